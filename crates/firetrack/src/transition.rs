//! Incident status transition rules.
//!
//! [`apply_status`] mutates an in-memory [`Incident`] and reports which
//! follow-on effects the store has to carry out on the incident's
//! assignments. It never touches the database, so the rules can be tested
//! without one.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{Incident, IncidentStatus};

/// Effects of a status change beyond the incident row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionEffects {
    /// The timestamp that was stamped on the incident, if any.
    pub stamped: Option<DateTime<Utc>>,
    /// Active vehicle assignments without an arrival get `arrived_time`.
    pub mark_arrivals: bool,
    /// Active assignments are cleared and their vehicles made available.
    pub release_assignments: bool,
    /// The moment all follow-on effects should use.
    pub at: DateTime<Utc>,
}

/// Apply a requested status to an incident.
///
/// Each lifecycle timestamp is stamped at most once. A stage is never
/// stamped once a later stage already carries a time, and the stamp is
/// never earlier than any time already recorded, so the timeline stays in
/// order even if an incident is reopened or the clock steps backwards.
pub fn apply_status(
    incident: &mut Incident,
    target: IncidentStatus,
    now: DateTime<Utc>,
) -> TransitionEffects {
    let at = not_before_timeline(incident, now);

    incident.status = target;
    let mut effects = TransitionEffects {
        at,
        ..TransitionEffects::default()
    };

    match target {
        IncidentStatus::Reported => {}
        IncidentStatus::Responding => {
            if incident.dispatch_time.is_none()
                && incident.arrival_time.is_none()
                && incident.controlled_time.is_none()
                && incident.cleared_time.is_none()
            {
                incident.dispatch_time = Some(at);
                effects.stamped = Some(at);
            }
        }
        IncidentStatus::OnScene => {
            if incident.arrival_time.is_none()
                && incident.controlled_time.is_none()
                && incident.cleared_time.is_none()
            {
                incident.arrival_time = Some(at);
                effects.stamped = Some(at);
            }
            effects.mark_arrivals = true;
        }
        IncidentStatus::Resolved => {
            if incident.cleared_time.is_none() {
                incident.cleared_time = Some(at);
                effects.stamped = Some(at);
            }
            effects.release_assignments = true;
        }
    }

    effects
}

/// Record that an on-scene incident is under control.
///
/// Independent of the status. Returns the stamped time, or `None` when the
/// incident was already marked controlled.
///
/// # Errors
///
/// Returns a validation error if units have not arrived yet or the
/// incident has already been cleared.
pub fn mark_controlled(
    incident: &mut Incident,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if incident.controlled_time.is_some() {
        return Ok(None);
    }
    if incident.cleared_time.is_some() {
        return Err(Error::validation(format!(
            "incident {} is already cleared",
            incident.incident_number
        )));
    }
    if incident.arrival_time.is_none() {
        return Err(Error::validation(format!(
            "incident {} has no arrival yet",
            incident.incident_number
        )));
    }

    let at = not_before_timeline(incident, now);
    incident.controlled_time = Some(at);
    Ok(Some(at))
}

fn not_before_timeline(incident: &Incident, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = incident
        .timeline()
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(incident.reported_time);
    now.max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn incident_at(reported: DateTime<Utc>) -> Incident {
        Incident {
            id: 1,
            incident_number: "INC-12345678".to_string(),
            incident_type: "fire".to_string(),
            status: IncidentStatus::Reported,
            priority: 2,
            address: "1 Main St".to_string(),
            latitude: None,
            longitude: None,
            reported_time: reported,
            dispatch_time: None,
            arrival_time: None,
            controlled_time: None,
            cleared_time: None,
            description: None,
            reporter_name: None,
            reporter_phone: None,
            station_id: None,
        }
    }

    #[test]
    fn test_responding_stamps_dispatch_once() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);

        let first = apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(1));
        assert_eq!(incident.status, IncidentStatus::Responding);
        assert_eq!(incident.dispatch_time, Some(t0 + Duration::minutes(1)));
        assert!(first.stamped.is_some());

        let second = apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(9));
        assert_eq!(incident.dispatch_time, Some(t0 + Duration::minutes(1)));
        assert!(second.stamped.is_none());
    }

    #[test]
    fn test_onscene_stamps_arrival_and_marks_assignments() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(1));

        let effects = apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(6));
        assert_eq!(incident.arrival_time, Some(t0 + Duration::minutes(6)));
        assert!(effects.mark_arrivals);
        assert!(!effects.release_assignments);
    }

    #[test]
    fn test_resolved_stamps_cleared_and_releases() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);

        let effects = apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::minutes(30));
        assert_eq!(incident.cleared_time, Some(t0 + Duration::minutes(30)));
        assert!(effects.release_assignments);
        assert!(incident.dispatch_time.is_none());
        assert!(incident.timestamps_ordered());
    }

    #[test]
    fn test_resolving_again_still_releases_without_restamping() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::minutes(30));

        let effects = apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::hours(2));
        assert_eq!(incident.cleared_time, Some(t0 + Duration::minutes(30)));
        assert!(effects.stamped.is_none());
        assert!(effects.release_assignments);
    }

    #[test]
    fn test_reopened_incident_keeps_timeline_ordered() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::minutes(10));

        apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(20));
        apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(25));

        assert_eq!(incident.status, IncidentStatus::OnScene);
        assert!(incident.dispatch_time.is_none());
        assert!(incident.arrival_time.is_none());
        assert!(incident.timestamps_ordered());
    }

    #[test]
    fn test_clock_skew_never_stamps_backwards() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(5));

        // Wall clock stepped back before the dispatch time.
        let effects = apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(2));
        assert_eq!(incident.arrival_time, Some(t0 + Duration::minutes(5)));
        assert_eq!(effects.at, t0 + Duration::minutes(5));
        assert!(incident.timestamps_ordered());
    }

    #[test]
    fn test_reported_has_no_effects() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        let effects = apply_status(&mut incident, IncidentStatus::Reported, t0);
        assert!(effects.stamped.is_none());
        assert!(!effects.mark_arrivals);
        assert!(!effects.release_assignments);
    }

    #[test]
    fn test_controlled_needs_arrival_and_stamps_once() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(1));
        assert!(matches!(
            mark_controlled(&mut incident, t0 + Duration::minutes(2)),
            Err(Error::Validation(_))
        ));

        apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(6));
        let stamped = mark_controlled(&mut incident, t0 + Duration::minutes(20)).unwrap();
        assert_eq!(stamped, Some(t0 + Duration::minutes(20)));
        assert_eq!(
            mark_controlled(&mut incident, t0 + Duration::minutes(25)).unwrap(),
            None
        );
        assert_eq!(incident.controlled_time, Some(t0 + Duration::minutes(20)));
    }

    #[test]
    fn test_controlled_incident_does_not_restamp_arrival() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(4));
        mark_controlled(&mut incident, t0 + Duration::minutes(3)).unwrap();
        assert_eq!(incident.controlled_time, Some(t0 + Duration::minutes(4)));

        apply_status(&mut incident, IncidentStatus::Responding, t0 + Duration::minutes(8));
        assert!(incident.dispatch_time.is_none());
        apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::minutes(30));
        assert!(incident.timestamps_ordered());
        assert!(matches!(
            mark_controlled(&mut incident, t0 + Duration::minutes(31)),
            Ok(None)
        ));
    }

    #[test]
    fn test_cleared_incident_cannot_be_marked_controlled() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        apply_status(&mut incident, IncidentStatus::OnScene, t0 + Duration::minutes(4));
        apply_status(&mut incident, IncidentStatus::Resolved, t0 + Duration::minutes(9));
        let err = mark_controlled(&mut incident, t0 + Duration::minutes(10)).unwrap_err();
        assert!(err.to_string().contains("already cleared"));
    }

    #[test]
    fn test_full_lifecycle_is_ordered() {
        let t0 = Utc::now();
        let mut incident = incident_at(t0);
        for (minutes, status) in [
            (1, IncidentStatus::Responding),
            (7, IncidentStatus::OnScene),
            (45, IncidentStatus::Resolved),
        ] {
            apply_status(&mut incident, status, t0 + Duration::minutes(minutes));
        }
        assert!(incident.timestamps_ordered());
        assert!((incident.response_minutes().unwrap() - 6.0).abs() < 1e-9);
    }
}
