//! Dashboard aggregates.

use serde::Serialize;

use crate::error::Result;
use crate::model::Incident;
use crate::storage::Storage;

/// Number of recent incidents shown when nothing else is configured.
pub const DEFAULT_RECENT_INCIDENTS: usize = 5;

/// A snapshot of department activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Incidents not yet resolved.
    pub active_incidents: i64,
    /// Vehicles ready for dispatch.
    pub available_vehicles: i64,
    /// Vehicles in the fleet.
    pub total_vehicles: i64,
    /// Mean minutes from dispatch to arrival, over incidents that have both.
    pub average_response_time: Option<f64>,
    /// Most recently reported incidents, newest first.
    pub recent_incidents: Vec<Incident>,
}

impl Storage {
    /// Compute the dashboard summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn dashboard(&self, recent_limit: usize) -> Result<DashboardSummary> {
        let active_incidents =
            self.count_rows("SELECT COUNT(*) FROM incidents WHERE status != 'resolved'")?;
        let available_vehicles =
            self.count_rows("SELECT COUNT(*) FROM vehicles WHERE status = 'available'")?;
        let total_vehicles = self.count_rows("SELECT COUNT(*) FROM vehicles")?;
        let average_response_time = self.average_response_minutes()?;
        let recent_incidents = self.recent_incidents(recent_limit)?;

        Ok(DashboardSummary {
            active_incidents,
            available_vehicles,
            total_vehicles,
            average_response_time,
            recent_incidents,
        })
    }
}

impl std::fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Active incidents:   {}", self.active_incidents)?;
        writeln!(
            f,
            "Available vehicles: {}/{}",
            self.available_vehicles, self.total_vehicles
        )?;
        match self.average_response_time {
            Some(minutes) => writeln!(f, "Avg response time:  {minutes:.1} min")?,
            None => writeln!(f, "Avg response time:  n/a")?,
        }

        if self.recent_incidents.is_empty() {
            return write!(f, "No incidents reported.");
        }
        write!(f, "\nRecent incidents:")?;
        for incident in &self.recent_incidents {
            write!(
                f,
                "\n  {}  {:<10} P{}  {:<10} {}  {}",
                incident.incident_number,
                incident.incident_type,
                incident.priority,
                incident.status,
                incident.reported_time.format("%Y-%m-%d %H:%M"),
                incident.address
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActorContext, IncidentStatus, IncidentUpdate, NewIncident, NewVehicle, VehicleStatus,
    };

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn report(storage: &mut Storage, address: &str) -> i64 {
        storage
            .create_incident(
                &ActorContext::new(1, None),
                &NewIncident {
                    incident_type: "fire".to_string(),
                    priority: 3,
                    address: address.to_string(),
                    latitude: None,
                    longitude: None,
                    description: None,
                    reporter_name: None,
                    reporter_phone: None,
                },
            )
            .unwrap()
            .id
    }

    /// Overwrite the lifecycle times of an incident directly.
    fn set_times(storage: &Storage, id: i64, dispatch: Option<&str>, arrival: Option<&str>) {
        storage
            .conn_for_tests()
            .execute(
                "UPDATE incidents SET dispatch_time = ?2, arrival_time = ?3 WHERE id = ?1",
                rusqlite::params![id, dispatch, arrival],
            )
            .unwrap();
    }

    #[test]
    fn test_empty_dashboard() {
        let storage = create_test_storage();
        let summary = storage.dashboard(DEFAULT_RECENT_INCIDENTS).unwrap();

        assert_eq!(summary.active_incidents, 0);
        assert_eq!(summary.available_vehicles, 0);
        assert_eq!(summary.total_vehicles, 0);
        assert!(summary.average_response_time.is_none());
        assert!(summary.recent_incidents.is_empty());
        assert!(summary.to_string().contains("n/a"));
    }

    #[test]
    fn test_counts() {
        let mut storage = create_test_storage();
        storage.seed_defaults().unwrap();
        let a = report(&mut storage, "1 A St");
        report(&mut storage, "2 B St");
        storage
            .update_incident(
                a,
                &IncidentUpdate {
                    status: Some(IncidentStatus::Resolved),
                    ..IncidentUpdate::default()
                },
            )
            .unwrap();
        let engine = storage.list_vehicles(Some(VehicleStatus::Available)).unwrap()[0].id;
        let b = storage.recent_incidents(1).unwrap()[0].id;
        storage.assign_vehicle(b, engine).unwrap();

        let summary = storage.dashboard(DEFAULT_RECENT_INCIDENTS).unwrap();
        assert_eq!(summary.active_incidents, 1);
        assert_eq!(summary.total_vehicles, 4);
        // Hazmat 1 is in maintenance and the engine is responding.
        assert_eq!(summary.available_vehicles, 2);
    }

    #[test]
    fn test_average_response_time_uses_complete_pairs_only() {
        let mut storage = create_test_storage();
        let a = report(&mut storage, "1 A St");
        let b = report(&mut storage, "2 B St");
        let c = report(&mut storage, "3 C St");
        set_times(
            &storage,
            a,
            Some("2024-05-01T10:00:00.000000Z"),
            Some("2024-05-01T10:04:00.000000Z"),
        );
        set_times(
            &storage,
            b,
            Some("2024-05-01T11:00:00.000000Z"),
            Some("2024-05-01T11:08:00.000000Z"),
        );
        set_times(&storage, c, Some("2024-05-01T12:00:00.000000Z"), None);

        let summary = storage.dashboard(DEFAULT_RECENT_INCIDENTS).unwrap();
        let average = summary.average_response_time.unwrap();
        assert!((average - 6.0).abs() < 0.01, "average was {average}");
    }

    #[test]
    fn test_recent_incidents_newest_first_and_limited() {
        let mut storage = create_test_storage();
        let ids: Vec<i64> = (0..7)
            .map(|n| report(&mut storage, &format!("{n} Main St")))
            .collect();

        let summary = storage.dashboard(DEFAULT_RECENT_INCIDENTS).unwrap();
        let recent: Vec<i64> = summary.recent_incidents.iter().map(|i| i.id).collect();
        assert_eq!(recent, ids.iter().rev().take(5).copied().collect::<Vec<_>>());

        assert_eq!(storage.dashboard(2).unwrap().recent_incidents.len(), 2);
    }

    #[test]
    fn test_serializes_null_average() {
        let storage = create_test_storage();
        let json = serde_json::to_value(storage.dashboard(5).unwrap()).unwrap();
        assert!(json["average_response_time"].is_null());
        assert_eq!(json["total_vehicles"], 0);
    }
}
