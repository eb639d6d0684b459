//! Incident records, their status lifecycle and the cascade delete.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use super::roster::{ensure_station, personnel_assignments_for};
use super::vehicles::vehicle_assignments_for;
use super::{encode_time, enum_column, now, opt_time_column, time_column, Storage};
use crate::error::{Error, Result};
use crate::model::{
    validate_priority, ActorContext, Incident, IncidentFilter, IncidentNote, IncidentStatus,
    IncidentUpdate, NewIncident, PersonnelAssignment, VehicleAssignment,
};
use crate::transition::{apply_status, mark_controlled};

const INCIDENT_COLUMNS: &str = r"
    id, incident_number, incident_type, status, priority, address, latitude, longitude,
    reported_time, dispatch_time, arrival_time, controlled_time, cleared_time,
    description, reporter_name, reporter_phone, station_id
";

/// Attempts at drawing an unused incident number.
const NUMBER_ATTEMPTS: usize = 3;

/// An incident together with everything attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDetail {
    /// The incident itself.
    #[serde(flatten)]
    pub incident: Incident,
    /// Every vehicle assignment, active or cleared.
    pub vehicles: Vec<VehicleAssignment>,
    /// Every personnel assignment, active or cleared.
    pub personnel: Vec<PersonnelAssignment>,
    /// Notes, oldest first.
    pub notes: Vec<IncidentNote>,
}

impl Storage {
    /// Record a newly reported incident.
    ///
    /// The incident starts in `reported` with `reported_time` set to now and
    /// is attributed to the actor's station.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank type or address or an
    /// out-of-range priority, and `NotFound` if the actor's station does not
    /// exist.
    pub fn create_incident(&mut self, actor: &ActorContext, new: &NewIncident) -> Result<Incident> {
        let priority = validate_priority(new.priority)?;
        let incident_type = required_text("incident type", &new.incident_type)?;
        let address = required_text("address", &new.address)?;

        let tx = self.write_transaction()?;
        if let Some(station_id) = actor.station_id {
            ensure_station(&tx, station_id)?;
        }

        let reported = encode_time(now());
        let mut attempt = 0;
        let id = loop {
            attempt += 1;
            let number = Incident::generate_number();
            let inserted = tx.execute(
                r"
                INSERT INTO incidents (
                    incident_number, incident_type, status, priority, address,
                    latitude, longitude, reported_time, description,
                    reporter_name, reporter_phone, station_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ",
                params![
                    number,
                    incident_type,
                    IncidentStatus::Reported.as_str(),
                    priority,
                    address,
                    new.latitude,
                    new.longitude,
                    reported,
                    new.description,
                    new.reporter_name,
                    new.reporter_phone,
                    actor.station_id,
                ],
            );
            match inserted.map_err(Error::from) {
                Ok(_) => break tx.last_insert_rowid(),
                Err(e) if e.is_unique_violation() && attempt < NUMBER_ATTEMPTS => {
                    debug!("Incident number {} already taken, drawing again", number);
                }
                Err(e) => return Err(e),
            }
        };

        let incident = load_incident(&tx, id)?;
        tx.commit()?;

        info!(
            "Incident {} ({}) reported by actor {}",
            incident.incident_number, incident.incident_type, actor.actor_id
        );
        Ok(incident)
    }

    /// Get an incident by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no incident has this id.
    pub fn incident(&self, id: i64) -> Result<Incident> {
        load_incident(&self.conn, id)
    }

    /// Get an incident with its assignments and notes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no incident has this id.
    pub fn incident_detail(&self, id: i64) -> Result<IncidentDetail> {
        let incident = load_incident(&self.conn, id)?;
        Ok(IncidentDetail {
            incident,
            vehicles: vehicle_assignments_for(&self.conn, id)?,
            personnel: personnel_assignments_for(&self.conn, id)?,
            notes: notes_for(&self.conn, id)?,
        })
    }

    /// List incidents, newest report first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {INCIDENT_COLUMNS} FROM incidents
            WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR incident_type = ?2)
            ORDER BY reported_time DESC, id DESC
            "
        ))?;

        let status = filter.status.map(IncidentStatus::as_str);
        let incidents = stmt
            .query_map(params![status, filter.incident_type], row_to_incident)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(incidents)
    }

    /// The most recently reported incidents.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_incidents(&self, limit: usize) -> Result<Vec<Incident>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY reported_time DESC, id DESC LIMIT ?1"
        ))?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let incidents = stmt
            .query_map([limit_i64], row_to_incident)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(incidents)
    }

    /// Apply a partial update to an incident.
    ///
    /// A status change runs the transition rules: lifecycle timestamps are
    /// stamped, arrivals are recorded on active assignments when units go on
    /// scene, and resolving clears every active assignment and returns its
    /// vehicle to `available`. `controlled` stamps `controlled_time` once,
    /// after any status change in the same update. The whole update is one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown incident, and a validation error for
    /// an out-of-range priority, a blank address, or marking an incident
    /// controlled before arrival or after it was cleared.
    pub fn update_incident(&mut self, id: i64, update: &IncidentUpdate) -> Result<Incident> {
        if let Some(priority) = update.priority {
            validate_priority(priority)?;
        }
        let address = update
            .address
            .as_deref()
            .map(|address| required_text("address", address))
            .transpose()?;

        let tx = self.write_transaction()?;
        let mut incident = load_incident(&tx, id)?;
        let stamp = now();

        if let Some(status) = update.status {
            let previous = incident.status;
            let effects = apply_status(&mut incident, status, stamp);
            if effects.mark_arrivals {
                let marked = mark_arrivals(&tx, id, effects.at)?;
                debug!("Marked {} assignment(s) on scene for incident {}", marked, id);
            }
            if effects.release_assignments {
                let released = release_active_assignments(&tx, id, effects.at)?;
                debug!("Released {} vehicle(s) from incident {}", released, id);
            }
            info!(
                "Incident {} status {} -> {}",
                incident.incident_number, previous, status
            );
        }
        if update.controlled {
            if let Some(at) = mark_controlled(&mut incident, stamp)? {
                info!("Incident {} under control at {}", incident.incident_number, at);
            }
        }
        if let Some(priority) = update.priority {
            incident.priority = priority;
        }
        if let Some(description) = &update.description {
            incident.description = Some(description.clone());
        }
        if let Some(address) = address {
            incident.address = address;
        }

        save_incident(&tx, &incident)?;
        tx.commit()?;
        Ok(incident)
    }

    /// Delete an incident and everything attached to it.
    ///
    /// Every vehicle that was ever assigned to the incident is set back to
    /// `available`, then the assignments, notes and the incident row are
    /// removed. Returns the number of vehicles released.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no incident has this id.
    pub fn delete_incident(&mut self, id: i64) -> Result<usize> {
        let tx = self.write_transaction()?;
        let incident = load_incident(&tx, id)?;

        let released = release_incident_vehicles(&tx, id)?;
        remove_incident(&tx, id)?;
        tx.commit()?;

        info!(
            "Deleted incident {} and released {} vehicle(s)",
            incident.incident_number, released
        );
        Ok(released)
    }

    /// Delete every incident. Returns the number of incidents removed.
    ///
    /// Runs the same release step as [`Storage::delete_incident`] for each
    /// incident, all inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_all_incidents(&mut self) -> Result<usize> {
        let tx = self.write_transaction()?;

        let ids: Vec<i64> = tx
            .prepare("SELECT id FROM incidents")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        let mut released = 0;
        for id in &ids {
            released += release_incident_vehicles(&tx, *id)?;
            remove_incident(&tx, *id)?;
        }
        tx.commit()?;

        info!(
            "Deleted {} incident(s) and released {} vehicle(s)",
            ids.len(),
            released
        );
        Ok(ids.len())
    }

    /// Append a note to an incident, authored by the actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown incident and a validation error for
    /// an empty note.
    pub fn add_note(
        &mut self,
        actor: &ActorContext,
        incident_id: i64,
        content: &str,
    ) -> Result<IncidentNote> {
        let content = required_text("note", content)?;

        let tx = self.write_transaction()?;
        load_incident(&tx, incident_id)?;

        let timestamp = now();
        tx.execute(
            r"
            INSERT INTO incident_notes (incident_id, personnel_id, timestamp, content)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![incident_id, actor.actor_id, encode_time(timestamp), content],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!("Added note {} to incident {}", id, incident_id);
        Ok(IncidentNote {
            id,
            incident_id,
            personnel_id: Some(actor.actor_id),
            timestamp,
            content,
        })
    }

    /// Notes on an incident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown incident.
    pub fn notes(&self, incident_id: i64) -> Result<Vec<IncidentNote>> {
        load_incident(&self.conn, incident_id)?;
        notes_for(&self.conn, incident_id)
    }
}

/// Load an incident or report it missing.
pub(super) fn load_incident(conn: &Connection, id: i64) -> Result<Incident> {
    conn.query_row(
        &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
        [id],
        row_to_incident,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("incident", id))
}

fn save_incident(conn: &Connection, incident: &Incident) -> Result<()> {
    debug_assert!(incident.timestamps_ordered(), "timeline out of order: {incident:?}");
    conn.execute(
        r"
        UPDATE incidents SET
            status = ?2, priority = ?3, address = ?4, description = ?5,
            dispatch_time = ?6, arrival_time = ?7, controlled_time = ?8, cleared_time = ?9
        WHERE id = ?1
        ",
        params![
            incident.id,
            incident.status.as_str(),
            incident.priority,
            incident.address,
            incident.description,
            incident.dispatch_time.map(encode_time),
            incident.arrival_time.map(encode_time),
            incident.controlled_time.map(encode_time),
            incident.cleared_time.map(encode_time),
        ],
    )?;
    Ok(())
}

/// Set every vehicle ever assigned to the incident back to `available`.
///
/// This is the single release step shared by every delete path.
fn release_incident_vehicles(conn: &Connection, incident_id: i64) -> Result<usize> {
    let released = conn.execute(
        r"
        UPDATE vehicles SET status = 'available'
        WHERE id IN (SELECT vehicle_id FROM vehicle_assignments WHERE incident_id = ?1)
        ",
        [incident_id],
    )?;
    Ok(released)
}

fn remove_incident(conn: &Connection, incident_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM vehicle_assignments WHERE incident_id = ?1",
        [incident_id],
    )?;
    conn.execute(
        "DELETE FROM personnel_assignments WHERE incident_id = ?1",
        [incident_id],
    )?;
    conn.execute(
        "DELETE FROM incident_notes WHERE incident_id = ?1",
        [incident_id],
    )?;
    conn.execute("DELETE FROM incidents WHERE id = ?1", [incident_id])?;
    Ok(())
}

/// Record arrival on active assignments that have none yet.
fn mark_arrivals(conn: &Connection, incident_id: i64, at: DateTime<Utc>) -> Result<usize> {
    let marked = conn.execute(
        r"
        UPDATE vehicle_assignments SET arrived_time = MAX(dispatched_time, ?2)
        WHERE incident_id = ?1 AND cleared_time IS NULL AND arrived_time IS NULL
        ",
        params![incident_id, encode_time(at)],
    )?;
    Ok(marked)
}

/// Clear active assignments and return their vehicles to service.
fn release_active_assignments(
    conn: &Connection,
    incident_id: i64,
    at: DateTime<Utc>,
) -> Result<usize> {
    let at = encode_time(at);
    conn.execute(
        r"
        UPDATE vehicles SET status = 'available'
        WHERE id IN (
            SELECT vehicle_id FROM vehicle_assignments
            WHERE incident_id = ?1 AND cleared_time IS NULL
        )
        ",
        [incident_id],
    )?;
    let cleared = conn.execute(
        r"
        UPDATE vehicle_assignments SET cleared_time = MAX(dispatched_time, ?2)
        WHERE incident_id = ?1 AND cleared_time IS NULL
        ",
        params![incident_id, at],
    )?;
    conn.execute(
        r"
        UPDATE personnel_assignments SET cleared_time = MAX(assigned_time, ?2)
        WHERE incident_id = ?1 AND cleared_time IS NULL
        ",
        params![incident_id, at],
    )?;
    Ok(cleared)
}

fn notes_for(conn: &Connection, incident_id: i64) -> Result<Vec<IncidentNote>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, incident_id, personnel_id, timestamp, content
        FROM incident_notes WHERE incident_id = ?1 ORDER BY timestamp, id
        ",
    )?;
    let notes = stmt
        .query_map([incident_id], |row| {
            Ok(IncidentNote {
                id: row.get(0)?,
                incident_id: row.get(1)?,
                personnel_id: row.get(2)?,
                timestamp: time_column(row, 3)?,
                content: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(notes)
}

pub(super) fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Convert a database row to an Incident.
fn row_to_incident(row: &rusqlite::Row) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        incident_number: row.get(1)?,
        incident_type: row.get(2)?,
        status: enum_column(row, 3, IncidentStatus::Reported)?,
        priority: row.get(4)?,
        address: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        reported_time: time_column(row, 8)?,
        dispatch_time: opt_time_column(row, 9)?,
        arrival_time: opt_time_column(row, 10)?,
        controlled_time: opt_time_column(row, 11)?,
        cleared_time: opt_time_column(row, 12)?,
        description: row.get(13)?,
        reporter_name: row.get(14)?,
        reporter_phone: row.get(15)?,
        station_id: row.get(16)?,
    })
}
