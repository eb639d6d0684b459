//! Apparatus records and vehicle-to-incident assignment.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::incidents::load_incident;
use super::roster::ensure_station;
use super::{encode_time, enum_column, now, opt_time_column, time_column, Storage};
use crate::error::{Error, Result};
use crate::model::{NewVehicle, Vehicle, VehicleAssignment, VehicleStatus};

const VEHICLE_COLUMNS: &str = r"
    id, name, vehicle_type, status, capacity, station_id,
    last_maintenance, next_maintenance, latitude, longitude
";

const ASSIGNMENT_COLUMNS: &str =
    "id, vehicle_id, incident_id, dispatched_time, arrived_time, cleared_time";

/// Outcome of assigning several vehicles at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    /// Assignments that were created.
    pub assigned: Vec<VehicleAssignment>,
    /// Vehicles that were passed over, with the reason.
    pub skipped: Vec<SkippedVehicle>,
}

/// A vehicle left out of a bulk assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVehicle {
    /// The requested vehicle.
    pub vehicle_id: i64,
    /// Why it was not assigned.
    pub reason: String,
}

impl Storage {
    /// Add a vehicle to the fleet.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name and `NotFound` for an
    /// unknown home station.
    pub fn add_vehicle(&mut self, new: &NewVehicle) -> Result<Vehicle> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::validation("vehicle name must not be empty"));
        }

        let tx = self.write_transaction()?;
        if let Some(station_id) = new.station_id {
            ensure_station(&tx, station_id)?;
        }
        tx.execute(
            r"
            INSERT INTO vehicles (
                name, vehicle_type, status, capacity, station_id, latitude, longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                name,
                new.vehicle_type,
                new.status.as_str(),
                new.capacity,
                new.station_id,
                new.latitude,
                new.longitude,
            ],
        )?;
        let vehicle = load_vehicle(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!("Added vehicle {} ({})", vehicle.name, vehicle.id);
        Ok(vehicle)
    }

    /// Get a vehicle by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no vehicle has this id.
    pub fn vehicle(&self, id: i64) -> Result<Vehicle> {
        load_vehicle(&self.conn, id)
    }

    /// List vehicles, optionally only those in one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_vehicles(&self, status: Option<VehicleStatus>) -> Result<Vec<Vehicle>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE (?1 IS NULL OR status = ?1) ORDER BY id"
        ))?;

        let vehicles = stmt
            .query_map([status.map(VehicleStatus::as_str)], row_to_vehicle)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(vehicles)
    }

    /// Set a vehicle's status by hand.
    ///
    /// A vehicle with an active assignment can only be marked `responding`;
    /// it goes back to service when its incident is resolved or deleted.
    /// Entering `maintenance` records `last_maintenance`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown vehicle and `Conflict` when an
    /// active assignment forbids the change.
    pub fn set_vehicle_status(&mut self, id: i64, status: VehicleStatus) -> Result<Vehicle> {
        let tx = self.write_transaction()?;
        let mut vehicle = load_vehicle(&tx, id)?;

        if status != VehicleStatus::Responding {
            if let Some(active) = active_assignment(&tx, id, None)? {
                return Err(Error::conflict(format!(
                    "vehicle {id} is still assigned to incident {}",
                    active.incident_id
                )));
            }
        }

        if status == VehicleStatus::Maintenance && vehicle.status != VehicleStatus::Maintenance {
            vehicle.last_maintenance = Some(now());
        }
        vehicle.status = status;

        tx.execute(
            "UPDATE vehicles SET status = ?2, last_maintenance = ?3 WHERE id = ?1",
            params![id, status.as_str(), vehicle.last_maintenance.map(encode_time)],
        )?;
        tx.commit()?;

        info!("Vehicle {} is now {}", vehicle.name, status);
        Ok(vehicle)
    }

    /// Commit a vehicle to an incident.
    ///
    /// Creates an active assignment dispatched now and marks the vehicle
    /// `responding`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the incident or vehicle does not exist and
    /// `Conflict` if the vehicle already has an active assignment to this
    /// incident (or, with exclusive assignments enabled, to any other).
    pub fn assign_vehicle(&mut self, incident_id: i64, vehicle_id: i64) -> Result<VehicleAssignment> {
        let exclusive = self.exclusive_assignments;
        let tx = self.write_transaction()?;
        load_incident(&tx, incident_id)?;

        let assignment = assign(&tx, incident_id, vehicle_id, exclusive, now())?;
        tx.commit()?;

        info!("Vehicle {} assigned to incident {}", vehicle_id, incident_id);
        Ok(assignment)
    }

    /// Commit several vehicles to an incident in one transaction.
    ///
    /// Vehicles that do not exist or are already actively assigned are
    /// skipped and reported; the rest are assigned.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the incident does not exist, or a storage error,
    /// in which case nothing is assigned.
    pub fn assign_vehicles(
        &mut self,
        incident_id: i64,
        vehicle_ids: &[i64],
    ) -> Result<AssignmentSummary> {
        let exclusive = self.exclusive_assignments;
        let tx = self.write_transaction()?;
        load_incident(&tx, incident_id)?;

        let dispatched = now();
        let mut summary = AssignmentSummary::default();
        for &vehicle_id in vehicle_ids {
            match assign(&tx, incident_id, vehicle_id, exclusive, dispatched) {
                Ok(assignment) => summary.assigned.push(assignment),
                Err(e) if e.is_not_found() || e.is_conflict() => {
                    warn!("Skipping vehicle {}: {}", vehicle_id, e);
                    summary.skipped.push(SkippedVehicle {
                        vehicle_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;

        info!(
            "Assigned {} vehicle(s) to incident {}, skipped {}",
            summary.assigned.len(),
            incident_id,
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Every assignment for an incident, active or cleared.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown incident.
    pub fn vehicle_assignments(&self, incident_id: i64) -> Result<Vec<VehicleAssignment>> {
        load_incident(&self.conn, incident_id)?;
        vehicle_assignments_for(&self.conn, incident_id)
    }
}

/// Check and create one assignment inside an open write transaction.
fn assign(
    conn: &Connection,
    incident_id: i64,
    vehicle_id: i64,
    exclusive: bool,
    now: DateTime<Utc>,
) -> Result<VehicleAssignment> {
    load_vehicle(conn, vehicle_id)?;

    let existing: Option<i64> = conn
        .query_row(
            r"
            SELECT id FROM vehicle_assignments
            WHERE vehicle_id = ?1 AND incident_id = ?2 AND cleared_time IS NULL
            ",
            [vehicle_id, incident_id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(already_assigned(vehicle_id));
    }

    if exclusive {
        if let Some(other) = active_assignment(conn, vehicle_id, Some(incident_id))? {
            return Err(Error::conflict(format!(
                "vehicle {vehicle_id} is already assigned to incident {}",
                other.incident_id
            )));
        }
    }

    let assignment = insert_assignment(conn, incident_id, vehicle_id, now)?;
    conn.execute(
        "UPDATE vehicles SET status = ?2 WHERE id = ?1",
        params![vehicle_id, VehicleStatus::Responding.as_str()],
    )?;
    Ok(assignment)
}

/// Insert an active assignment row.
///
/// The partial unique index turns a concurrent duplicate into a conflict.
fn insert_assignment(
    conn: &Connection,
    incident_id: i64,
    vehicle_id: i64,
    now: DateTime<Utc>,
) -> Result<VehicleAssignment> {
    let inserted = conn.execute(
        r"
        INSERT INTO vehicle_assignments (vehicle_id, incident_id, dispatched_time)
        VALUES (?1, ?2, ?3)
        ",
        params![vehicle_id, incident_id, encode_time(now)],
    );
    match inserted.map_err(Error::from) {
        Ok(_) => Ok(VehicleAssignment {
            id: conn.last_insert_rowid(),
            vehicle_id,
            incident_id,
            dispatched_time: now,
            arrived_time: None,
            cleared_time: None,
        }),
        Err(e) if e.is_unique_violation() => Err(already_assigned(vehicle_id)),
        Err(e) => Err(e),
    }
}

fn already_assigned(vehicle_id: i64) -> Error {
    Error::conflict(format!(
        "vehicle {vehicle_id} is already assigned to this incident"
    ))
}

/// The newest active assignment of a vehicle, optionally ignoring one incident.
fn active_assignment(
    conn: &Connection,
    vehicle_id: i64,
    except_incident: Option<i64>,
) -> Result<Option<VehicleAssignment>> {
    let assignment = conn
        .query_row(
            &format!(
                r"
                SELECT {ASSIGNMENT_COLUMNS} FROM vehicle_assignments
                WHERE vehicle_id = ?1 AND cleared_time IS NULL
                  AND (?2 IS NULL OR incident_id != ?2)
                ORDER BY dispatched_time DESC, id DESC LIMIT 1
                "
            ),
            params![vehicle_id, except_incident],
            row_to_assignment,
        )
        .optional()?;
    Ok(assignment)
}

/// Every assignment for an incident, in dispatch order.
pub(super) fn vehicle_assignments_for(
    conn: &Connection,
    incident_id: i64,
) -> Result<Vec<VehicleAssignment>> {
    let mut stmt = conn.prepare(&format!(
        r"
        SELECT {ASSIGNMENT_COLUMNS} FROM vehicle_assignments
        WHERE incident_id = ?1 ORDER BY dispatched_time, id
        "
    ))?;
    let assignments = stmt
        .query_map([incident_id], row_to_assignment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(assignments)
}

pub(super) fn load_vehicle(conn: &Connection, id: i64) -> Result<Vehicle> {
    conn.query_row(
        &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1"),
        [id],
        row_to_vehicle,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("vehicle", id))
}

fn row_to_vehicle(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        name: row.get(1)?,
        vehicle_type: row.get(2)?,
        status: enum_column(row, 3, VehicleStatus::Available)?,
        capacity: row.get(4)?,
        station_id: row.get(5)?,
        last_maintenance: opt_time_column(row, 6)?,
        next_maintenance: opt_time_column(row, 7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
    })
}

fn row_to_assignment(row: &rusqlite::Row) -> rusqlite::Result<VehicleAssignment> {
    Ok(VehicleAssignment {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        incident_id: row.get(2)?,
        dispatched_time: time_column(row, 3)?,
        arrived_time: opt_time_column(row, 4)?,
        cleared_time: opt_time_column(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorContext, IncidentStatus, IncidentUpdate, NewIncident};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn report(storage: &mut Storage) -> i64 {
        storage
            .create_incident(
                &ActorContext::new(1, None),
                &NewIncident {
                    incident_type: "fire".to_string(),
                    priority: 2,
                    address: "5 Pine Rd".to_string(),
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

    fn add(storage: &mut Storage, name: &str) -> i64 {
        storage
            .add_vehicle(&NewVehicle {
                name: name.to_string(),
                ..NewVehicle::default()
            })
            .unwrap()
            .id
    }

    fn assignment_rows(storage: &Storage, incident_id: i64) -> i64 {
        storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM vehicle_assignments WHERE incident_id = ?1",
                [incident_id],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_add_and_get_vehicle() {
        let mut storage = create_test_storage();
        let vehicle = storage
            .add_vehicle(&NewVehicle {
                name: "Ladder 1".to_string(),
                vehicle_type: Some("Ladder".to_string()),
                capacity: Some(6),
                latitude: Some(39.95),
                longitude: Some(-75.16),
                ..NewVehicle::default()
            })
            .unwrap();

        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(vehicle.capacity, Some(6));
        assert_eq!(vehicle.latitude, Some(39.95));
        assert_eq!(vehicle.longitude, Some(-75.16));
        assert_eq!(storage.vehicle(vehicle.id).unwrap(), vehicle);
    }

    #[test]
    fn test_add_vehicle_validation() {
        let mut storage = create_test_storage();
        assert!(matches!(
            storage.add_vehicle(&NewVehicle::default()),
            Err(Error::Validation(_))
        ));
        let err = storage
            .add_vehicle(&NewVehicle {
                name: "Engine 9".to_string(),
                station_id: Some(12),
                ..NewVehicle::default()
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_vehicles_by_status() {
        let mut storage = create_test_storage();
        add(&mut storage, "Engine 1");
        storage
            .add_vehicle(&NewVehicle {
                name: "Hazmat 1".to_string(),
                status: VehicleStatus::Maintenance,
                ..NewVehicle::default()
            })
            .unwrap();

        assert_eq!(storage.list_vehicles(None).unwrap().len(), 2);
        let available = storage
            .list_vehicles(Some(VehicleStatus::Available))
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Engine 1");
    }

    #[test]
    fn test_assign_marks_vehicle_responding() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        let assignment = storage.assign_vehicle(incident, v1).unwrap();
        assert!(assignment.is_active());
        assert_eq!(assignment.vehicle_id, v1);
        assert_eq!(
            storage.vehicle(v1).unwrap().status,
            VehicleStatus::Responding
        );
        assert_eq!(
            active_assignment(&storage.conn, v1, None).unwrap(),
            Some(assignment.clone())
        );
        assert_eq!(storage.vehicle_assignments(incident).unwrap(), vec![assignment]);
    }

    #[test]
    fn test_duplicate_assignment_rejected() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        storage.assign_vehicle(incident, v1).unwrap();
        let err = storage.assign_vehicle(incident, v1).unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(assignment_rows(&storage, incident), 1);
    }

    #[test]
    fn test_unique_index_backstops_duplicate_insert() {
        let storage = create_test_storage();
        let conn = &storage.conn;
        conn.execute_batch(
            r"
            INSERT INTO vehicles (name) VALUES ('Engine 1');
            INSERT INTO incidents (incident_number, incident_type, priority, address, reported_time)
            VALUES ('INC-00000001', 'fire', 1, 'x', '2024-01-01T00:00:00.000000Z');
            ",
        )
        .unwrap();

        insert_assignment(conn, 1, 1, Utc::now()).unwrap();
        let err = insert_assignment(conn, 1, 1, Utc::now()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_assign_missing_records() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        let err = storage.assign_vehicle(incident + 10, v1).unwrap_err();
        assert_eq!(err.to_string(), format!("incident not found: {}", incident + 10));
        let err = storage.assign_vehicle(incident, v1 + 10).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.vehicle(v1).unwrap().status, VehicleStatus::Available);
    }

    #[test]
    fn test_vehicle_may_serve_two_incidents_by_default() {
        let mut storage = create_test_storage();
        let a = report(&mut storage);
        let b = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        storage.assign_vehicle(a, v1).unwrap();
        assert!(storage.assign_vehicle(b, v1).is_ok());
    }

    #[test]
    fn test_exclusive_assignments_reject_second_incident() {
        let mut storage = create_test_storage().with_exclusive_assignments(true);
        let a = report(&mut storage);
        let b = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        storage.assign_vehicle(a, v1).unwrap();
        let err = storage.assign_vehicle(b, v1).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains(&format!("incident {a}")));

        storage
            .update_incident(
                a,
                &IncidentUpdate {
                    status: Some(IncidentStatus::Resolved),
                    ..IncidentUpdate::default()
                },
            )
            .unwrap();
        assert!(storage.assign_vehicle(b, v1).is_ok());
    }

    #[test]
    fn test_reassign_after_resolve_creates_new_row() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");

        storage.assign_vehicle(incident, v1).unwrap();
        storage
            .update_incident(
                incident,
                &IncidentUpdate {
                    status: Some(IncidentStatus::Resolved),
                    ..IncidentUpdate::default()
                },
            )
            .unwrap();
        storage.assign_vehicle(incident, v1).unwrap();

        assert_eq!(assignment_rows(&storage, incident), 2);
    }

    #[test]
    fn test_assign_vehicles_skips_bad_ids() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");
        let v2 = add(&mut storage, "Ladder 1");
        storage.assign_vehicle(incident, v2).unwrap();

        let summary = storage
            .assign_vehicles(incident, &[v1, v2, 404, v1])
            .unwrap();

        assert_eq!(summary.assigned.len(), 1);
        assert_eq!(summary.assigned[0].vehicle_id, v1);
        let skipped: Vec<_> = summary.skipped.iter().map(|s| s.vehicle_id).collect();
        assert_eq!(skipped, vec![v2, 404, v1]);
        assert_eq!(assignment_rows(&storage, incident), 2);
    }

    #[test]
    fn test_assign_vehicles_missing_incident() {
        let mut storage = create_test_storage();
        let v1 = add(&mut storage, "Engine 1");
        assert!(storage.assign_vehicles(3, &[v1]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_set_vehicle_status() {
        let mut storage = create_test_storage();
        let v1 = add(&mut storage, "Engine 1");

        let vehicle = storage
            .set_vehicle_status(v1, VehicleStatus::Maintenance)
            .unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Maintenance);
        assert!(vehicle.last_maintenance.is_some());
        assert_eq!(storage.vehicle(v1).unwrap(), vehicle);

        let back = storage
            .set_vehicle_status(v1, VehicleStatus::Available)
            .unwrap();
        assert_eq!(back.last_maintenance, vehicle.last_maintenance);
    }

    #[test]
    fn test_set_vehicle_status_blocked_by_active_assignment() {
        let mut storage = create_test_storage();
        let incident = report(&mut storage);
        let v1 = add(&mut storage, "Engine 1");
        storage.assign_vehicle(incident, v1).unwrap();

        let err = storage
            .set_vehicle_status(v1, VehicleStatus::Available)
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(storage
            .set_vehicle_status(v1, VehicleStatus::Responding)
            .is_ok());
        assert!(storage
            .set_vehicle_status(99, VehicleStatus::Available)
            .unwrap_err()
            .is_not_found());
    }
}
