//! Stations, personnel and default seeding.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use super::incidents::load_incident;
use super::{encode_time, enum_column, now, opt_time_column, time_column, Storage};
use crate::error::{Error, Result};
use crate::model::{
    NewPersonnel, NewStation, Personnel, PersonnelAssignment, PersonnelRole, Station,
    VehicleStatus,
};

/// Default apparatus created by [`Storage::seed_defaults`].
const SEED_VEHICLES: &[(&str, &str, VehicleStatus)] = &[
    ("Engine 1", "Engine", VehicleStatus::Available),
    ("Ladder 1", "Ladder", VehicleStatus::Available),
    ("Ambulance 1", "Ambulance", VehicleStatus::Available),
    ("Hazmat 1", "Hazmat", VehicleStatus::Maintenance),
];

/// What a seed run created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedReport {
    /// The station that was created.
    pub station: Station,
    /// Vehicles housed at the new station.
    pub vehicles: usize,
}

impl Storage {
    /// Add a station.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name.
    pub fn add_station(&mut self, new: &NewStation) -> Result<Station> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::validation("station name must not be empty"));
        }

        self.conn.execute(
            r"
            INSERT INTO stations (name, address, latitude, longitude, phone)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![name, new.address, new.latitude, new.longitude, new.phone],
        )?;

        let station = Station {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            address: new.address.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
            phone: new.phone.clone(),
        };
        debug!("Added station {} ({})", station.name, station.id);
        Ok(station)
    }

    /// List all stations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_stations(&self) -> Result<Vec<Station>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, latitude, longitude, phone FROM stations ORDER BY id",
        )?;
        let stations = stmt
            .query_map([], row_to_station)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stations)
    }

    /// Add a member of the department.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name and `NotFound` for an
    /// unknown station.
    pub fn add_personnel(&mut self, new: &NewPersonnel) -> Result<Personnel> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::validation("personnel name must not be empty"));
        }

        let tx = self.write_transaction()?;
        if let Some(station_id) = new.station_id {
            ensure_station(&tx, station_id)?;
        }
        tx.execute(
            "INSERT INTO personnel (name, role, station_id) VALUES (?1, ?2, ?3)",
            params![name, new.role.as_str(), new.station_id],
        )?;
        let person = Personnel {
            id: tx.last_insert_rowid(),
            name: name.to_string(),
            role: new.role,
            station_id: new.station_id,
        };
        tx.commit()?;

        debug!("Added {} {} ({})", person.role, person.name, person.id);
        Ok(person)
    }

    /// List personnel, optionally only one station's.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_personnel(&self, station_id: Option<i64>) -> Result<Vec<Personnel>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, name, role, station_id FROM personnel
            WHERE (?1 IS NULL OR station_id = ?1) ORDER BY name, id
            ",
        )?;
        let personnel = stmt
            .query_map([station_id], |row| {
                Ok(Personnel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    role: enum_column(row, 2, PersonnelRole::Firefighter)?,
                    station_id: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(personnel)
    }

    /// Put a person on an incident.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the incident or person does not exist and
    /// `Conflict` if the person is already active on this incident.
    pub fn assign_personnel(
        &mut self,
        incident_id: i64,
        personnel_id: i64,
        role: Option<&str>,
    ) -> Result<PersonnelAssignment> {
        let tx = self.write_transaction()?;
        load_incident(&tx, incident_id)?;
        ensure_personnel(&tx, personnel_id)?;

        let assigned_time = now();
        let role = role.map(str::trim).filter(|r| !r.is_empty());
        let inserted = tx.execute(
            r"
            INSERT INTO personnel_assignments (personnel_id, incident_id, role, assigned_time)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![personnel_id, incident_id, role, encode_time(assigned_time)],
        );
        match inserted.map_err(Error::from) {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(Error::conflict(format!(
                    "personnel {personnel_id} is already assigned to this incident"
                )));
            }
            Err(e) => return Err(e),
        }
        let assignment = PersonnelAssignment {
            id: tx.last_insert_rowid(),
            personnel_id,
            incident_id,
            role: role.map(str::to_string),
            assigned_time,
            cleared_time: None,
        };
        tx.commit()?;

        info!("Personnel {} assigned to incident {}", personnel_id, incident_id);
        Ok(assignment)
    }

    /// Create the default station and apparatus on an empty database.
    ///
    /// Returns `None` without changing anything when any station exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn seed_defaults(&mut self) -> Result<Option<SeedReport>> {
        let tx = self.write_transaction()?;
        let stations: i64 = tx.query_row("SELECT COUNT(*) FROM stations", [], |row| row.get(0))?;
        if stations > 0 {
            debug!("Stations already present, skipping seed");
            return Ok(None);
        }

        let station = NewStation {
            name: "Main Station".to_string(),
            address: Some("123 Main St".to_string()),
            latitude: Some(40.7128),
            longitude: Some(-74.0060),
            phone: Some("555-0100".to_string()),
        };
        tx.execute(
            r"
            INSERT INTO stations (name, address, latitude, longitude, phone)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                station.name,
                station.address,
                station.latitude,
                station.longitude,
                station.phone
            ],
        )?;
        let station_id = tx.last_insert_rowid();

        for (name, vehicle_type, status) in SEED_VEHICLES {
            tx.execute(
                "INSERT INTO vehicles (name, vehicle_type, status, station_id) VALUES (?1, ?2, ?3, ?4)",
                params![name, vehicle_type, status.as_str(), station_id],
            )?;
        }
        let station = tx.query_row(
            "SELECT id, name, address, latitude, longitude, phone FROM stations WHERE id = ?1",
            [station_id],
            row_to_station,
        )?;
        tx.commit()?;

        info!(
            "Seeded {} with {} vehicle(s)",
            station.name,
            SEED_VEHICLES.len()
        );
        Ok(Some(SeedReport {
            station,
            vehicles: SEED_VEHICLES.len(),
        }))
    }
}

/// Fail with `NotFound` unless the station exists.
pub(super) fn ensure_station(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM stations WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::not_found("station", id))
}

/// Fail with `NotFound` unless the person exists.
pub(super) fn ensure_personnel(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM personnel WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::not_found("personnel", id))
}

/// Every personnel assignment for an incident, oldest first.
pub(super) fn personnel_assignments_for(
    conn: &Connection,
    incident_id: i64,
) -> Result<Vec<PersonnelAssignment>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, personnel_id, incident_id, role, assigned_time, cleared_time
        FROM personnel_assignments WHERE incident_id = ?1 ORDER BY assigned_time, id
        ",
    )?;
    let assignments = stmt
        .query_map([incident_id], |row| {
            Ok(PersonnelAssignment {
                id: row.get(0)?,
                personnel_id: row.get(1)?,
                incident_id: row.get(2)?,
                role: row.get(3)?,
                assigned_time: time_column(row, 4)?,
                cleared_time: opt_time_column(row, 5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(assignments)
}

fn row_to_station(row: &rusqlite::Row) -> rusqlite::Result<Station> {
    Ok(Station {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        phone: row.get(5)?,
    })
}
