//! Equipment inventory and apparatus maintenance history.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::incidents::required_text;
use super::vehicles::load_vehicle;
use super::{
    encode_time, ensure_date_order, enum_column, opt_time_column, optional_text, Storage,
};
use crate::error::{Error, Result};
use crate::model::{
    Equipment, EquipmentStatus, MaintenanceRecord, MaintenanceStatus, NewEquipment,
    NewMaintenance,
};

const EQUIPMENT_COLUMNS: &str =
    "id, name, equipment_type, status, last_inspection, next_inspection, vehicle_id";

const MAINTENANCE_COLUMNS: &str =
    "id, vehicle_id, start_date, end_date, description, cost, status, technician";

impl Storage {
    /// Add a piece of equipment to the inventory.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name or a next inspection
    /// before the last one, and `NotFound` for an unknown vehicle.
    pub fn add_equipment(&mut self, new: &NewEquipment) -> Result<Equipment> {
        let name = required_text("equipment name", &new.name)?;
        ensure_date_order(
            "last inspection",
            new.last_inspection,
            "next inspection",
            new.next_inspection,
        )?;

        let tx = self.write_transaction()?;
        if let Some(vehicle_id) = new.vehicle_id {
            load_vehicle(&tx, vehicle_id)?;
        }
        tx.execute(
            r"
            INSERT INTO equipment (
                name, equipment_type, status, last_inspection, next_inspection, vehicle_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                name,
                optional_text(new.equipment_type.as_deref()),
                new.status.as_str(),
                new.last_inspection.map(encode_time),
                new.next_inspection.map(encode_time),
                new.vehicle_id,
            ],
        )?;
        let equipment = load_equipment(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!("Added equipment {} ({})", equipment.name, equipment.id);
        Ok(equipment)
    }

    /// List equipment by name, optionally only what one vehicle carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_equipment(&self, vehicle_id: Option<i64>) -> Result<Vec<Equipment>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {EQUIPMENT_COLUMNS} FROM equipment
            WHERE (?1 IS NULL OR vehicle_id = ?1) ORDER BY name, id
            "
        ))?;
        let equipment = stmt
            .query_map([vehicle_id], row_to_equipment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(equipment)
    }

    /// Record a maintenance job on a vehicle.
    ///
    /// A job recorded as `completed` with an end date moves the vehicle's
    /// `last_maintenance` forward to that date, never backwards.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown vehicle, and a validation error for
    /// a negative cost or an end date before the start date.
    pub fn add_maintenance(&mut self, new: &NewMaintenance) -> Result<MaintenanceRecord> {
        if new.cost.is_some_and(|cost| cost.is_nan() || cost < 0.0) {
            return Err(Error::validation("maintenance cost must not be negative"));
        }
        ensure_date_order("start date", new.start_date, "end date", new.end_date)?;

        let tx = self.write_transaction()?;
        let vehicle = load_vehicle(&tx, new.vehicle_id)?;
        tx.execute(
            r"
            INSERT INTO maintenance_records (
                vehicle_id, start_date, end_date, description, cost, status, technician
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                new.vehicle_id,
                new.start_date.map(encode_time),
                new.end_date.map(encode_time),
                optional_text(new.description.as_deref()),
                new.cost,
                new.status.as_str(),
                optional_text(new.technician.as_deref()),
            ],
        )?;
        let record = load_maintenance(&tx, tx.last_insert_rowid())?;

        if record.status == MaintenanceStatus::Completed {
            if let Some(end) = record.end_date {
                let moved = tx.execute(
                    r"
                    UPDATE vehicles SET last_maintenance = ?2
                    WHERE id = ?1 AND (last_maintenance IS NULL OR last_maintenance < ?2)
                    ",
                    params![vehicle.id, encode_time(end)],
                )?;
                if moved > 0 {
                    debug!("Vehicle {} last maintained {}", vehicle.name, end);
                }
            }
        }
        tx.commit()?;

        info!(
            "Maintenance {} recorded for {} ({})",
            record.id, vehicle.name, record.status
        );
        Ok(record)
    }

    /// List maintenance jobs, newest first, optionally for one vehicle.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_maintenance(&self, vehicle_id: Option<i64>) -> Result<Vec<MaintenanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
            WHERE (?1 IS NULL OR vehicle_id = ?1)
            ORDER BY COALESCE(start_date, end_date) DESC, id DESC
            "
        ))?;
        let records = stmt
            .query_map([vehicle_id], row_to_maintenance)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn load_equipment(conn: &Connection, id: i64) -> Result<Equipment> {
    conn.query_row(
        &format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = ?1"),
        [id],
        row_to_equipment,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("equipment", id))
}

fn load_maintenance(conn: &Connection, id: i64) -> Result<MaintenanceRecord> {
    conn.query_row(
        &format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records WHERE id = ?1"),
        [id],
        row_to_maintenance,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("maintenance record", id))
}

fn row_to_equipment(row: &rusqlite::Row) -> rusqlite::Result<Equipment> {
    Ok(Equipment {
        id: row.get(0)?,
        name: row.get(1)?,
        equipment_type: row.get(2)?,
        status: enum_column(row, 3, EquipmentStatus::Operational)?,
        last_inspection: opt_time_column(row, 4)?,
        next_inspection: opt_time_column(row, 5)?,
        vehicle_id: row.get(6)?,
    })
}

fn row_to_maintenance(row: &rusqlite::Row) -> rusqlite::Result<MaintenanceRecord> {
    Ok(MaintenanceRecord {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        start_date: opt_time_column(row, 2)?,
        end_date: opt_time_column(row, 3)?,
        description: row.get(4)?,
        cost: row.get(5)?,
        status: enum_column(row, 6, MaintenanceStatus::Scheduled)?,
        technician: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewVehicle;
    use chrono::{Duration, TimeZone, Utc};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn add_vehicle(storage: &mut Storage, name: &str) -> i64 {
        storage
            .add_vehicle(&NewVehicle {
                name: name.to_string(),
                ..NewVehicle::default()
            })
            .unwrap()
            .id
    }

    fn scba(vehicle_id: Option<i64>) -> NewEquipment {
        NewEquipment {
            name: "SCBA 12".to_string(),
            equipment_type: Some("SCBA".to_string()),
            vehicle_id,
            ..NewEquipment::default()
        }
    }

    #[test]
    fn test_add_and_list_equipment() {
        let mut storage = create_test_storage();
        let engine = add_vehicle(&mut storage, "Engine 1");
        let inspected = Utc::now();

        let carried = storage
            .add_equipment(&NewEquipment {
                last_inspection: Some(inspected),
                next_inspection: Some(inspected + Duration::days(90)),
                ..scba(Some(engine))
            })
            .unwrap();
        storage
            .add_equipment(&NewEquipment {
                name: "Hydraulic spreader".to_string(),
                status: EquipmentStatus::NeedsMaintenance,
                ..NewEquipment::default()
            })
            .unwrap();

        assert_eq!(carried.status, EquipmentStatus::Operational);
        assert_eq!(storage.list_equipment(None).unwrap().len(), 2);
        assert_eq!(storage.list_equipment(Some(engine)).unwrap(), vec![carried]);
    }

    #[test]
    fn test_add_equipment_validation() {
        let mut storage = create_test_storage();
        let err = storage
            .add_equipment(&NewEquipment {
                name: "  ".to_string(),
                ..NewEquipment::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(storage.add_equipment(&scba(Some(40))).unwrap_err().is_not_found());

        let inspected = Utc::now();
        let err = storage
            .add_equipment(&NewEquipment {
                last_inspection: Some(inspected),
                next_inspection: Some(inspected - Duration::days(1)),
                ..scba(None)
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(storage.list_equipment(None).unwrap().is_empty());
    }

    #[test]
    fn test_completed_maintenance_moves_last_maintenance_forward() {
        let mut storage = create_test_storage();
        let engine = add_vehicle(&mut storage, "Engine 1");
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 17, 0, 0).unwrap();

        let record = storage
            .add_maintenance(&NewMaintenance {
                vehicle_id: engine,
                start_date: Some(start),
                end_date: Some(end),
                description: Some("Pump service".to_string()),
                cost: Some(1250.0),
                status: MaintenanceStatus::Completed,
                technician: Some("  ".to_string()),
            })
            .unwrap();
        assert_eq!(record.technician, None);
        assert_eq!(storage.vehicle(engine).unwrap().last_maintenance, Some(end));

        // An older completed job does not move it back.
        storage
            .add_maintenance(&NewMaintenance {
                vehicle_id: engine,
                end_date: Some(end - Duration::days(30)),
                status: MaintenanceStatus::Completed,
                ..NewMaintenance::default()
            })
            .unwrap();
        assert_eq!(storage.vehicle(engine).unwrap().last_maintenance, Some(end));

        // Nor does one that is only scheduled.
        storage
            .add_maintenance(&NewMaintenance {
                vehicle_id: engine,
                end_date: Some(end + Duration::days(30)),
                ..NewMaintenance::default()
            })
            .unwrap();
        assert_eq!(storage.vehicle(engine).unwrap().last_maintenance, Some(end));
    }

    #[test]
    fn test_add_maintenance_validation() {
        let mut storage = create_test_storage();
        let engine = add_vehicle(&mut storage, "Engine 1");
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let negative = NewMaintenance {
            vehicle_id: engine,
            cost: Some(-5.0),
            ..NewMaintenance::default()
        };
        assert!(matches!(
            storage.add_maintenance(&negative),
            Err(Error::Validation(_))
        ));

        let backwards = NewMaintenance {
            vehicle_id: engine,
            start_date: Some(start),
            end_date: Some(start - Duration::hours(1)),
            ..NewMaintenance::default()
        };
        assert!(matches!(
            storage.add_maintenance(&backwards),
            Err(Error::Validation(_))
        ));

        let unknown = NewMaintenance {
            vehicle_id: 77,
            ..NewMaintenance::default()
        };
        assert!(storage.add_maintenance(&unknown).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_maintenance_newest_first() {
        let mut storage = create_test_storage();
        let engine = add_vehicle(&mut storage, "Engine 1");
        let ladder = add_vehicle(&mut storage, "Ladder 1");
        let day = |d| Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap();

        for (vehicle_id, d) in [(engine, 1), (engine, 9), (ladder, 5)] {
            storage
                .add_maintenance(&NewMaintenance {
                    vehicle_id,
                    start_date: Some(day(d)),
                    ..NewMaintenance::default()
                })
                .unwrap();
        }

        let all = storage.list_maintenance(None).unwrap();
        let starts: Vec<_> = all.iter().filter_map(|r| r.start_date).collect();
        assert_eq!(starts, vec![day(9), day(5), day(1)]);

        let engine_jobs = storage.list_maintenance(Some(engine)).unwrap();
        assert_eq!(engine_jobs.len(), 2);
        assert!(engine_jobs.iter().all(|r| r.vehicle_id == engine));
        assert_eq!(engine_jobs[0].status, MaintenanceStatus::Scheduled);
    }
}
