//! Personnel training records and the emergency contact directory.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::incidents::required_text;
use super::roster::ensure_personnel;
use super::{
    encode_time, ensure_date_order, enum_column, opt_time_column, optional_text, Storage,
};
use crate::error::{Error, Result};
use crate::model::{
    EmergencyContact, NewEmergencyContact, NewTrainingRecord, TrainingRecord, TrainingStatus,
};

const TRAINING_COLUMNS: &str = r"
    id, personnel_id, training_type, completion_date, expiration_date,
    certification_number, status
";

const CONTACT_COLUMNS: &str =
    "id, name, organization, phone, email, contact_type, address, notes";

impl Storage {
    /// Record a course or certification for a person.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown person, and a validation error for
    /// a blank training type or an expiration before completion.
    pub fn add_training(&mut self, new: &NewTrainingRecord) -> Result<TrainingRecord> {
        let training_type = required_text("training type", &new.training_type)?;
        ensure_date_order(
            "completion date",
            new.completion_date,
            "expiration date",
            new.expiration_date,
        )?;

        let tx = self.write_transaction()?;
        ensure_personnel(&tx, new.personnel_id)?;
        tx.execute(
            r"
            INSERT INTO training_records (
                personnel_id, training_type, completion_date, expiration_date,
                certification_number, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                new.personnel_id,
                training_type,
                new.completion_date.map(encode_time),
                new.expiration_date.map(encode_time),
                optional_text(new.certification_number.as_deref()),
                new.status.as_str(),
            ],
        )?;
        let record = load_training(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!(
            "Recorded {} training for personnel {}",
            record.training_type, record.personnel_id
        );
        Ok(record)
    }

    /// List training records, optionally for one person.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_training(&self, personnel_id: Option<i64>) -> Result<Vec<TrainingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {TRAINING_COLUMNS} FROM training_records
            WHERE (?1 IS NULL OR personnel_id = ?1)
            ORDER BY personnel_id, training_type, id
            "
        ))?;
        let records = stmt
            .query_map([personnel_id], row_to_training)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Add an emergency contact.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name.
    pub fn add_contact(&mut self, new: &NewEmergencyContact) -> Result<EmergencyContact> {
        let name = required_text("contact name", &new.name)?;

        let tx = self.write_transaction()?;
        tx.execute(
            r"
            INSERT INTO emergency_contacts (
                name, organization, phone, email, contact_type, address, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                name,
                optional_text(new.organization.as_deref()),
                optional_text(new.phone.as_deref()),
                optional_text(new.email.as_deref()),
                optional_text(new.contact_type.as_deref()),
                optional_text(new.address.as_deref()),
                optional_text(new.notes.as_deref()),
            ],
        )?;
        let contact = load_contact(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!("Added contact {} ({})", contact.name, contact.id);
        Ok(contact)
    }

    /// List emergency contacts by name, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_contacts(&self, contact_type: Option<&str>) -> Result<Vec<EmergencyContact>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {CONTACT_COLUMNS} FROM emergency_contacts
            WHERE (?1 IS NULL OR contact_type = ?1 COLLATE NOCASE)
            ORDER BY name, id
            "
        ))?;
        let contacts = stmt
            .query_map([optional_text(contact_type)], row_to_contact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(contacts)
    }
}

fn load_training(conn: &Connection, id: i64) -> Result<TrainingRecord> {
    conn.query_row(
        &format!("SELECT {TRAINING_COLUMNS} FROM training_records WHERE id = ?1"),
        [id],
        row_to_training,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("training record", id))
}

fn load_contact(conn: &Connection, id: i64) -> Result<EmergencyContact> {
    conn.query_row(
        &format!("SELECT {CONTACT_COLUMNS} FROM emergency_contacts WHERE id = ?1"),
        [id],
        row_to_contact,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("contact", id))
}

fn row_to_training(row: &rusqlite::Row) -> rusqlite::Result<TrainingRecord> {
    Ok(TrainingRecord {
        id: row.get(0)?,
        personnel_id: row.get(1)?,
        training_type: row.get(2)?,
        completion_date: opt_time_column(row, 3)?,
        expiration_date: opt_time_column(row, 4)?,
        certification_number: row.get(5)?,
        status: enum_column(row, 6, TrainingStatus::Completed)?,
    })
}

fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<EmergencyContact> {
    Ok(EmergencyContact {
        id: row.get(0)?,
        name: row.get(1)?,
        organization: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        contact_type: row.get(5)?,
        address: row.get(6)?,
        notes: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewPersonnel;
    use chrono::{Duration, Utc};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn hire(storage: &mut Storage, name: &str) -> i64 {
        storage
            .add_personnel(&NewPersonnel {
                name: name.to_string(),
                ..NewPersonnel::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_add_and_list_training() {
        let mut storage = create_test_storage();
        let ana = hire(&mut storage, "Ana Silva");
        let ben = hire(&mut storage, "Ben Cho");
        let completed = Utc::now();

        let record = storage
            .add_training(&NewTrainingRecord {
                personnel_id: ana,
                training_type: " Hazmat Operations ".to_string(),
                completion_date: Some(completed),
                expiration_date: Some(completed + Duration::days(365)),
                certification_number: Some("HZ-4411".to_string()),
                status: TrainingStatus::Completed,
            })
            .unwrap();
        storage
            .add_training(&NewTrainingRecord {
                personnel_id: ben,
                training_type: "EMT-B".to_string(),
                status: TrainingStatus::InProgress,
                ..NewTrainingRecord::default()
            })
            .unwrap();

        assert_eq!(record.training_type, "Hazmat Operations");
        assert_eq!(storage.list_training(Some(ana)).unwrap(), vec![record]);
        assert_eq!(storage.list_training(None).unwrap().len(), 2);
    }

    #[test]
    fn test_add_training_validation() {
        let mut storage = create_test_storage();
        let ana = hire(&mut storage, "Ana Silva");
        let completed = Utc::now();

        let unknown = NewTrainingRecord {
            personnel_id: 404,
            training_type: "CPR".to_string(),
            ..NewTrainingRecord::default()
        };
        assert!(storage.add_training(&unknown).unwrap_err().is_not_found());

        let blank = NewTrainingRecord {
            personnel_id: ana,
            ..NewTrainingRecord::default()
        };
        assert!(matches!(
            storage.add_training(&blank),
            Err(Error::Validation(_))
        ));

        let lapsed_first = NewTrainingRecord {
            personnel_id: ana,
            training_type: "CPR".to_string(),
            completion_date: Some(completed),
            expiration_date: Some(completed - Duration::days(1)),
            ..NewTrainingRecord::default()
        };
        assert!(matches!(
            storage.add_training(&lapsed_first),
            Err(Error::Validation(_))
        ));
        assert!(storage.list_training(None).unwrap().is_empty());
    }

    #[test]
    fn test_contacts_filter_by_type() {
        let mut storage = create_test_storage();
        let hospital = storage
            .add_contact(&NewEmergencyContact {
                name: "Mercy General ER".to_string(),
                phone: Some("555-0100".to_string()),
                contact_type: Some("hospital".to_string()),
                notes: Some(String::new()),
                ..NewEmergencyContact::default()
            })
            .unwrap();
        storage
            .add_contact(&NewEmergencyContact {
                name: "County Gas".to_string(),
                contact_type: Some("utility".to_string()),
                ..NewEmergencyContact::default()
            })
            .unwrap();

        assert_eq!(hospital.notes, None);
        assert_eq!(storage.list_contacts(None).unwrap().len(), 2);
        assert_eq!(
            storage.list_contacts(Some("Hospital")).unwrap(),
            vec![hospital]
        );
        assert!(storage.list_contacts(Some("police")).unwrap().is_empty());
    }

    #[test]
    fn test_contact_requires_name() {
        let mut storage = create_test_storage();
        let err = storage
            .add_contact(&NewEmergencyContact::default())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
