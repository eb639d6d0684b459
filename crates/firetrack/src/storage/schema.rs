//! `SQLite` schema definitions for firetrack.
//!
//! Timestamps are stored as RFC 3339 text in UTC with microsecond precision,
//! so lexical order matches chronological order and `julianday()` can read
//! them.

/// SQL statement to create the stations table.
pub const CREATE_STATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS stations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT,
    latitude REAL,
    longitude REAL,
    phone TEXT
)
";

/// SQL statement to create the personnel table.
pub const CREATE_PERSONNEL_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS personnel (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'firefighter',
    station_id INTEGER REFERENCES stations(id)
)
";

/// SQL statement to create the vehicles table.
pub const CREATE_VEHICLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    vehicle_type TEXT,
    status TEXT NOT NULL DEFAULT 'available',
    capacity INTEGER,
    station_id INTEGER REFERENCES stations(id),
    last_maintenance TEXT,
    next_maintenance TEXT,
    latitude REAL,
    longitude REAL
)
";

/// SQL statement to create the incidents table.
pub const CREATE_INCIDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_number TEXT NOT NULL UNIQUE,
    incident_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'reported',
    priority INTEGER NOT NULL CHECK (priority BETWEEN 1 AND 5),
    address TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    reported_time TEXT NOT NULL,
    dispatch_time TEXT,
    arrival_time TEXT,
    controlled_time TEXT,
    cleared_time TEXT,
    description TEXT,
    reporter_name TEXT,
    reporter_phone TEXT,
    station_id INTEGER REFERENCES stations(id)
)
";

/// SQL statement to create the vehicle assignments table.
pub const CREATE_VEHICLE_ASSIGNMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vehicle_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    dispatched_time TEXT NOT NULL,
    arrived_time TEXT,
    cleared_time TEXT
)
";

/// At most one active assignment per vehicle and incident.
pub const CREATE_ACTIVE_VEHICLE_ASSIGNMENT_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_vehicle_assignments_active
ON vehicle_assignments(vehicle_id, incident_id) WHERE cleared_time IS NULL
";

/// SQL statement to create an index on `incident_id` for assignment lookups.
pub const CREATE_VEHICLE_ASSIGNMENT_INCIDENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_vehicle_assignments_incident ON vehicle_assignments(incident_id)
";

/// SQL statement to create the personnel assignments table.
pub const CREATE_PERSONNEL_ASSIGNMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS personnel_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    personnel_id INTEGER NOT NULL REFERENCES personnel(id),
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    role TEXT,
    assigned_time TEXT NOT NULL,
    cleared_time TEXT
)
";

/// At most one active assignment per person and incident.
pub const CREATE_ACTIVE_PERSONNEL_ASSIGNMENT_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_personnel_assignments_active
ON personnel_assignments(personnel_id, incident_id) WHERE cleared_time IS NULL
";

/// SQL statement to create the incident notes table.
pub const CREATE_INCIDENT_NOTES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS incident_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    personnel_id INTEGER,
    timestamp TEXT NOT NULL,
    content TEXT NOT NULL
)
";

/// SQL statement to create an index on `reported_time` for recency queries.
pub const CREATE_INCIDENT_REPORTED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_incidents_reported ON incidents(reported_time DESC)
";

/// SQL statement to create an index on incident `status` for filtering.
pub const CREATE_INCIDENT_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status)
";

/// Equipment carried on apparatus or kept at a station.
pub const CREATE_EQUIPMENT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    equipment_type TEXT,
    status TEXT NOT NULL DEFAULT 'operational',
    last_inspection TEXT,
    next_inspection TEXT,
    vehicle_id INTEGER REFERENCES vehicles(id)
)
";

/// Service history of apparatus.
pub const CREATE_MAINTENANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS maintenance_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
    start_date TEXT,
    end_date TEXT,
    description TEXT,
    cost REAL CHECK (cost IS NULL OR cost >= 0),
    status TEXT NOT NULL DEFAULT 'scheduled',
    technician TEXT
)
";

/// Certifications and courses held by personnel.
pub const CREATE_TRAINING_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS training_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    personnel_id INTEGER NOT NULL REFERENCES personnel(id),
    training_type TEXT NOT NULL,
    completion_date TEXT,
    expiration_date TEXT,
    certification_number TEXT,
    status TEXT NOT NULL DEFAULT 'completed'
)
";

/// Outside agencies such as police and hospitals.
pub const CREATE_EMERGENCY_CONTACTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS emergency_contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    organization TEXT,
    phone TEXT,
    email TEXT,
    contact_type TEXT,
    address TEXT,
    notes TEXT
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_STATIONS_TABLE,
    CREATE_PERSONNEL_TABLE,
    CREATE_VEHICLES_TABLE,
    CREATE_INCIDENTS_TABLE,
    CREATE_VEHICLE_ASSIGNMENTS_TABLE,
    CREATE_ACTIVE_VEHICLE_ASSIGNMENT_INDEX,
    CREATE_VEHICLE_ASSIGNMENT_INCIDENT_INDEX,
    CREATE_PERSONNEL_ASSIGNMENTS_TABLE,
    CREATE_ACTIVE_PERSONNEL_ASSIGNMENT_INDEX,
    CREATE_INCIDENT_NOTES_TABLE,
    CREATE_INCIDENT_REPORTED_INDEX,
    CREATE_INCIDENT_STATUS_INDEX,
    CREATE_EQUIPMENT_TABLE,
    CREATE_MAINTENANCE_TABLE,
    CREATE_TRAINING_TABLE,
    CREATE_EMERGENCY_CONTACTS_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_incidents_table_contains_timeline_columns() {
        for column in [
            "reported_time TEXT NOT NULL",
            "dispatch_time TEXT",
            "arrival_time TEXT",
            "controlled_time TEXT",
            "cleared_time TEXT",
        ] {
            assert!(CREATE_INCIDENTS_TABLE.contains(column), "missing {column}");
        }
    }

    #[test]
    fn test_active_assignment_index_is_partial_unique() {
        assert!(CREATE_ACTIVE_VEHICLE_ASSIGNMENT_INDEX.contains("UNIQUE"));
        assert!(CREATE_ACTIVE_VEHICLE_ASSIGNMENT_INDEX.contains("WHERE cleared_time IS NULL"));
    }

    #[test]
    fn test_every_index_is_created_with_the_schema() {
        for index in [
            CREATE_ACTIVE_VEHICLE_ASSIGNMENT_INDEX,
            CREATE_ACTIVE_PERSONNEL_ASSIGNMENT_INDEX,
            CREATE_VEHICLE_ASSIGNMENT_INCIDENT_INDEX,
        ] {
            assert!(SCHEMA_STATEMENTS.contains(&index));
        }
    }

    #[test]
    fn test_dependents_cascade_on_incident_delete() {
        for table in [
            CREATE_VEHICLE_ASSIGNMENTS_TABLE,
            CREATE_PERSONNEL_ASSIGNMENTS_TABLE,
            CREATE_INCIDENT_NOTES_TABLE,
        ] {
            assert!(table.contains("REFERENCES incidents(id) ON DELETE CASCADE"));
        }
    }
}
