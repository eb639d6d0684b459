//! Record types for firetrack.
//!
//! These mirror the rows of the relational store: stations, apparatus,
//! personnel, incidents and the time-bounded assignments that link them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// Report received, nothing dispatched yet.
    Reported,
    /// Units are on their way.
    Responding,
    /// Units have arrived.
    OnScene,
    /// Incident closed out.
    Resolved,
}

impl IncidentStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Reported,
        Self::Responding,
        Self::OnScene,
        Self::Resolved,
    ];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Responding => "responding",
            Self::OnScene => "onscene",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown incident status: {s}")))
    }
}

/// Availability of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// In quarters and ready.
    #[default]
    Available,
    /// Committed to an incident.
    Responding,
    /// Out of service.
    Maintenance,
}

impl VehicleStatus {
    /// All vehicle statuses.
    pub const ALL: [Self; 3] = [Self::Available, Self::Responding, Self::Maintenance];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Responding => "responding",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown vehicle status: {s}")))
    }
}

/// Department role of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonnelRole {
    /// System administrator.
    Admin,
    /// Chief officer.
    Chief,
    /// Dispatch desk.
    Dispatcher,
    /// Line firefighter.
    #[default]
    Firefighter,
}

impl PersonnelRole {
    /// All roles.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Chief, Self::Dispatcher, Self::Firefighter];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Chief => "chief",
            Self::Dispatcher => "dispatcher",
            Self::Firefighter => "firefighter",
        }
    }
}

impl std::fmt::Display for PersonnelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonnelRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown personnel role: {s}")))
    }
}

/// Condition of a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    /// Fit for use.
    #[default]
    Operational,
    /// Usable but due for service.
    NeedsMaintenance,
    /// Must not be used.
    OutOfService,
}

impl EquipmentStatus {
    /// All equipment statuses.
    pub const ALL: [Self; 3] = [Self::Operational, Self::NeedsMaintenance, Self::OutOfService];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::NeedsMaintenance => "needs_maintenance",
            Self::OutOfService => "out_of_service",
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown equipment status: {s}")))
    }
}

/// Progress of a maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    /// Booked, not started.
    #[default]
    Scheduled,
    /// Work under way.
    InProgress,
    /// Work finished.
    Completed,
}

impl MaintenanceStatus {
    /// All maintenance statuses.
    pub const ALL: [Self; 3] = [Self::Scheduled, Self::InProgress, Self::Completed];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown maintenance status: {s}")))
    }
}

/// Standing of a training record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    /// Passed and current.
    #[default]
    Completed,
    /// Lapsed.
    Expired,
    /// Enrolled.
    InProgress,
}

impl TrainingStatus {
    /// All training statuses.
    pub const ALL: [Self; 3] = [Self::Completed, Self::Expired, Self::InProgress];

    /// The stored text form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::InProgress => "in_progress",
        }
    }
}

impl std::fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown training status: {s}")))
    }
}

/// Highest priority value (most urgent).
pub const PRIORITY_HIGHEST: u8 = 1;

/// Lowest priority value.
pub const PRIORITY_LOWEST: u8 = 5;

/// Check that a priority lies in the 1-5 range.
///
/// # Errors
///
/// Returns a validation error when the value is out of range.
pub fn validate_priority(priority: u8) -> Result<u8> {
    if (PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&priority) {
        Ok(priority)
    } else {
        Err(Error::validation(format!(
            "priority must be between {PRIORITY_HIGHEST} and {PRIORITY_LOWEST}, got {priority}"
        )))
    }
}

/// Who is performing an operation.
///
/// Supplied by the session layer in front of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Personnel id of the acting user.
    pub actor_id: i64,
    /// Station the actor belongs to, if any.
    pub station_id: Option<i64>,
}

impl ActorContext {
    /// Create a new actor context.
    #[must_use]
    pub fn new(actor_id: i64, station_id: Option<i64>) -> Self {
        Self {
            actor_id,
            station_id,
        }
    }
}

/// An organizational unit owning vehicles and personnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: Option<String>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Fields for a new station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStation {
    /// Display name.
    pub name: String,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
}

/// A piece of apparatus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Row id.
    pub id: i64,
    /// Call sign, e.g. "Engine 1".
    pub name: String,
    /// Engine, Ladder, Ambulance, ...
    pub vehicle_type: Option<String>,
    /// Current availability.
    pub status: VehicleStatus,
    /// Seated crew capacity.
    pub capacity: Option<u32>,
    /// Home station.
    pub station_id: Option<i64>,
    /// When maintenance was last performed.
    pub last_maintenance: Option<DateTime<Utc>>,
    /// When maintenance is next due.
    pub next_maintenance: Option<DateTime<Utc>>,
    /// Last known latitude in degrees.
    pub latitude: Option<f64>,
    /// Last known longitude in degrees.
    pub longitude: Option<f64>,
}

/// Fields for a new vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    /// Call sign.
    pub name: String,
    /// Apparatus type.
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: VehicleStatus,
    /// Seated crew capacity.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Home station.
    #[serde(default)]
    pub station_id: Option<i64>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A member of the department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    /// Row id.
    pub id: i64,
    /// Full name.
    pub name: String,
    /// Department role.
    pub role: PersonnelRole,
    /// Assigned station.
    pub station_id: Option<i64>,
}

/// Fields for a new person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPersonnel {
    /// Full name.
    pub name: String,
    /// Department role.
    #[serde(default)]
    pub role: PersonnelRole,
    /// Assigned station.
    #[serde(default)]
    pub station_id: Option<i64>,
}

/// A reported incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Row id.
    pub id: i64,
    /// Human-facing number, `INC-` followed by eight hex digits.
    pub incident_number: String,
    /// Fire, medical, hazmat, rescue, ...
    pub incident_type: String,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// 1 (highest) to 5.
    pub priority: u8,
    /// Location.
    pub address: String,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// When the report came in.
    pub reported_time: DateTime<Utc>,
    /// When units were first dispatched.
    pub dispatch_time: Option<DateTime<Utc>>,
    /// When units first arrived.
    pub arrival_time: Option<DateTime<Utc>>,
    /// When the incident was brought under control.
    pub controlled_time: Option<DateTime<Utc>>,
    /// When the incident was cleared.
    pub cleared_time: Option<DateTime<Utc>>,
    /// Free-text narrative.
    pub description: Option<String>,
    /// Reporting party.
    pub reporter_name: Option<String>,
    /// Reporting party's phone.
    pub reporter_phone: Option<String>,
    /// Station that took the report.
    pub station_id: Option<i64>,
}

impl Incident {
    /// Generate a fresh incident number.
    #[must_use]
    pub fn generate_number() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("INC-{}", hex[..8].to_uppercase())
    }

    /// The timestamps in lifecycle order, `None` where unset.
    #[must_use]
    pub fn timeline(&self) -> [Option<DateTime<Utc>>; 5] {
        [
            Some(self.reported_time),
            self.dispatch_time,
            self.arrival_time,
            self.controlled_time,
            self.cleared_time,
        ]
    }

    /// Whether every pair of set timestamps is in lifecycle order.
    #[must_use]
    pub fn timestamps_ordered(&self) -> bool {
        let set: Vec<_> = self.timeline().into_iter().flatten().collect();
        set.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Minutes between dispatch and arrival, when both are known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn response_minutes(&self) -> Option<f64> {
        let dispatch = self.dispatch_time?;
        let arrival = self.arrival_time?;
        Some((arrival - dispatch).num_milliseconds() as f64 / 60_000.0)
    }
}

/// Fields captured at report intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Fire, medical, hazmat, rescue, ...
    pub incident_type: String,
    /// 1 (highest) to 5.
    pub priority: u8,
    /// Location.
    pub address: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Free-text narrative.
    #[serde(default)]
    pub description: Option<String>,
    /// Reporting party.
    #[serde(default)]
    pub reporter_name: Option<String>,
    /// Reporting party's phone.
    #[serde(default)]
    pub reporter_phone: Option<String>,
}

/// A partial update to an incident. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// Requested status.
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    /// New priority.
    #[serde(default)]
    pub priority: Option<u8>,
    /// New narrative.
    #[serde(default)]
    pub description: Option<String>,
    /// New location.
    #[serde(default)]
    pub address: Option<String>,
    /// Record that the incident is under control.
    #[serde(default)]
    pub controlled: bool,
}

impl IncidentUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.description.is_none()
            && self.address.is_none()
            && !self.controlled
    }
}

/// Filters for listing incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// Only incidents in this status.
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    /// Only incidents of this type.
    #[serde(default, rename = "type")]
    pub incident_type: Option<String>,
}

/// One vehicle committed to one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAssignment {
    /// Row id.
    pub id: i64,
    /// Assigned vehicle.
    pub vehicle_id: i64,
    /// Target incident.
    pub incident_id: i64,
    /// When the vehicle was dispatched.
    pub dispatched_time: DateTime<Utc>,
    /// When the vehicle arrived.
    pub arrived_time: Option<DateTime<Utc>>,
    /// When the vehicle was released.
    pub cleared_time: Option<DateTime<Utc>>,
}

impl VehicleAssignment {
    /// An assignment is active until it is cleared.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cleared_time.is_none()
    }
}

/// One person committed to one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelAssignment {
    /// Row id.
    pub id: i64,
    /// Assigned person.
    pub personnel_id: i64,
    /// Target incident.
    pub incident_id: i64,
    /// Commander, operator, medic, ...
    pub role: Option<String>,
    /// When the assignment was made.
    pub assigned_time: DateTime<Utc>,
    /// When the person was released.
    pub cleared_time: Option<DateTime<Utc>>,
}

impl PersonnelAssignment {
    /// An assignment is active until it is cleared.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cleared_time.is_none()
    }
}

/// A timestamped remark on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentNote {
    /// Row id.
    pub id: i64,
    /// Incident the note belongs to.
    pub incident_id: i64,
    /// Author.
    pub personnel_id: Option<i64>,
    /// When the note was written.
    pub timestamp: DateTime<Utc>,
    /// Note body.
    pub content: String,
}

/// Equipment carried on a vehicle or held in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Row id.
    pub id: i64,
    /// Name or asset tag.
    pub name: String,
    /// SCBA, hose, extrication tool, ...
    pub equipment_type: Option<String>,
    /// Current condition.
    pub status: EquipmentStatus,
    /// Last inspection.
    pub last_inspection: Option<DateTime<Utc>>,
    /// Next inspection due.
    pub next_inspection: Option<DateTime<Utc>>,
    /// Vehicle carrying it.
    pub vehicle_id: Option<i64>,
}

/// Fields for new equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEquipment {
    /// Name or asset tag.
    pub name: String,
    /// Kind of equipment.
    #[serde(default)]
    pub equipment_type: Option<String>,
    /// Initial condition.
    #[serde(default)]
    pub status: EquipmentStatus,
    /// Last inspection.
    #[serde(default)]
    pub last_inspection: Option<DateTime<Utc>>,
    /// Next inspection due, not before the last one.
    #[serde(default)]
    pub next_inspection: Option<DateTime<Utc>>,
    /// Vehicle carrying it.
    #[serde(default)]
    pub vehicle_id: Option<i64>,
}

/// One maintenance job on a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// Row id.
    pub id: i64,
    /// Vehicle serviced.
    pub vehicle_id: i64,
    /// When work started.
    pub start_date: Option<DateTime<Utc>>,
    /// When work ended.
    pub end_date: Option<DateTime<Utc>>,
    /// Work performed.
    pub description: Option<String>,
    /// Cost, never negative.
    pub cost: Option<f64>,
    /// Progress.
    pub status: MaintenanceStatus,
    /// Who did the work.
    pub technician: Option<String>,
}

/// Fields for a new maintenance job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMaintenance {
    /// Vehicle serviced.
    pub vehicle_id: i64,
    /// When work starts.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// When work ends.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Work to perform.
    #[serde(default)]
    pub description: Option<String>,
    /// Cost, never negative.
    #[serde(default)]
    pub cost: Option<f64>,
    /// Initial status.
    #[serde(default)]
    pub status: MaintenanceStatus,
    /// Who does the work.
    #[serde(default)]
    pub technician: Option<String>,
}

/// A course or certification held by a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Row id.
    pub id: i64,
    /// Person trained.
    pub personnel_id: i64,
    /// Course or certification name.
    pub training_type: String,
    /// When it was completed.
    pub completion_date: Option<DateTime<Utc>>,
    /// When it lapses.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Certificate number.
    pub certification_number: Option<String>,
    /// Standing.
    pub status: TrainingStatus,
}

/// Fields for a new training record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrainingRecord {
    /// Person trained.
    pub personnel_id: i64,
    /// Course or certification name.
    pub training_type: String,
    /// When it was completed.
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    /// When it lapses, not before completion.
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Certificate number.
    #[serde(default)]
    pub certification_number: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: TrainingStatus,
}

/// An outside agency or person to call during operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Row id.
    pub id: i64,
    /// Contact name.
    pub name: String,
    /// Agency or company.
    pub organization: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Police, hospital, utility, government, ...
    pub contact_type: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// Fields for a new emergency contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmergencyContact {
    /// Contact name.
    pub name: String,
    /// Agency or company.
    #[serde(default)]
    pub organization: Option<String>,
    /// Phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// Police, hospital, utility, government, ...
    #[serde(default)]
    pub contact_type: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
}
