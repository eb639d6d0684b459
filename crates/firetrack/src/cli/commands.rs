//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{
    EquipmentStatus, IncidentStatus, MaintenanceStatus, PersonnelRole, TrainingStatus,
    VehicleStatus,
};

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Number of recent incidents to list (defaults to the configured value)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Incident commands.
#[derive(Debug, Subcommand)]
pub enum IncidentCommand {
    /// List incidents, newest first
    List {
        /// Only incidents in this status
        #[arg(short, long, value_enum)]
        status: Option<IncidentStatusArg>,

        /// Only incidents of this type
        #[arg(short = 't', long = "type")]
        incident_type: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show an incident with its assignments and notes
    Show {
        /// Incident id
        id: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Record a newly reported incident
    Create {
        /// Incident type (fire, medical, hazmat, rescue, ...)
        #[arg(short = 't', long = "type")]
        incident_type: String,

        /// Location of the incident
        #[arg(short, long)]
        address: String,

        /// Priority from 1 (highest) to 5
        #[arg(short, long, default_value = "3")]
        priority: u8,

        /// Narrative
        #[arg(short, long)]
        description: Option<String>,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,

        /// Name of the reporting party
        #[arg(long)]
        reporter_name: Option<String>,

        /// Phone of the reporting party
        #[arg(long)]
        reporter_phone: Option<String>,
    },

    /// Change an incident's status or details
    Update {
        /// Incident id
        id: i64,

        /// New status
        #[arg(short, long, value_enum)]
        status: Option<IncidentStatusArg>,

        /// New priority
        #[arg(short, long)]
        priority: Option<u8>,

        /// New narrative
        #[arg(short, long)]
        description: Option<String>,

        /// New location
        #[arg(short, long)]
        address: Option<String>,

        /// Record that the incident is under control
        #[arg(long)]
        controlled: bool,
    },

    /// Assign one or more vehicles to an incident
    Assign {
        /// Incident id
        id: i64,

        /// Vehicle ids
        #[arg(required = true, num_args = 1..)]
        vehicles: Vec<i64>,
    },

    /// Add a note to an incident
    Note {
        /// Incident id
        id: i64,

        /// Note text
        content: String,
    },

    /// Delete an incident and release its vehicles
    Delete {
        /// Incident id
        id: i64,
    },

    /// Delete every incident and release their vehicles
    Purge {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Vehicle commands.
#[derive(Debug, Subcommand)]
pub enum VehicleCommand {
    /// List vehicles
    List {
        /// Only vehicles in this status
        #[arg(short, long, value_enum)]
        status: Option<VehicleStatusArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a vehicle to the fleet
    Add {
        /// Call sign, e.g. "Engine 2"
        name: String,

        /// Apparatus type
        #[arg(short = 't', long = "type")]
        vehicle_type: Option<String>,

        /// Seated crew capacity
        #[arg(long)]
        capacity: Option<u32>,

        /// Home station id
        #[arg(short, long)]
        station: Option<i64>,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
    },

    /// Set a vehicle's status
    Status {
        /// Vehicle id
        id: i64,

        /// New status
        #[arg(value_enum)]
        status: VehicleStatusArg,
    },
}

/// Station commands.
#[derive(Debug, Subcommand)]
pub enum StationCommand {
    /// List stations
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a station
    Add {
        /// Station name
        name: String,

        /// Street address
        #[arg(short, long)]
        address: Option<String>,

        /// Contact phone
        #[arg(short, long)]
        phone: Option<String>,
    },
}

/// Personnel commands.
#[derive(Debug, Subcommand)]
pub enum PersonnelCommand {
    /// List personnel
    List {
        /// Only personnel of this station
        #[arg(short, long)]
        station: Option<i64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a member of the department
    Add {
        /// Full name
        name: String,

        /// Department role
        #[arg(short, long, value_enum, default_value = "firefighter")]
        role: RoleArg,

        /// Station id
        #[arg(short, long)]
        station: Option<i64>,
    },

    /// Put a person on an incident
    Assign {
        /// Incident id
        incident: i64,

        /// Personnel id
        personnel: i64,

        /// Role on the incident
        #[arg(short, long)]
        role: Option<String>,
    },
}

/// Equipment commands.
#[derive(Debug, Subcommand)]
pub enum EquipmentCommand {
    /// List equipment
    List {
        /// Only equipment carried by this vehicle
        #[arg(long, value_name = "ID")]
        vehicle: Option<i64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add equipment to the inventory
    Add {
        /// Name or asset tag
        name: String,

        /// Kind of equipment
        #[arg(short = 't', long = "type")]
        equipment_type: Option<String>,

        /// Condition
        #[arg(short, long, value_enum, default_value = "operational")]
        status: EquipmentStatusArg,

        /// Vehicle carrying it
        #[arg(long, value_name = "ID")]
        vehicle: Option<i64>,

        /// Date of the last inspection (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        last_inspection: Option<NaiveDate>,

        /// Date the next inspection is due (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        next_inspection: Option<NaiveDate>,
    },
}

/// Maintenance commands.
#[derive(Debug, Subcommand)]
pub enum MaintenanceCommand {
    /// List maintenance jobs, newest first
    List {
        /// Only jobs on this vehicle
        #[arg(long, value_name = "ID")]
        vehicle: Option<i64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Record a maintenance job
    Add {
        /// Vehicle id
        vehicle: i64,

        /// Work performed
        #[arg(short, long)]
        description: Option<String>,

        /// Cost
        #[arg(long)]
        cost: Option<f64>,

        /// Progress
        #[arg(short, long, value_enum, default_value = "scheduled")]
        status: MaintenanceStatusArg,

        /// Who did the work
        #[arg(short, long)]
        technician: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        end: Option<NaiveDate>,
    },
}

/// Training record commands.
#[derive(Debug, Subcommand)]
pub enum TrainingCommand {
    /// List training records
    List {
        /// Only this person's records
        #[arg(long, value_name = "ID")]
        personnel: Option<i64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Record a course or certification
    Add {
        /// Personnel id
        personnel: i64,

        /// Course or certification name
        training_type: String,

        /// Completion date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        completed: Option<NaiveDate>,

        /// Expiration date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        expires: Option<NaiveDate>,

        /// Certificate number
        #[arg(long)]
        certification: Option<String>,

        /// Standing
        #[arg(short, long, value_enum, default_value = "completed")]
        status: TrainingStatusArg,
    },
}

/// Emergency contact commands.
#[derive(Debug, Subcommand)]
pub enum ContactCommand {
    /// List emergency contacts
    List {
        /// Only contacts of this type (police, hospital, utility, ...)
        #[arg(short = 't', long = "type")]
        contact_type: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an emergency contact
    Add {
        /// Contact name
        name: String,

        /// Agency or company
        #[arg(short, long)]
        organization: Option<String>,

        /// Phone
        #[arg(short, long)]
        phone: Option<String>,

        /// Email
        #[arg(short, long)]
        email: Option<String>,

        /// Contact type (police, hospital, utility, government, ...)
        #[arg(short = 't', long = "type")]
        contact_type: Option<String>,

        /// Street address
        #[arg(short, long)]
        address: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Incident status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IncidentStatusArg {
    /// Report received
    Reported,
    /// Units en route
    Responding,
    /// Units on scene
    Onscene,
    /// Closed out
    Resolved,
}

impl From<IncidentStatusArg> for IncidentStatus {
    fn from(arg: IncidentStatusArg) -> Self {
        match arg {
            IncidentStatusArg::Reported => Self::Reported,
            IncidentStatusArg::Responding => Self::Responding,
            IncidentStatusArg::Onscene => Self::OnScene,
            IncidentStatusArg::Resolved => Self::Resolved,
        }
    }
}

/// Vehicle status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VehicleStatusArg {
    /// Ready for dispatch
    Available,
    /// Committed to an incident
    Responding,
    /// Out of service
    Maintenance,
}

impl From<VehicleStatusArg> for VehicleStatus {
    fn from(arg: VehicleStatusArg) -> Self {
        match arg {
            VehicleStatusArg::Available => Self::Available,
            VehicleStatusArg::Responding => Self::Responding,
            VehicleStatusArg::Maintenance => Self::Maintenance,
        }
    }
}

/// Personnel role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// System administrator
    Admin,
    /// Chief officer
    Chief,
    /// Dispatch desk
    Dispatcher,
    /// Line firefighter
    Firefighter,
}

impl From<RoleArg> for PersonnelRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Admin,
            RoleArg::Chief => Self::Chief,
            RoleArg::Dispatcher => Self::Dispatcher,
            RoleArg::Firefighter => Self::Firefighter,
        }
    }
}

/// Equipment status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EquipmentStatusArg {
    /// Fit for use
    Operational,
    /// Due for service
    #[value(name = "needs_maintenance")]
    NeedsMaintenance,
    /// Must not be used
    #[value(name = "out_of_service")]
    OutOfService,
}

impl From<EquipmentStatusArg> for EquipmentStatus {
    fn from(arg: EquipmentStatusArg) -> Self {
        match arg {
            EquipmentStatusArg::Operational => Self::Operational,
            EquipmentStatusArg::NeedsMaintenance => Self::NeedsMaintenance,
            EquipmentStatusArg::OutOfService => Self::OutOfService,
        }
    }
}

/// Maintenance status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaintenanceStatusArg {
    /// Booked
    Scheduled,
    /// Under way
    #[value(name = "in_progress")]
    InProgress,
    /// Finished
    Completed,
}

impl From<MaintenanceStatusArg> for MaintenanceStatus {
    fn from(arg: MaintenanceStatusArg) -> Self {
        match arg {
            MaintenanceStatusArg::Scheduled => Self::Scheduled,
            MaintenanceStatusArg::InProgress => Self::InProgress,
            MaintenanceStatusArg::Completed => Self::Completed,
        }
    }
}

/// Training status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrainingStatusArg {
    /// Passed and current
    Completed,
    /// Lapsed
    Expired,
    /// Enrolled
    #[value(name = "in_progress")]
    InProgress,
}

impl From<TrainingStatusArg> for TrainingStatus {
    fn from(arg: TrainingStatusArg) -> Self {
        match arg {
            TrainingStatusArg::Completed => Self::Completed,
            TrainingStatusArg::Expired => Self::Expired,
            TrainingStatusArg::InProgress => Self::InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_status_arg_conversion() {
        assert_eq!(
            IncidentStatus::from(IncidentStatusArg::Onscene),
            IncidentStatus::OnScene
        );
        assert_eq!(
            IncidentStatus::from(IncidentStatusArg::Resolved),
            IncidentStatus::Resolved
        );
    }

    #[test]
    fn test_status_arg_names_match_stored_text() {
        for arg in IncidentStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), IncidentStatus::from(*arg).as_str());
        }
        for arg in VehicleStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), VehicleStatus::from(*arg).as_str());
        }
        for arg in EquipmentStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), EquipmentStatus::from(*arg).as_str());
        }
        for arg in MaintenanceStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), MaintenanceStatus::from(*arg).as_str());
        }
        for arg in TrainingStatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), TrainingStatus::from(*arg).as_str());
        }
    }

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(PersonnelRole::from(RoleArg::Chief), PersonnelRole::Chief);
        assert_eq!(
            PersonnelRole::from(RoleArg::Firefighter),
            PersonnelRole::default()
        );
    }
}
