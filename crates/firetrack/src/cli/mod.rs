//! Command-line interface for firetrack.
//!
//! This module provides the CLI structure for the `firetrack` binary.

mod commands;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};

use crate::error::{Error, Result};
use crate::logging::Verbosity;
use crate::model::ActorContext;

pub use commands::{
    ConfigCommand, ContactCommand, DashboardCommand, EquipmentCommand, EquipmentStatusArg,
    IncidentCommand, IncidentStatusArg, MaintenanceCommand, MaintenanceStatusArg,
    PersonnelCommand, RoleArg, StationCommand, TrainingCommand, TrainingStatusArg,
    VehicleCommand, VehicleStatusArg,
};

/// firetrack - Incident and apparatus tracking for fire departments
///
/// Records incidents through their lifecycle, commits vehicles and crews to
/// them, and serves the same records over an HTTP JSON API.
#[derive(Debug, Parser)]
#[command(name = "firetrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Personnel id to act as for changes
    #[arg(long, global = true, value_name = "ID")]
    pub actor: Option<i64>,

    /// Station id of the acting person
    #[arg(long, global = true, value_name = "ID")]
    pub actor_station: Option<i64>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP JSON API
    Serve,

    /// Show active incidents, fleet availability and response times
    Dashboard(DashboardCommand),

    /// Create the default station and vehicles on an empty database
    Seed,

    /// Manage incidents
    #[command(subcommand)]
    Incident(IncidentCommand),

    /// Manage vehicles
    #[command(subcommand)]
    Vehicle(VehicleCommand),

    /// Manage stations
    #[command(subcommand)]
    Station(StationCommand),

    /// Manage personnel
    #[command(subcommand)]
    Personnel(PersonnelCommand),

    /// Manage the equipment inventory
    #[command(subcommand)]
    Equipment(EquipmentCommand),

    /// Manage vehicle maintenance records
    #[command(subcommand)]
    Maintenance(MaintenanceCommand),

    /// Manage personnel training records
    #[command(subcommand)]
    Training(TrainingCommand),

    /// Manage emergency contacts
    #[command(subcommand)]
    Contact(ContactCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// The acting person for commands that change records.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when `--actor` was not given.
    pub fn actor(&self) -> Result<ActorContext> {
        self.actor
            .map(|actor_id| ActorContext::new(actor_id, self.actor_station))
            .ok_or(Error::Unauthorized)
    }
}

/// Midnight UTC at the start of a date given on the command line.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}
