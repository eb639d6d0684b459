//! `firetrack` - Incident, apparatus and personnel tracking for fire departments
//!
//! This library keeps the incident lifecycle, vehicle assignments and their
//! timestamps consistent in a `SQLite` store, and exposes the records through
//! a CLI and an HTTP JSON API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod model;
pub mod server;
pub mod storage;
pub mod transition;

pub use config::Config;
pub use dashboard::DashboardSummary;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{
    ActorContext, Incident, IncidentStatus, Personnel, PersonnelRole, Station, Vehicle,
    VehicleAssignment, VehicleStatus,
};
pub use storage::Storage;
