//! `firetrack` - CLI for the firetrack incident store
//!
//! This binary manages incidents, vehicles, stations, personnel and their
//! supporting records from the command line and serves the HTTP JSON API.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use firetrack::cli::{
    start_of_day, Cli, Command, ConfigCommand, ContactCommand, DashboardCommand,
    EquipmentCommand, IncidentCommand, MaintenanceCommand, PersonnelCommand, StationCommand,
    TrainingCommand, VehicleCommand,
};
use firetrack::model::{
    IncidentFilter, IncidentUpdate, NewEmergencyContact, NewEquipment, NewIncident,
    NewMaintenance, NewPersonnel, NewStation, NewTrainingRecord, NewVehicle,
};
use firetrack::storage::IncidentDetail;
use firetrack::{init_logging, Config, Incident, Storage, Vehicle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match &cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Serve => {
            let storage = open_storage(&config)?;
            firetrack::server::serve(&config, storage).await?;
            Ok(())
        }
        Command::Dashboard(cmd) => handle_dashboard(&config, cmd),
        Command::Seed => {
            let mut storage = open_storage(&config)?;
            match storage.seed_defaults()? {
                Some(report) => println!(
                    "Created {} with {} vehicles.",
                    report.station.name, report.vehicles
                ),
                None => println!("Stations already exist; nothing seeded."),
            }
            Ok(())
        }
        Command::Incident(cmd) => handle_incident(&cli, &config, cmd),
        Command::Vehicle(cmd) => handle_vehicle(&config, cmd),
        Command::Station(cmd) => handle_station(&config, cmd),
        Command::Personnel(cmd) => handle_personnel(&config, cmd),
        Command::Equipment(cmd) => handle_equipment(&config, cmd),
        Command::Maintenance(cmd) => handle_maintenance(&config, cmd),
        Command::Training(cmd) => handle_training(&config, cmd),
        Command::Contact(cmd) => handle_contact(&config, cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(storage.with_exclusive_assignments(config.dispatch.exclusive_vehicle_assignment))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_dashboard(config: &Config, cmd: &DashboardCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let limit = cmd.limit.unwrap_or(config.dashboard.recent_incidents);
    let summary = storage.dashboard(limit)?;
    if cmd.json {
        print_json(&summary)
    } else {
        println!("{summary}");
        Ok(())
    }
}

fn handle_incident(cli: &Cli, config: &Config, cmd: &IncidentCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        IncidentCommand::List {
            status,
            incident_type,
            json,
        } => {
            let filter = IncidentFilter {
                status: status.map(Into::into),
                incident_type: incident_type.clone(),
            };
            let incidents = storage.list_incidents(&filter)?;
            if *json {
                return print_json(&incidents);
            }
            if incidents.is_empty() {
                println!("No incidents.");
            }
            for incident in &incidents {
                print_incident_row(incident);
            }
        }
        IncidentCommand::Show { id, json } => {
            let detail = storage.incident_detail(*id)?;
            if *json {
                return print_json(&detail);
            }
            print_incident_detail(&detail);
        }
        IncidentCommand::Create {
            incident_type,
            address,
            priority,
            description,
            latitude,
            longitude,
            reporter_name,
            reporter_phone,
        } => {
            let incident = storage.create_incident(
                &cli.actor()?,
                &NewIncident {
                    incident_type: incident_type.clone(),
                    priority: *priority,
                    address: address.clone(),
                    latitude: *latitude,
                    longitude: *longitude,
                    description: description.clone(),
                    reporter_name: reporter_name.clone(),
                    reporter_phone: reporter_phone.clone(),
                },
            )?;
            println!("Created incident {} (id {})", incident.incident_number, incident.id);
        }
        IncidentCommand::Update {
            id,
            status,
            priority,
            description,
            address,
            controlled,
        } => {
            cli.actor()?;
            let update = IncidentUpdate {
                status: status.map(Into::into),
                priority: *priority,
                description: description.clone(),
                address: address.clone(),
                controlled: *controlled,
            };
            if update.is_empty() {
                bail!(
                    "nothing to update; pass --status, --priority, --description, --address \
                     or --controlled"
                );
            }
            let incident = storage.update_incident(*id, &update)?;
            print_incident_row(&incident);
        }
        IncidentCommand::Assign { id, vehicles } => {
            cli.actor()?;
            let summary = storage.assign_vehicles(*id, vehicles)?;
            for assignment in &summary.assigned {
                println!("Assigned vehicle {}", assignment.vehicle_id);
            }
            for skipped in &summary.skipped {
                println!("Skipped vehicle {}: {}", skipped.vehicle_id, skipped.reason);
            }
        }
        IncidentCommand::Note { id, content } => {
            let note = storage.add_note(&cli.actor()?, *id, content)?;
            println!("Added note {} to incident {}", note.id, id);
        }
        IncidentCommand::Delete { id } => {
            cli.actor()?;
            let released = storage.delete_incident(*id)?;
            println!("Deleted incident {id}; released {released} vehicle(s).");
        }
        IncidentCommand::Purge { yes } => {
            cli.actor()?;
            if !yes {
                bail!("purge deletes every incident; pass --yes to confirm");
            }
            let deleted = storage.delete_all_incidents()?;
            println!("Deleted {deleted} incident(s).");
        }
    }
    Ok(())
}

fn handle_vehicle(config: &Config, cmd: &VehicleCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        VehicleCommand::List { status, json } => {
            let vehicles = storage.list_vehicles(status.map(Into::into))?;
            if *json {
                return print_json(&vehicles);
            }
            for vehicle in &vehicles {
                print_vehicle_row(vehicle);
            }
        }
        VehicleCommand::Add {
            name,
            vehicle_type,
            capacity,
            station,
            latitude,
            longitude,
        } => {
            let vehicle = storage.add_vehicle(&NewVehicle {
                name: name.clone(),
                vehicle_type: vehicle_type.clone(),
                capacity: *capacity,
                station_id: *station,
                latitude: *latitude,
                longitude: *longitude,
                ..NewVehicle::default()
            })?;
            println!("Added vehicle {} (id {})", vehicle.name, vehicle.id);
        }
        VehicleCommand::Status { id, status } => {
            let vehicle = storage.set_vehicle_status(*id, (*status).into())?;
            print_vehicle_row(&vehicle);
        }
    }
    Ok(())
}

fn handle_station(config: &Config, cmd: &StationCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        StationCommand::List { json } => {
            let stations = storage.list_stations()?;
            if *json {
                return print_json(&stations);
            }
            for station in &stations {
                println!(
                    "{:>4}  {:<20} {}",
                    station.id,
                    station.name,
                    station.address.as_deref().unwrap_or("-")
                );
            }
        }
        StationCommand::Add {
            name,
            address,
            phone,
        } => {
            let station = storage.add_station(&NewStation {
                name: name.clone(),
                address: address.clone(),
                phone: phone.clone(),
                ..NewStation::default()
            })?;
            println!("Added station {} (id {})", station.name, station.id);
        }
    }
    Ok(())
}

fn handle_personnel(config: &Config, cmd: &PersonnelCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        PersonnelCommand::List { station, json } => {
            let personnel = storage.list_personnel(*station)?;
            if *json {
                return print_json(&personnel);
            }
            for person in &personnel {
                println!("{:>4}  {:<24} {}", person.id, person.name, person.role);
            }
        }
        PersonnelCommand::Add {
            name,
            role,
            station,
        } => {
            let person = storage.add_personnel(&NewPersonnel {
                name: name.clone(),
                role: (*role).into(),
                station_id: *station,
            })?;
            println!("Added {} {} (id {})", person.role, person.name, person.id);
        }
        PersonnelCommand::Assign {
            incident,
            personnel,
            role,
        } => {
            storage.assign_personnel(*incident, *personnel, role.as_deref())?;
            println!("Assigned personnel {personnel} to incident {incident}");
        }
    }
    Ok(())
}

fn handle_equipment(config: &Config, cmd: &EquipmentCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        EquipmentCommand::List { vehicle, json } => {
            let equipment = storage.list_equipment(*vehicle)?;
            if *json {
                return print_json(&equipment);
            }
            for item in &equipment {
                println!(
                    "{:>4}  {:<24} {:<18} vehicle {}  next inspection {}",
                    item.id,
                    item.name,
                    item.status,
                    item.vehicle_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                    day(item.next_inspection)
                );
            }
        }
        EquipmentCommand::Add {
            name,
            equipment_type,
            status,
            vehicle,
            last_inspection,
            next_inspection,
        } => {
            let item = storage.add_equipment(&NewEquipment {
                name: name.clone(),
                equipment_type: equipment_type.clone(),
                status: (*status).into(),
                last_inspection: last_inspection.and_then(start_of_day),
                next_inspection: next_inspection.and_then(start_of_day),
                vehicle_id: *vehicle,
            })?;
            println!("Added equipment {} (id {})", item.name, item.id);
        }
    }
    Ok(())
}

fn handle_maintenance(config: &Config, cmd: &MaintenanceCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        MaintenanceCommand::List { vehicle, json } => {
            let records = storage.list_maintenance(*vehicle)?;
            if *json {
                return print_json(&records);
            }
            for record in &records {
                println!(
                    "{:>4}  vehicle {:>4}  {:<12} {} .. {}  {}",
                    record.id,
                    record.vehicle_id,
                    record.status,
                    day(record.start_date),
                    day(record.end_date),
                    record.description.as_deref().unwrap_or("-")
                );
            }
        }
        MaintenanceCommand::Add {
            vehicle,
            description,
            cost,
            status,
            technician,
            start,
            end,
        } => {
            let record = storage.add_maintenance(&NewMaintenance {
                vehicle_id: *vehicle,
                start_date: start.and_then(start_of_day),
                end_date: end.and_then(start_of_day),
                description: description.clone(),
                cost: *cost,
                status: (*status).into(),
                technician: technician.clone(),
            })?;
            println!(
                "Recorded maintenance {} on vehicle {}",
                record.id, record.vehicle_id
            );
        }
    }
    Ok(())
}

fn handle_training(config: &Config, cmd: &TrainingCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        TrainingCommand::List { personnel, json } => {
            let records = storage.list_training(*personnel)?;
            if *json {
                return print_json(&records);
            }
            for record in &records {
                println!(
                    "{:>4}  personnel {:>4}  {:<24} {:<12} expires {}",
                    record.id,
                    record.personnel_id,
                    record.training_type,
                    record.status,
                    day(record.expiration_date)
                );
            }
        }
        TrainingCommand::Add {
            personnel,
            training_type,
            completed,
            expires,
            certification,
            status,
        } => {
            let record = storage.add_training(&NewTrainingRecord {
                personnel_id: *personnel,
                training_type: training_type.clone(),
                completion_date: completed.and_then(start_of_day),
                expiration_date: expires.and_then(start_of_day),
                certification_number: certification.clone(),
                status: (*status).into(),
            })?;
            println!(
                "Recorded {} for personnel {} (id {})",
                record.training_type, record.personnel_id, record.id
            );
        }
    }
    Ok(())
}

fn handle_contact(config: &Config, cmd: &ContactCommand) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    match cmd {
        ContactCommand::List { contact_type, json } => {
            let contacts = storage.list_contacts(contact_type.as_deref())?;
            if *json {
                return print_json(&contacts);
            }
            for contact in &contacts {
                println!(
                    "{:>4}  {:<28} {:<12} {}",
                    contact.id,
                    contact.name,
                    contact.contact_type.as_deref().unwrap_or("-"),
                    contact.phone.as_deref().unwrap_or("-")
                );
            }
        }
        ContactCommand::Add {
            name,
            organization,
            phone,
            email,
            contact_type,
            address,
            notes,
        } => {
            let contact = storage.add_contact(&NewEmergencyContact {
                name: name.clone(),
                organization: organization.clone(),
                phone: phone.clone(),
                email: email.clone(),
                contact_type: contact_type.clone(),
                address: address.clone(),
                notes: notes.clone(),
            })?;
            println!("Added contact {} (id {})", contact.name, contact.id);
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                return print_json(config);
            }
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[storage]");
            println!("  database_path:                {}", config.database_path().display());
            println!("[server]");
            println!("  bind_address:                 {}", config.server.bind_address);
            println!("[dispatch]");
            println!(
                "  exclusive_vehicle_assignment: {}",
                config.dispatch.exclusive_vehicle_assignment
            );
            println!("[dashboard]");
            println!(
                "  recent_incidents:             {}",
                config.dashboard.recent_incidents
            );
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn day(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string())
}

fn print_incident_row(incident: &Incident) {
    println!(
        "{:>4}  {}  {:<10} P{}  {:<10} {}",
        incident.id,
        incident.incident_number,
        incident.incident_type,
        incident.priority,
        incident.status,
        incident.address
    );
}

fn print_vehicle_row(vehicle: &Vehicle) {
    println!(
        "{:>4}  {:<14} {:<10} {}",
        vehicle.id,
        vehicle.name,
        vehicle.vehicle_type.as_deref().unwrap_or("-"),
        vehicle.status
    );
}

fn print_incident_detail(detail: &IncidentDetail) {
    let incident = &detail.incident;
    let stamp = |time: Option<chrono::DateTime<chrono::Utc>>| {
        time.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    };

    println!("{} ({})", incident.incident_number, incident.incident_type);
    println!("  Status:    {}", incident.status);
    println!("  Priority:  {}", incident.priority);
    println!("  Address:   {}", incident.address);
    if let Some(description) = &incident.description {
        println!("  Narrative: {description}");
    }
    println!("  Reported:  {}", incident.reported_time.to_rfc3339());
    println!("  Dispatch:  {}", stamp(incident.dispatch_time));
    println!("  Arrival:   {}", stamp(incident.arrival_time));
    println!("  Control:   {}", stamp(incident.controlled_time));
    println!("  Cleared:   {}", stamp(incident.cleared_time));
    if let Some(minutes) = incident.response_minutes() {
        println!("  Response:  {minutes:.1} min");
    }

    if !detail.vehicles.is_empty() {
        println!("\nVehicles:");
        for assignment in &detail.vehicles {
            println!(
                "  vehicle {:>4}  dispatched {}  arrived {}  cleared {}",
                assignment.vehicle_id,
                assignment.dispatched_time.to_rfc3339(),
                stamp(assignment.arrived_time),
                stamp(assignment.cleared_time)
            );
        }
    }
    if !detail.personnel.is_empty() {
        println!("\nPersonnel:");
        for assignment in &detail.personnel {
            println!(
                "  personnel {:>4}  {}  {}",
                assignment.personnel_id,
                assignment.role.as_deref().unwrap_or("-"),
                if assignment.is_active() { "active" } else { "cleared" }
            );
        }
    }
    if !detail.notes.is_empty() {
        println!("\nNotes:");
        for note in &detail.notes {
            println!("  [{}] {}", note.timestamp.format("%Y-%m-%d %H:%M"), note.content);
        }
    }
}
