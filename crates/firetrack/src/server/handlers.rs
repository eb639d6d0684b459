//! Request handlers for the JSON API.
//!
//! Every handler takes the shared [`AppState`], locks the store for the
//! length of one storage call and maps [`Error`] onto an HTTP status through
//! [`ApiError`]. Mutating routes require an [`Actor`].

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::AppState;
use crate::dashboard::DashboardSummary;
use crate::error::Error;
use crate::model::{
    ActorContext, EmergencyContact, Equipment, Incident, IncidentFilter, IncidentNote,
    IncidentUpdate, MaintenanceRecord, NewEmergencyContact, NewEquipment, NewIncident,
    NewMaintenance, NewPersonnel, NewStation, NewTrainingRecord, NewVehicle, Personnel,
    PersonnelAssignment, Station, TrainingRecord, Vehicle, VehicleStatus,
};
use crate::storage::IncidentDetail;

/// Header carrying the acting person's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Header carrying the acting person's station id.
pub const STATION_HEADER: &str = "x-station-id";

/// An [`Error`] rendered as `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The acting person, taken from the `x-actor-id` and `x-station-id` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub ActorContext);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let actor_id = header(ACTOR_HEADER)
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(Error::Unauthorized)?;
        let station_id = header(STATION_HEADER)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| Error::validation(format!("invalid {STATION_HEADER}: {value}")))
            })
            .transpose()?;

        Ok(Self(ActorContext::new(actor_id, station_id)))
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()).into())
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()).into())
}

#[derive(Debug, Deserialize)]
pub(super) struct VehicleQuery {
    status: Option<VehicleStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PersonnelQuery {
    station_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ByVehicleQuery {
    vehicle_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrainingQuery {
    personnel_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContactQuery {
    #[serde(rename = "type")]
    contact_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum AssignVehiclesRequest {
    One { vehicle_id: i64 },
    Many { vehicle_ids: Vec<i64> },
}

#[derive(Debug, Deserialize)]
pub(super) struct AssignPersonnelRequest {
    personnel_id: i64,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NoteRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct VehicleStatusRequest {
    status: VehicleStatus,
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub(super) async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardSummary>> {
    let storage = state.storage()?;
    Ok(Json(storage.dashboard(state.recent_incidents)?))
}

pub(super) async fn list_incidents(
    State(state): State<AppState>,
    filter: Result<Query<IncidentFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Incident>>> {
    let filter = query(filter)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_incidents(&filter)?))
}

pub(super) async fn create_incident(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<NewIncident>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    let incident = storage.create_incident(&actor, &new)?;
    Ok((StatusCode::CREATED, Json(incident)))
}

pub(super) async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IncidentDetail>> {
    let storage = state.storage()?;
    Ok(Json(storage.incident_detail(id)?))
}

pub(super) async fn update_incident(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(id): Path<i64>,
    payload: Result<Json<IncidentUpdate>, JsonRejection>,
) -> ApiResult<Json<Incident>> {
    let update = body(payload)?;
    let mut storage = state.storage()?;
    Ok(Json(storage.update_incident(id, &update)?))
}

pub(super) async fn delete_incident(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut storage = state.storage()?;
    let released = storage.delete_incident(id)?;
    Ok(Json(json!({ "deleted": id, "vehicles_released": released })))
}

pub(super) async fn delete_all_incidents(
    State(state): State<AppState>,
    Actor(_): Actor,
) -> ApiResult<Json<serde_json::Value>> {
    let mut storage = state.storage()?;
    let deleted = storage.delete_all_incidents()?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub(super) async fn assign_vehicles(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(id): Path<i64>,
    payload: Result<Json<AssignVehiclesRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let mut storage = state.storage()?;
    let response = match request {
        AssignVehiclesRequest::One { vehicle_id } => {
            let assignment = storage.assign_vehicle(id, vehicle_id)?;
            (StatusCode::CREATED, Json(assignment)).into_response()
        }
        AssignVehiclesRequest::Many { vehicle_ids } => {
            Json(storage.assign_vehicles(id, &vehicle_ids)?).into_response()
        }
    };
    Ok(response)
}

pub(super) async fn assign_personnel(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(id): Path<i64>,
    payload: Result<Json<AssignPersonnelRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PersonnelAssignment>)> {
    let request = body(payload)?;
    let mut storage = state.storage()?;
    let assignment =
        storage.assign_personnel(id, request.personnel_id, request.role.as_deref())?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub(super) async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<IncidentNote>>> {
    let storage = state.storage()?;
    Ok(Json(storage.notes(id)?))
}

pub(super) async fn add_note(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IncidentNote>)> {
    let request = body(payload)?;
    let mut storage = state.storage()?;
    let note = storage.add_note(&actor, id, &request.content)?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub(super) async fn list_vehicles(
    State(state): State<AppState>,
    params: Result<Query<VehicleQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Vehicle>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_vehicles(params.status)?))
}

pub(super) async fn add_vehicle(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewVehicle>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_vehicle(&new)?)))
}

pub(super) async fn set_vehicle_status(
    State(state): State<AppState>,
    Actor(_): Actor,
    Path(id): Path<i64>,
    payload: Result<Json<VehicleStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Vehicle>> {
    let request = body(payload)?;
    let mut storage = state.storage()?;
    Ok(Json(storage.set_vehicle_status(id, request.status)?))
}

pub(super) async fn list_stations(State(state): State<AppState>) -> ApiResult<Json<Vec<Station>>> {
    let storage = state.storage()?;
    Ok(Json(storage.list_stations()?))
}

pub(super) async fn add_station(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewStation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_station(&new)?)))
}

pub(super) async fn list_personnel(
    State(state): State<AppState>,
    params: Result<Query<PersonnelQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Personnel>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_personnel(params.station_id)?))
}

pub(super) async fn add_personnel(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewPersonnel>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Personnel>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_personnel(&new)?)))
}

pub(super) async fn list_equipment(
    State(state): State<AppState>,
    params: Result<Query<ByVehicleQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Equipment>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_equipment(params.vehicle_id)?))
}

pub(super) async fn add_equipment(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewEquipment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Equipment>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_equipment(&new)?)))
}

pub(super) async fn list_maintenance(
    State(state): State<AppState>,
    params: Result<Query<ByVehicleQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MaintenanceRecord>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_maintenance(params.vehicle_id)?))
}

pub(super) async fn add_maintenance(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewMaintenance>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MaintenanceRecord>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_maintenance(&new)?)))
}

pub(super) async fn list_training(
    State(state): State<AppState>,
    params: Result<Query<TrainingQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TrainingRecord>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_training(params.personnel_id)?))
}

pub(super) async fn add_training(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewTrainingRecord>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TrainingRecord>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_training(&new)?)))
}

pub(super) async fn list_contacts(
    State(state): State<AppState>,
    params: Result<Query<ContactQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<EmergencyContact>>> {
    let params = query(params)?;
    let storage = state.storage()?;
    Ok(Json(storage.list_contacts(params.contact_type.as_deref())?))
}

pub(super) async fn add_contact(
    State(state): State<AppState>,
    Actor(_): Actor,
    payload: Result<Json<NewEmergencyContact>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EmergencyContact>)> {
    let new = body(payload)?;
    let mut storage = state.storage()?;
    Ok((StatusCode::CREATED, Json(storage.add_contact(&new)?)))
}
