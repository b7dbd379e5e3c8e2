// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fleet API routes: vehicles, meter readings and maintenance entries.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    MaintenanceEntry, MaintenanceStatus, MaintenanceType, MeterReading, ReadingType, Vehicle,
    VehicleStatus, VehicleType,
};
use crate::services::ChangeKind;
use crate::time_utils::{format_utc_rfc3339, parse_day, parse_opt_day};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/api/vehicles/{id}",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route(
            "/api/vehicles/{id}/readings",
            get(list_readings).post(create_reading),
        )
        .route(
            "/api/maintenance",
            get(list_maintenance).post(create_maintenance),
        )
        .route(
            "/api/maintenance/{id}",
            get(get_maintenance)
                .put(update_maintenance)
                .delete(delete_maintenance),
        )
}

fn now() -> String {
    format_utc_rfc3339(chrono::Utc::now())
}

fn today() -> String {
    chrono::Local::now().date_naive().to_string()
}

/// Reject a date field that is present but not a calendar day.
fn check_day(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(raw) if parse_day(raw).is_none() => Err(AppError::BadRequest(format!(
            "Invalid '{}': expected YYYY-MM-DD",
            field
        ))),
        _ => Ok(()),
    }
}

async fn require_vehicle(state: &AppState, vehicle_id: &str) -> Result<Vehicle> {
    state
        .db
        .get_vehicle(vehicle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", vehicle_id)))
}

// ─── Vehicles ────────────────────────────────────────────────

/// Editable vehicle fields (same keys as the stored document).
#[derive(Deserialize, Validate)]
pub struct VehicleInput {
    #[serde(rename = "nom")]
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(rename = "type")]
    vehicle_type: VehicleType,
    #[serde(rename = "kilometrage", default)]
    #[validate(range(min = 0.0))]
    odometer_km: Option<f64>,
    #[serde(rename = "heuresMoteur", default)]
    #[validate(range(min = 0.0))]
    engine_hours: Option<f64>,
    #[serde(rename = "dateProchainCT", default)]
    next_inspection_date: Option<String>,
    #[serde(rename = "statut", default = "default_vehicle_status")]
    status: VehicleStatus,
}

fn default_vehicle_status() -> VehicleStatus {
    VehicleStatus::Active
}

impl VehicleInput {
    /// Trim the name, then validate; a name of only spaces is empty.
    fn check(&mut self) -> Result<()> {
        self.name = self.name.trim().to_string();
        self.validate()?;
        check_day("dateProchainCT", self.next_inspection_date.as_deref())
    }

    /// Apply the input onto a vehicle. A meter value that changes is dated today.
    fn apply_to(self, vehicle: &mut Vehicle, now: &str) {
        let today = today();
        if self.odometer_km != vehicle.odometer_km {
            vehicle.odometer_updated_on = self.odometer_km.map(|_| today.clone());
        }
        if self.engine_hours != vehicle.engine_hours {
            vehicle.hours_updated_on = self.engine_hours.map(|_| today.clone());
        }

        vehicle.name = self.name;
        vehicle.vehicle_type = self.vehicle_type;
        vehicle.odometer_km = self.odometer_km;
        vehicle.engine_hours = self.engine_hours;
        vehicle.next_inspection_date = self.next_inspection_date;
        vehicle.status = self.status;
        vehicle.updated_at = now.to_string();
    }
}

/// List the fleet, sorted by name.
async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Vehicle>>> {
    tracing::debug!(username = %user.username, "Listing vehicles");

    let mut vehicles = state.db.list_vehicles().await?;
    vehicles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(vehicles))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(mut input): Json<VehicleInput>,
) -> Result<(StatusCode, Json<Vehicle>)> {
    input.check()?;

    let now = now();
    let mut vehicle = Vehicle {
        id: uuid::Uuid::new_v4().to_string(),
        name: String::new(),
        vehicle_type: input.vehicle_type,
        odometer_km: None,
        engine_hours: None,
        odometer_updated_on: None,
        hours_updated_on: None,
        next_inspection_date: None,
        status: input.status,
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    input.apply_to(&mut vehicle, &now);

    state.db.upsert_vehicle(&vehicle, ChangeKind::Created).await?;
    tracing::info!(vehicle_id = %vehicle.id, name = %vehicle.name, "Vehicle created");

    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>> {
    Ok(Json(require_vehicle(&state, &id).await?))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut input): Json<VehicleInput>,
) -> Result<Json<Vehicle>> {
    input.check()?;

    let mut vehicle = require_vehicle(&state, &id).await?;
    input.apply_to(&mut vehicle, &now());

    state.db.upsert_vehicle(&vehicle, ChangeKind::Updated).await?;
    tracing::info!(vehicle_id = %vehicle.id, "Vehicle updated");

    Ok(Json(vehicle))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteResponse {
    pub deleted: usize,
}

/// Delete a vehicle and everything recorded for it.
async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    require_vehicle(&state, &id).await?;

    tracing::info!(vehicle_id = %id, username = %user.username, "Deleting vehicle");
    let deleted = state.db.delete_vehicle(&id).await?;

    Ok(Json(DeleteResponse { deleted }))
}

// ─── Meter Readings ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ReadingInput {
    #[serde(rename = "type")]
    reading_type: ReadingType,
    #[serde(rename = "valeur")]
    #[validate(range(min = 0.0))]
    value: f64,
    /// Defaults to today
    #[serde(default)]
    date: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReadingResponse {
    pub reading: MeterReading,
    pub vehicle: Vehicle,
}

async fn list_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MeterReading>>> {
    Ok(Json(state.db.list_meter_readings(Some(&id)).await?))
}

/// Submit a reading; the vehicle's meter snapshot follows if it is current.
async fn create_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<ReadingInput>,
) -> Result<(StatusCode, Json<ReadingResponse>)> {
    input.validate()?;
    check_day("date", input.date.as_deref())?;
    if !input.value.is_finite() {
        return Err(AppError::BadRequest("Invalid 'valeur'".to_string()));
    }

    let reading = MeterReading {
        id: uuid::Uuid::new_v4().to_string(),
        vehicle_id: id,
        reading_type: input.reading_type,
        value: input.value,
        date: input.date.unwrap_or_else(today),
        created_at: now(),
    };

    let vehicle = state.db.record_meter_reading(&reading).await?;

    Ok((StatusCode::CREATED, Json(ReadingResponse { reading, vehicle })))
}

// ─── Maintenance ─────────────────────────────────────────────

#[derive(Deserialize)]
struct MaintenanceQuery {
    /// Restrict to one vehicle
    vehicle_id: Option<String>,
}

/// Editable maintenance fields (same keys as the stored document).
#[derive(Deserialize, Validate)]
pub struct MaintenanceInput {
    #[serde(rename = "vehiculeId")]
    #[validate(length(min = 1, max = 100))]
    vehicle_id: String,
    #[serde(rename = "type")]
    maintenance_type: MaintenanceType,
    #[serde(rename = "statut")]
    status: MaintenanceStatus,
    #[serde(rename = "dateRealisation", default)]
    performed_date: Option<String>,
    #[serde(rename = "datePrevue", default)]
    planned_date: Option<String>,
    #[serde(rename = "prochainKm", default)]
    #[validate(range(min = 0.0))]
    next_due_km: Option<f64>,
    #[serde(rename = "prochainesHeures", default)]
    #[validate(range(min = 0.0))]
    next_due_hours: Option<f64>,
    #[serde(rename = "prochaineDate", default)]
    next_due_date: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    description: Option<String>,
    #[serde(rename = "cout", default)]
    #[validate(range(min = 0.0))]
    cost: Option<f64>,
    #[serde(rename = "kmAuMoment", default)]
    #[validate(range(min = 0.0))]
    odometer_at_service: Option<f64>,
}

impl MaintenanceInput {
    fn check(&self) -> Result<()> {
        self.validate()?;
        check_day("dateRealisation", self.performed_date.as_deref())?;
        check_day("datePrevue", self.planned_date.as_deref())?;
        check_day("prochaineDate", self.next_due_date.as_deref())
    }

    fn into_entry(self, id: String, created_at: String, now: &str) -> MaintenanceEntry {
        MaintenanceEntry {
            id,
            vehicle_id: self.vehicle_id,
            maintenance_type: self.maintenance_type,
            status: self.status,
            performed_date: self.performed_date,
            planned_date: self.planned_date,
            next_due_km: self.next_due_km,
            next_due_hours: self.next_due_hours,
            next_due_date: self.next_due_date,
            description: self.description,
            cost: self.cost,
            odometer_at_service: self.odometer_at_service,
            created_at,
            updated_at: now.to_string(),
        }
    }
}

/// Unknown vehicle in a maintenance body is a client error, not a 404 on the route.
async fn check_vehicle_exists(state: &AppState, vehicle_id: &str) -> Result<()> {
    match require_vehicle(state, vehicle_id).await {
        Err(AppError::NotFound(msg)) => Err(AppError::BadRequest(msg)),
        other => other.map(|_| ()),
    }
}

/// List maintenance entries, most recent first.
async fn list_maintenance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MaintenanceQuery>,
) -> Result<Json<Vec<MaintenanceEntry>>> {
    let mut entries = state
        .db
        .list_maintenance(params.vehicle_id.as_deref())
        .await?;

    let sort_day = |e: &MaintenanceEntry| {
        parse_opt_day(e.performed_date.as_deref())
            .or_else(|| parse_opt_day(e.planned_date.as_deref()))
    };
    entries.sort_by(|a, b| sort_day(b).cmp(&sort_day(a)).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(entries))
}

async fn create_maintenance(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MaintenanceInput>,
) -> Result<(StatusCode, Json<MaintenanceEntry>)> {
    input.check()?;
    check_vehicle_exists(&state, &input.vehicle_id).await?;

    let now = now();
    let entry = input.into_entry(uuid::Uuid::new_v4().to_string(), now.clone(), &now);

    state
        .db
        .upsert_maintenance(&entry, ChangeKind::Created)
        .await?;
    tracing::info!(
        entry_id = %entry.id,
        vehicle_id = %entry.vehicle_id,
        maintenance_type = ?entry.maintenance_type,
        status = ?entry.status,
        "Maintenance entry created"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

async fn require_maintenance(state: &AppState, entry_id: &str) -> Result<MaintenanceEntry> {
    state
        .db
        .get_maintenance(entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance entry {} not found", entry_id)))
}

async fn get_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MaintenanceEntry>> {
    Ok(Json(require_maintenance(&state, &id).await?))
}

async fn update_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<MaintenanceInput>,
) -> Result<Json<MaintenanceEntry>> {
    input.check()?;

    let existing = require_maintenance(&state, &id).await?;
    if existing.vehicle_id != input.vehicle_id {
        check_vehicle_exists(&state, &input.vehicle_id).await?;
    }

    let entry = input.into_entry(existing.id, existing.created_at, &now());
    state
        .db
        .upsert_maintenance(&entry, ChangeKind::Updated)
        .await?;
    tracing::info!(entry_id = %entry.id, status = ?entry.status, "Maintenance entry updated");

    Ok(Json(entry))
}

async fn delete_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_maintenance(&state, &id).await?;

    state.db.delete_maintenance(&id).await?;
    tracing::info!(entry_id = %id, "Maintenance entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
