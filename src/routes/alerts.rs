// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Alert board and dashboard routes.

use crate::config::MAX_LOOK_AHEAD_DAYS;
use crate::error::{AppError, Result};
use crate::models::{FleetSnapshot, MaintenanceStatus, VehicleStatus};
use crate::services::{derive_maintenance_alerts, AlertBoard, AlertOptions};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/alerts", get(get_alerts))
        .route("/api/dashboard", get(get_dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// Evaluate as of this day instead of the local date (YYYY-MM-DD)
    pub today: Option<String>,
    pub look_ahead_days: Option<u32>,
}

/// Validated overrides for an on-demand derivation.
#[derive(Debug, PartialEq)]
struct AlertOverrides {
    today: Option<NaiveDate>,
    look_ahead_days: Option<u32>,
}

impl AlertsQuery {
    fn overrides(&self) -> Result<Option<AlertOverrides>> {
        let today = match self.today.as_deref() {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::BadRequest("Invalid 'today': expected YYYY-MM-DD".to_string())
            })?),
            None => None,
        };

        if let Some(days) = self.look_ahead_days {
            if days > MAX_LOOK_AHEAD_DAYS {
                return Err(AppError::BadRequest(format!(
                    "look_ahead_days must be at most {}",
                    MAX_LOOK_AHEAD_DAYS
                )));
            }
        }

        if today.is_none() && self.look_ahead_days.is_none() {
            return Ok(None);
        }

        Ok(Some(AlertOverrides {
            today,
            look_ahead_days: self.look_ahead_days,
        }))
    }
}

/// Current maintenance alerts.
///
/// Without parameters this is the monitor's latest board, refreshed first if
/// it was computed for an earlier day. With `today` or `look_ahead_days` the
/// alerts are derived on demand and nothing is published.
async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<AlertBoard>> {
    let local_today = chrono::Local::now().date_naive();

    let Some(overrides) = params.overrides()? else {
        let board = state.alert_monitor.latest();
        if board.computed_for == Some(local_today) {
            return Ok(Json((*board).clone()));
        }
        let board = state.alert_monitor.refresh(&state.db).await?;
        return Ok(Json((*board).clone()));
    };

    let today = overrides.today.unwrap_or(local_today);
    let look_ahead_days = overrides
        .look_ahead_days
        .unwrap_or_else(|| state.alert_monitor.look_ahead_days());

    tracing::debug!(today = %today, look_ahead_days, "Deriving alerts on demand");

    let snapshot = state.db.load_fleet_snapshot().await?;
    let options = AlertOptions::new(today).with_look_ahead(look_ahead_days);
    let alerts = derive_maintenance_alerts(
        &snapshot.vehicles,
        &snapshot.maintenance,
        &snapshot.readings,
        &options,
    );

    Ok(Json(AlertBoard {
        alerts,
        computed_for: Some(today),
        look_ahead_days,
        generated_at: Some(format_utc_rfc3339(chrono::Utc::now())),
        generation: 0,
    }))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    pub total_vehicles: usize,
    /// Vehicle count per stored status value
    pub vehicles_by_status: BTreeMap<String, usize>,
    pub urgent_alerts: usize,
    pub upcoming_alerts: usize,
    pub planned_maintenance: usize,
    pub in_progress_maintenance: usize,
}

/// Fleet overview counters.
async fn get_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardResponse>> {
    let monitor = &state.alert_monitor;
    let generation = monitor.next_generation();
    let snapshot = state.db.load_fleet_snapshot().await?;

    let today = chrono::Local::now().date_naive();
    let mut board = monitor.latest();
    if board.computed_for != Some(today) {
        board = monitor.publish(generation, &snapshot, today);
    }

    Ok(Json(summarize(&snapshot, &board)))
}

/// Count vehicles and entries in `snapshot`, alerts from `board`.
///
/// Every vehicle status is present in `vehicles_by_status`, zero or not.
fn summarize(snapshot: &FleetSnapshot, board: &AlertBoard) -> DashboardResponse {
    let mut vehicles_by_status: BTreeMap<String, usize> = [
        VehicleStatus::Active,
        VehicleStatus::InRepair,
        VehicleStatus::Stored,
        VehicleStatus::Sold,
        VehicleStatus::Retired,
    ]
    .iter()
    .map(|status| (status.as_str().to_string(), 0))
    .collect();

    for vehicle in &snapshot.vehicles {
        *vehicles_by_status
            .entry(vehicle.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    let count_status = |status: MaintenanceStatus| {
        snapshot
            .maintenance
            .iter()
            .filter(|e| e.status == status)
            .count()
    };

    DashboardResponse {
        total_vehicles: snapshot.vehicles.len(),
        vehicles_by_status,
        urgent_alerts: board.urgent_count(),
        upcoming_alerts: board.upcoming_count(),
        planned_maintenance: count_status(MaintenanceStatus::Planned),
        in_progress_maintenance: count_status(MaintenanceStatus::InProgress),
    }
}
