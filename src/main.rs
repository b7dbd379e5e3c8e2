// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Farm fleet API server
//!
//! Tracks the farm's vehicles and their maintenance, and keeps a board of
//! services that are due soon or overdue.

use farm_fleet::{config::Config, db::FirestoreDb, services::AlertMonitor, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        look_ahead_days = config.alert_look_ahead_days,
        "Starting farm fleet API"
    );

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Recompute alerts whenever vehicles, maintenance or readings change
    let alert_monitor = AlertMonitor::new(config.alert_look_ahead_days);
    let _monitor = alert_monitor.spawn(db.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        alert_monitor,
    });

    let app = farm_fleet::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("farm_fleet=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
