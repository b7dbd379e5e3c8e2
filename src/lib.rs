// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Farm fleet: vehicle maintenance tracking for the farm.
//!
//! This crate provides the backend API for the farm's vehicles, their
//! maintenance history and meter readings, and derives which services are
//! due or overdue.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::AlertMonitor;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub alert_monitor: AlertMonitor,
}
