// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod alert;
pub mod maintenance;
pub mod reading;
pub mod vehicle;

pub use alert::{AlertReason, MaintenanceAlert};
pub use maintenance::{MaintenanceEntry, MaintenanceStatus, MaintenanceType};
pub use reading::{MeterReading, ReadingType};
pub use vehicle::{Vehicle, VehicleStatus, VehicleType};

/// The three collections the alert deriver reads, loaded together.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub maintenance: Vec<MaintenanceEntry>,
    pub readings: Vec<MeterReading>,
}
