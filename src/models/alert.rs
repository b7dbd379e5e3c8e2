// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived maintenance alerts. Never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::MaintenanceType;

/// Why an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    /// Odometer reached the next-due km
    KmExceeded,
    /// Engine hours reached the next-due hours
    HoursExceeded,
    /// Next-due date passed or within the look-ahead window
    DateDue,
}

/// A vehicle has reached or is approaching a maintenance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MaintenanceAlert {
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub maintenance_type: MaintenanceType,
    /// Completed entry holding the active threshold
    pub entry_id: String,
    /// Triggered conditions, in `AlertReason` order
    pub reasons: Vec<AlertReason>,
    pub current_km: Option<f64>,
    pub target_km: Option<f64>,
    pub current_hours: Option<f64>,
    pub target_hours: Option<f64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub target_date: Option<NaiveDate>,
    /// Days until `target_date` (negative once passed)
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub days_remaining: Option<i64>,
    pub urgent: bool,
}

impl MaintenanceAlert {
    pub fn has_reason(&self, reason: AlertReason) -> bool {
        self.reasons.contains(&reason)
    }
}
