// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meter reading model (append-only log per vehicle).

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which meter a reading comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ReadingType {
    #[serde(rename = "kilometrage")]
    Odometer,
    #[serde(rename = "heures")]
    Hours,
}

/// A dated odometer or engine-hours value recorded for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeterReading {
    pub id: String,
    #[serde(rename = "vehiculeId")]
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub reading_type: ReadingType,
    #[serde(rename = "valeur")]
    pub value: f64,
    /// Day of the reading (`YYYY-MM-DD`)
    pub date: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
}
