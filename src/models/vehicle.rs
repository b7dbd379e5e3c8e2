// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle model for storage and API.
//!
//! Stored documents keep the French field names used by the farm's
//! existing records (`kilometrage`, `dateProchainCT`, ...).

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{MeterReading, ReadingType};
use crate::time_utils::{parse_day, parse_opt_day};

/// Kind of vehicle in the farm fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VehicleType {
    #[serde(rename = "voiture")]
    Car,
    #[serde(rename = "tracteur")]
    Tractor,
    #[serde(rename = "moto")]
    Motorcycle,
    #[serde(rename = "quad")]
    Quad,
    #[serde(rename = "utilitaire")]
    Van,
    #[serde(rename = "remorque")]
    Trailer,
}

/// Lifecycle status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VehicleStatus {
    #[serde(rename = "actif")]
    Active,
    #[serde(rename = "en_reparation")]
    InRepair,
    #[serde(rename = "stocke")]
    Stored,
    #[serde(rename = "vendu")]
    Sold,
    #[serde(rename = "reforme")]
    Retired,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "actif",
            VehicleStatus::InRepair => "en_reparation",
            VehicleStatus::Stored => "stocke",
            VehicleStatus::Sold => "vendu",
            VehicleStatus::Retired => "reforme",
        }
    }
}

/// Vehicle record stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Vehicle {
    pub id: String,
    /// Display name (e.g. "John Deere 6120M")
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    /// Current odometer reading in km
    #[serde(rename = "kilometrage", default)]
    pub odometer_km: Option<f64>,
    /// Current engine hours
    #[serde(rename = "heuresMoteur", default)]
    pub engine_hours: Option<f64>,
    /// Day `odometer_km` was last updated from a reading
    #[serde(rename = "dateReleveKm", default)]
    pub odometer_updated_on: Option<String>,
    /// Day `engine_hours` was last updated from a reading
    #[serde(rename = "dateReleveHeures", default)]
    pub hours_updated_on: Option<String>,
    /// Next technical inspection due date
    #[serde(rename = "dateProchainCT", default)]
    pub next_inspection_date: Option<String>,
    #[serde(rename = "statut")]
    pub status: VehicleStatus,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

impl Vehicle {
    /// Snapshot value of a meter and the day it was last updated.
    pub fn meter(&self, reading_type: ReadingType) -> (Option<f64>, Option<&str>) {
        match reading_type {
            ReadingType::Odometer => (self.odometer_km, self.odometer_updated_on.as_deref()),
            ReadingType::Hours => (self.engine_hours, self.hours_updated_on.as_deref()),
        }
    }

    /// Fold a submitted reading into the meter snapshot.
    ///
    /// The snapshot only moves forward in time: a reading dated before the
    /// current snapshot stays in the log but does not overwrite it. Readings
    /// with an unparsable date are never applied.
    ///
    /// Returns `true` if the snapshot changed.
    pub fn apply_reading(&mut self, reading: &MeterReading, now: &str) -> bool {
        let Some(reading_day) = parse_day(&reading.date) else {
            return false;
        };
        let (_, snapshot_day) = self.meter(reading.reading_type);
        if parse_opt_day(snapshot_day).is_some_and(|snapshot_day| reading_day < snapshot_day) {
            return false;
        }

        let (value, updated_on) = match reading.reading_type {
            ReadingType::Odometer => (&mut self.odometer_km, &mut self.odometer_updated_on),
            ReadingType::Hours => (&mut self.engine_hours, &mut self.hours_updated_on),
        };
        *value = Some(reading.value);
        *updated_on = Some(reading.date.clone());
        self.updated_at = now.to_string();
        true
    }
}
