// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance entry model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of service performed on a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MaintenanceType {
    #[serde(rename = "vidange")]
    OilChange,
    #[serde(rename = "filtres")]
    Filters,
    #[serde(rename = "freins")]
    Brakes,
    #[serde(rename = "pneus")]
    Tires,
    #[serde(rename = "batterie")]
    Battery,
    #[serde(rename = "courroie")]
    Belt,
    #[serde(rename = "climatisation")]
    AirConditioning,
    #[serde(rename = "controle_technique")]
    TechnicalInspection,
    #[serde(rename = "revision")]
    Overhaul,
    #[serde(rename = "reparation")]
    Repair,
    #[serde(rename = "autre")]
    Other,
}

/// Progress of a maintenance entry. Owned by the CRUD layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MaintenanceStatus {
    #[serde(rename = "planifie")]
    Planned,
    #[serde(rename = "en_cours")]
    InProgress,
    #[serde(rename = "termine")]
    Done,
    #[serde(rename = "annule")]
    Cancelled,
}

/// One service event (planned or completed) for a vehicle.
///
/// The `next_due_*` fields on the latest completed entry of a type define
/// when that service is due again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MaintenanceEntry {
    pub id: String,
    #[serde(rename = "vehiculeId")]
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub maintenance_type: MaintenanceType,
    #[serde(rename = "statut")]
    pub status: MaintenanceStatus,
    #[serde(rename = "dateRealisation", default)]
    pub performed_date: Option<String>,
    #[serde(rename = "datePrevue", default)]
    pub planned_date: Option<String>,
    #[serde(rename = "prochainKm", default)]
    pub next_due_km: Option<f64>,
    #[serde(rename = "prochainesHeures", default)]
    pub next_due_hours: Option<f64>,
    #[serde(rename = "prochaineDate", default)]
    pub next_due_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Cost in euros
    #[serde(rename = "cout", default)]
    pub cost: Option<f64>,
    /// Odometer at the time of service
    #[serde(rename = "kmAuMoment", default)]
    pub odometer_at_service: Option<f64>,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

impl MaintenanceEntry {
    /// Whether this entry carries any next-due threshold.
    pub fn has_next_due(&self) -> bool {
        self.next_due_km.is_some() || self.next_due_hours.is_some() || self.next_due_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_entry() {
        let doc = serde_json::json!({
            "id": "e1",
            "vehiculeId": "v1",
            "type": "controle_technique",
            "statut": "termine",
            "prochaineDate": "2025-04-01",
        });

        let entry: MaintenanceEntry = serde_json::from_value(doc).unwrap();

        assert_eq!(entry.maintenance_type, MaintenanceType::TechnicalInspection);
        assert_eq!(entry.status, MaintenanceStatus::Done);
        assert_eq!(entry.next_due_date.as_deref(), Some("2025-04-01"));
        assert!(entry.has_next_due());
        assert_eq!(entry.performed_date, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let doc = serde_json::json!({
            "id": "e1",
            "vehiculeId": "v1",
            "type": "peinture",
            "statut": "termine",
        });

        assert!(serde_json::from_value::<MaintenanceEntry>(doc).is_err());
    }
}
