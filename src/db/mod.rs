//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const VEHICLES: &str = "vehicules";
    pub const MAINTENANCE: &str = "entretiens";
    /// Append-only meter log (odometer and engine hours)
    pub const METER_READINGS: &str = "releves_compteur";

    /// Collections the maintenance alerts are derived from.
    pub const ALERT_SOURCES: [&str; 3] = [VEHICLES, MAINTENANCE, METER_READINGS];
}
