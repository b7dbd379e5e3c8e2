// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keeps the maintenance alert board current.
//!
//! The monitor owns the "recompute on change" policy: it subscribes to the
//! vehicle, maintenance and meter-reading collections, reloads a fresh
//! snapshot whenever any of them changes, and republishes the derived alerts.
//! Bursts of changes are coalesced into a single reload.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::models::{FleetSnapshot, MaintenanceAlert, MaintenanceType};
use crate::services::alerts::{derive_maintenance_alerts, AlertOptions};
use crate::services::change_feed::Subscription;
use crate::time_utils::format_utc_rfc3339;

/// Latest derived alerts and the parameters they were computed with.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AlertBoard {
    pub alerts: Vec<MaintenanceAlert>,
    /// Day used as "today" (None until the first computation)
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub computed_for: Option<NaiveDate>,
    pub look_ahead_days: u32,
    pub generated_at: Option<String>,
    /// Order in which the underlying snapshot load started (0 = never computed)
    #[serde(skip)]
    pub generation: u64,
}

impl AlertBoard {
    pub fn empty(look_ahead_days: u32) -> Self {
        Self {
            alerts: Vec::new(),
            computed_for: None,
            look_ahead_days,
            generated_at: None,
            generation: 0,
        }
    }

    pub fn urgent_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.urgent).count()
    }

    pub fn upcoming_count(&self) -> usize {
        self.alerts.len() - self.urgent_count()
    }
}

/// Publishes the alert board through a `watch` channel.
///
/// Several callers may recompute at once (the background task and request
/// handlers). Each takes a generation before loading its snapshot, and a
/// board is only published if its generation is newer than the current one.
#[derive(Clone)]
pub struct AlertMonitor {
    look_ahead_days: u32,
    board: watch::Sender<Arc<AlertBoard>>,
    generations: Arc<AtomicU64>,
}

impl AlertMonitor {
    pub fn new(look_ahead_days: u32) -> Self {
        let (board, _) = watch::channel(Arc::new(AlertBoard::empty(look_ahead_days)));
        Self {
            look_ahead_days,
            board,
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reserve a generation. Call before loading the snapshot to publish.
    pub fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn look_ahead_days(&self) -> u32 {
        self.look_ahead_days
    }

    /// Most recently published board.
    pub fn latest(&self) -> Arc<AlertBoard> {
        self.board.borrow().clone()
    }

    /// Receive every future board.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertBoard>> {
        self.board.subscribe()
    }

    /// Derive alerts from `snapshot` as of `today` and publish them.
    pub fn recompute(&self, snapshot: &FleetSnapshot, today: NaiveDate) -> Arc<AlertBoard> {
        let generation = self.next_generation();
        self.publish(generation, snapshot, today)
    }

    /// Derive and publish a board for a snapshot loaded under `generation`.
    ///
    /// Returns the board now current. If a newer generation was published in
    /// the meantime, that board is kept and returned instead.
    pub fn publish(
        &self,
        generation: u64,
        snapshot: &FleetSnapshot,
        today: NaiveDate,
    ) -> Arc<AlertBoard> {
        let options = AlertOptions::new(today).with_look_ahead(self.look_ahead_days);
        let alerts = derive_maintenance_alerts(
            &snapshot.vehicles,
            &snapshot.maintenance,
            &snapshot.readings,
            &options,
        );

        let board = Arc::new(AlertBoard {
            alerts,
            computed_for: Some(today),
            look_ahead_days: self.look_ahead_days,
            generated_at: Some(format_utc_rfc3339(chrono::Utc::now())),
            generation,
        });

        let mut previous = None;
        self.board.send_if_modified(|current| {
            if generation <= current.generation {
                return false;
            }
            previous = Some(std::mem::replace(current, board.clone()));
            true
        });

        let Some(previous) = previous else {
            tracing::debug!(generation, "Discarding alert board from an older snapshot");
            return self.latest();
        };

        let previously_urgent: HashSet<(&str, MaintenanceType)> = previous
            .alerts
            .iter()
            .filter(|a| a.urgent)
            .map(|a| (a.vehicle_id.as_str(), a.maintenance_type))
            .collect();

        for alert in board.alerts.iter().filter(|a| {
            a.urgent && !previously_urgent.contains(&(a.vehicle_id.as_str(), a.maintenance_type))
        }) {
            tracing::warn!(
                vehicle_id = %alert.vehicle_id,
                vehicle = %alert.vehicle_name,
                maintenance_type = ?alert.maintenance_type,
                reasons = ?alert.reasons,
                days_remaining = ?alert.days_remaining,
                "Maintenance now overdue"
            );
        }

        tracing::info!(
            today = %today,
            urgent = board.urgent_count(),
            upcoming = board.upcoming_count(),
            "Maintenance alerts recomputed"
        );

        board
    }

    /// Reload the snapshot from the store and recompute as of the local date.
    pub async fn refresh(&self, db: &FirestoreDb) -> Result<Arc<AlertBoard>, AppError> {
        let generation = self.next_generation();
        let snapshot = db.load_fleet_snapshot().await?;
        Ok(self.publish(
            generation,
            &snapshot,
            chrono::Local::now().date_naive(),
        ))
    }

    /// Start recomputing whenever an alert source collection changes.
    ///
    /// Runs one refresh immediately. The returned handle stops the task and
    /// drops the subscriptions when dropped.
    pub fn spawn(&self, db: FirestoreDb) -> MonitorHandle {
        let wake = Arc::new(Notify::new());

        let subscriptions = collections::ALERT_SOURCES
            .iter()
            .map(|collection| {
                let wake = wake.clone();
                db.changes().subscribe(collection, move |_| wake.notify_one())
            })
            .collect();

        let monitor = self.clone();
        let task = tokio::spawn(async move {
            loop {
                if let Err(e) = monitor.refresh(&db).await {
                    tracing::warn!(error = %e, "Failed to refresh maintenance alerts, keeping previous board");
                }
                wake.notified().await;
            }
        });

        tracing::info!(
            look_ahead_days = self.look_ahead_days,
            "Alert monitor started"
        );

        MonitorHandle {
            task,
            _subscriptions: subscriptions,
        }
    }
}

/// Keeps the monitor task and its change subscriptions alive.
pub struct MonitorHandle {
    task: JoinHandle<()>,
    _subscriptions: Vec<Subscription>,
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaintenanceEntry, MaintenanceStatus, Vehicle, VehicleStatus, VehicleType};

    fn snapshot_with_hours(hours: f64) -> FleetSnapshot {
        let vehicle = Vehicle {
            id: "v1".to_string(),
            name: "Tracteur".to_string(),
            vehicle_type: VehicleType::Tractor,
            odometer_km: None,
            engine_hours: Some(hours),
            odometer_updated_on: None,
            hours_updated_on: None,
            next_inspection_date: None,
            status: VehicleStatus::Active,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let entry = MaintenanceEntry {
            id: "e1".to_string(),
            vehicle_id: "v1".to_string(),
            maintenance_type: MaintenanceType::Overhaul,
            status: MaintenanceStatus::Done,
            performed_date: Some("2024-01-10".to_string()),
            planned_date: None,
            next_due_km: None,
            next_due_hours: Some(500.0),
            next_due_date: Some("2024-10-01".to_string()),
            description: None,
            cost: None,
            odometer_at_service: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        FleetSnapshot {
            vehicles: vec![vehicle],
            maintenance: vec![entry],
            readings: vec![],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 15).unwrap()
    }

    #[test]
    fn test_starts_with_empty_board() {
        let monitor = AlertMonitor::new(30);
        let board = monitor.latest();

        assert!(board.alerts.is_empty());
        assert_eq!(board.computed_for, None);
        assert_eq!(board.look_ahead_days, 30);
    }

    #[test]
    fn test_recompute_publishes_board() {
        let monitor = AlertMonitor::new(30);
        let mut receiver = monitor.subscribe();

        monitor.recompute(&snapshot_with_hours(450.0), today());
        assert!(receiver.has_changed().unwrap());
        let board = receiver.borrow_and_update().clone();
        assert_eq!(board.alerts.len(), 1);
        assert_eq!(board.urgent_count(), 0);
        assert_eq!(board.upcoming_count(), 1);
        assert_eq!(board.computed_for, Some(today()));

        monitor.recompute(&snapshot_with_hours(520.0), today());
        let board = monitor.latest();
        assert_eq!(board.urgent_count(), 1);
    }

    #[test]
    fn test_look_ahead_is_applied() {
        let monitor = AlertMonitor::new(7);

        // Date is 16 days out and hours are under the threshold.
        let board = monitor.recompute(&snapshot_with_hours(100.0), today());

        assert!(board.alerts.is_empty());
        assert_eq!(board.look_ahead_days, 7);
    }

    #[test]
    fn test_older_generation_does_not_replace_newer_board() {
        let monitor = AlertMonitor::new(30);

        // Load A starts first but finishes after load B.
        let older = monitor.next_generation();
        let newer = monitor.next_generation();

        let published = monitor.publish(newer, &snapshot_with_hours(520.0), today());
        assert_eq!(published.urgent_count(), 1);

        let mut receiver = monitor.subscribe();
        let kept = monitor.publish(older, &snapshot_with_hours(100.0), today());

        assert!(!receiver.has_changed().unwrap());
        assert_eq!(kept.generation, newer);
        assert_eq!(monitor.latest().urgent_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_subscribes_to_alert_sources() {
        let db = FirestoreDb::new_mock();
        let monitor = AlertMonitor::new(30);

        let handle = monitor.spawn(db.clone());
        assert_eq!(db.changes().subscriber_count(), 3);

        drop(handle);
        assert_eq!(db.changes().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_offline_keeps_previous_board() {
        let db = FirestoreDb::new_mock();
        let monitor = AlertMonitor::new(30);
        monitor.recompute(&snapshot_with_hours(520.0), today());

        assert!(monitor.refresh(&db).await.is_err());
        assert_eq!(monitor.latest().urgent_count(), 1);
    }
}
