// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST). Each test uses its own vehicle IDs so they
//! can share one emulator instance.

use farm_fleet::error::AppError;
use farm_fleet::models::{
    MaintenanceEntry, MaintenanceStatus, MaintenanceType, MeterReading, ReadingType, Vehicle,
    VehicleStatus, VehicleType,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use farm_fleet::services::{AlertMonitor, ChangeKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::test_db;

/// Generate a unique ID for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn test_vehicle(id: &str) -> Vehicle {
    Vehicle {
        id: id.to_string(),
        name: "Tracteur test".to_string(),
        vehicle_type: VehicleType::Tractor,
        odometer_km: None,
        engine_hours: Some(480.0),
        odometer_updated_on: None,
        hours_updated_on: Some("2024-09-01".to_string()),
        next_inspection_date: None,
        status: VehicleStatus::Active,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

fn test_entry(vehicle_id: &str, next_due_hours: f64) -> MaintenanceEntry {
    MaintenanceEntry {
        id: unique_id("entry"),
        vehicle_id: vehicle_id.to_string(),
        maintenance_type: MaintenanceType::Overhaul,
        status: MaintenanceStatus::Done,
        performed_date: Some("2024-01-10".to_string()),
        planned_date: None,
        next_due_km: None,
        next_due_hours: Some(next_due_hours),
        next_due_date: None,
        description: Some("Révision annuelle".to_string()),
        cost: Some(350.0),
        odometer_at_service: None,
        created_at: "2024-01-10T00:00:00Z".to_string(),
        updated_at: "2024-01-10T00:00:00Z".to_string(),
    }
}

fn hours_reading(vehicle_id: &str, value: f64, date: &str) -> MeterReading {
    MeterReading {
        id: unique_id("reading"),
        vehicle_id: vehicle_id.to_string(),
        reading_type: ReadingType::Hours,
        value,
        date: date.to_string(),
        created_at: "2024-09-10T08:00:00Z".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VEHICLE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_vehicle_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");

    assert!(db.get_vehicle(&id).await.unwrap().is_none());

    let vehicle = test_vehicle(&id);
    db.upsert_vehicle(&vehicle, ChangeKind::Created).await.unwrap();

    let fetched = db.get_vehicle(&id).await.unwrap().expect("vehicle exists");
    assert_eq!(fetched, vehicle);
}

#[tokio::test]
async fn test_delete_vehicle_cascades() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");

    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();
    db.upsert_maintenance(&test_entry(&id, 500.0), ChangeKind::Created)
        .await
        .unwrap();
    db.record_meter_reading(&hours_reading(&id, 490.0, "2024-09-10"))
        .await
        .unwrap();

    let deleted = db.delete_vehicle(&id).await.unwrap();
    assert_eq!(deleted, 3);

    assert!(db.get_vehicle(&id).await.unwrap().is_none());
    assert!(db.list_maintenance(Some(&id)).await.unwrap().is_empty());
    assert!(db.list_meter_readings(Some(&id)).await.unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// METER READING TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_reading_updates_snapshot() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();

    let vehicle = db
        .record_meter_reading(&hours_reading(&id, 512.5, "2024-09-10"))
        .await
        .unwrap();
    assert_eq!(vehicle.engine_hours, Some(512.5));
    assert_eq!(vehicle.hours_updated_on.as_deref(), Some("2024-09-10"));

    let stored = db.get_vehicle(&id).await.unwrap().unwrap();
    assert_eq!(stored.engine_hours, Some(512.5));
}

#[tokio::test]
async fn test_backdated_reading_is_logged_only() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();

    let vehicle = db
        .record_meter_reading(&hours_reading(&id, 300.0, "2024-03-01"))
        .await
        .unwrap();
    assert_eq!(vehicle.engine_hours, Some(480.0));

    let readings = db.list_meter_readings(Some(&id)).await.unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].value, 300.0);
}

#[tokio::test]
async fn test_reading_for_unknown_vehicle() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("missing");

    let result = db
        .record_meter_reading(&hours_reading(&id, 10.0, "2024-09-10"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(db.list_meter_readings(Some(&id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reading_does_not_recreate_deleted_vehicle() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();

    // Whichever commits first, the vehicle must end up gone
    let reading = hours_reading(&id, 520.0, "2024-09-12");
    let (deleted, recorded) =
        tokio::join!(db.delete_vehicle(&id), db.record_meter_reading(&reading));
    deleted.unwrap();
    if let Err(e) = recorded {
        assert!(matches!(e, AppError::NotFound(_)), "unexpected error {:?}", e);
    }

    assert!(db.get_vehicle(&id).await.unwrap().is_none());

    let late = db
        .record_meter_reading(&hours_reading(&id, 530.0, "2024-09-13"))
        .await;
    assert!(matches!(late, Err(AppError::NotFound(_))));
    assert!(db.get_vehicle(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_readings_both_kept() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    let mut vehicle = test_vehicle(&id);
    vehicle.odometer_km = Some(12_000.0);
    vehicle.odometer_updated_on = Some("2024-09-01".to_string());
    db.upsert_vehicle(&vehicle, ChangeKind::Created).await.unwrap();

    let hours = hours_reading(&id, 510.0, "2024-09-12");
    let odometer = MeterReading {
        reading_type: ReadingType::Odometer,
        value: 12_400.0,
        ..hours_reading(&id, 0.0, "2024-09-12")
    };

    let (first, second) = tokio::join!(
        db.record_meter_reading(&hours),
        db.record_meter_reading(&odometer)
    );
    first.unwrap();
    second.unwrap();

    let stored = db.get_vehicle(&id).await.unwrap().unwrap();
    assert_eq!(stored.engine_hours, Some(510.0));
    assert_eq!(stored.odometer_km, Some(12_400.0));
    assert_eq!(db.list_meter_readings(Some(&id)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_writes_publish_changes() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let _subscription = db.changes().subscribe("vehicules", move |event| {
        if event.kind == ChangeKind::Updated {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();
    db.record_meter_reading(&hours_reading(&id, 600.0, "2024-09-12"))
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// ALERT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_sees_new_reading() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();
    db.upsert_maintenance(&test_entry(&id, 500.0), ChangeKind::Created)
        .await
        .unwrap();

    let monitor = AlertMonitor::new(30);
    let board = monitor.refresh(&db).await.unwrap();
    assert!(!board.alerts.iter().any(|a| a.vehicle_id == id));

    db.record_meter_reading(&hours_reading(&id, 505.0, "2024-09-12"))
        .await
        .unwrap();

    let board = monitor.refresh(&db).await.unwrap();
    let alert = board
        .alerts
        .iter()
        .find(|a| a.vehicle_id == id)
        .expect("hours threshold reached");
    assert!(alert.urgent);
    assert_eq!(alert.current_hours, Some(505.0));
}

#[tokio::test]
async fn test_spawned_monitor_publishes_after_reading() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("vehicle");
    db.upsert_vehicle(&test_vehicle(&id), ChangeKind::Created)
        .await
        .unwrap();
    db.upsert_maintenance(&test_entry(&id, 500.0), ChangeKind::Created)
        .await
        .unwrap();

    let monitor = AlertMonitor::new(30);
    let mut receiver = monitor.subscribe();
    let _handle = monitor.spawn(db.clone());

    // Initial board, before the threshold is crossed
    let initial = tokio::time::timeout(
        Duration::from_secs(10),
        receiver.wait_for(|board| board.computed_for.is_some()),
    )
    .await
    .expect("initial board published")
    .expect("monitor running")
    .clone();
    assert!(!initial.alerts.iter().any(|a| a.vehicle_id == id));

    db.record_meter_reading(&hours_reading(&id, 505.0, "2024-09-12"))
        .await
        .unwrap();

    let board = tokio::time::timeout(
        Duration::from_secs(10),
        receiver.wait_for(|board| board.alerts.iter().any(|a| a.vehicle_id == id)),
    )
    .await
    .expect("board republished after reading")
    .expect("monitor running")
    .clone();

    let alert = board
        .alerts
        .iter()
        .find(|a| a.vehicle_id == id)
        .expect("hours threshold reached");
    assert!(alert.urgent);
    assert_eq!(alert.current_hours, Some(505.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// MAINTENANCE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_missing_maintenance_is_not_found() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("entry");

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let _subscription = db.changes().subscribe("entretiens", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = db.delete_maintenance(&id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    // Existing entries still delete and publish once
    let entry = test_entry(&unique_id("vehicle"), 500.0);
    db.upsert_maintenance(&entry, ChangeKind::Created).await.unwrap();
    db.delete_maintenance(&entry.id).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(db.get_maintenance(&entry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_maintenance_route() {
    require_emulator!();

    let (app, state) = common::create_test_app_with_db(test_db().await);
    let token = common::create_test_jwt("ferme", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/maintenance/{}", unique_id("entry")))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
