// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Vehicles (fleet records with denormalized meter snapshot)
//! - Maintenance entries (service history and next-due thresholds)
//! - Meter readings (append-only odometer/hours log)
//!
//! Every successful write is published on the shared [`ChangeFeed`].

use crate::db::collections;
use crate::error::AppError;
use crate::models::{FleetSnapshot, MaintenanceEntry, MeterReading, Vehicle};
use crate::services::change_feed::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::time_utils::format_utc_rfc3339;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreWritePrecondition};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Attempts for a transaction aborted by a concurrent write.
const MAX_TRANSACTION_ATTEMPTS: usize = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    changes: ChangeFeed,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            changes: ChangeFeed::new(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            changes: ChangeFeed::new(),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            changes: ChangeFeed::new(),
        }
    }

    /// Change notifications for writes made through this client.
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn notify(&self, collection: &str, document_id: &str, kind: ChangeKind) {
        self.changes
            .publish(ChangeEvent::new(collection, document_id, kind));
    }

    // ─── Vehicle Operations ──────────────────────────────────────

    /// List every vehicle in the fleet.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::VEHICLES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VEHICLES)
            .obj()
            .one(vehicle_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a vehicle.
    pub async fn upsert_vehicle(&self, vehicle: &Vehicle, kind: ChangeKind) -> Result<(), AppError> {
        let _: Vehicle = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VEHICLES)
            .document_id(&vehicle.id)
            .object(vehicle)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.notify(collections::VEHICLES, &vehicle.id, kind);
        Ok(())
    }

    /// Delete a vehicle together with its maintenance entries and readings.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_vehicle(&self, vehicle_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Maintenance history
        let entries = self.list_maintenance(Some(vehicle_id)).await?;
        self.batch_delete(&entries, collections::MAINTENANCE, |e: &MaintenanceEntry| {
            e.id.clone()
        })
        .await?;
        deleted_count += entries.len();
        tracing::debug!(vehicle_id, count = entries.len(), "Deleted maintenance entries");

        // 2. Meter readings
        let readings = self.list_meter_readings(Some(vehicle_id)).await?;
        self.batch_delete(&readings, collections::METER_READINGS, |r: &MeterReading| {
            r.id.clone()
        })
        .await?;
        deleted_count += readings.len();
        tracing::debug!(vehicle_id, count = readings.len(), "Deleted meter readings");

        // 3. The vehicle itself
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::VEHICLES)
            .document_id(vehicle_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;
        self.notify(collections::VEHICLES, vehicle_id, ChangeKind::Deleted);

        tracing::info!(vehicle_id, deleted_count, "Vehicle deletion complete");
        Ok(deleted_count)
    }

    // ─── Maintenance Operations ──────────────────────────────────

    /// List maintenance entries, optionally restricted to one vehicle.
    pub async fn list_maintenance(
        &self,
        vehicle_id: Option<&str>,
    ) -> Result<Vec<MaintenanceEntry>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::MAINTENANCE);

        let result = if let Some(vehicle_id) = vehicle_id {
            query
                .filter(|q| q.for_all([q.field("vehiculeId").eq(vehicle_id)]))
                .obj()
                .query()
                .await
        } else {
            query.obj().query().await
        };

        result.map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_maintenance(
        &self,
        entry_id: &str,
    ) -> Result<Option<MaintenanceEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MAINTENANCE)
            .obj()
            .one(entry_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a maintenance entry.
    pub async fn upsert_maintenance(
        &self,
        entry: &MaintenanceEntry,
        kind: ChangeKind,
    ) -> Result<(), AppError> {
        let _: MaintenanceEntry = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MAINTENANCE)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.notify(collections::MAINTENANCE, &entry.id, kind);
        Ok(())
    }

    /// Delete a maintenance entry. A missing entry is `NotFound` and
    /// publishes nothing.
    pub async fn delete_maintenance(&self, entry_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::MAINTENANCE)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(entry_id)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataNotFoundError(_) => {
                    AppError::NotFound(format!("Maintenance entry {} not found", entry_id))
                }
                e => AppError::Database(e.to_string()),
            })?;

        self.notify(collections::MAINTENANCE, entry_id, ChangeKind::Deleted);
        Ok(())
    }

    // ─── Meter Reading Operations ────────────────────────────────

    /// List meter readings, newest first, optionally for one vehicle.
    pub async fn list_meter_readings(
        &self,
        vehicle_id: Option<&str>,
    ) -> Result<Vec<MeterReading>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::METER_READINGS);

        let result = if let Some(vehicle_id) = vehicle_id {
            query
                .filter(|q| q.for_all([q.field("vehiculeId").eq(vehicle_id)]))
                .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
        } else {
            query
                .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
        };

        result.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a meter reading and fold it into the vehicle's snapshot.
    ///
    /// The vehicle is read inside the transaction, so a concurrent write to
    /// it aborts the commit instead of being overwritten; the whole attempt
    /// is then retried. The vehicle update requires the document to still
    /// exist, so a vehicle deleted meanwhile is `NotFound`, never recreated.
    /// Returns the vehicle as written.
    pub async fn record_meter_reading(&self, reading: &MeterReading) -> Result<Vehicle, AppError> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let Some((vehicle, snapshot_changed)) = self.try_record_meter_reading(reading).await?
            else {
                tracing::warn!(
                    vehicle_id = %reading.vehicle_id,
                    attempt,
                    "Meter reading transaction contended, retrying"
                );
                continue;
            };

            tracing::info!(
                vehicle_id = %vehicle.id,
                reading_id = %reading.id,
                reading_type = ?reading.reading_type,
                value = reading.value,
                snapshot_changed,
                "Meter reading recorded"
            );

            self.notify(collections::METER_READINGS, &reading.id, ChangeKind::Created);
            if snapshot_changed {
                self.notify(collections::VEHICLES, &vehicle.id, ChangeKind::Updated);
            }
            return Ok(vehicle);
        }

        Err(AppError::Database(format!(
            "Meter reading for vehicle {} still contended after {} attempts",
            reading.vehicle_id, MAX_TRANSACTION_ATTEMPTS
        )))
    }

    /// One transactional attempt. `Ok(None)` means the commit was aborted by
    /// a conflicting write and may be retried.
    async fn try_record_meter_reading(
        &self,
        reading: &MeterReading,
    ) -> Result<Option<(Vehicle, bool)>, AppError> {
        let client = self.get_client()?;
        let now = format_utc_rfc3339(chrono::Utc::now());

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Read the vehicle through the transaction (registers it for conflict detection)
        let vehicle: Option<Vehicle> = client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::VEHICLES)
            .obj()
            .one(&reading.vehicle_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read vehicle in transaction: {}", e))
            })?;

        let Some(mut vehicle) = vehicle else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Vehicle {} not found",
                reading.vehicle_id
            )));
        };

        // 2. Append the reading
        client
            .fluent()
            .update()
            .in_col(collections::METER_READINGS)
            .document_id(&reading.id)
            .object(reading)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add reading to transaction: {}", e))
            })?;

        // 3. Update the snapshot if the reading is current
        let snapshot_changed = vehicle.apply_reading(reading, &now);
        if snapshot_changed {
            client
                .fluent()
                .update()
                .in_col(collections::VEHICLES)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(&vehicle.id)
                .object(&vehicle)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add vehicle to transaction: {}", e))
                })?;
        }

        // 4. Commit
        match transaction.commit().await {
            Ok(_) => Ok(Some((vehicle, snapshot_changed))),
            Err(FirestoreError::DatabaseError(ref e)) if e.retry_possible => Ok(None),
            Err(FirestoreError::DataNotFoundError(_)) => Err(AppError::NotFound(format!(
                "Vehicle {} not found",
                reading.vehicle_id
            ))),
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }

    // ─── Snapshot ────────────────────────────────────────────────

    /// Load the three alert source collections concurrently.
    ///
    /// There is no cross-collection consistency: an entry may reference a
    /// vehicle deleted between the reads.
    pub async fn load_fleet_snapshot(&self) -> Result<FleetSnapshot, AppError> {
        let (vehicles, maintenance, readings) = tokio::try_join!(
            self.list_vehicles(),
            self.list_maintenance(None),
            self.list_meter_readings(None),
        )?;

        Ok(FleetSnapshot {
            vehicles,
            maintenance,
            readings,
        })
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Batch delete documents using transactions, then publish each deletion.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;

            for item in chunk {
                self.notify(collection, &id_extractor(item), ChangeKind::Deleted);
            }
        }

        Ok(())
    }
}
