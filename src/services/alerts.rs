// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance alert derivation.
//!
//! Turns the fleet, its maintenance history and its meter readings into the
//! list of services that are due or overdue. Pure: no I/O, no clock. The
//! caller injects `today` and decides when to recompute.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{
    AlertReason, MaintenanceAlert, MaintenanceEntry, MaintenanceStatus, MaintenanceType,
    MeterReading, ReadingType, Vehicle,
};
use crate::time_utils::{days_until, parse_day, parse_opt_day};

/// Default window for "approaching" date thresholds.
pub const DEFAULT_LOOK_AHEAD_DAYS: u32 = 30;

/// Parameters of a derivation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertOptions {
    pub today: NaiveDate,
    /// Date thresholds this many days out (or fewer) raise an alert
    pub look_ahead_days: u32,
}

impl AlertOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            look_ahead_days: DEFAULT_LOOK_AHEAD_DAYS,
        }
    }

    pub fn with_look_ahead(mut self, days: u32) -> Self {
        self.look_ahead_days = days;
        self
    }
}

/// Derive the current maintenance alerts for the fleet.
///
/// For every (vehicle, maintenance type) pair, only the most recently
/// completed entry holds the active threshold; older completed entries are
/// superseded even when the newest one carries no threshold at all.
///
/// Entries pointing at unknown vehicles and unparsable dates are ignored.
/// Output is sorted urgent first, then by ascending days remaining (alerts
/// without a date threshold last), then by vehicle and type.
pub fn derive_maintenance_alerts(
    vehicles: &[Vehicle],
    entries: &[MaintenanceEntry],
    readings: &[MeterReading],
    options: &AlertOptions,
) -> Vec<MaintenanceAlert> {
    let vehicles_by_id: HashMap<&str, &Vehicle> =
        vehicles.iter().map(|v| (v.id.as_str(), v)).collect();

    let mut holders: BTreeMap<(&str, MaintenanceType), &MaintenanceEntry> = BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.status == MaintenanceStatus::Done)
    {
        holders
            .entry((entry.vehicle_id.as_str(), entry.maintenance_type))
            .and_modify(|current| {
                if completion_key(entry) > completion_key(current) {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    let latest_readings = latest_readings(readings);

    let mut alerts: Vec<MaintenanceAlert> = holders
        .into_iter()
        .filter(|(_, holder)| holder.has_next_due())
        .filter_map(|((vehicle_id, _), holder)| {
            let vehicle = vehicles_by_id.get(vehicle_id)?;
            evaluate(vehicle, holder, &latest_readings, options)
        })
        .collect();

    alerts.sort_by(compare_alerts);
    alerts
}

/// Ordering key for "most recently completed": performed date, falling back
/// to the planned date, then entry id so ties resolve the same way every run.
fn completion_key(entry: &MaintenanceEntry) -> (Option<NaiveDate>, &str) {
    let day = parse_opt_day(entry.performed_date.as_deref())
        .or_else(|| parse_opt_day(entry.planned_date.as_deref()));
    (day, entry.id.as_str())
}

type LatestReadings<'a> = HashMap<(&'a str, ReadingType), (NaiveDate, f64)>;

/// Most recent dated reading per (vehicle, meter). Same-day readings keep the
/// highest value.
fn latest_readings(readings: &[MeterReading]) -> LatestReadings<'_> {
    let mut latest: LatestReadings<'_> = HashMap::new();

    for reading in readings {
        let Some(day) = parse_day(&reading.date) else {
            continue;
        };
        if !reading.value.is_finite() {
            continue;
        }

        latest
            .entry((reading.vehicle_id.as_str(), reading.reading_type))
            .and_modify(|(best_day, best_value)| {
                if (day, reading.value) > (*best_day, *best_value) {
                    *best_day = day;
                    *best_value = reading.value;
                }
            })
            .or_insert((day, reading.value));
    }

    latest
}

/// Latest known meter value: the vehicle's snapshot, unless a reading dated
/// after the snapshot exists (or the snapshot is undated or missing).
fn current_meter(
    vehicle: &Vehicle,
    reading_type: ReadingType,
    latest: &LatestReadings<'_>,
) -> Option<f64> {
    let (snapshot, snapshot_day) = vehicle.meter(reading_type);
    let snapshot_day = parse_opt_day(snapshot_day);

    match latest.get(&(vehicle.id.as_str(), reading_type)) {
        Some(&(day, reading))
            if snapshot.is_none() || snapshot_day.map_or(true, |snapshot_day| day > snapshot_day) =>
        {
            Some(reading)
        }
        _ => snapshot,
    }
}

fn evaluate(
    vehicle: &Vehicle,
    holder: &MaintenanceEntry,
    latest: &LatestReadings<'_>,
    options: &AlertOptions,
) -> Option<MaintenanceAlert> {
    let current_km = current_meter(vehicle, ReadingType::Odometer, latest);
    let current_hours = current_meter(vehicle, ReadingType::Hours, latest);
    let target_date = parse_opt_day(holder.next_due_date.as_deref());
    let days_remaining = target_date.map(|date| days_until(options.today, date));

    let mut reasons = Vec::new();

    if threshold_reached(current_km, holder.next_due_km) {
        reasons.push(AlertReason::KmExceeded);
    }
    if threshold_reached(current_hours, holder.next_due_hours) {
        reasons.push(AlertReason::HoursExceeded);
    }
    if days_remaining.is_some_and(|days| days <= i64::from(options.look_ahead_days)) {
        reasons.push(AlertReason::DateDue);
    }

    if reasons.is_empty() {
        return None;
    }

    // Any exceeded meter is already over the limit. A date is only urgent once
    // it has actually passed, not while it is merely approaching.
    let urgent = reasons.contains(&AlertReason::KmExceeded)
        || reasons.contains(&AlertReason::HoursExceeded)
        || days_remaining.is_some_and(|days| days < 0);

    Some(MaintenanceAlert {
        vehicle_id: vehicle.id.clone(),
        vehicle_name: vehicle.name.clone(),
        maintenance_type: holder.maintenance_type,
        entry_id: holder.id.clone(),
        reasons,
        current_km,
        target_km: holder.next_due_km,
        current_hours,
        target_hours: holder.next_due_hours,
        target_date,
        days_remaining,
        urgent,
    })
}

fn threshold_reached(current: Option<f64>, target: Option<f64>) -> bool {
    matches!((current, target), (Some(current), Some(target)) if current >= target)
}

fn compare_alerts(a: &MaintenanceAlert, b: &MaintenanceAlert) -> Ordering {
    b.urgent
        .cmp(&a.urgent)
        .then_with(|| match (a.days_remaining, b.days_remaining) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
        .then_with(|| a.maintenance_type.cmp(&b.maintenance_type))
}
