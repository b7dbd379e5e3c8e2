// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod alert_monitor;
pub mod alerts;
pub mod change_feed;

pub use alert_monitor::{AlertBoard, AlertMonitor, MonitorHandle};
pub use alerts::{derive_maintenance_alerts, AlertOptions, DEFAULT_LOOK_AHEAD_DAYS};
pub use change_feed::{ChangeEvent, ChangeFeed, ChangeKind, Subscription};
