// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent-wide configuration constants - single source of truth.
//! **NEVER hardcode these elsewhere!**

/// Capacity of the execution input queue (EXECSETs plus direct targets).
pub const EXECS_QUEUE_CAP: usize = 64;

/// Capacity of the reporting (egress) queue.
pub const RPTGS_QUEUE_CAP: usize = 64;

/// Re-check cadence for `wait-cond` while its condition is falsy, in
/// milliseconds.
pub const WAIT_COND_POLL_MS: i64 = 1000;

/// Upper bound on per-alarm severity history entries.
pub const ALARM_HISTORY_MAX: usize = 16;

/// Worker thread names.
pub const INGRESS_THREAD_NAME: &str = "refda-ingress";
pub const EGRESS_THREAD_NAME: &str = "refda-egress";
pub const EXEC_THREAD_NAME: &str = "refda-exec";

/// Poll period used by transports to observe the daemon running flag while
/// blocked in receive, in milliseconds.
pub const TRANSPORT_POLL_MS: u64 = 100;

/// Reported software vendor string.
pub const SW_VENDOR: &str = "JHU/APL";

/// Reported software version string.
pub const SW_VERSION: &str = env!("CARGO_PKG_VERSION");
