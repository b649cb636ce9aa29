// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orc-storage: the persister (C8) — incremental, idempotent writes of
//! execution telemetry through the `GraphStore` interface.

pub mod persister;

pub use persister::{PersistError, Persister};
