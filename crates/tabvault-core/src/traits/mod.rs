// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the vault and the page that hosts it.

pub mod clock;
pub mod host;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use host::{HostEnvironment, StaticHost};
pub use store::KeyValueStore;
