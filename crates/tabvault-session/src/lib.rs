// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tab session lifecycle for the TabVault credential vault.
//!
//! - [`TabSession`]: store/retrieve/clear/status plus the security report.
//! - [`Scheduler`]: which periodic checks are due, by an injectable clock.
//! - [`spawn_ticker`]: runs the due checks in the background.

pub mod scheduler;
pub mod session;
pub mod ticker;

pub use scheduler::{PeriodicTask, Scheduler};
pub use session::{TabSession, TickReport};
pub use ticker::spawn_ticker;
