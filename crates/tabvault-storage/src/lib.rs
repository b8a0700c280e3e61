// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage layer for the TabVault credential vault.
//!
//! The vault only ever talks to a [`tabvault_core::KeyValueStore`]; this
//! crate provides the key layout shared by every component and the
//! in-memory implementation used for a single tab.

pub mod keys;
pub mod memory;

pub use keys::StorageKeys;
pub use memory::MemoryStore;
