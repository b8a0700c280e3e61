// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for TabVault integration tests.
//!
//! [`TestHarness`] assembles a complete tab session over in-memory stores,
//! a manual clock and a scriptable host, with a fast KDF.

pub mod harness;

pub use harness::{TEST_KDF_ITERATIONS, TEST_USER_AGENT, TestHarness, TestHarnessBuilder};
