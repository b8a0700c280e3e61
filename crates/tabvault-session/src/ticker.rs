// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task that drives [`TabSession::tick`] on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::TabSession;

/// Spawn the ticker. It holds the session lock only for the duration of one
/// tick, so UI calls interleave between ticks but never within one.
pub fn spawn_ticker(
    session: Arc<Mutex<TabSession>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = session.lock().await.tick().await;
                    if let Some(version) = report.rotated_to {
                        info!(key_version = version, "background key rotation");
                    }
                    if report.session_valid == Some(false) {
                        info!("session invalidated by background validation");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("session ticker shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use secrecy::SecretString;
    use tabvault_config::TabVaultConfig;
    use tabvault_core::{ManualClock, StaticHost, TabHost};
    use tabvault_security::RedactionList;
    use tabvault_storage::MemoryStore;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticker_rotates_and_stops_on_cancel() {
        let clock = Arc::new(ManualClock::starting_now());
        let host = TabHost {
            ephemeral: Arc::new(MemoryStore::new()),
            persistent: Arc::new(MemoryStore::new()),
            clock: clock.clone(),
            env: Arc::new(StaticHost::new("test-agent")),
        };
        let mut config = TabVaultConfig::default();
        config.vault.kdf_iterations = 1_000;
        let session = Arc::new(Mutex::new(TabSession::open(
            host,
            config,
            RedactionList::new(),
        )));
        session
            .lock()
            .await
            .store("alice", SecretString::from("abc123".to_string()))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_ticker(session.clone(), Duration::from_secs(1), cancel.clone());

        clock.advance(TimeDelta::minutes(61));
        let mut rotated = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let status = session.lock().await.status().unwrap();
            if status.is_some_and(|s| s.key_version == 2) {
                rotated = true;
                break;
            }
        }
        assert!(rotated);

        cancel.cancel();
        handle.await.unwrap();
    }
}
