use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::Result;
use crate::models::Sport;

/// Runs the full refresh pipeline for every sport on a fixed interval.
/// Each sport gets its own in-process mutex so two overlapping refreshes
/// of the *same* sport can never run concurrently (the staging table
/// would otherwise be clobbered), while different sports refresh freely
/// in parallel. This replaces the persisted `RefreshMetadata` row the
/// original kept — there is no durable "is a refresh running" flag,
/// only this process's own lock table.
pub struct Scheduler {
    locks: HashMap<Sport, Arc<Mutex<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let locks = Sport::ALL
            .into_iter()
            .map(|sport| (sport, Arc::new(Mutex::new(()))))
            .collect();
        Self { locks }
    }

    /// Runs `refresh` for `sport`, serialised against any other in-flight
    /// refresh of the same sport. Returns `false` without running
    /// anything if a refresh for this sport is already in progress.
    pub async fn run_once<F, Fut>(&self, sport: Sport, refresh: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<usize>>,
    {
        let lock = self
            .locks
            .get(&sport)
            .expect("every sport has a lock entry")
            .clone();

        let Ok(_guard) = lock.try_lock() else {
            info!(sport = %sport, "skipping refresh, one is already in progress");
            return Ok(false);
        };

        match refresh().await {
            Ok(slot_count) => {
                info!(sport = %sport, slot_count, "refresh completed");
                Ok(true)
            }
            Err(error) => {
                error!(sport = %sport, error = %error, "refresh failed");
                Err(error)
            }
        }
    }

    pub async fn run_forever<F, Fut>(&self, settings: &Settings, mut refresh: F)
    where
        F: FnMut(Sport) -> Fut,
        Fut: std::future::Future<Output = Result<usize>>,
    {
        let mut interval = tokio::time::interval(settings.schedule_interval);
        loop {
            interval.tick().await;
            for sport in Sport::ALL {
                if let Err(error) = self.run_once(sport, || refresh(sport)).await {
                    error!(sport = %sport, error = %error, "scheduled refresh failed, continuing with other sports");
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
