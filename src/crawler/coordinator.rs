//! Run coordinator - scrape scheduling and orchestration
//!
//! This module contains the background scraper that:
//! - Decides when a run is due (minimum interval, urgent override)
//! - Fans a run out to one worker task per source
//! - Stores each source's listings and records the run in history
//! - Drives the periodic background loop and its graceful shutdown

use crate::config::ScheduleConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::flags::RunFlags;
use crate::crawler::traversal::CrawlContext;
use crate::model::Agency;
use crate::sources::Source;
use crate::storage::{ArtifactStore, SharedStorage, Storage};
use crate::HomefinderError;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Periodic, non-overlapping scraper over a fixed set of sources
pub struct BackgroundScraper {
    sources: Vec<Arc<dyn Source>>,
    storage: SharedStorage,
    fetcher: Fetcher,
    artifacts: Arc<dyn ArtifactStore>,
    schedule: ScheduleConfig,
    max_pages: u32,
    flags: RunFlags,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundScraper {
    /// Creates a new scraper and seeds the agency records of its sources
    ///
    /// # Arguments
    ///
    /// * `sources` - The sources scraped on every run
    /// * `storage` - Listing store shared with the worker tasks
    /// * `fetcher` - HTTP fetcher used by every traversal
    /// * `artifacts` - Store for raw detail-page markup
    /// * `schedule` - Loop timing
    /// * `max_pages` - Index page cap per source and run
    pub fn new(
        sources: Vec<Arc<dyn Source>>,
        storage: SharedStorage,
        fetcher: Fetcher,
        artifacts: Arc<dyn ArtifactStore>,
        schedule: ScheduleConfig,
        max_pages: u32,
    ) -> Self {
        let agencies: Vec<Agency> = sources.iter().map(|s| s.agency()).collect();
        match storage.lock() {
            Ok(mut guard) => {
                if let Err(e) = guard.seed_agencies(&agencies) {
                    tracing::warn!("Failed to seed agencies: {}", e);
                }
            }
            Err(_) => tracing::warn!("Storage lock poisoned, agencies not seeded"),
        }

        Self {
            sources,
            storage,
            fetcher,
            artifacts,
            schedule,
            max_pages,
            flags: RunFlags::new(),
            loop_handle: Mutex::new(None),
        }
    }

    /// Comma-joined source names, as recorded in the run history
    pub fn source_names(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.name().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether enough time has passed since the last recorded run
    fn check_due(&self) -> Result<bool, HomefinderError> {
        let last = {
            let storage = self
                .storage
                .lock()
                .map_err(|_| HomefinderError::LockPoisoned)?;
            storage.get_last_run_time()?
        };

        let Some(last) = last else {
            return Ok(true);
        };
        let min_interval = chrono::Duration::from_std(self.schedule.min_interval())
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        Ok(Utc::now() - last >= min_interval)
    }

    /// Returns true if `force` is set, no run was ever recorded, or the
    /// minimum interval has elapsed since the last run
    ///
    /// A storage failure is logged and treated as "not due".
    pub fn should_run(&self, force: bool) -> bool {
        if force {
            return true;
        }
        match self.check_due() {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!("Cannot read last run time: {}", e);
                false
            }
        }
    }

    /// Executes one scrape run over every source
    ///
    /// # Returns
    ///
    /// The number of listings stored, or 0 when the run was skipped because
    /// another run is in progress, a stop was requested, or no run is due.
    pub async fn run_once(&self, force: bool) -> usize {
        let Some(_guard) = self.flags.try_begin_run() else {
            tracing::debug!("A run is already in progress, skipping");
            return 0;
        };

        let urgent = self.flags.take_urgent();
        if urgent {
            tracing::info!("Consuming urgent scrape request");
        }
        let force = force || urgent;

        if self.flags.is_stopped() {
            tracing::debug!("Stop requested, skipping run");
            return 0;
        }
        if !self.should_run(force) {
            tracing::debug!("Run not due yet");
            return 0;
        }

        let started = Instant::now();
        let context = Arc::new(CrawlContext {
            fetcher: self.fetcher.clone(),
            artifacts: Arc::clone(&self.artifacts),
            cancel: self.flags.token().clone(),
            max_pages: self.max_pages,
        });

        tracing::info!("Starting scrape run over {} sources", self.sources.len());

        let workers: Vec<(String, JoinHandle<usize>)> = self
            .sources
            .iter()
            .map(|source| {
                let name = source.name().to_string();
                let handle = tokio::spawn(scrape_source(
                    Arc::clone(source),
                    Arc::clone(&context),
                    Arc::clone(&self.storage),
                ));
                (name, handle)
            })
            .collect();

        let mut total = 0;
        for (name, handle) in workers {
            match handle.await {
                Ok(count) => total += count,
                Err(e) => tracing::error!("Worker for {} aborted: {}", name, e),
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        match self.storage.lock() {
            Ok(mut storage) => {
                if let Err(e) = storage.log_run(&self.source_names(), total, elapsed) {
                    tracing::warn!("Failed to record scrape run: {}", e);
                }
            }
            Err(_) => tracing::warn!("Storage lock poisoned, scrape run not recorded"),
        }

        tracing::info!("Scrape run finished: {} listings in {:.1}s", total, elapsed);
        total
    }

    /// Starts the background loop
    ///
    /// Returns false if the loop is already active or a stop was requested.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.flags.is_stopped() {
            tracing::warn!("Scraper was stopped, not restarting");
            return false;
        }

        let Ok(mut handle) = self.loop_handle.lock() else {
            tracing::error!("Loop handle lock poisoned");
            return false;
        };
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("Background loop already running");
            return false;
        }

        *handle = Some(tokio::spawn(Arc::clone(self).run_loop()));
        true
    }

    /// Requests a stop and waits (bounded) for the background loop to exit
    ///
    /// A run in progress observes the stop at its next page boundary.
    ///
    /// # Returns
    ///
    /// `true` if no loop was active or it exited cleanly within the stop
    /// timeout, `false` if it timed out or ended abnormally.
    pub async fn stop(&self) -> bool {
        self.flags.request_stop();

        let handle = match self.loop_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(handle) = handle else {
            return true;
        };

        match tokio::time::timeout(self.schedule.stop_timeout(), handle).await {
            Ok(Ok(())) => {
                tracing::info!("Background scraper stopped");
                true
            }
            Ok(Err(e)) => {
                tracing::error!("Background loop ended abnormally: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!(
                    "Background loop did not stop within {:?}",
                    self.schedule.stop_timeout()
                );
                false
            }
        }
    }

    /// True while a run is in progress
    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    /// True while the background loop is active
    pub fn is_scheduled(&self) -> bool {
        self.loop_handle
            .lock()
            .map(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Asks for a run regardless of the minimum interval
    ///
    /// Returns false if an urgent request is already pending.
    pub fn request_urgent(&self) -> bool {
        let accepted = self.flags.request_urgent();
        if accepted {
            tracing::info!("Urgent scrape requested");
        } else {
            tracing::debug!("Urgent scrape already pending");
        }
        accepted
    }

    async fn run_loop(self: Arc<Self>) {
        tracing::info!("Background scraper started");

        while !self.flags.is_stopped() {
            if self.flags.is_running() {
                self.pause(self.schedule.poll_increment(), false).await;
                continue;
            }

            let due = if self.flags.urgent_pending() {
                Ok(true)
            } else {
                self.check_due()
            };

            match due {
                Ok(true) => {
                    self.run_once(false).await;
                    self.pause(self.schedule.interval(), true).await;
                }
                Ok(false) => {
                    tracing::debug!("Next run not due, idling");
                    self.pause(self.schedule.idle_backoff(), true).await;
                }
                Err(e) => {
                    tracing::error!("Background loop error: {}", e);
                    self.pause(self.schedule.error_backoff(), true).await;
                }
            }
        }

        tracing::info!("Background scraper exiting");
    }

    /// Sleeps `total` in poll-increment steps
    ///
    /// Returns early on stop, and on a pending urgent request if
    /// `wake_on_urgent` is set.
    async fn pause(&self, total: Duration, wake_on_urgent: bool) {
        let started = Instant::now();
        let step = self.schedule.poll_increment().max(Duration::from_millis(1));

        loop {
            if self.flags.is_stopped() || (wake_on_urgent && self.flags.urgent_pending()) {
                return;
            }
            let remaining = total.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(step.min(remaining)) => {}
                _ = self.flags.token().cancelled() => return,
            }
        }
    }
}

/// Crawls one source and stores its listings; failures count as zero
async fn scrape_source(
    source: Arc<dyn Source>,
    context: Arc<CrawlContext>,
    storage: SharedStorage,
) -> usize {
    let name = source.name().to_string();
    let listings = match source.crawl(&context).await {
        Ok(listings) => listings,
        Err(e) => {
            tracing::error!("Source {} failed: {}", name, e);
            return 0;
        }
    };

    let saved = match storage.lock() {
        Ok(mut storage) => storage.save_listings(&listings),
        Err(_) => {
            tracing::error!("Storage lock poisoned, dropping {} listings", listings.len());
            0
        }
    };
    tracing::info!("Source {}: stored {}/{} listings", name, saved, listings.len());
    saved
}
