//! Live-ish donation feed.
//!
//! Polls the ledger for the running total and the recent-donations list,
//! publishing snapshots over a watch channel. Poll failures are logged and
//! leave the previously published data in place. The flow controller
//! invalidates the feed after a successful payment so the new donation
//! shows up without waiting for the next poll.

use crate::gateway::LedgerGateway;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Donor label the backend uses for donations without an attached identity.
pub const ANONYMOUS_DONOR: &str = "Anonymous";

/// One donation, as projected by the ledger for public display.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub created_at: DateTime<Utc>,
    /// Display name, or the [`ANONYMOUS_DONOR`] sentinel.
    pub donor_label: String,
    pub amount_cents: i64,
    pub currency: String,
}

impl LogEntry {
    pub fn is_anonymous(&self) -> bool {
        self.donor_label == ANONYMOUS_DONOR
    }

    pub fn amount_dollars(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }
}

/// What the poller publishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub total_dollars: f64,
    /// Most-recent-first, as delivered; never re-sorted here.
    pub recent: Vec<LogEntry>,
    /// When any part of this snapshot was last refreshed. `None` until the
    /// first successful poll.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Background poller for the donation total and recent list.
///
/// The polling task runs independently of the wizard and only ever reads;
/// it never touches wizard state. Dropping the feed aborts the task.
pub struct DonationFeed {
    rx: watch::Receiver<FeedSnapshot>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl DonationFeed {
    /// Spawns the polling task. The first fetch happens immediately, then
    /// every `poll_interval`, or sooner when [`DonationFeed::invalidate`]
    /// is called.
    pub fn spawn(ledger: Arc<dyn LedgerGateway>, poll_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(FeedSnapshot::default());
        let refresh = Arc::new(Notify::new());
        let notified = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notified.notified() => {
                        debug!("donation feed invalidated, refetching");
                        ticker.reset();
                    }
                }
                refresh_once(&*ledger, &tx).await;
            }
        });

        Self { rx, refresh, task }
    }

    /// Subscribes to feed snapshots.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.rx.clone()
    }

    /// A handle the flow controller uses to invalidate the feed without
    /// owning it.
    pub fn refresh_handle(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    /// Forces a refetch ahead of the next poll tick.
    pub fn invalidate(&self) {
        self.refresh.notify_one();
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.rx.borrow().clone()
    }
}

impl Drop for DonationFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One poll round. Total and recent are fetched concurrently and applied
/// independently, so one failing query does not blank the other's data.
async fn refresh_once(ledger: &dyn LedgerGateway, tx: &watch::Sender<FeedSnapshot>) {
    let (total, recent) = tokio::join!(ledger.total_raised(), ledger.recent_donations());

    let mut snapshot = tx.borrow().clone();
    let mut refreshed = false;

    match total {
        Ok(total_dollars) => {
            snapshot.total_dollars = total_dollars;
            refreshed = true;
        }
        Err(err) => warn!(error = %err, "total-raised poll failed; keeping last value"),
    }

    match recent {
        Ok(entries) => {
            snapshot.recent = entries;
            refreshed = true;
        }
        Err(err) => warn!(error = %err, "recent-donations poll failed; keeping last list"),
    }

    if refreshed {
        snapshot.fetched_at = Some(Utc::now());
        let _ = tx.send(snapshot);
    }
}
