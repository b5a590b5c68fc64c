//! Fire-and-forget announcements to peers
//!
//! Every announcement becomes one job per peer on a bounded queue. A fixed
//! pool of workers drains the queue, each job under its own timeout. When
//! the queue is full new jobs are dropped; failures are logged and counted,
//! never retried.

use crate::core::{Block, Transaction};
use crate::network::client::PeerClient;
use log::{debug, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

/// Announcer configuration
#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Maximum queued jobs
    pub queue_capacity: usize,
    /// Time limit for one delivery
    pub timeout: Duration,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 256,
            timeout: Duration::from_secs(2),
        }
    }
}

/// One delivery to one peer
#[derive(Debug, Clone)]
enum Job {
    Block { peer: String, block: Arc<Block> },
    Transaction { peer: String, tx: Arc<Transaction> },
}

impl Job {
    fn peer(&self) -> &str {
        match self {
            Job::Block { peer, .. } | Job::Transaction { peer, .. } => peer,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct AnnouncerStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Handle to the worker pool
#[derive(Debug, Clone)]
pub struct Announcer {
    sender: mpsc::Sender<Job>,
    // Held so the queue stays open even with no workers
    _receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    counters: Arc<Counters>,
}

impl Announcer {
    /// Spawn the workers on the current tokio runtime
    pub fn start(config: AnnouncerConfig, client: PeerClient) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        for worker in 0..config.workers {
            let receiver = receiver.clone();
            let counters = counters.clone();
            let client = client.clone();
            let timeout = config.timeout;

            tokio::spawn(async move {
                loop {
                    let job = { receiver.lock().await.recv().await };
                    let Some(job) = job else {
                        debug!("Announcer worker {} stopping", worker);
                        break;
                    };
                    deliver(&client, job, timeout, &counters).await;
                }
            });
        }

        Self {
            sender,
            _receiver: receiver,
            counters,
        }
    }

    /// Queue a block for every peer
    ///
    /// Returns the number of jobs queued.
    pub fn announce_block(&self, block: &Block, peers: &[String]) -> usize {
        let block = Arc::new(block.clone());
        peers
            .iter()
            .filter(|peer| {
                self.enqueue(Job::Block {
                    peer: (*peer).clone(),
                    block: block.clone(),
                })
            })
            .count()
    }

    /// Queue a transaction for every peer that has not processed it yet
    pub fn announce_transaction(&self, tx: &Transaction, peers: &[String]) -> usize {
        let tx = Arc::new(tx.clone());
        peers
            .iter()
            .filter(|peer| !tx.is_claimed_by(peer.as_str()))
            .filter(|peer| {
                self.enqueue(Job::Transaction {
                    peer: (*peer).clone(),
                    tx: tx.clone(),
                })
            })
            .count()
    }

    /// Jobs waiting for a worker
    #[cfg(test)]
    fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn stats(&self) -> AnnouncerStats {
        AnnouncerStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    fn enqueue(&self, job: Job) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!("Announcement queue full, dropping job for {}", job.peer());
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!("Announcer stopped, dropping job for {}", job.peer());
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

async fn deliver(client: &PeerClient, job: Job, timeout: Duration, counters: &Counters) {
    let result = match &job {
        Job::Block { peer, block } => {
            tokio::time::timeout(timeout, client.send_block(peer, block)).await
        }
        Job::Transaction { peer, tx } => {
            tokio::time::timeout(timeout, client.send_transaction(peer, tx)).await
        }
    };

    match result {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            warn!("Announcement to {} failed: {}", job.peer(), e);
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        Err(_) => {
            warn!("Announcement to {} timed out", job.peer());
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
