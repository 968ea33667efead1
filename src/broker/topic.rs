//! Topic and partition plumbing

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::utils::error::{AlertflowError, Result};

/// One consumer group's sender into a partition
struct GroupSender<T> {
    group: String,
    tx: mpsc::Sender<T>,
}

/// Per-partition state: registered group senders plus the backlog of
/// messages published before any group subscribed
struct PartitionState<T> {
    senders: Vec<GroupSender<T>>,
    backlog: VecDeque<T>,
}

impl<T> Default for PartitionState<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
            backlog: VecDeque::new(),
        }
    }
}

/// A named topic with N ordered partitions
pub struct Topic<T> {
    name: String,
    capacity: usize,
    partitions: Vec<Mutex<PartitionState<T>>>,
}

impl<T: Clone + Send + 'static> Topic<T> {
    /// Create a topic with `partitions` ordered partitions and a bounded
    /// per-partition channel of `capacity` messages
    pub fn new(name: &str, partitions: usize, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            capacity: capacity.max(1),
            partitions: (0..partitions.max(1))
                .map(|_| Mutex::new(PartitionState::default()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Publish a message to one partition. Every subscribed consumer group
    /// receives its own copy, in publication order within the partition.
    /// Awaits channel capacity, so a full partition applies backpressure to
    /// the producer rather than dropping.
    pub async fn publish(&self, partition: usize, message: T) -> Result<()> {
        let state = self.partitions.get(partition).ok_or_else(|| {
            AlertflowError::Broker(format!(
                "partition {} out of range for topic {} ({} partitions)",
                partition,
                self.name,
                self.partitions.len()
            ))
        })?;

        let senders: Vec<mpsc::Sender<T>> = {
            let mut state = state.lock();
            if state.senders.is_empty() {
                state.backlog.push_back(message);
                return Ok(());
            }
            state.senders.iter().map(|s| s.tx.clone()).collect()
        };

        for tx in senders {
            tx.send(message.clone()).await.map_err(|_| {
                AlertflowError::Broker(format!(
                    "topic {} partition {} has no live consumer",
                    self.name, partition
                ))
            })?;
        }

        Ok(())
    }

    /// Subscribe a consumer group to a set of partitions, returning one
    /// ordered consumer per partition. Each partition's backlog is drained
    /// into the first group that subscribes to it.
    pub fn subscribe(&self, group: &str, partitions: &[usize]) -> Vec<PartitionConsumer<T>> {
        let mut consumers = Vec::with_capacity(partitions.len());

        for &partition in partitions {
            let Some(state) = self.partitions.get(partition) else {
                warn!(
                    "Consumer group {} asked for missing partition {} of topic {}",
                    group, partition, self.name
                );
                continue;
            };

            let mut state = state.lock();
            let backlog_len = state.backlog.len();
            let (tx, rx) = mpsc::channel(self.capacity.max(backlog_len + 1));

            while let Some(parked) = state.backlog.pop_front() {
                // Capacity was sized above to hold the whole backlog
                if tx.try_send(parked).is_err() {
                    warn!(
                        "Dropped backlog message on topic {} partition {}",
                        self.name, partition
                    );
                }
            }

            state.senders.push(GroupSender {
                group: group.to_string(),
                tx,
            });

            debug!(
                "Consumer group {} subscribed to topic {} partition {} ({} backlog messages)",
                group, self.name, partition, backlog_len
            );

            consumers.push(PartitionConsumer {
                topic: self.name.clone(),
                group: group.to_string(),
                partition,
                rx,
            });
        }

        consumers
    }

    /// Subscribe a group to every partition of the topic
    pub fn subscribe_all(&self, group: &str) -> Vec<PartitionConsumer<T>> {
        let partitions: Vec<usize> = (0..self.partitions.len()).collect();
        self.subscribe(group, &partitions)
    }

    /// Drop a consumer group's registration (its channels close once the
    /// receivers are dropped too)
    pub fn unsubscribe(&self, group: &str) {
        for state in &self.partitions {
            state.lock().senders.retain(|s| s.group != group);
        }
    }
}

/// Ordered receiving end of one `(topic, group, partition)` binding
pub struct PartitionConsumer<T> {
    topic: String,
    group: String,
    partition: usize,
    rx: mpsc::Receiver<T>,
}

impl<T> PartitionConsumer<T> {
    /// Receive the next message in partition order; `None` once the topic
    /// side is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn partition(&self) -> usize {
        self.partition
    }
}
