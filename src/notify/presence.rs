//! Presence registry
//!
//! In-memory index of live delivery channels, keyed by [`ChannelKey`]. One
//! user may hold several channels (tabs, devices); each gets its own id.
//!
//! The DashMap shard lock serialises join, leave and push for a key, so a
//! push never observes a half-removed channel. Pushing is non-blocking:
//! a full buffer drops the frame, a closed receiver prunes the channel.
//! Losing the registry loses no data, clients simply re-join.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::types::ChannelKey;

use super::model::ServerFrame;

/// Identifier of one registered channel
pub type ChannelId = u64;

/// Sink for live frames, injected into the fan-out engine
pub trait LiveDelivery: Send + Sync {
    /// Push `frame` to every channel registered under `key`.
    /// Returns how many channels accepted it.
    fn deliver(&self, key: &ChannelKey, frame: &ServerFrame) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStats {
    pub connected_users: usize,
    pub open_channels: usize,
}

pub struct PresenceRegistry {
    channels: DashMap<ChannelKey, HashMap<ChannelId, mpsc::Sender<ServerFrame>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl PresenceRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// A bounded channel sized for this registry
    pub fn channel(&self) -> (mpsc::Sender<ServerFrame>, mpsc::Receiver<ServerFrame>) {
        mpsc::channel(self.buffer)
    }

    /// Register a channel under `key`
    pub fn join(&self, key: ChannelKey, sender: mpsc::Sender<ServerFrame>) -> ChannelId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, channel = id, "Channel joined");
        self.channels.entry(key).or_default().insert(id, sender);
        id
    }

    /// Deregister a channel. Returns false if it was not registered.
    pub fn leave(&self, key: &ChannelKey, id: ChannelId) -> bool {
        let removed = match self.channels.get_mut(key) {
            Some(mut entry) => entry.remove(&id).is_some(),
            None => false,
        };
        // Shard lock from get_mut is released before remove_if takes it again
        self.channels.remove_if(key, |_, set| set.is_empty());
        if removed {
            debug!(key = %key, channel = id, "Channel left");
        }
        removed
    }

    /// Push a frame to every channel of `key`
    pub fn push(&self, key: &ChannelKey, frame: &ServerFrame) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        if let Some(entry) = self.channels.get(key) {
            for (id, sender) in entry.iter() {
                match sender.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(key = %key, channel = id, "Push buffer full, frame dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        for id in closed {
            self.leave(key, id);
        }
        delivered
    }

    pub fn is_connected(&self, key: &ChannelKey) -> bool {
        self.channels.get(key).map(|e| !e.is_empty()).unwrap_or(false)
    }

    pub fn stats(&self) -> PresenceStats {
        let mut stats = PresenceStats {
            connected_users: 0,
            open_channels: 0,
        };
        for entry in self.channels.iter() {
            if !entry.is_empty() {
                stats.connected_users += 1;
                stats.open_channels += entry.len();
            }
        }
        stats
    }
}

impl LiveDelivery for PresenceRegistry {
    fn deliver(&self, key: &ChannelKey, frame: &ServerFrame) -> usize {
        self.push(key, frame)
    }
}
