//! Polling block watcher shared by every session on a provider.
//!
//! Publishes each new block number exactly once on a broadcast channel; the
//! swap session uses the feed to keep `ready` quotes fresh. Fetch failures
//! are tolerated and the last seen height is kept until the provider
//! recovers.

use anyhow::{Context, Result};
use ethers::providers::{Middleware, Provider, Ws};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

pub struct BlockWatcher<M> {
    provider: Arc<M>,
    sender: broadcast::Sender<u64>,
    last_block: AtomicU64,
    poll_interval: Duration,
}

impl<M: Middleware + 'static> BlockWatcher<M> {
    pub fn new(provider: Arc<M>, poll_interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            provider,
            sender,
            last_block: AtomicU64::new(0),
            poll_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.sender.subscribe()
    }

    pub fn last_block(&self) -> u64 {
        self.last_block.load(Ordering::Relaxed)
    }

    /// Polls forever; run this on its own task.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.provider.get_block_number().await {
                Ok(number) => {
                    let number = number.as_u64();
                    let previous = self.last_block.fetch_max(number, Ordering::Relaxed);
                    // Monotone guard: reorg stutter or a lagging endpoint
                    // must not re-announce an old height.
                    if number > previous {
                        debug!("new block {number}");
                        let _ = self.sender.send(number);
                    }
                }
                Err(e) => {
                    warn!("block number fetch failed: {e}");
                }
            }
        }
    }

    /// Websocket variant: streams new heads into the same feed. Returns when
    /// the subscription ends, so callers typically fall back to [`run`].
    pub async fn run_ws(self: Arc<Self>, ws_url: &str) -> Result<()> {
        let provider = Provider::<Ws>::connect(ws_url)
            .await
            .context("websocket connect failed")?;
        let mut stream = provider
            .subscribe_blocks()
            .await
            .context("newHeads subscription failed")?;
        info!("subscribed to new heads via websocket");
        while let Some(block) = stream.next().await {
            let Some(number) = block.number else { continue };
            let number = number.as_u64();
            let previous = self.last_block.fetch_max(number, Ordering::Relaxed);
            if number > previous {
                debug!("new block {number} (ws)");
                let _ = self.sender.send(number);
            }
        }
        warn!("websocket block subscription ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let (sender, _) = broadcast::channel::<u64>(16);
        let mut rx1 = sender.subscribe();
        let mut rx2 = sender.subscribe();
        sender.send(100).unwrap();
        assert_eq!(rx1.recv().await.unwrap(), 100);
        assert_eq!(rx2.recv().await.unwrap(), 100);
    }
}
