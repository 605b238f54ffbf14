//! Periodic replay into subscribed groups. One streamer per hub; each owns
//! its encoder, so encode calls never cross tasks.
//!
//! Every tick advances one cursor per (group, subscriber key) and delivers
//! at most one record per subscriber. Failures at any step skip that
//! subscriber or group for the tick; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::hub::Hub;
use crate::codec::Encoder;
use crate::cursor::{self, CursorStore};
use crate::store::RecordStore;

pub struct Streamer {
    hub: Arc<Hub>,
    store: Arc<dyn RecordStore>,
    cursors: Arc<CursorStore>,
    encoder: Encoder,
    interval: Duration,
}

impl Streamer {
    pub fn new(
        hub: Arc<Hub>,
        store: Arc<dyn RecordStore>,
        cursors: Arc<CursorStore>,
        interval: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            hub,
            store,
            cursors,
            encoder: Encoder::new()?,
            interval,
        })
    }

    /// Runs until cancellation. The first tick is aligned to the next whole
    /// wall-clock second so replay cadence is predictable across hubs.
    pub async fn run(mut self, cancel: CancellationToken) {
        let wait = delay_to_next_second(Utc::now().nanosecond());
        debug!(hub = self.hub.name(), ?wait, "aligning to next second");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(hub = self.hub.name(), "streamer cancelled during alignment");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(hub = self.hub.name(), interval = ?self.interval, "streamer started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(hub = self.hub.name(), "streamer stopping");
                    return;
                }
                _ = ticker.tick() => self.broadcast_next(),
            }
        }
    }

    /// One tick: per active group, per subscriber key, advance the push
    /// cursor and dispatch the record to that key's connections.
    fn broadcast_next(&mut self) {
        let groups = self.hub.active_groups();
        if groups.is_empty() {
            return;
        }

        let kind = self.hub.kind();
        for group in groups {
            let Some((ticker, category)) = self.hub.parse_group(&group) else {
                continue;
            };

            let length = match self.store.len_of(&ticker, kind.family(), &category) {
                Ok(length) => length,
                Err(e) => {
                    debug!(ticker = %ticker, category = %category, error = %e, "failed to get data length");
                    continue;
                }
            };
            if length == 0 {
                continue;
            }

            let subscribers = self.hub.subscribers_by_key(&group);
            if subscribers.is_empty() {
                continue;
            }

            for (api_key, conns) in subscribers {
                let cursor_key =
                    cursor::push_key(self.hub.name(), &ticker, &category, &api_key);
                let (index, exhausted) = self.cursors.take(&cursor_key, length);
                if exhausted {
                    continue;
                }

                let raw = match self.store.raw_at(&ticker, kind.family(), &category, index) {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!(ticker = %ticker, category = %category, index, error = %e, "failed to get data at index");
                        continue;
                    }
                };

                let encoded = match self.encoder.encode(kind.shape(), &raw) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        debug!(ticker = %ticker, category = %category, index, error = %e, "failed to encode record");
                        continue;
                    }
                };

                self.hub
                    .dispatch_to(&conns, &encoded, Some(&raw), &group, kind.type_url());

                debug!(
                    hub = self.hub.name(),
                    ticker = %ticker,
                    category = %category,
                    index,
                    encoded_size = encoded.len(),
                    "broadcast record"
                );
            }
        }
    }
}

/// Wait from a subsecond offset to the next whole second. Leap-second
/// readings (chrono reports them as nanos >= 1e9) fold into the same
/// second.
fn delay_to_next_second(nanos: u32) -> Duration {
    let sub = u64::from(nanos) % 1_000_000_000;
    Duration::from_nanos((1_000_000_000 - sub) % 1_000_000_000)
}
