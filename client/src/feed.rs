//! Live placement feed from the Canvas Service websocket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::routes;
use common::wire::{FeedMessage, Subscription};
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;

use crate::pixel_info::PixelInfoCache;
use crate::store::{Action, Store};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Apply one frame to the store. Returns `true` if a pixel was painted.
///
/// Frames for other worlds are ignored. Remote paints are last-write-wins
/// and drop the cached placer for that cell.
pub async fn apply_feed_message(
    store: &RwLock<Store>,
    cache: &Mutex<PixelInfoCache>,
    world_id: Option<u32>,
    msg: &FeedMessage,
) -> bool {
    let Some((frame_world, position, color)) = msg.paint() else {
        return false;
    };
    if frame_world != world_id {
        return false;
    }
    let applied = store
        .write()
        .await
        .reduce(Action::ApplyRemotePixel { position, color });
    if applied {
        cache.lock().await.invalidate(world_id, position);
    }
    applied
}

/// Consume the feed until `is_running` clears, reconnecting with backoff.
pub async fn run(
    url: String,
    world_id: Option<u32>,
    store: Arc<RwLock<Store>>,
    cache: Arc<Mutex<PixelInfoCache>>,
    is_running: Arc<AtomicBool>,
) {
    tracing::info!("Feed consumer started for {}", routes::world_channel(world_id));
    let mut backoff = INITIAL_BACKOFF;

    while is_running.load(Ordering::SeqCst) {
        match consume(&url, world_id, &store, &cache, &is_running).await {
            Ok(()) => {
                tracing::warn!("Feed connection closed");
                backoff = INITIAL_BACKOFF;
            }
            Err(e) => {
                tracing::error!("Feed connection failed: {:#}", e);
            }
        }
        if !is_running.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    tracing::info!("Feed consumer stopped");
}

async fn consume(
    url: &str,
    world_id: Option<u32>,
    store: &RwLock<Store>,
    cache: &Mutex<PixelInfoCache>,
    is_running: &AtomicBool,
) -> anyhow::Result<()> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws.split();

    let subscribe = serde_json::to_string(&Subscription::subscribe(routes::world_channel(world_id)))?;
    write.send(Message::Text(subscribe.into())).await?;

    let mut applied = 0u64;
    while let Some(message) = read.next().await {
        if !is_running.load(Ordering::SeqCst) {
            break;
        }
        match message? {
            Message::Text(text) => {
                let frame: FeedMessage = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("Skipping malformed feed frame: {}", e);
                        continue;
                    }
                };
                if apply_feed_message(store, cache, world_id, &frame).await {
                    applied += 1;
                    if applied % 1000 == 0 {
                        tracing::info!("Applied {} remote pixels", applied);
                    }
                }
            }
            Message::Close(frame) => {
                tracing::info!("Feed closed by server: {:?}", frame);
                break;
            }
            _ => {}
        }
    }

    let unsubscribe =
        serde_json::to_string(&Subscription::unsubscribe(routes::world_channel(world_id)))?;
    let _ = write.send(Message::Text(unsubscribe.into())).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::{Canvas, Palette};

    use super::*;
    use crate::quota::Quota;

    fn state() -> (RwLock<Store>, Mutex<PixelInfoCache>) {
        let palette = Palette::new(vec!["000000".into(), "ffffff".into(), "ff0000".into()]);
        let store = Store::new(Some(4), Canvas::new(10, 10), palette, Quota::new(true));
        (RwLock::new(store), Mutex::new(PixelInfoCache::new(8)))
    }

    #[tokio::test]
    async fn applies_frames_for_the_bound_world_and_invalidates_cache() {
        let (store, cache) = state();
        cache.lock().await.put(Some(4), 12, "0xold".into());

        let frame = FeedMessage::ColorWorldPixel {
            world_id: 4,
            position: 12,
            color: 2,
        };
        assert!(apply_feed_message(&store, &cache, Some(4), &frame).await);
        assert_eq!(store.read().await.canvas().get(2, 1), Some(2));
        assert_eq!(cache.lock().await.get(Some(4), 12), None);
    }

    #[tokio::test]
    async fn ignores_other_worlds_and_unknown_frames() {
        let (store, cache) = state();
        let other_world = FeedMessage::ColorWorldPixel {
            world_id: 5,
            position: 12,
            color: 2,
        };
        let main_canvas = FeedMessage::ColorPixel {
            position: 12,
            color: 2,
        };
        assert!(!apply_feed_message(&store, &cache, Some(4), &other_world).await);
        assert!(!apply_feed_message(&store, &cache, Some(4), &main_canvas).await);
        assert!(!apply_feed_message(&store, &cache, Some(4), &FeedMessage::Other).await);
        assert_eq!(store.read().await.canvas().get(2, 1), Some(0));
    }

    #[tokio::test]
    async fn out_of_range_positions_are_dropped() {
        let (store, cache) = state();
        let frame = FeedMessage::ColorWorldPixel {
            world_id: 4,
            position: 100,
            color: 1,
        };
        assert!(!apply_feed_message(&store, &cache, Some(4), &frame).await);
    }
}
