use serde::{Deserialize, Serialize};

use crate::palette::ColorId;

/// Canvas Service response wrapper: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

/// Body of `POST place-pixel`, mirroring an on-chain placement into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePixelNotice {
    /// Always serialized; `null` for the main canvas.
    pub world_id: Option<u32>,
    pub position: u32,
    pub color: ColorId,
    pub address: String,
}

/// Body of the devnet placement routes. Every field travels as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevnetPlacePixel {
    pub position: String,
    pub color: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_id: Option<String>,
}

impl DevnetPlacePixel {
    pub fn new(world_id: Option<u32>, position: u32, color: ColorId, timestamp: u64) -> Self {
        Self {
            position: position.to_string(),
            color: color.to_string(),
            timestamp: timestamp.to_string(),
            world_id: world_id.map(|id| id.to_string()),
        }
    }
}

/// Frames pushed by the Canvas Service websocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "camelCase")]
pub enum FeedMessage {
    ColorPixel {
        position: u32,
        color: ColorId,
    },
    #[serde(rename_all = "camelCase")]
    ColorWorldPixel {
        world_id: u32,
        position: u32,
        color: ColorId,
    },
    #[serde(other)]
    Other,
}

impl FeedMessage {
    /// The `(world, position, color)` painted by this frame, if any.
    pub fn paint(&self) -> Option<(Option<u32>, u32, ColorId)> {
        match *self {
            FeedMessage::ColorPixel { position, color } => Some((None, position, color)),
            FeedMessage::ColorWorldPixel {
                world_id,
                position,
                color,
            } => Some((Some(world_id), position, color)),
            FeedMessage::Other => None,
        }
    }
}

/// Client-to-server websocket frame: `{"event": "...", "data": {"channel": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub event: String,
    pub data: Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel: String,
}

impl Subscription {
    pub fn subscribe(channel: String) -> Self {
        Self {
            event: "subscribe".into(),
            data: Channel { channel },
        }
    }

    pub fn unsubscribe(channel: String) -> Self {
        Self {
            event: "unsubscribe".into(),
            data: Channel { channel },
        }
    }
}
