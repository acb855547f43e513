//! Canvas Service: the REST backend that caches placements for observers
//! who do not read the chain.

use std::future::Future;

use common::wire::{DevnetPlacePixel, Envelope, PlacePixelNotice};
use common::{routes, Canvas, Palette, World};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// The calls the placement pipeline needs from the backend.
pub trait CanvasService: Send + Sync + 'static {
    /// Who placed the pixel at `position`. `None` on any failure.
    fn pixel_info(
        &self,
        world_id: Option<u32>,
        position: u32,
    ) -> impl Future<Output = Option<String>> + Send;

    /// Mirror an accepted on-chain placement into the cache.
    fn notify_placement(
        &self,
        notice: &PlacePixelNotice,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Clone)]
pub struct HttpCanvasService {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorEntry {
    Hex(String),
    Object { hex: String },
}

impl HttpCanvasService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET `path` and unwrap the `{data}` envelope. Failures are logged and
    /// read as "no data".
    async fn fetch_data<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let result: Result<Envelope<T>, reqwest::Error> = async {
            self.http
                .get(self.url(path))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
        }
        .await;

        match result {
            Ok(envelope) => envelope.data,
            Err(e) => {
                tracing::error!("Error fetching data from {}: {}", path, e);
                None
            }
        }
    }

    async fn post_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> anyhow::Result<()> {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn all_worlds(&self, page: u32, page_length: u32) -> Vec<World> {
        self.fetch_data(&routes::all_worlds_path(page, page_length))
            .await
            .unwrap_or_default()
    }

    /// Look up a world by its unique name, scanning pages until exhausted.
    pub async fn find_world(&self, unique_name: &str) -> Option<World> {
        const PAGE_LENGTH: u32 = 50;
        for page in 1.. {
            let worlds = self.all_worlds(page, PAGE_LENGTH).await;
            let last_page = worlds.len() < PAGE_LENGTH as usize;
            if let Some(world) = worlds.into_iter().find(|w| w.unique_name == unique_name) {
                return Some(world);
            }
            if last_page {
                break;
            }
        }
        None
    }

    /// Fetch and decode the packed canvas blob.
    pub async fn canvas(
        &self,
        world_id: Option<u32>,
        width: u32,
        height: u32,
        bit_width: u8,
    ) -> Option<Canvas> {
        let path = routes::canvas_path(world_id);
        let result: Result<Vec<u8>, reqwest::Error> = async {
            let bytes = self
                .http
                .get(self.url(&path))
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            Ok(bytes.to_vec())
        }
        .await;

        match result {
            Ok(bytes) => Some(Canvas::from_packed(width, height, bit_width, &bytes)),
            Err(e) => {
                tracing::error!("Error fetching canvas from {}: {}", path, e);
                None
            }
        }
    }

    pub async fn colors(&self, world_id: Option<u32>) -> Option<Palette> {
        let entries: Vec<ColorEntry> = self.fetch_data(&routes::colors_path(world_id)).await?;
        let colors = entries
            .into_iter()
            .map(|entry| match entry {
                ColorEntry::Hex(hex) | ColorEntry::Object { hex } => hex,
            })
            .collect();
        Some(Palette::new(colors))
    }

    /// Bonus allotment. The service answers with a number or a numeric string.
    pub async fn extra_pixels(&self, world_id: Option<u32>, address: &str) -> Option<u32> {
        let value: serde_json::Value = self
            .fetch_data(&routes::extra_pixels_path(world_id, address))
            .await?;
        match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Unix millis of the account's last base placement. `None` when it never
    /// placed (the service answers with the epoch) or the lookup failed.
    pub async fn last_placed_time(&self, world_id: Option<u32>, address: &str) -> Option<u64> {
        let stamp: String = self
            .fetch_data(&routes::last_placed_time_path(world_id, address))
            .await?;
        let placed_at = match OffsetDateTime::parse(stamp.trim(), &Rfc3339) {
            Ok(placed_at) => placed_at,
            Err(e) => {
                tracing::error!("Invalid last placed time {:?}: {}", stamp, e);
                return None;
            }
        };
        let millis = placed_at.unix_timestamp_nanos() / 1_000_000;
        u64::try_from(millis).ok().filter(|&ms| ms > 0)
    }

    pub async fn place_pixel_devnet(
        &self,
        world_id: Option<u32>,
        body: &DevnetPlacePixel,
    ) -> anyhow::Result<()> {
        self.post_json(routes::devnet_place_path(world_id), body).await
    }
}

impl CanvasService for HttpCanvasService {
    async fn pixel_info(&self, world_id: Option<u32>, position: u32) -> Option<String> {
        self.fetch_data(&routes::pixel_info_path(world_id, position))
            .await
    }

    async fn notify_placement(&self, notice: &PlacePixelNotice) -> anyhow::Result<()> {
        self.post_json(routes::PLACE_PIXEL, notice).await
    }
}
