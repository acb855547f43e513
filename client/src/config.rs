use std::time::Duration;

use common::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

pub struct Config {
    pub backend_url: String,
    pub websocket_url: String,
    /// Wallet address; `None` means logged out.
    pub address: Option<String>,
    /// Unique name of the world to bind to; `None` is the main canvas.
    pub world_name: Option<String>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub colors_bit_width: u8,
    pub devnet_mode: bool,
    pub defend_interval: Duration,
    pub pixel_info_cache_size: usize,
    pub time_between_pixels_secs: u64,
    pub template_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            websocket_url: std::env::var("WEBSOCKET_URL")
                .unwrap_or_else(|_| "ws://localhost:8083/ws".into()),
            address: std::env::var("ACCOUNT_ADDRESS").ok().filter(|a| !a.is_empty()),
            world_name: std::env::var("WORLD_NAME").ok().filter(|n| !n.is_empty()),
            canvas_width: env_parse("CANVAS_WIDTH", DEFAULT_WIDTH),
            canvas_height: env_parse("CANVAS_HEIGHT", DEFAULT_HEIGHT),
            colors_bit_width: env_parse("COLORS_BIT_WIDTH", 5),
            devnet_mode: std::env::var("DEVNET_MODE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            defend_interval: Duration::from_millis(env_parse("DEFEND_INTERVAL_MS", 1000)),
            pixel_info_cache_size: env_parse("PIXEL_INFO_CACHE_SIZE", 256),
            time_between_pixels_secs: env_parse("TIME_BETWEEN_PIXELS_SECS", 120),
            template_path: std::env::var("TEMPLATE_PATH").ok(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
