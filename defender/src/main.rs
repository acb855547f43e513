use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use client::config::Config;
use client::defense::DefenseLoop;
use client::ledger::DevnetLedger;
use client::quota::Quota;
use client::service::HttpCanvasService;
use client::{Action, PlacementPipeline, Store};
use common::Template;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("defender=info".parse()?)
                .add_directive("client=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    if !config.devnet_mode {
        anyhow::bail!("No ledger signer configured; run with DEVNET_MODE=true");
    }
    let template = load_template(config.template_path.as_deref())?;

    let service = HttpCanvasService::new(config.backend_url.clone());
    let world = match &config.world_name {
        Some(name) => Some(
            service
                .find_world(name)
                .await
                .with_context(|| format!("World {name} not found"))?,
        ),
        None => None,
    };
    let world_id = world.as_ref().map(|w| w.world_id);
    let (width, height) = world
        .as_ref()
        .map(|w| (w.width, w.height))
        .unwrap_or((config.canvas_width, config.canvas_height));
    let time_between_pixels = world
        .as_ref()
        .and_then(|w| w.time_between_pixels)
        .unwrap_or(config.time_between_pixels_secs);

    let palette = service
        .colors(world_id)
        .await
        .context("Failed to fetch palette")?;
    let canvas = service
        .canvas(world_id, width, height, config.colors_bit_width)
        .await
        .context("Failed to fetch canvas")?;

    tracing::info!(
        "Defending template at {} ({}x{}) on {} ({}x{}, {} colors)",
        template.position,
        template.width,
        template.height,
        config.world_name.as_deref().unwrap_or("main canvas"),
        width,
        height,
        palette.len()
    );

    let mut store = Store::new(
        world_id,
        canvas,
        palette,
        Quota::new(config.address.is_some()),
    );
    match &config.address {
        Some(address) => {
            if let Some(available_pixels) = service.extra_pixels(world_id, address).await {
                store.reduce(Action::RefreshQuota { available_pixels });
            }
            if let Some(last_placed_ms) = service.last_placed_time(world_id, address).await {
                tracing::info!("Last base placement at {} ms", last_placed_ms);
                store.reduce(Action::SyncLastPlaced { last_placed_ms });
            }
            store.reduce(Action::TickQuota {
                now_ms: unix_now_ms(),
                time_between_pixels_secs: time_between_pixels,
            });
        }
        None => tracing::warn!("ACCOUNT_ADDRESS not set, placements will be rejected"),
    }

    let ledger = DevnetLedger::new(service.clone());
    let pipeline = PlacementPipeline::new(
        store,
        ledger,
        service,
        config.address.clone(),
        config.pixel_info_cache_size,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())?;

    let is_running = Arc::new(AtomicBool::new(true));
    let feed_handle = tokio::spawn(client::feed::run(
        config.websocket_url.clone(),
        world_id,
        pipeline.store().clone(),
        pipeline.pixel_info_cache().clone(),
        is_running.clone(),
    ));
    let defense = DefenseLoop::spawn(pipeline.clone(), template, config.defend_interval);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while !shutdown.load(Ordering::SeqCst) {
        ticker.tick().await;
        pipeline
            .dispatch(Action::TickQuota {
                now_ms: unix_now_ms(),
                time_between_pixels_secs: time_between_pixels,
            })
            .await;
    }

    tracing::info!("Shutting down");
    is_running.store(false, Ordering::SeqCst);
    defense.stop();
    feed_handle.abort();

    tracing::info!("Defender stopped.");
    Ok(())
}

fn load_template(path: Option<&str>) -> anyhow::Result<Template> {
    let path = path.context("TEMPLATE_PATH not set")?;
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {path}"))?;
    let template: Template =
        serde_json::from_str(&json).with_context(|| format!("Invalid template {path}"))?;
    let Some(cells) = template.cell_count() else {
        anyhow::bail!(
            "Template {} is too large ({}x{})",
            path,
            template.width,
            template.height
        );
    };
    if !template.is_well_formed() {
        anyhow::bail!(
            "Template {} has {} cells, expected {}",
            path,
            template.color_indices.len(),
            cells
        );
    }
    Ok(template)
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
