//! Keeps a template painted: diffs it against the live canvas and issues
//! corrective placements.

use std::time::Duration;

use common::{Canvas, ColorId, Palette, Template};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;

use crate::ledger::Ledger;
use crate::overlay::ExtraPixel;
use crate::pipeline::{PlacementOutcome, PlacementPipeline};
use crate::service::CanvasService;

/// Whether the live cell already renders as the template's target color.
fn renders_as(canvas: &Canvas, palette: &Palette, position: u32, target: ColorId) -> bool {
    let Some(target_hex) = palette.get(target) else {
        // Unknown target colors cannot be placed; treat them as satisfied.
        return true;
    };
    canvas
        .get_position(position)
        .is_some_and(|live| palette.matches(live, target_hex))
}

/// Template cells in row-major order as `(canvas position, target color)`,
/// skipping transparent cells and cells that fall off the canvas.
fn template_cells<'a>(
    template: &'a Template,
    canvas: &'a Canvas,
) -> impl Iterator<Item = (u32, ColorId)> + 'a {
    let (origin_x, origin_y) = template.origin(canvas.width());
    (0..template.height).flat_map(move |ty| {
        (0..template.width).filter_map(move |tx| {
            let color = template.color_at(tx, ty)?;
            let position = canvas.position(origin_x.checked_add(tx)?, origin_y.checked_add(ty)?)?;
            Some((position, color))
        })
    })
}

/// The first drifted cell in row-major scan order.
pub fn find_first_mismatch(
    template: &Template,
    canvas: &Canvas,
    palette: &Palette,
) -> Option<(u32, ColorId)> {
    template_cells(template, canvas)
        .find(|&(position, color)| !renders_as(canvas, palette, position, color))
}

pub fn collect_mismatches(
    template: &Template,
    canvas: &Canvas,
    palette: &Palette,
) -> Vec<(u32, ColorId)> {
    template_cells(template, canvas)
        .filter(|&(position, color)| !renders_as(canvas, palette, position, color))
        .collect()
}

/// One timer tick: correct at most one cell through the base lane.
pub async fn defend_tick<L: Ledger, S: CanvasService>(
    pipeline: &PlacementPipeline<L, S>,
    template: &Template,
) -> Option<PlacementOutcome> {
    let mismatch = {
        let store = pipeline.store().read().await;
        if !store.quota().base_pixel_up() {
            return None;
        }
        find_first_mismatch(template, store.canvas(), store.palette())
    };
    let (position, color) = mismatch?;

    tracing::info!("Defending template at {} with color {}", position, color);
    match pipeline.place_base(position, color).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!("Defense placement failed: {}", e);
            None
        }
    }
}

/// Bonus-lane sweep: every drifted cell, shuffled, up to the remaining
/// bonus allotment. Returns how many were buffered.
pub async fn defend_now<L: Ledger, S: CanvasService, R: Rng + ?Sized>(
    pipeline: &PlacementPipeline<L, S>,
    template: &Template,
    rng: &mut R,
) -> usize {
    let (mut mismatches, remaining, width) = {
        let store = pipeline.store().read().await;
        (
            collect_mismatches(template, store.canvas(), store.palette()),
            store.quota().bonus_remaining() as usize,
            store.canvas().width(),
        )
    };
    if mismatches.is_empty() || remaining == 0 {
        return 0;
    }

    mismatches.shuffle(rng);
    let batch: Vec<ExtraPixel> = mismatches
        .into_iter()
        .take(remaining)
        .map(|(position, color)| ExtraPixel {
            x: position % width,
            y: position / width,
            color,
        })
        .collect();

    let buffered = pipeline.buffer_extra(batch).await;
    tracing::info!("Buffered {} defense pixels", buffered);
    buffered
}

/// A running defense timer. Stops when dropped.
pub struct DefenseHandle {
    task: JoinHandle<()>,
}

impl DefenseHandle {
    pub fn stop(self) {
        // Drop aborts.
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DefenseHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct DefenseLoop;

impl DefenseLoop {
    pub fn spawn<L: Ledger, S: CanvasService>(
        pipeline: PlacementPipeline<L, S>,
        template: Template,
        interval: Duration,
    ) -> DefenseHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Some(outcome) = defend_tick(&pipeline, &template).await {
                    tracing::debug!("Defense tick: {:?}", outcome);
                }
            }
        });
        DefenseHandle { task }
    }
}
