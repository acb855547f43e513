//! Glue between raw input and the placement pipeline for one canvas.

use tokio::task::JoinHandle;

use crate::coords::{screen_to_grid, Point};
use crate::error::PlacementError;
use crate::input::{InputEvent, InputSubscription};
use crate::ledger::Ledger;
use crate::pipeline::{PlacementOutcome, PlacementPipeline, Step};
use crate::service::CanvasService;
use crate::store::{Action, Mode};
use crate::viewport::{ViewportController, ViewportLayout};

/// Result of routing one input event.
#[derive(Debug)]
pub enum SessionOutcome {
    Done(PlacementOutcome),
    /// A ledger submission or placer lookup still running on its own task.
    /// The store already reflects the optimistic state.
    InFlight(JoinHandle<Result<PlacementOutcome, PlacementError>>),
}

impl SessionOutcome {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SessionOutcome::InFlight(_))
    }

    /// Wait for the remote half, if any.
    pub async fn resolve(self) -> Result<PlacementOutcome, PlacementError> {
        match self {
            SessionOutcome::Done(outcome) => Ok(outcome),
            SessionOutcome::InFlight(task) => task.await?,
        }
    }
}

/// One rendered canvas: its viewport and the pipeline its clicks feed.
pub struct CanvasSession<L, S> {
    controller: ViewportController,
    pipeline: PlacementPipeline<L, S>,
    erasing: bool,
}

impl<L: Ledger, S: CanvasService> CanvasSession<L, S> {
    pub fn new(layout: ViewportLayout, pipeline: PlacementPipeline<L, S>) -> Self {
        Self {
            controller: ViewportController::new(layout),
            pipeline,
            erasing: false,
        }
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.controller
    }

    pub fn pipeline(&self) -> &PlacementPipeline<L, S> {
        &self.pipeline
    }

    pub fn subscribe(&self) -> InputSubscription {
        self.controller.subscribe()
    }

    async fn mode(&self) -> Mode {
        self.pipeline.store().read().await.mode()
    }

    async fn sync_drag_intercept(&mut self) -> Mode {
        let mode = self.mode().await;
        self.controller.set_drag_intercept(mode.intercepts_drag());
        mode
    }

    async fn cell_at(&self, at: Point) -> Option<(u32, u32)> {
        let (width, height) = {
            let store = self.pipeline.store().read().await;
            (store.canvas().width(), store.canvas().height())
        };
        screen_to_grid(at, &self.controller.viewport().canvas_rect(), width, height)
    }

    /// Spawn the network half so input keeps flowing while it runs.
    fn run(&self, step: Step) -> SessionOutcome {
        match step {
            Step::Done(outcome) => SessionOutcome::Done(outcome),
            Step::Remote(remote) => {
                let pipeline = self.pipeline.clone();
                SessionOutcome::InFlight(tokio::spawn(async move { pipeline.finish(remote).await }))
            }
        }
    }

    /// Route one input event. Viewport changes happen first; then the event
    /// is resolved to a grid cell and its store transition applied. Network
    /// calls never hold up the next event.
    pub async fn handle(&mut self, event: InputEvent) -> Option<SessionOutcome> {
        let mode = self.sync_drag_intercept().await;
        self.controller.dispatch(event.clone());

        let outcome = match event {
            InputEvent::Click(at) => match self.cell_at(at).await {
                Some((x, y)) => self.click(mode, x, y).await,
                None => None,
            },
            InputEvent::Hover(at) => match self.cell_at(at).await {
                Some((x, y)) => {
                    let step = self.pipeline.begin_hover(x, y).await;
                    Some(self.run(step))
                }
                None => None,
            },
            InputEvent::PointerDown(at) => {
                if mode == Mode::Eraser {
                    self.erasing = true;
                    self.erase_under(at).await
                } else {
                    None
                }
            }
            InputEvent::PointerMove(at) => {
                if self.erasing {
                    self.erase_under(at).await
                } else {
                    self.move_stencil(mode, at).await;
                    None
                }
            }
            InputEvent::PointerUp(_) => {
                self.erasing = false;
                None
            }
            InputEvent::Wheel { .. } | InputEvent::TouchStart(_) | InputEvent::TouchMove(_) => None,
        };

        // Placements and erasures can change the mode.
        let mode = self.sync_drag_intercept().await;
        if mode != Mode::Eraser {
            self.erasing = false;
        }
        outcome
    }

    async fn click(&self, mode: Mode, x: u32, y: u32) -> Option<SessionOutcome> {
        let next_mode = match mode {
            Mode::StencilCreation {
                position: Some(_),
                selected: false,
            } => {
                self.pipeline.dispatch(Action::FixStencil).await;
                return None;
            }
            Mode::NftMinting { selected: false } => Mode::NftMinting { selected: true },
            Mode::TemplateCreation { selected: false } => {
                Mode::TemplateCreation { selected: true }
            }
            _ => {
                let step = self.pipeline.begin_click(x, y).await;
                return Some(self.run(step));
            }
        };
        self.pipeline.dispatch(Action::SetMode(next_mode)).await;
        None
    }

    async fn erase_under(&self, at: Point) -> Option<SessionOutcome> {
        let (x, y) = self.cell_at(at).await?;
        let erased = self
            .pipeline
            .dispatch(Action::EraseExtraPixel { x, y })
            .await;
        Some(SessionOutcome::Done(PlacementOutcome::Erased(erased)))
    }

    async fn move_stencil(&self, mode: Mode, at: Point) {
        if !matches!(mode, Mode::StencilCreation { selected: false, .. }) {
            return;
        }
        let Some((x, y)) = self.cell_at(at).await else {
            return;
        };
        let position = {
            let store = self.pipeline.store().read().await;
            store.canvas().position(x, y)
        };
        if let Some(position) = position {
            self.pipeline.dispatch(Action::MoveStencil { position }).await;
        }
    }
}
