//! Session state and the reducer that is its only mutator.

use common::{Canvas, ColorId, Palette};

use crate::overlay::{ExtraPixel, ExtraPixelOverlay};
use crate::quota::Quota;

/// Interaction mode. Creation modes take over clicks for their own
/// placement and suppress pixel placement entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Eraser,
    NftMinting { selected: bool },
    TemplateCreation { selected: bool },
    StencilCreation { position: Option<u32>, selected: bool },
}

impl Mode {
    pub fn suppresses_placement(&self) -> bool {
        !matches!(self, Mode::Normal | Mode::Eraser)
    }

    /// Whether a pointer-down belongs to the mode rather than to drag-pan.
    pub fn intercepts_drag(&self) -> bool {
        matches!(
            self,
            Mode::Eraser
                | Mode::NftMinting { selected: false }
                | Mode::TemplateCreation { selected: false }
                | Mode::StencilCreation { selected: false, .. }
        )
    }
}

/// Where the current placement stands: `Idle -> Selected -> Submitting ->
/// Settled | Failed`.
///
/// Confirmation and submission are one state: `ConfirmPlacement` paints
/// optimistically and spends the base pixel in the same transition that hands
/// the placement to the ledger, so nothing can observe a confirmed but
/// unsubmitted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Selected,
    Submitting,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub x: u32,
    pub y: u32,
}

/// An optimistic base-lane paint awaiting the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    position: u32,
    color: ColorId,
    previous: ColorId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectPixel { x: u32, y: u32 },
    ClearSelection,
    SelectColor(Option<ColorId>),
    SetMode(Mode),
    /// Base lane: clear the color, paint locally, spend the base pixel.
    ConfirmPlacement { position: u32, color: ColorId },
    /// Bonus lane: buffer as many as the remaining allotment allows.
    BufferExtraPixels(Vec<ExtraPixel>),
    EraseExtraPixel { x: u32, y: u32 },
    SettlePlacement { position: u32, now_ms: u64 },
    FailPlacement { position: u32 },
    ApplyRemotePixel { position: u32, color: ColorId },
    SetPixelInfo(Option<String>),
    RefreshQuota { available_pixels: u32 },
    /// The service's record of the last base placement; the countdown runs from it.
    SyncLastPlaced { last_placed_ms: u64 },
    TickQuota { now_ms: u64, time_between_pixels_secs: u64 },
    MoveStencil { position: u32 },
    FixStencil,
}

#[derive(Debug, Clone)]
pub struct Store {
    world_id: Option<u32>,
    canvas: Canvas,
    palette: Palette,
    overlay: ExtraPixelOverlay,
    quota: Quota,
    selection: Option<Selection>,
    selected_color: Option<ColorId>,
    mode: Mode,
    phase: Phase,
    in_flight: Vec<InFlight>,
    pixel_placed_by: Option<String>,
}

impl Store {
    pub fn new(world_id: Option<u32>, canvas: Canvas, palette: Palette, quota: Quota) -> Self {
        let overlay = ExtraPixelOverlay::new(canvas.width(), canvas.height());
        Self {
            world_id,
            canvas,
            palette,
            overlay,
            quota,
            selection: None,
            selected_color: None,
            mode: Mode::Normal,
            phase: Phase::Idle,
            in_flight: Vec::new(),
            pixel_placed_by: None,
        }
    }

    pub fn world_id(&self) -> Option<u32> {
        self.world_id
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn overlay(&self) -> &ExtraPixelOverlay {
        &self.overlay
    }

    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected_color(&self) -> Option<ColorId> {
        self.selected_color
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pixel_placed_by(&self) -> Option<&str> {
        self.pixel_placed_by.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Apply one transition. Returns `false` when the action was a no-op.
    pub fn reduce(&mut self, action: Action) -> bool {
        match action {
            Action::SelectPixel { x, y } => {
                if !self.canvas.contains(x, y) {
                    return false;
                }
                self.selection = Some(Selection { x, y });
                self.phase = Phase::Selected;
            }
            Action::ClearSelection => {
                self.selection = None;
                self.phase = Phase::Idle;
            }
            Action::SelectColor(color) => {
                if color.is_some_and(|c| self.palette.get(c).is_none()) {
                    return false;
                }
                self.selected_color = color;
                if color.is_some() && self.mode == Mode::Eraser {
                    self.mode = Mode::Normal;
                }
            }
            Action::SetMode(mode) => {
                self.mode = mode;
            }
            Action::ConfirmPlacement { position, color } => {
                let Some(previous) = self.canvas.set_position(position, color) else {
                    return false;
                };
                self.selected_color = None;
                self.quota.consume_base();
                self.in_flight.push(InFlight {
                    position,
                    color,
                    previous,
                });
                self.phase = Phase::Submitting;
            }
            Action::BufferExtraPixels(pixels) => {
                let mut placed = 0;
                for pixel in pixels {
                    if self.quota.bonus_remaining() == 0 {
                        break;
                    }
                    if self.overlay.place(pixel) {
                        self.quota.consume_bonus(1);
                        placed += 1;
                    }
                }
                if placed == 0 {
                    return false;
                }
            }
            Action::EraseExtraPixel { x, y } => {
                let erased = self.overlay.erase_at(x, y).is_some();
                if erased {
                    self.quota.refund_bonus();
                }
                if self.overlay.is_empty() && self.mode == Mode::Eraser {
                    self.mode = Mode::Normal;
                }
                return erased;
            }
            Action::SettlePlacement { position, now_ms } => {
                self.take_in_flight(position);
                self.selection = None;
                self.quota.record_placement(now_ms);
                self.phase = Phase::Settled;
            }
            Action::FailPlacement { position } => {
                if let Some(flight) = self.take_in_flight(position) {
                    // Keep newer paints, e.g. from the live feed.
                    if self.canvas.get_position(position) == Some(flight.color) {
                        self.canvas.set_position(position, flight.previous);
                    }
                }
                self.quota.restore_base();
                self.phase = Phase::Failed;
            }
            Action::ApplyRemotePixel { position, color } => {
                if self.canvas.set_position(position, color).is_none() {
                    return false;
                }
            }
            Action::SetPixelInfo(placed_by) => {
                self.pixel_placed_by = placed_by;
            }
            Action::RefreshQuota { available_pixels } => {
                self.quota.refresh_bonus(available_pixels);
            }
            Action::SyncLastPlaced { last_placed_ms } => {
                self.quota.record_placement(last_placed_ms);
            }
            Action::TickQuota {
                now_ms,
                time_between_pixels_secs,
            } => {
                self.quota.tick(now_ms, time_between_pixels_secs);
            }
            Action::MoveStencil { position } => match self.mode {
                Mode::StencilCreation {
                    selected: false, ..
                } => {
                    self.mode = Mode::StencilCreation {
                        position: Some(position),
                        selected: false,
                    };
                }
                _ => return false,
            },
            Action::FixStencil => match self.mode {
                Mode::StencilCreation {
                    position: Some(position),
                    selected: false,
                } => {
                    self.mode = Mode::StencilCreation {
                        position: Some(position),
                        selected: true,
                    };
                }
                _ => return false,
            },
        }
        true
    }

    fn take_in_flight(&mut self, position: u32) -> Option<InFlight> {
        let index = self.in_flight.iter().position(|f| f.position == position)?;
        Some(self.in_flight.remove(index))
    }
}
