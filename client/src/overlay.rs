//! Pending bonus placements, kept apart from the base canvas and
//! composited over it.

use common::{Canvas, ColorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraPixel {
    pub x: u32,
    pub y: u32,
    pub color: ColorId,
}

/// What a viewer sees at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Base(ColorId),
    PendingBonus(ColorId),
}

impl Cell {
    pub fn color(self) -> ColorId {
        match self {
            Cell::Base(c) | Cell::PendingBonus(c) => c,
        }
    }
}

/// Transparent layer the size of the base canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraPixelOverlay {
    width: u32,
    height: u32,
    pending: Vec<ExtraPixel>,
    cells: Vec<Option<ColorId>>,
}

impl ExtraPixelOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pending: Vec::new(),
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[ExtraPixel] {
        &self.pending
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    /// Draw a pending pixel. Out-of-bounds pixels are dropped.
    pub fn place(&mut self, pixel: ExtraPixel) -> bool {
        let Some(index) = self.index(pixel.x, pixel.y) else {
            return false;
        };
        self.cells[index] = Some(pixel.color);
        self.pending.push(pixel);
        true
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<ColorId> {
        self.index(x, y).and_then(|i| self.cells[i])
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.color_at(x, y).is_some()
    }

    /// Remove the pending entry at `(x, y)`. Linear scan; allotments are small.
    pub fn erase_at(&mut self, x: u32, y: u32) -> Option<ExtraPixel> {
        let entry = self.pending.iter().position(|p| p.x == x && p.y == y)?;
        let removed = self.pending.remove(entry);
        if let Some(index) = self.index(x, y) {
            // An earlier entry on the same cell shows through again.
            self.cells[index] = self
                .pending
                .iter()
                .rev()
                .find(|p| p.x == x && p.y == y)
                .map(|p| p.color);
        }
        Some(removed)
    }

    /// Overlay cell if pending, else the base cell.
    pub fn composite(&self, canvas: &Canvas, x: u32, y: u32) -> Option<Cell> {
        match self.color_at(x, y) {
            Some(color) => Some(Cell::PendingBonus(color)),
            None => canvas.get(x, y).map(Cell::Base),
        }
    }
}
