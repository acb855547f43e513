use crate::palette::ColorId;

/// Main canvas width in cells.
pub const DEFAULT_WIDTH: u32 = 518;

/// Main canvas height in cells.
pub const DEFAULT_HEIGHT: u32 = 396;

/// Row-major grid of color ids. Index = `y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<ColorId>,
}

impl Canvas {
    /// A blank canvas, every cell set to color 0.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap an existing pixel buffer. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<ColorId>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode the Canvas Service blob: `bit_width` bits per cell, MSB first,
    /// row-major. Cells past the end of a short blob stay 0.
    pub fn from_packed(width: u32, height: u32, bit_width: u8, bytes: &[u8]) -> Self {
        let mut canvas = Self::new(width, height);
        if bit_width == 0 || bit_width > 8 {
            return canvas;
        }
        let bit_width = bit_width as usize;
        let mask = (1u16 << bit_width) - 1;

        for (i, cell) in canvas.pixels.iter_mut().enumerate() {
            let bit = i * bit_width;
            let byte = bit / 8;
            if byte >= bytes.len() {
                break;
            }
            // Read two bytes so a cell may straddle a byte boundary.
            let hi = bytes[byte] as u16;
            let lo = bytes.get(byte + 1).copied().unwrap_or(0) as u16;
            let word = (hi << 8) | lo;
            let shift = 16 - (bit % 8) - bit_width;
            *cell = ((word >> shift) & mask) as ColorId;
        }
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[ColorId] {
        &self.pixels
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Linear position of a cell, or `None` if out of bounds.
    pub fn position(&self, x: u32, y: u32) -> Option<u32> {
        self.contains(x, y).then(|| y * self.width + x)
    }

    /// Inverse of [`Canvas::position`].
    pub fn coords(&self, position: u32) -> Option<(u32, u32)> {
        if self.width == 0 || position as usize >= self.pixels.len() {
            return None;
        }
        Some((position % self.width, position / self.width))
    }

    pub fn get(&self, x: u32, y: u32) -> Option<ColorId> {
        let position = self.position(x, y)?;
        self.pixels.get(position as usize).copied()
    }

    pub fn get_position(&self, position: u32) -> Option<ColorId> {
        self.pixels.get(position as usize).copied()
    }

    /// Paint a cell. Returns the previous color, or `None` if out of bounds.
    pub fn set(&mut self, x: u32, y: u32, color: ColorId) -> Option<ColorId> {
        let position = self.position(x, y)?;
        self.set_position(position, color)
    }

    pub fn set_position(&mut self, position: u32, color: ColorId) -> Option<ColorId> {
        let cell = self.pixels.get_mut(position as usize)?;
        Some(std::mem::replace(cell, color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_coords() {
        let canvas = Canvas::new(518, 396);
        let position = canvas.position(17, 200).unwrap();
        assert_eq!(position, 200 * 518 + 17);
        assert_eq!(canvas.coords(position), Some((17, 200)));
        assert_eq!(canvas.position(518, 0), None);
        assert_eq!(canvas.coords(518 * 396), None);
    }

    #[test]
    fn set_returns_previous_color() {
        let mut canvas = Canvas::new(4, 4);
        assert_eq!(canvas.set(1, 2, 9), Some(0));
        assert_eq!(canvas.set(1, 2, 3), Some(9));
        assert_eq!(canvas.get(1, 2), Some(3));
        assert_eq!(canvas.set(4, 0, 1), None);
    }

    #[test]
    fn from_pixels_checks_length() {
        assert!(Canvas::from_pixels(2, 2, vec![0; 3]).is_none());
        assert!(Canvas::from_pixels(2, 2, vec![0; 4]).is_some());
    }

    #[test]
    fn decodes_five_bit_cells_across_byte_boundaries() {
        // Cells 1, 2, 31 packed MSB-first at 5 bits: 00001 00010 11111 (+0 pad)
        let bytes = [0b0000_1000, 0b1011_1110];
        let canvas = Canvas::from_packed(3, 1, 5, &bytes);
        assert_eq!(canvas.pixels(), &[1, 2, 31]);
    }

    #[test]
    fn short_blob_leaves_trailing_cells_blank() {
        let canvas = Canvas::from_packed(4, 1, 8, &[7, 8]);
        assert_eq!(canvas.pixels(), &[7, 8, 0, 0]);
    }
}
