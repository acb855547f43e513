use serde::{Deserialize, Serialize};

use crate::palette::ColorId;

/// Color id marking a transparent template cell. Never compared or placed.
pub const TRANSPARENT: ColorId = 0xFF;

/// A reference image anchored on a canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Linear canvas position of the top-left cell.
    pub position: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` entries.
    pub color_indices: Vec<ColorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Template {
    /// Top-left `(x, y)` on a canvas of the given width.
    pub fn origin(&self, canvas_width: u32) -> (u32, u32) {
        if canvas_width == 0 {
            return (0, 0);
        }
        (self.position % canvas_width, self.position / canvas_width)
    }

    /// `width * height`, or `None` if it does not fit in memory.
    pub fn cell_count(&self) -> Option<usize> {
        let cells = self.width.checked_mul(self.height)?;
        usize::try_from(cells).ok()
    }

    /// Whether `color_indices` covers exactly `width * height` cells.
    pub fn is_well_formed(&self) -> bool {
        self.cell_count() == Some(self.color_indices.len())
    }

    /// Target color at template-local `(x, y)`; `None` when transparent or
    /// outside the template.
    pub fn color_at(&self, x: u32, y: u32) -> Option<ColorId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.color_indices
            .get(index)
            .copied()
            .filter(|&c| c != TRANSPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{"position":520,"width":2,"height":1,"colorIndices":[3,255]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.origin(518), (2, 1));
        assert_eq!(template.color_at(0, 0), Some(3));
        assert_eq!(template.color_at(1, 0), None);
        assert_eq!(template.color_at(2, 0), None);
    }

    #[test]
    fn oversized_dimensions_are_rejected_without_overflow() {
        let hostile = Template {
            position: 0,
            width: u32::MAX,
            height: 2,
            color_indices: vec![1, 2],
            image: None,
        };
        assert_eq!(hostile.cell_count(), None);
        assert!(!hostile.is_well_formed());

        let short = Template {
            width: 2,
            height: 2,
            ..hostile.clone()
        };
        assert!(!short.is_well_formed());
        let exact = Template {
            width: 2,
            height: 1,
            ..hostile
        };
        assert!(exact.is_well_formed());
    }
}
