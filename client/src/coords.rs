//! Screen <-> grid mapping.
//!
//! Mapping goes through the rendered element's bounding box, which already
//! reflects pan and zoom, so none of these functions look at the viewport.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Bounding box of the rendered canvas element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Grid cell under a screen point, or `None` when outside the grid.
pub fn screen_to_grid(point: Point, rect: &Rect, grid_width: u32, grid_height: u32) -> Option<(u32, u32)> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let x = ((point.x - rect.left) / rect.width * grid_width as f64).floor();
    let y = ((point.y - rect.top) / rect.height * grid_height as f64).floor();
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    if x < 0.0 || y < 0.0 || x >= grid_width as f64 || y >= grid_height as f64 {
        return None;
    }
    Some((x as u32, y as u32))
}

/// Screen position of the center of a grid cell.
pub fn grid_to_screen(x: u32, y: u32, rect: &Rect, grid_width: u32, grid_height: u32) -> Point {
    let cell_w = rect.width / grid_width.max(1) as f64;
    let cell_h = rect.height / grid_height.max(1) as f64;
    Point::new(
        rect.left + (x as f64 + 0.5) * cell_w,
        rect.top + (y as f64 + 0.5) * cell_h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect {
            left: -209.0,
            top: 12.5,
            width: 518.0 * 2.5,
            height: 396.0 * 2.5,
        }
    }

    #[test]
    fn cell_centers_map_back_to_their_cell() {
        let rect = rect();
        for &(x, y) in &[(0, 0), (517, 395), (259, 198), (1, 394)] {
            let p = grid_to_screen(x, y, &rect, 518, 396);
            assert_eq!(screen_to_grid(p, &rect, 518, 396), Some((x, y)));
        }
    }

    #[test]
    fn points_outside_the_element_are_out_of_bounds() {
        let rect = rect();
        assert_eq!(screen_to_grid(Point::new(-209.5, 100.0), &rect, 518, 396), None);
        assert_eq!(screen_to_grid(Point::new(rect.right(), 100.0), &rect, 518, 396), None);
        assert_eq!(screen_to_grid(Point::new(0.0, rect.bottom() + 1.0), &rect, 518, 396), None);
    }

    #[test]
    fn degenerate_rect_maps_nothing() {
        let rect = Rect {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 10.0,
        };
        assert_eq!(screen_to_grid(Point::new(0.0, 0.0), &rect, 4, 4), None);
    }

    #[test]
    fn non_finite_points_map_nothing() {
        let rect = rect();
        assert_eq!(screen_to_grid(Point::new(f64::NAN, 100.0), &rect, 518, 396), None);
        assert_eq!(screen_to_grid(Point::new(100.0, f64::NAN), &rect, 518, 396), None);
        assert_eq!(screen_to_grid(Point::new(f64::INFINITY, 100.0), &rect, 518, 396), None);
    }
}
