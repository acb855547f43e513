use serde::{Deserialize, Serialize};

/// Index into a [`Palette`]. Stable for the lifetime of a world.
pub type ColorId = u8;

/// Ordered list of hex colors, e.g. `"FF5733"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Self {
        let colors = colors
            .into_iter()
            .map(|c| c.trim_start_matches('#').to_string())
            .collect();
        Self { colors }
    }

    pub fn get(&self, id: ColorId) -> Option<&str> {
        self.colors.get(id as usize).map(String::as_str)
    }

    /// Whether color `id` renders as `hex`, ignoring case.
    pub fn matches(&self, id: ColorId, hex: &str) -> bool {
        self.get(id)
            .is_some_and(|c| c.eq_ignore_ascii_case(hex.trim_start_matches('#')))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl From<Vec<String>> for Palette {
    fn from(colors: Vec<String>) -> Self {
        Self::new(colors)
    }
}

impl From<Palette> for Vec<String> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hash_and_compares_case_insensitively() {
        let palette = Palette::new(vec!["#fafafa".into(), "080808".into()]);
        assert_eq!(palette.get(0), Some("fafafa"));
        assert!(palette.matches(0, "FAFAFA"));
        assert!(!palette.matches(1, "fafafa"));
        assert!(!palette.matches(7, "fafafa"));
    }
}
