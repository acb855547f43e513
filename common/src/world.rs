use serde::{Deserialize, Serialize};

/// A named sub-canvas as listed by `get-all-worlds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub world_id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub unique_name: String,
    /// Base lane cooldown in seconds, when the service reports it.
    #[serde(default)]
    pub time_between_pixels: Option<u64>,
}
