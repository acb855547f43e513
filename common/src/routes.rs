//! Canvas Service route and channel names.

/// Paginated world listing.
pub const ALL_WORLDS: &str = "get-all-worlds";

/// Cache notification after an on-chain placement.
pub const PLACE_PIXEL: &str = "place-pixel";

/// Ledger-less placement on the main canvas.
pub const PLACE_PIXEL_DEVNET: &str = "place-pixel-devnet";

/// Ledger-less placement on a world.
pub const PLACE_WORLD_PIXEL_DEVNET: &str = "place-world-pixel-devnet";

/// Websocket channel carrying main canvas updates.
pub const GENERAL_CHANNEL: &str = "general";

/// "Who placed this pixel" lookup.
pub fn pixel_info_path(world_id: Option<u32>, position: u32) -> String {
    match world_id {
        None => format!("get-pixel-info?position={position}"),
        Some(id) => format!("get-worlds-pixel-info?position={position}&worldId={id}"),
    }
}

/// Packed canvas blob.
pub fn canvas_path(world_id: Option<u32>) -> String {
    match world_id {
        None => "get-canvas".to_string(),
        Some(id) => format!("get-world-canvas?worldId={id}"),
    }
}

/// Palette as a list of hex strings.
pub fn colors_path(world_id: Option<u32>) -> String {
    match world_id {
        None => "get-colors".to_string(),
        Some(id) => format!("get-worlds-colors?worldId={id}"),
    }
}

/// Bonus allotment for an account.
pub fn extra_pixels_path(world_id: Option<u32>, address: &str) -> String {
    match world_id {
        None => format!("get-extra-pixels?address={address}"),
        Some(id) => format!("get-worlds-extra-pixels?worldId={id}&address={address}"),
    }
}

/// When an account last placed a base pixel, as an RFC 3339 string.
pub fn last_placed_time_path(world_id: Option<u32>, address: &str) -> String {
    match world_id {
        None => format!("get-last-placed-time?address={address}"),
        Some(id) => format!("get-worlds-last-placed-time?worldId={id}&address={address}"),
    }
}

pub fn all_worlds_path(page: u32, page_length: u32) -> String {
    format!("{ALL_WORLDS}?address=0&page={page}&pageLength={page_length}")
}

pub fn devnet_place_path(world_id: Option<u32>) -> &'static str {
    match world_id {
        None => PLACE_PIXEL_DEVNET,
        Some(_) => PLACE_WORLD_PIXEL_DEVNET,
    }
}

/// Websocket channel for a world, or the general channel.
pub fn world_channel(world_id: Option<u32>) -> String {
    match world_id {
        None => GENERAL_CHANNEL.to_string(),
        Some(id) => format!("world_{id}"),
    }
}
