pub mod config;
pub mod coords;
pub mod defense;
pub mod error;
pub mod feed;
pub mod input;
pub mod ledger;
pub mod overlay;
pub mod pipeline;
pub mod pixel_info;
pub mod quota;
pub mod service;
pub mod session;
pub mod store;
pub mod viewport;

pub use error::PlacementError;
pub use pipeline::{PlacementOutcome, PlacementPipeline};
pub use store::{Action, Mode, Store};
