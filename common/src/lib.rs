pub mod canvas;
pub mod palette;
pub mod routes;
pub mod template;
pub mod wire;
pub mod world;

pub use canvas::Canvas;
pub use palette::{ColorId, Palette};
pub use template::{Template, TRANSPARENT};
pub use wire::{DevnetPlacePixel, Envelope, FeedMessage, PlacePixelNotice, Subscription};
pub use world::World;
