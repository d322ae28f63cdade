//! Umbra bridge: wires the renderer to a GPU device and a presentation target,
//! either a window surface or an offscreen texture with pixel readback.

mod error;
mod gpu;
mod offscreen;
mod window_backend;

pub use error::BridgeError;
pub use offscreen::OffscreenBackend;
pub use window_backend::UmbraWindowBackend;
