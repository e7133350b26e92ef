/// Frame module - per-frame synchronization state

pub mod frame_slot;
pub mod image_ownership;

pub use frame_slot::*;
pub use image_ownership::*;
