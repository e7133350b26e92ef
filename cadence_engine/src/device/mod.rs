/// Device module - external collaborator seams of the frame pacer

pub mod handle;
pub mod format;
pub mod graphics_device;
pub mod presentation_surface;

pub use handle::*;
pub use format::*;
pub use graphics_device::*;
pub use presentation_surface::*;

// Simulated GPU for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
