/*!
# Cadence Engine

Frame pacing and presentation-resource lifecycle for swapchain-based renderers.

This crate holds the platform-agnostic core: a bounded-depth frame loop that
keeps up to N frames in flight, and the presentation chain (swapchain images,
views, render targets) that is rebuilt whenever the surface changes. GPU and
window-system access go through two traits so that backends (Vulkan today)
and the simulated GPU used by the unit tests plug in the same way.

## Architecture

- **GraphicsDevice**: gates, signals, command buffers, views, render targets, queue submission
- **PresentationSurface**: surface capabilities, swapchain creation, acquire and present
- **PresentableChain**: one generation of swapchain + per-image views and render targets
- **FrameSlotRing**: per-slot synchronization handles, fixed for the pacer's lifetime
- **ImageOwnershipTable**: which slot gate last wrote each presentable image
- **FramePacer**: the per-frame WAIT_SLOT / ACQUIRE / REBUILD / RECORD / SUBMIT / PRESENT loop
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod device;
pub mod chain;
pub mod frame;
pub mod pacer;

// Main cadence namespace module
pub mod cadence {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger registry)
    pub use crate::engine::Engine;

    pub use crate::config::Config;

    // Frame loop entry points
    pub use crate::pacer::{FramePacer, FramePhase, FrameStatus, PacerStats, RecordCallback, RecordTarget};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend-facing traits and value types
    pub mod device {
        pub use crate::device::*;
    }

    pub mod chain {
        pub use crate::chain::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod pacer {
        pub use crate::pacer::*;
    }
}
