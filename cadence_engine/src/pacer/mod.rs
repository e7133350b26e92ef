/// Pacer module - the per-frame acquire / record / submit / present loop

pub mod frame_pacer;
pub mod rebuild;
pub mod record;

pub use frame_pacer::*;
pub use rebuild::*;
pub use record::*;
