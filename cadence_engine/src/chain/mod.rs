/// Chain module - presentable images and their per-image resources

pub mod presentable_chain;

pub use presentable_chain::*;
