/// Pending rebuild reasons
///
/// Every invalidation report is merged into one set; the next rebuild clears
/// it. Any number of reports before that rebuild cost a single rebuild.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RebuildReasons: u32 {
        /// Acquire reported the chain out of date
        const ACQUIRE_OUT_OF_DATE = 1 << 0;
        /// Acquire succeeded but the chain no longer matches the surface
        const ACQUIRE_SUBOPTIMAL = 1 << 1;
        const PRESENT_SUBOPTIMAL = 1 << 2;
        const PRESENT_OUT_OF_DATE = 1 << 3;
        /// The window reported a new drawable size
        const RESIZED = 1 << 4;
        /// Explicit `FramePacer::request_rebuild`
        const REQUESTED = 1 << 5;
    }
}
