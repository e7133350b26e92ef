/// Frame slots - synchronization handles for each in-flight frame
///
/// The ring holds N slots for the lifetime of the pacer. Slot `k` is only
/// reused once its slot-free gate has been confirmed signaled.

use crate::device::{GateHandle, GraphicsDevice, SignalHandle};
use crate::error::{Error, Result};

/// Synchronization handles of one in-flight frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Signaled by the presentation engine when the acquired image is ready
    pub image_acquired: SignalHandle,
    /// Signaled by the graphics queue when the frame's commands retire; presentation waits on it
    pub render_finished: SignalHandle,
    /// Host-visible completion of the slot's last submission (created signaled)
    pub slot_free: GateHandle,
}

/// Fixed ring of N frame slots
#[derive(Debug)]
pub struct FrameSlotRing {
    slots: Vec<FrameSlot>,
}

impl FrameSlotRing {
    /// Create `count` slots
    ///
    /// # Errors
    ///
    /// * `Configuration` if `count` is zero
    /// * `ResourceExhaustion` if any primitive cannot be created; everything
    ///   created so far is released first
    pub fn new<D: GraphicsDevice + ?Sized>(device: &D, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::Configuration(
                "frame slot ring needs at least one slot".to_string(),
            ));
        }

        let mut ring = FrameSlotRing { slots: Vec::with_capacity(count) };
        for index in 0..count {
            match Self::create_slot(device) {
                Ok(slot) => ring.slots.push(slot),
                Err(e) => {
                    ring.destroy(device);
                    return Err(Error::ResourceExhaustion(format!(
                        "frame slot {} of {}: {}",
                        index, count, e
                    )));
                }
            }
        }
        Ok(ring)
    }

    fn create_slot<D: GraphicsDevice + ?Sized>(device: &D) -> Result<FrameSlot> {
        let image_acquired = device.create_signal()?;
        let render_finished = match device.create_signal() {
            Ok(signal) => signal,
            Err(e) => {
                device.destroy_signal(image_acquired);
                return Err(e);
            }
        };
        let slot_free = match device.create_gate(true) {
            Ok(gate) => gate,
            Err(e) => {
                device.destroy_signal(render_finished);
                device.destroy_signal(image_acquired);
                return Err(e);
            }
        };
        Ok(FrameSlot { image_acquired, render_finished, slot_free })
    }

    /// Slot at ring position `cursor`
    ///
    /// # Panics
    ///
    /// If `cursor >= len()`. `FrameCursor` never produces such a value.
    pub fn slot_at(&self, cursor: usize) -> FrameSlot {
        self.slots[cursor]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSlot> {
        self.slots.iter()
    }

    /// Release every primitive. The caller must have drained the device.
    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &D) {
        for slot in self.slots {
            device.destroy_gate(slot.slot_free);
            device.destroy_signal(slot.render_finished);
            device.destroy_signal(slot.image_acquired);
        }
    }
}

/// Current ring position, in `[0, N)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    index: usize,
    len: usize,
}

impl FrameCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len: len.max(1) }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `(cursor + 1) mod N`
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.len;
    }
}

#[cfg(test)]
#[path = "frame_slot_tests.rs"]
mod tests;
