/// ImageOwnershipTable - which slot gate last wrote each presentable image
///
/// The presentation engine may hand back an image whose previous frame is
/// still executing under a different slot. Before writing image `i`, its
/// recorded gate must be confirmed signaled.

use crate::device::{GateHandle, GraphicsDevice};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct ImageOwnershipTable {
    owners: Vec<Option<GateHandle>>,
}

impl ImageOwnershipTable {
    /// Table for `image_count` images, all free
    pub fn new(image_count: usize) -> Self {
        Self { owners: vec![None; image_count] }
    }

    /// Resize to `image_count` and forget every owner
    ///
    /// Only valid after a full device drain (every recorded gate signaled).
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Gate of the last submission that wrote `image_index`
    pub fn owner(&self, image_index: usize) -> Result<Option<GateHandle>> {
        self.owners
            .get(image_index)
            .copied()
            .ok_or_else(|| out_of_range(image_index, self.owners.len()))
    }

    /// Record `gate` as the writer of `image_index` (overwrites)
    pub fn record_owner(&mut self, image_index: usize, gate: GateHandle) -> Result<()> {
        let len = self.owners.len();
        let owner = self
            .owners
            .get_mut(image_index)
            .ok_or_else(|| out_of_range(image_index, len))?;
        *owner = Some(gate);
        Ok(())
    }

    /// Block until the recorded owner of `image_index` is signaled
    ///
    /// Queries the gate first and only waits when it is unsignaled.
    /// Returns true if a wait was needed.
    pub fn await_owner<D: GraphicsDevice + ?Sized>(&self, device: &D, image_index: usize) -> Result<bool> {
        let Some(gate) = self.owner(image_index)? else {
            return Ok(false);
        };
        if device.gate_status(gate)? {
            return Ok(false);
        }
        device.wait_gates(&[gate])?;
        Ok(true)
    }
}

fn out_of_range(image_index: usize, len: usize) -> Error {
    Error::BackendError(format!(
        "image index {} out of range ({} images)",
        image_index, len
    ))
}

#[cfg(test)]
#[path = "image_ownership_tests.rs"]
mod tests;
