/// FramePacer - bounded-depth frame loop over a rebuildable presentation chain
///
/// One pacer per window surface. Each `run_once` walks:
///
/// ```text
/// WAIT_SLOT -> ACQUIRE -> (REBUILD)* -> AWAIT_IMAGE_OWNER -> RECORD -> SUBMIT -> PRESENT -> ADVANCE
/// ```
///
/// Host blocking happens only in WAIT_SLOT, ACQUIRE, AWAIT_IMAGE_OWNER and the
/// device drain of REBUILD. The slot gate wait is the only backpressure: at
/// most N frames are ever in flight.

use crate::chain::PresentableChain;
use crate::config::Config;
use crate::device::{
    AcquireOutcome, CommandBufferHandle, CommandPoolHandle, Extent2D, GraphicsDevice,
    PresentOutcome, PresentationSurface, RenderPassHandle, Submission,
};
use crate::error::{Error, Result};
use crate::frame::{FrameCursor, FrameSlot, FrameSlotRing, ImageOwnershipTable};
use crate::pacer::{RebuildReasons, RecordCallback, RecordTarget};
use crate::{engine_debug, engine_error, engine_info, engine_trace};

/// Last phase the pacer entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Constructed, no frame run yet
    Idle,
    WaitSlot,
    Acquire,
    Rebuild,
    AwaitImageOwner,
    Record,
    Submit,
    Present,
    Advance,
    /// Last iteration issued no GPU work (zero-area drawable)
    Deferred,
    /// A fatal error occurred; every later frame returns it
    Failed,
    Shutdown,
}

/// Result of one `run_once`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and queued for presentation
    Presented { image_index: u32, slot: usize, generation: u64 },
    /// The drawable area is zero (e.g., minimized); nothing was issued
    Deferred,
}

/// Counters since construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacerStats {
    pub frames_presented: u64,
    pub rebuilds: u64,
    pub deferred_frames: u64,
    /// AWAIT_IMAGE_OWNER had to block
    pub owner_waits: u64,
    /// ACQUIRE reported out of date and was retried after a rebuild
    pub acquire_retries: u64,
}

/// Frame pacer over a graphics device and a presentation surface
///
/// # Example
///
/// ```ignore
/// let mut pacer = FramePacer::new(device, surface, render_pass, Config::default())?;
/// while running {
///     pacer.run_once(&mut |target: &RecordTarget, cmd: CommandBufferHandle| {
///         // record draw commands into `cmd` targeting `target.render_target`
///     })?;
/// }
/// pacer.shutdown()?;
/// ```
pub struct FramePacer<D: GraphicsDevice, S: PresentationSurface> {
    device: D,
    surface: S,
    config: Config,
    render_pass: RenderPassHandle,

    slots: Option<FrameSlotRing>,
    chain: Option<PresentableChain>,
    owners: ImageOwnershipTable,
    command_pool: CommandPoolHandle,
    command_buffers: Vec<CommandBufferHandle>,

    cursor: FrameCursor,
    pending: RebuildReasons,
    phase: FramePhase,
    failure: Option<Error>,
    stats: PacerStats,
}

impl<D: GraphicsDevice, S: PresentationSurface> FramePacer<D, S> {
    /// Create the slot ring, the first chain generation and the command pool
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Pass every render target is created against. It must
    ///   be compatible with `PresentableChain::select_format` for this surface.
    ///
    /// # Errors
    ///
    /// Any error from config validation, slot creation or the initial chain
    /// build. Everything created before the failure is released.
    pub fn new(device: D, surface: S, render_pass: RenderPassHandle, config: Config) -> Result<Self> {
        config.validate()?;

        let mut pacer = FramePacer {
            device,
            surface,
            cursor: FrameCursor::new(config.frames_in_flight),
            config,
            render_pass,
            slots: None,
            chain: None,
            owners: ImageOwnershipTable::default(),
            command_pool: CommandPoolHandle::NULL,
            command_buffers: Vec::new(),
            pending: RebuildReasons::empty(),
            phase: FramePhase::Idle,
            failure: None,
            stats: PacerStats::default(),
        };

        // On any error below, dropping `pacer` releases what exists
        pacer.slots = Some(FrameSlotRing::new(&pacer.device, pacer.config.frames_in_flight)?);

        let chain = PresentableChain::build(
            &pacer.device,
            &pacer.surface,
            &pacer.config,
            pacer.render_pass,
            None,
        )?;
        pacer.owners = ImageOwnershipTable::new(chain.image_count());
        pacer.chain = Some(chain);
        pacer.create_commands()?;

        if let Some(chain) = &pacer.chain {
            engine_info!(
                "cadence::FramePacer",
                "Frame pacer ready: {} frames in flight, {} images {}x{} ({:?}, {:?})",
                pacer.config.frames_in_flight,
                chain.image_count(),
                chain.extent().width,
                chain.extent().height,
                chain.format().format,
                chain.present_mode()
            );
        }
        Ok(pacer)
    }

    // ===== FRAME LOOP =====

    /// Run one frame iteration
    ///
    /// # Errors
    ///
    /// Any fatal error. The error is sticky: every later call returns it
    /// again without touching the GPU. Call `shutdown` afterwards.
    pub fn run_once<R: RecordCallback + ?Sized>(&mut self, record: &mut R) -> Result<FrameStatus> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        match self.frame(record) {
            Ok(status) => Ok(status),
            Err(error) => {
                engine_error!(
                    "cadence::FramePacer",
                    "Fatal error during {:?} (slot {}): {}",
                    self.phase,
                    self.cursor.index(),
                    error
                );
                self.phase = FramePhase::Failed;
                self.failure = Some(error.clone());
                Err(error)
            }
        }
    }

    fn frame<R: RecordCallback + ?Sized>(&mut self, record: &mut R) -> Result<FrameStatus> {
        // The drawable is only consulted ahead of a rebuild. A zero-area
        // drawable (minimized window) defers the frame and keeps the rebuild
        // pending; steady-state frames talk to the surface only through
        // acquire and present.
        if !self.pending.is_empty() {
            if self.surface.drawable_extent().is_empty() {
                return Ok(self.defer());
            }
            self.rebuild()?;
        }

        let slot_index = self.cursor.index();
        let slot = self.slot(slot_index)?;

        // WAIT_SLOT
        self.enter(FramePhase::WaitSlot);
        self.device.wait_gates(&[slot.slot_free])?;

        // ACQUIRE (+ REBUILD on out of date)
        let mut retried_at: Option<(Extent2D, Extent2D)> = None;
        let (image_index, suboptimal) = loop {
            self.enter(FramePhase::Acquire);
            let swapchain = self.current_chain()?.swapchain();
            match self.surface.acquire_next_image(swapchain, slot.image_acquired)? {
                AcquireOutcome::Acquired { image_index, suboptimal } => break (image_index, suboptimal),
                AcquireOutcome::OutOfDate => {
                    if let Some((before, after)) = retried_at {
                        if before == after {
                            return Err(Error::BackendError(format!(
                                "swapchain out of date again right after a rebuild at unchanged extent {}x{}",
                                after.width, after.height
                            )));
                        }
                    }
                    self.stats.acquire_retries += 1;
                    self.pending |= RebuildReasons::ACQUIRE_OUT_OF_DATE;
                    if self.surface.drawable_extent().is_empty() {
                        return Ok(self.defer());
                    }
                    let before = self.current_chain()?.extent();
                    self.rebuild()?;
                    retried_at = Some((before, self.current_chain()?.extent()));
                }
            }
        };
        if suboptimal {
            self.pending |= RebuildReasons::ACQUIRE_SUBOPTIMAL;
        }

        // AWAIT_IMAGE_OWNER
        self.enter(FramePhase::AwaitImageOwner);
        if self.owners.await_owner(&self.device, image_index as usize)? {
            self.stats.owner_waits += 1;
        }

        // RECORD
        self.enter(FramePhase::Record);
        let command_buffer = self
            .command_buffers
            .get(slot_index)
            .copied()
            .ok_or_else(|| Error::BackendError(format!("no command buffer for slot {}", slot_index)))?;
        let target = self.record_target(image_index, slot_index)?;
        self.device.begin_commands(command_buffer)?;
        record.record(&target, command_buffer);
        self.device.end_commands(command_buffer)?;

        // SUBMIT
        self.enter(FramePhase::Submit);
        self.device.reset_gates(&[slot.slot_free])?;
        self.device.submit(&Submission {
            command_buffer,
            wait: slot.image_acquired,
            signal: slot.render_finished,
            gate: slot.slot_free,
        })?;
        self.owners.record_owner(image_index as usize, slot.slot_free)?;

        // PRESENT
        self.enter(FramePhase::Present);
        let outcome = self
            .surface
            .present(self.current_chain()?.swapchain(), image_index, slot.render_finished)?;
        let reason = match outcome {
            PresentOutcome::Optimal => RebuildReasons::empty(),
            PresentOutcome::Suboptimal => RebuildReasons::PRESENT_SUBOPTIMAL,
            PresentOutcome::OutOfDate => RebuildReasons::PRESENT_OUT_OF_DATE,
        };
        // Absorbed only when this frame's acquire already forced a rebuild
        if !reason.is_empty() {
            if retried_at.is_some() {
                engine_debug!(
                    "cadence::FramePacer",
                    "Present reported {:?} on a chain rebuilt by this frame's acquire, absorbed",
                    outcome
                );
            } else {
                self.pending |= reason;
            }
        }

        // ADVANCE
        self.enter(FramePhase::Advance);
        self.cursor.advance();
        self.stats.frames_presented += 1;

        Ok(FrameStatus::Presented {
            image_index,
            slot: slot_index,
            generation: target.generation,
        })
    }

    fn defer(&mut self) -> FrameStatus {
        self.enter(FramePhase::Deferred);
        self.stats.deferred_frames += 1;
        FrameStatus::Deferred
    }

    fn enter(&mut self, phase: FramePhase) {
        self.phase = phase;
        engine_trace!("cadence::FramePacer", "{:?} (slot {})", phase, self.cursor.index());
    }

    // ===== REBUILD =====

    /// Drain, rebuild the chain from the previous generation, reset ownership
    /// and recreate the command buffers
    fn rebuild(&mut self) -> Result<()> {
        self.enter(FramePhase::Rebuild);
        let reasons = std::mem::replace(&mut self.pending, RebuildReasons::empty());

        self.device.wait_idle()?;
        self.destroy_commands();

        let previous = self.chain.take();
        let chain = PresentableChain::build(
            &self.device,
            &self.surface,
            &self.config,
            self.render_pass,
            previous,
        )?;
        self.owners.reset(chain.image_count());

        engine_info!(
            "cadence::FramePacer",
            "Rebuilt presentation chain: generation {}, {} images {}x{} ({:?})",
            chain.generation(),
            chain.image_count(),
            chain.extent().width,
            chain.extent().height,
            reasons
        );
        self.chain = Some(chain);
        self.create_commands()?;
        self.stats.rebuilds += 1;
        Ok(())
    }

    /// Mark a rebuild as pending (idempotent until the next rebuild)
    pub fn request_rebuild(&mut self) {
        self.pending |= RebuildReasons::REQUESTED;
    }

    /// Report a new drawable size from the window system
    ///
    /// A size equal to the current chain extent is ignored.
    pub fn notify_resized(&mut self, extent: Extent2D) {
        if self.chain.as_ref().is_some_and(|chain| chain.extent() == extent) {
            return;
        }
        engine_debug!(
            "cadence::FramePacer",
            "Drawable resized to {}x{}",
            extent.width,
            extent.height
        );
        self.pending |= RebuildReasons::RESIZED;
    }

    // ===== COMMAND BUFFERS =====

    fn create_commands(&mut self) -> Result<()> {
        self.command_pool = self.device.create_command_pool()?;
        self.command_buffers = self
            .device
            .allocate_command_buffers(self.command_pool, self.config.frames_in_flight)?;
        Ok(())
    }

    fn destroy_commands(&mut self) {
        self.command_buffers.clear();
        let pool = std::mem::replace(&mut self.command_pool, CommandPoolHandle::NULL);
        if !pool.is_null() {
            self.device.destroy_command_pool(pool);
        }
    }

    // ===== SHUTDOWN =====

    /// Drain the device and release every object the pacer created
    ///
    /// Runs after fatal errors too. Also run (best effort) on drop.
    pub fn shutdown(mut self) -> Result<()> {
        let result = self.release();
        engine_info!(
            "cadence::FramePacer",
            "Frame pacer shut down after {} frames ({} rebuilds)",
            self.stats.frames_presented,
            self.stats.rebuilds
        );
        result
    }

    fn release(&mut self) -> Result<()> {
        if self.slots.is_none() && self.chain.is_none() && self.command_pool.is_null() {
            return Ok(());
        }

        let drained = self.device.wait_idle();
        if let Err(e) = &drained {
            engine_error!("cadence::FramePacer", "Drain before release failed: {}", e);
        }

        self.destroy_commands();
        if let Some(chain) = self.chain.take() {
            chain.destroy(&self.device, &self.surface);
        }
        if let Some(slots) = self.slots.take() {
            slots.destroy(&self.device);
        }
        self.phase = FramePhase::Shutdown;
        drained
    }

    // ===== ACCESSORS =====

    fn slot(&self, index: usize) -> Result<FrameSlot> {
        match &self.slots {
            Some(slots) if index < slots.len() => Ok(slots.slot_at(index)),
            _ => Err(Error::BackendError(format!("no frame slot {}", index))),
        }
    }

    fn current_chain(&self) -> Result<&PresentableChain> {
        self.chain
            .as_ref()
            .ok_or_else(|| Error::BackendError("no presentation chain".to_string()))
    }

    fn record_target(&self, image_index: u32, slot: usize) -> Result<RecordTarget> {
        let chain = self.current_chain()?;
        let i = image_index as usize;
        match (chain.images().get(i), chain.views().get(i), chain.render_targets().get(i)) {
            (Some(&image), Some(&view), Some(&render_target)) => Ok(RecordTarget {
                image_index,
                slot,
                render_target,
                image,
                view,
                extent: chain.extent(),
                format: chain.format().format,
                render_pass: self.render_pass,
                generation: chain.generation(),
            }),
            _ => Err(Error::BackendError(format!(
                "acquired image {} outside the chain ({} images)",
                image_index,
                chain.image_count()
            ))),
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Ring position of the next frame
    pub fn cursor(&self) -> usize {
        self.cursor.index()
    }

    /// Current chain (None only after shutdown or a failed rebuild)
    pub fn chain(&self) -> Option<&PresentableChain> {
        self.chain.as_ref()
    }

    pub fn slots(&self) -> Option<&FrameSlotRing> {
        self.slots.as_ref()
    }

    pub fn stats(&self) -> PacerStats {
        self.stats
    }

    pub fn pending_rebuild(&self) -> RebuildReasons {
        self.pending
    }

    /// The sticky fatal error, if any
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<D: GraphicsDevice, S: PresentationSurface> Drop for FramePacer<D, S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
#[path = "frame_pacer_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "frame_pacer_property_tests.rs"]
mod property_tests;
