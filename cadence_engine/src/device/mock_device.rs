/// Simulated GPU for unit tests (no GPU required)
///
/// `MockGpu` implements both `GraphicsDevice` and `PresentationSurface` on one
/// shared state, so a test can hand clones to a `FramePacer` and keep one to
/// inspect. Submitted work retires lazily: only when a host wait needs it, on
/// `wait_idle`, or when the test calls `complete_*`. That makes every
/// backpressure point observable.
///
/// Misuse that would be undefined behavior on a real device (resetting an
/// in-flight command buffer, writing an image whose previous write has not
/// retired, waiting on a gate nothing will signal, ...) is recorded as a
/// hazard and returned as `Error::BackendError`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::error::{Error, Result};
use crate::device::{
    AcquireOutcome, ColorSpace, CommandBufferHandle, CommandPoolHandle, Extent2D, GateHandle,
    GraphicsDevice, ImageHandle, PixelFormat, PresentMode, PresentOutcome, PresentationSurface,
    RenderPassHandle, RenderTargetHandle, SignalHandle, Submission, SurfaceCapabilities,
    SurfaceFormat, SwapchainDesc, SwapchainHandle, ViewHandle,
};

new_key_type! {
    struct GateKey;
    struct SignalKey;
    struct PoolKey;
    struct CommandBufferKey;
    struct ImageKey;
    struct ViewKey;
    struct TargetKey;
    struct SwapchainKey;
}

fn raw<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

fn key<K: Key + From<KeyData>>(raw: u64) -> K {
    KeyData::from_ffi(raw).into()
}

// ============================================================================
// Scripting types
// ============================================================================

/// Outcome forced on a given acquire/present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    OutOfDate,
    Suboptimal,
    SurfaceLost,
    Fail,
}

/// Creation call that can be made to fail with `ResourceExhaustion`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Gate,
    Signal,
    CommandPool,
    CommandBuffers,
    ImageView,
    RenderTarget,
    Swapchain,
}

/// Observable GPU / presentation engine events, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// Host waited on a gate; `blocked` if it was unsignaled at call time
    WaitGate { gate: GateHandle, blocked: bool },
    /// A submission retired and signaled its gate
    Completed { gate: GateHandle, image_index: u32 },
    Acquire { image_index: u32, suboptimal: bool },
    AcquireOutOfDate,
    Submit { gate: GateHandle, image_index: u32 },
    Present { image_index: u32, outcome: PresentOutcome },
    WaitIdle,
    SwapchainCreated { swapchain: SwapchainHandle, image_count: u32, extent: Extent2D },
    SwapchainDestroyed { swapchain: SwapchainHandle },
}

/// Chooses among available image indices; returns a position in the slice
pub type ImagePicker = Box<dyn FnMut(&[u32]) -> usize + Send>;

// ============================================================================
// Internal state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalState {
    Idle,
    /// Will be signaled by the presentation engine for this image
    Acquired { image: ImageHandle, image_index: u32 },
    /// Will be signaled by a submission that wrote this image
    Rendered { image: ImageHandle, image_index: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Initial,
    Recording,
    Executable,
}

struct MockCommandBuffer {
    pool: PoolKey,
    state: RecordState,
}

struct MockSwapchain {
    images: Vec<ImageHandle>,
    extent: Extent2D,
    retired: bool,
    held: Vec<bool>,
    next: usize,
}

struct InFlight {
    gate: GateKey,
    command_buffer: CommandBufferKey,
    image: ImageHandle,
    image_index: u32,
}

struct MockState {
    caps: SurfaceCapabilities,
    reports_current_extent: bool,
    surface_extent: Extent2D,
    surface_lost: bool,

    gates: SlotMap<GateKey, bool>,
    signals: SlotMap<SignalKey, SignalState>,
    pools: SlotMap<PoolKey, ()>,
    command_buffers: SlotMap<CommandBufferKey, MockCommandBuffer>,
    images: SlotMap<ImageKey, SwapchainKey>,
    views: SlotMap<ViewKey, ImageHandle>,
    targets: SlotMap<TargetKey, ViewHandle>,
    swapchains: SlotMap<SwapchainKey, MockSwapchain>,

    queue: VecDeque<InFlight>,
    in_flight_limit: usize,
    max_in_flight: usize,

    acquire_calls: u32,
    present_calls: u32,
    drawable_queries: u32,
    acquire_script: FxHashMap<u32, Scripted>,
    present_script: FxHashMap<u32, Scripted>,
    fail_points: FxHashMap<FailPoint, FxHashSet<u32>>,
    fail_counts: FxHashMap<FailPoint, u32>,
    picker: Option<ImagePicker>,
    swapchains_created: u32,

    events: Vec<MockEvent>,
    hazards: Vec<String>,
}

impl MockState {
    fn hazard(&mut self, message: String) -> Error {
        self.hazards.push(message.clone());
        Error::BackendError(message)
    }

    fn inject(&mut self, point: FailPoint) -> Result<()> {
        let count = self.fail_counts.entry(point).or_insert(0);
        *count += 1;
        let call = *count;
        if self.fail_points.get(&point).is_some_and(|calls| calls.contains(&call)) {
            return Err(Error::ResourceExhaustion(format!(
                "injected {:?} failure (call {})",
                point, call
            )));
        }
        Ok(())
    }

    fn complete_front(&mut self) -> bool {
        let Some(work) = self.queue.pop_front() else {
            return false;
        };
        if let Some(signaled) = self.gates.get_mut(work.gate) {
            *signaled = true;
        }
        self.events.push(MockEvent::Completed {
            gate: GateHandle(raw(work.gate)),
            image_index: work.image_index,
        });
        true
    }

    fn gate_in_flight(&self, gate: GateKey) -> bool {
        self.queue.iter().any(|w| w.gate == gate)
    }

    fn current_caps(&self) -> SurfaceCapabilities {
        let mut caps = self.caps.clone();
        caps.current_extent = self.reports_current_extent.then_some(self.surface_extent);
        caps
    }
}

// ============================================================================
// MockGpu
// ============================================================================

/// Simulated device + presentation engine
#[derive(Clone)]
pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
}

impl MockGpu {
    /// Surface with `min_image_count` images at `extent`, supporting
    /// B8G8R8A8 UNORM/SRGB and Fifo/Mailbox
    pub fn new(min_image_count: u32, extent: Extent2D) -> Self {
        let caps = SurfaceCapabilities {
            min_image_count,
            max_image_count: 8,
            current_extent: None,
            min_extent: Extent2D::new(1, 1),
            max_extent: Extent2D::new(4096, 4096),
            formats: vec![
                SurfaceFormat::new(PixelFormat::B8G8R8A8_UNORM, ColorSpace::SrgbNonlinear),
                SurfaceFormat::new(PixelFormat::B8G8R8A8_SRGB, ColorSpace::SrgbNonlinear),
            ],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
        };

        Self {
            state: Arc::new(Mutex::new(MockState {
                caps,
                reports_current_extent: true,
                surface_extent: extent,
                surface_lost: false,
                gates: SlotMap::with_key(),
                signals: SlotMap::with_key(),
                pools: SlotMap::with_key(),
                command_buffers: SlotMap::with_key(),
                images: SlotMap::with_key(),
                views: SlotMap::with_key(),
                targets: SlotMap::with_key(),
                swapchains: SlotMap::with_key(),
                queue: VecDeque::new(),
                in_flight_limit: usize::MAX,
                max_in_flight: 0,
                acquire_calls: 0,
                present_calls: 0,
                drawable_queries: 0,
                acquire_script: FxHashMap::default(),
                present_script: FxHashMap::default(),
                fail_points: FxHashMap::default(),
                fail_counts: FxHashMap::default(),
                picker: None,
                swapchains_created: 0,
                events: Vec::new(),
                hazards: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // ===== SURFACE CONTROL =====

    pub fn resize(&self, extent: Extent2D) {
        self.state().surface_extent = extent;
    }

    pub fn lose_surface(&self) {
        self.state().surface_lost = true;
    }

    pub fn set_formats(&self, formats: Vec<SurfaceFormat>) {
        self.state().caps.formats = formats;
    }

    pub fn set_present_modes(&self, modes: Vec<PresentMode>) {
        self.state().caps.present_modes = modes;
    }

    pub fn set_image_count_range(&self, min: u32, max: u32) {
        let mut s = self.state();
        s.caps.min_image_count = min;
        s.caps.max_image_count = max;
    }

    pub fn set_extent_range(&self, min: Extent2D, max: Extent2D) {
        let mut s = self.state();
        s.caps.min_extent = min;
        s.caps.max_extent = max;
    }

    /// When false, capabilities leave the extent to the application
    pub fn set_reports_current_extent(&self, reports: bool) {
        self.state().reports_current_extent = reports;
    }

    // ===== SCRIPTING =====

    /// Force the outcome of the `call`-th acquire (1-based)
    pub fn script_acquire(&self, call: u32, outcome: Scripted) {
        self.state().acquire_script.insert(call, outcome);
    }

    /// Force the outcome of the `call`-th present (1-based)
    pub fn script_present(&self, call: u32, outcome: Scripted) {
        self.state().present_script.insert(call, outcome);
    }

    /// Make the `call`-th creation at `point` fail (1-based)
    pub fn fail_on(&self, point: FailPoint, call: u32) {
        self.state().fail_points.entry(point).or_default().insert(call);
    }

    /// Submitting beyond `limit` concurrent submissions is a hazard
    pub fn set_in_flight_limit(&self, limit: usize) {
        self.state().in_flight_limit = limit;
    }

    /// Replace round-robin image selection
    pub fn set_image_picker(&self, picker: ImagePicker) {
        self.state().picker = Some(picker);
    }

    // ===== GPU PROGRESS =====

    /// Retire the oldest in-flight submission
    pub fn complete_next(&self) -> bool {
        self.state().complete_front()
    }

    /// Retire every in-flight submission
    pub fn complete_all(&self) {
        let mut s = self.state();
        while s.complete_front() {}
    }

    // ===== INSPECTION =====

    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn hazards(&self) -> Vec<String> {
        self.state().hazards.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.state().queue.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    pub fn acquire_calls(&self) -> u32 {
        self.state().acquire_calls
    }

    pub fn present_calls(&self) -> u32 {
        self.state().present_calls
    }

    /// Number of `drawable_extent` queries so far
    pub fn drawable_queries(&self) -> u32 {
        self.state().drawable_queries
    }

    pub fn swapchains_created(&self) -> u32 {
        self.state().swapchains_created
    }

    /// Gates a host wait actually blocked on, in order
    pub fn blocked_waits(&self) -> Vec<GateHandle> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::WaitGate { gate, blocked: true } => Some(*gate),
                _ => None,
            })
            .collect()
    }

    /// Image indices of successful acquires, in order
    pub fn acquired_images(&self) -> Vec<u32> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Acquire { image_index, .. } => Some(*image_index),
                _ => None,
            })
            .collect()
    }

    /// Number of objects created through either trait and not yet destroyed
    pub fn live_object_count(&self) -> usize {
        let s = self.state();
        s.gates.len()
            + s.signals.len()
            + s.pools.len()
            + s.command_buffers.len()
            + s.views.len()
            + s.targets.len()
            + s.swapchains.len()
    }

    pub fn live_gate_count(&self) -> usize {
        self.state().gates.len()
    }

    pub fn live_signal_count(&self) -> usize {
        self.state().signals.len()
    }

    pub fn live_swapchain_count(&self) -> usize {
        self.state().swapchains.len()
    }

    pub fn is_gate_signaled(&self, gate: GateHandle) -> Option<bool> {
        self.state().gates.get(key::<GateKey>(gate.0)).copied()
    }
}

// ============================================================================
// GraphicsDevice
// ============================================================================

impl GraphicsDevice for MockGpu {
    fn create_gate(&self, signaled: bool) -> Result<GateHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.inject(FailPoint::Gate)?;
        Ok(GateHandle(raw(s.gates.insert(signaled))))
    }

    fn destroy_gate(&self, gate: GateHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        let k: GateKey = key(gate.0);
        if s.gate_in_flight(k) {
            s.hazard(format!("gate {:?} destroyed while its submission is in flight", gate));
        }
        if s.gates.remove(k).is_none() {
            s.hazard(format!("destroy of unknown gate {:?}", gate));
        }
    }

    fn gate_status(&self, gate: GateHandle) -> Result<bool> {
        let mut guard = self.state();
        let s = &mut *guard;
        match s.gates.get(key::<GateKey>(gate.0)).copied() {
            Some(signaled) => Ok(signaled),
            None => Err(s.hazard(format!("status of unknown gate {:?}", gate))),
        }
    }

    fn wait_gates(&self, gates: &[GateHandle]) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        for &gate in gates {
            let k: GateKey = key(gate.0);
            let Some(signaled) = s.gates.get(k).copied() else {
                return Err(s.hazard(format!("wait on unknown gate {:?}", gate)));
            };
            s.events.push(MockEvent::WaitGate { gate, blocked: !signaled });
            if signaled {
                continue;
            }
            if !s.gate_in_flight(k) {
                return Err(s.hazard(format!(
                    "wait on gate {:?} that no submission will signal",
                    gate
                )));
            }
            while !s.gates[k] {
                s.complete_front();
            }
        }
        Ok(())
    }

    fn reset_gates(&self, gates: &[GateHandle]) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        for &gate in gates {
            let k: GateKey = key(gate.0);
            if s.gate_in_flight(k) {
                return Err(s.hazard(format!("gate {:?} reset while in flight", gate)));
            }
            match s.gates.get_mut(k) {
                Some(signaled) => *signaled = false,
                None => return Err(s.hazard(format!("reset of unknown gate {:?}", gate))),
            }
        }
        Ok(())
    }

    fn create_signal(&self) -> Result<SignalHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.inject(FailPoint::Signal)?;
        Ok(SignalHandle(raw(s.signals.insert(SignalState::Idle))))
    }

    fn destroy_signal(&self, signal: SignalHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        if s.signals.remove(key::<SignalKey>(signal.0)).is_none() {
            s.hazard(format!("destroy of unknown signal {:?}", signal));
        }
    }

    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.inject(FailPoint::CommandPool)?;
        Ok(CommandPoolHandle(raw(s.pools.insert(()))))
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        let k: PoolKey = key(pool.0);
        let busy = s
            .queue
            .iter()
            .any(|w| s.command_buffers.get(w.command_buffer).is_some_and(|cb| cb.pool == k));
        if busy {
            s.hazard(format!("command pool {:?} destroyed while in use", pool));
        }
        if s.pools.remove(k).is_none() {
            s.hazard(format!("destroy of unknown command pool {:?}", pool));
        }
        s.command_buffers.retain(|_, cb| cb.pool != k);
    }

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: usize,
    ) -> Result<Vec<CommandBufferHandle>> {
        let mut guard = self.state();
        let s = &mut *guard;
        let k: PoolKey = key(pool.0);
        if !s.pools.contains_key(k) {
            return Err(s.hazard(format!("allocate from unknown command pool {:?}", pool)));
        }
        s.inject(FailPoint::CommandBuffers)?;
        Ok((0..count)
            .map(|_| {
                let cb = s.command_buffers.insert(MockCommandBuffer {
                    pool: k,
                    state: RecordState::Initial,
                });
                CommandBufferHandle(raw(cb))
            })
            .collect())
    }

    fn begin_commands(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        let k: CommandBufferKey = key(command_buffer.0);
        if s.queue.iter().any(|w| w.command_buffer == k) {
            return Err(s.hazard(format!(
                "command buffer {:?} reset while in flight",
                command_buffer
            )));
        }
        match s.command_buffers.get_mut(k) {
            Some(cb) => {
                cb.state = RecordState::Recording;
                Ok(())
            }
            None => Err(s.hazard(format!("begin on unknown command buffer {:?}", command_buffer))),
        }
    }

    fn end_commands(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        match s.command_buffers.get_mut(key::<CommandBufferKey>(command_buffer.0)) {
            Some(cb) if cb.state == RecordState::Recording => {
                cb.state = RecordState::Executable;
                Ok(())
            }
            _ => Err(s.hazard(format!(
                "end on command buffer {:?} that is not recording",
                command_buffer
            ))),
        }
    }

    fn create_image_view(&self, image: ImageHandle, _format: PixelFormat) -> Result<ViewHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.inject(FailPoint::ImageView)?;
        if !s.images.contains_key(key::<ImageKey>(image.0)) {
            return Err(s.hazard(format!("view of unknown image {:?}", image)));
        }
        Ok(ViewHandle(raw(s.views.insert(image))))
    }

    fn destroy_image_view(&self, view: ViewHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        if !s.queue.is_empty() {
            s.hazard(format!("view {:?} destroyed while GPU work is in flight", view));
        }
        if s.targets.values().any(|v| *v == view) {
            s.hazard(format!("view {:?} destroyed before its render target", view));
        }
        if s.views.remove(key::<ViewKey>(view.0)).is_none() {
            s.hazard(format!("destroy of unknown view {:?}", view));
        }
    }

    fn create_render_target(
        &self,
        render_pass: RenderPassHandle,
        view: ViewHandle,
        extent: Extent2D,
    ) -> Result<RenderTargetHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.inject(FailPoint::RenderTarget)?;
        if render_pass.is_null() {
            return Err(s.hazard("render target with null render pass".to_string()));
        }
        if extent.is_empty() {
            return Err(s.hazard("render target with zero-area extent".to_string()));
        }
        if !s.views.contains_key(key::<ViewKey>(view.0)) {
            return Err(s.hazard(format!("render target of unknown view {:?}", view)));
        }
        Ok(RenderTargetHandle(raw(s.targets.insert(view))))
    }

    fn destroy_render_target(&self, target: RenderTargetHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        if !s.queue.is_empty() {
            s.hazard(format!("render target {:?} destroyed while GPU work is in flight", target));
        }
        if s.targets.remove(key::<TargetKey>(target.0)).is_none() {
            s.hazard(format!("destroy of unknown render target {:?}", target));
        }
    }

    fn submit(&self, submission: &Submission) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        let cb: CommandBufferKey = key(submission.command_buffer.0);
        let gate: GateKey = key(submission.gate.0);
        let wait: SignalKey = key(submission.wait.0);
        let signal: SignalKey = key(submission.signal.0);

        match s.command_buffers.get(cb) {
            Some(buffer) if buffer.state == RecordState::Executable => {}
            _ => return Err(s.hazard("submit of a command buffer that is not executable".to_string())),
        }
        if s.queue.iter().any(|w| w.command_buffer == cb) {
            return Err(s.hazard("command buffer submitted while already in flight".to_string()));
        }
        match s.gates.get(gate).copied() {
            Some(false) if !s.gate_in_flight(gate) => {}
            _ => return Err(s.hazard(format!(
                "submit with gate {:?} that is signaled, unknown or in flight",
                submission.gate
            ))),
        }
        let (image, image_index) = match s.signals.get(wait).copied() {
            Some(SignalState::Acquired { image, image_index }) => (image, image_index),
            _ => return Err(s.hazard(format!(
                "submit waits on signal {:?} that no acquire will signal",
                submission.wait
            ))),
        };
        if s.signals.get(signal).copied() != Some(SignalState::Idle) {
            return Err(s.hazard(format!(
                "submit signals {:?} which is already pending",
                submission.signal
            )));
        }
        if s.queue.iter().any(|w| w.image == image) {
            return Err(s.hazard(format!(
                "image {} written while a previous write is in flight",
                image_index
            )));
        }

        s.signals[wait] = SignalState::Idle;
        s.signals[signal] = SignalState::Rendered { image, image_index };
        s.queue.push_back(InFlight { gate, command_buffer: cb, image, image_index });
        s.max_in_flight = s.max_in_flight.max(s.queue.len());
        s.events.push(MockEvent::Submit { gate: submission.gate, image_index });

        if s.queue.len() > s.in_flight_limit {
            return Err(s.hazard(format!(
                "{} submissions in flight, limit is {}",
                s.queue.len(),
                s.in_flight_limit
            )));
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        while s.complete_front() {}
        s.events.push(MockEvent::WaitIdle);
        Ok(())
    }
}

// ============================================================================
// PresentationSurface
// ============================================================================

impl PresentationSurface for MockGpu {
    fn capabilities(&self) -> Result<SurfaceCapabilities> {
        let s = self.state();
        if s.surface_lost {
            return Err(Error::SurfaceLost("mock surface lost".to_string()));
        }
        Ok(s.current_caps())
    }

    fn drawable_extent(&self) -> Extent2D {
        let mut s = self.state();
        s.drawable_queries += 1;
        s.surface_extent
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<SwapchainHandle>,
    ) -> Result<SwapchainHandle> {
        let mut guard = self.state();
        let s = &mut *guard;
        if s.surface_lost {
            return Err(Error::SurfaceLost("mock surface lost".to_string()));
        }
        s.inject(FailPoint::Swapchain)?;

        if desc.image_count < s.caps.min_image_count
            || (s.caps.max_image_count > 0 && desc.image_count > s.caps.max_image_count)
        {
            return Err(s.hazard(format!("image count {} outside surface limits", desc.image_count)));
        }
        if desc.extent.is_empty() {
            return Err(s.hazard("swapchain with zero-area extent".to_string()));
        }
        if let Some(old) = old {
            match s.swapchains.get_mut(key::<SwapchainKey>(old.0)) {
                Some(chain) if !chain.retired => chain.retired = true,
                _ => return Err(s.hazard(format!("old swapchain {:?} is unknown or retired", old))),
            }
        }

        let count = desc.image_count as usize;
        let swapchain = s.swapchains.insert(MockSwapchain {
            images: Vec::with_capacity(count),
            extent: desc.extent,
            retired: false,
            held: vec![false; count],
            next: 0,
        });
        let images: Vec<ImageHandle> = (0..count)
            .map(|_| ImageHandle(raw(s.images.insert(swapchain))))
            .collect();
        s.swapchains[swapchain].images = images;

        let handle = SwapchainHandle(raw(swapchain));
        s.swapchains_created += 1;
        s.events.push(MockEvent::SwapchainCreated {
            swapchain: handle,
            image_count: desc.image_count,
            extent: desc.extent,
        });
        Ok(handle)
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let mut guard = self.state();
        let s = &mut *guard;
        match s.swapchains.get(key::<SwapchainKey>(swapchain.0)) {
            Some(chain) => Ok(chain.images.clone()),
            None => Err(s.hazard(format!("images of unknown swapchain {:?}", swapchain))),
        }
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        let mut guard = self.state();
        let s = &mut *guard;
        let k: SwapchainKey = key(swapchain.0);
        if !s.queue.is_empty() {
            s.hazard(format!("swapchain {:?} destroyed while GPU work is in flight", swapchain));
        }
        let Some(chain) = s.swapchains.remove(k) else {
            s.hazard(format!("destroy of unknown swapchain {:?}", swapchain));
            return;
        };
        if s.views.values().any(|image| chain.images.contains(image)) {
            s.hazard(format!("swapchain {:?} destroyed before its views", swapchain));
        }
        s.images.retain(|_, owner| *owner != k);
        s.events.push(MockEvent::SwapchainDestroyed { swapchain });
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SignalHandle,
    ) -> Result<AcquireOutcome> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.acquire_calls += 1;
        let call = s.acquire_calls;

        if s.surface_lost {
            return Err(Error::SurfaceLost("mock surface lost".to_string()));
        }
        let scripted = s.acquire_script.get(&call).copied();
        match scripted {
            Some(Scripted::OutOfDate) => {
                s.events.push(MockEvent::AcquireOutOfDate);
                return Ok(AcquireOutcome::OutOfDate);
            }
            Some(Scripted::SurfaceLost) => {
                s.surface_lost = true;
                return Err(Error::SurfaceLost("mock surface lost during acquire".to_string()));
            }
            Some(Scripted::Fail) => {
                return Err(Error::BackendError(format!("injected acquire failure (call {})", call)));
            }
            Some(Scripted::Suboptimal) | None => {}
        }

        let k: SwapchainKey = key(swapchain.0);
        let surface_extent = s.surface_extent;
        let (retired, extent) = match s.swapchains.get(k) {
            Some(chain) => (chain.retired, chain.extent),
            None => return Err(s.hazard(format!("acquire from unknown swapchain {:?}", swapchain))),
        };
        if retired {
            return Err(s.hazard(format!("acquire from retired swapchain {:?}", swapchain)));
        }
        if extent != surface_extent {
            s.events.push(MockEvent::AcquireOutOfDate);
            return Ok(AcquireOutcome::OutOfDate);
        }
        let signal_key: SignalKey = key(signal.0);
        if s.signals.get(signal_key).copied() != Some(SignalState::Idle) {
            return Err(s.hazard(format!("acquire signals {:?} which is already pending", signal)));
        }

        let chain = &s.swapchains[k];
        let count = chain.images.len();
        let available: Vec<u32> = (0..count)
            .map(|offset| (chain.next + offset) % count)
            .filter(|&i| !chain.held[i])
            .map(|i| i as u32)
            .collect();
        if available.is_empty() {
            return Err(s.hazard("acquire with every image held by the application".to_string()));
        }
        let position = match s.picker.as_mut() {
            Some(picker) => picker(&available) % available.len(),
            None => 0,
        };
        let image_index = available[position];

        let chain = &mut s.swapchains[k];
        chain.held[image_index as usize] = true;
        chain.next = (image_index as usize + 1) % count;
        let image = chain.images[image_index as usize];
        s.signals[signal_key] = SignalState::Acquired { image, image_index };

        let suboptimal = scripted == Some(Scripted::Suboptimal);
        s.events.push(MockEvent::Acquire { image_index, suboptimal });
        Ok(AcquireOutcome::Acquired { image_index, suboptimal })
    }

    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SignalHandle,
    ) -> Result<PresentOutcome> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.present_calls += 1;
        let call = s.present_calls;

        if s.surface_lost {
            return Err(Error::SurfaceLost("mock surface lost".to_string()));
        }
        let k: SwapchainKey = key(swapchain.0);
        let (image, held, extent) = match s.swapchains.get(k) {
            Some(chain) if (image_index as usize) < chain.images.len() => (
                chain.images[image_index as usize],
                chain.held[image_index as usize],
                chain.extent,
            ),
            _ => return Err(s.hazard(format!(
                "present of image {} on unknown swapchain {:?}",
                image_index, swapchain
            ))),
        };
        if !held {
            return Err(s.hazard(format!("present of image {} that was not acquired", image_index)));
        }
        let wait_key: SignalKey = key(wait.0);
        match s.signals.get(wait_key).copied() {
            Some(SignalState::Rendered { image: rendered, .. }) if rendered == image => {}
            _ => return Err(s.hazard(format!(
                "present of image {} waits on {:?} which no submission for it signals",
                image_index, wait
            ))),
        }

        s.signals[wait_key] = SignalState::Idle;
        s.swapchains[k].held[image_index as usize] = false;

        let outcome = match s.present_script.get(&call).copied() {
            Some(Scripted::Fail) => {
                return Err(Error::BackendError(format!("injected present failure (call {})", call)));
            }
            Some(Scripted::SurfaceLost) => {
                s.surface_lost = true;
                return Err(Error::SurfaceLost("mock surface lost during present".to_string()));
            }
            Some(Scripted::OutOfDate) => PresentOutcome::OutOfDate,
            Some(Scripted::Suboptimal) => PresentOutcome::Suboptimal,
            None if extent != s.surface_extent => PresentOutcome::OutOfDate,
            None => PresentOutcome::Optimal,
        };
        s.events.push(MockEvent::Present { image_index, outcome });
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
