/// Opaque GPU object handles
///
/// Every object that crosses the device/surface seams is a plain `u64`
/// newtype. Backends decide what the value means (a raw Vulkan handle, an
/// arena key, ...). `0` is reserved as the null handle.

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
            pub struct $name(pub u64);

            impl $name {
                /// The null handle
                pub const NULL: Self = Self(0);

                pub fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }

                pub fn as_raw(&self) -> u64 {
                    self.0
                }

                pub fn is_null(&self) -> bool {
                    self.0 == 0
                }
            }
        )*
    };
}

define_handle!(
    /// Host-waitable completion primitive (a fence)
    GateHandle,
    /// GPU-to-GPU signal (a binary semaphore)
    SignalHandle,
    CommandPoolHandle,
    CommandBufferHandle,
    /// Presentable image owned by a swapchain
    ImageHandle,
    ViewHandle,
    /// Render-pass compatible attachment set (a framebuffer)
    RenderTargetHandle,
    RenderPassHandle,
    SwapchainHandle,
);
