// glswap/src/device.rs
//
//! The abstract interface that all devices conform to.
//!
//! A device bundles the two things the surface-management core consumes from
//! the platform layer: the GL object primitives (framebuffers, renderbuffers,
//! color attachments) and an allocator for shareable GPU buffers. The
//! cross-process ownership-transfer primitives live on the buffers
//! themselves, since their implementation is entirely backend-specific.

use crate::error::Error;
use crate::surface::SurfaceKind;

use euclid::default::Size2D;
use std::fmt::Debug;

bitflags::bitflags! {
    /// Capabilities a device advertises to the backend registry and to the
    /// framebuffer-redirection logic.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DeviceCapabilities: u8 {
        /// Separate draw and read framebuffer targets are supported.
        const SPLIT_FRAMEBUFFER = 1 << 0;
        /// Buffers can be exported as cross-process shared handles.
        const SHARED_HANDLES = 1 << 1;
        /// Buffers can be bound to window-system pixmaps.
        const PIXMAP_BINDING = 1 << 2;
        /// Buffers can be backed by platform hardware buffers.
        const HARDWARE_BUFFERS = 1 << 3;
    }
}

/// Which framebuffer binding point an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferTarget {
    /// Both the draw and read targets.
    Framebuffer,
    /// The draw target only.
    Draw,
    /// The read target only.
    Read,
}

/// Renderbuffer storage formats used for depth/stencil attachments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderbufferFormat {
    Depth24,
    StencilIndex8,
    Depth24Stencil8,
}

/// Framebuffer attachment points for renderbuffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderbufferAttachment {
    Depth,
    Stencil,
    DepthStencil,
}

/// A handle to a GPU device owned by a single GL context.
///
/// All methods assume they are called on the thread owning the GL context.
pub trait Device: 'static {
    /// A GPU allocation backing one shared surface.
    type Buffer: Buffer;
    /// A framebuffer object name. The nominal default framebuffer is
    /// represented as `None` wherever an `Option` of this type appears.
    type Framebuffer: Copy + PartialEq + Debug;
    /// A renderbuffer object name.
    type Renderbuffer: Copy + PartialEq + Debug;

    /// Returns the capabilities of this device.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Allocates a buffer of exactly `size` pixels for the given backend
    /// kind.
    fn create_buffer(&self, kind: SurfaceKind, size: Size2D<i32>)
        -> Result<Self::Buffer, Error>;

    /// Creates a framebuffer object.
    fn create_framebuffer(&self) -> Result<Self::Framebuffer, Error>;

    /// Destroys a framebuffer object.
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    /// Binds a framebuffer, or the default framebuffer if `None`.
    fn bind_framebuffer(
        &self,
        target: FramebufferTarget,
        framebuffer: Option<Self::Framebuffer>,
    );

    /// Attaches `buffer` as the color target of `framebuffer`.
    ///
    /// May leave the framebuffer binding modified; callers that care about
    /// the current binding must rebind afterwards.
    fn attach_buffer_to_framebuffer(
        &self,
        framebuffer: Self::Framebuffer,
        buffer: &Self::Buffer,
    ) -> Result<(), Error>;

    /// Returns whether `framebuffer` is complete.
    ///
    /// May leave the framebuffer binding modified.
    fn framebuffer_complete(&self, framebuffer: Self::Framebuffer) -> bool;

    /// Creates a renderbuffer with the given storage format and size.
    fn create_renderbuffer(
        &self,
        format: RenderbufferFormat,
        size: Size2D<i32>,
    ) -> Result<Self::Renderbuffer, Error>;

    /// Attaches a renderbuffer to `framebuffer` at the given attachment
    /// point.
    fn attach_renderbuffer(
        &self,
        framebuffer: Self::Framebuffer,
        attachment: RenderbufferAttachment,
        renderbuffer: Self::Renderbuffer,
    );

    /// Destroys a renderbuffer.
    fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer);
}

/// The per-buffer ownership-transfer primitives.
///
/// A buffer has exactly one producer-owner and one consumer-owner at a time;
/// the acquire/release pairs below implement the handoff. None of these calls
/// block except `wait_for_buffer_ownership`, which may await a cross-process
/// fence signalling that the consumer side has relinquished the buffer.
pub trait Buffer {
    /// The buffer's size in pixels.
    fn size(&self) -> Size2D<i32>;

    /// Blocks until the consumer side has relinquished the buffer.
    fn wait_for_buffer_ownership(&self);

    /// Transfers ownership to the producer for drawing.
    fn producer_acquire(&self);

    /// Releases producer ownership back to the consumer.
    fn producer_release(&self);

    /// Acquires the buffer transiently for producer-side reads.
    fn producer_read_acquire(&self);

    /// Releases a transient producer-side read acquisition.
    fn producer_read_release(&self);

    /// Takes the producer-side GL lock.
    fn lock(&self);

    /// Drops the producer-side GL lock.
    fn unlock(&self);

    /// Commits finished drawing, typically by inserting a fence or flushing.
    fn commit(&self);
}
