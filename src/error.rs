// glswap/src/error.rs
//
//! Various errors that methods can produce.

/// Various errors that methods can produce.
///
/// Protocol violations (double-lock, double-acquire, releasing the wrong
/// presenter, re-attaching a surface of a different size) are not errors:
/// they are programmer bugs and fail fast with a panic.
#[derive(Debug)]
pub enum Error {
    /// The method failed for a miscellaneous reason.
    Failed,
    /// No surface backend supports the requested consumer texture type on
    /// this device.
    UnsupportedConsumerTextureType,
    /// The device couldn't allocate a GPU buffer of the requested size.
    SurfaceCreationFailed,
    /// The device couldn't create a framebuffer object.
    FramebufferCreationFailed,
    /// The device couldn't create a renderbuffer.
    RenderbufferCreationFailed,
    /// Attaching a surface to a framebuffer failed.
    AttachmentFailed,
    /// The framebuffer was incomplete after attaching a surface.
    FramebufferIncomplete,
}
