// glswap/src/lib.rs
//
//! Offscreen GL screen buffers and shared-surface swap chains.
//!
//! This crate manages GPU surfaces shared between a producer GL context and
//! a consumer compositor, possibly across process boundaries. The producer
//! draws into a back buffer and publishes it; the consumer reads the front
//! buffer; a bounded recycle pool keeps steady-state rendering from churning
//! allocations. Ownership handoff is an explicit acquire/release protocol on
//! each surface rather than a blocking lock, so the two sides never contend
//! on surface contents.
//!
//! Two embodiments of the same pattern are provided:
//!
//! - [`GLScreenBuffer`], the "default framebuffer" of an offscreen context:
//!   it intercepts binds of the nominal framebuffer 0 and redirects them to
//!   an internal render target, swapping surfaces underneath on publish.
//! - [`SwapChain`], a scoped-presenter abstraction: [`SwapChain::acquire`]
//!   hands out a [`SwapChainPresenter`] bound to a back buffer, and dropping
//!   it promotes that buffer to the front.
//!
//! Platform GL and interop plumbing enters through the [`Device`] and
//! [`Buffer`] traits; [`platform::generic::GlowDevice`] is the plain-GL
//! backend.

pub mod platform;
pub use platform::generic::GlowDevice;

pub mod error;
pub use crate::error::Error;

pub mod device;
pub use crate::device::{
    Buffer, Device, DeviceCapabilities, FramebufferTarget, RenderbufferAttachment,
    RenderbufferFormat,
};

pub mod surface;
pub use crate::surface::{
    ConsumerTextureType, PartialSharedSurfaceDesc, SharedSurface, SharedSurfaceDesc, SurfaceID,
    SurfaceKind,
};

pub mod factory;
pub use crate::factory::{SurfaceFactory, SurfaceFlags, TextureClient};

pub mod registry;
pub use crate::registry::select_backend;

pub mod readbuffer;
pub use crate::readbuffer::ReadBuffer;

pub mod screenbuffer;
pub use crate::screenbuffer::GLScreenBuffer;

pub mod chains;
pub use crate::chains::{SwapChain, SwapChainPresenter};

mod renderbuffers;
pub use crate::renderbuffers::RenderTargetFlags;

#[cfg(test)]
mod tests;
