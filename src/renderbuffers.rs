// glswap/src/renderbuffers.rs
//
//! A utility module for render targets that carry depth/stencil
//! renderbuffers alongside their color attachment.

use crate::device::{Device, RenderbufferAttachment, RenderbufferFormat};
use crate::error::Error;

use euclid::default::Size2D;

bitflags::bitflags! {
    /// Which ancillary buffers a render target carries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RenderTargetFlags: u8 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

// A combined depth-stencil renderbuffer is stored once and attached at the
// combined attachment point, so it can never be double-freed.
pub(crate) enum Renderbuffers<D: Device> {
    None,
    IndividualDepthStencil {
        depth: Option<D::Renderbuffer>,
        stencil: Option<D::Renderbuffer>,
    },
    CombinedDepthStencil(Option<D::Renderbuffer>),
}

impl<D: Device> Drop for Renderbuffers<D> {
    fn drop(&mut self) {
        match *self {
            Renderbuffers::None
            | Renderbuffers::IndividualDepthStencil {
                depth: None,
                stencil: None,
            }
            | Renderbuffers::CombinedDepthStencil(None) => {}
            _ => panic!("Should have destroyed the renderbuffers with `destroy()`!"),
        }
    }
}

impl<D: Device> Renderbuffers<D> {
    pub(crate) fn new(
        device: &D,
        size: &Size2D<i32>,
        flags: RenderTargetFlags,
    ) -> Result<Renderbuffers<D>, Error> {
        if flags.contains(RenderTargetFlags::DEPTH | RenderTargetFlags::STENCIL) {
            let renderbuffer =
                device.create_renderbuffer(RenderbufferFormat::Depth24Stencil8, *size)?;
            return Ok(Renderbuffers::CombinedDepthStencil(Some(renderbuffer)));
        }

        if flags.is_empty() {
            return Ok(Renderbuffers::None);
        }

        let mut depth = None;
        let mut stencil = None;
        if flags.contains(RenderTargetFlags::DEPTH) {
            depth = Some(device.create_renderbuffer(RenderbufferFormat::Depth24, *size)?);
        }
        if flags.contains(RenderTargetFlags::STENCIL) {
            match device.create_renderbuffer(RenderbufferFormat::StencilIndex8, *size) {
                Ok(renderbuffer) => stencil = Some(renderbuffer),
                Err(err) => {
                    if let Some(depth) = depth {
                        device.delete_renderbuffer(depth);
                    }
                    return Err(err);
                }
            }
        }
        Ok(Renderbuffers::IndividualDepthStencil { depth, stencil })
    }

    pub(crate) fn attach_to_framebuffer(&self, device: &D, framebuffer: D::Framebuffer) {
        match *self {
            Renderbuffers::None => {}
            Renderbuffers::CombinedDepthStencil(Some(renderbuffer)) => {
                device.attach_renderbuffer(
                    framebuffer,
                    RenderbufferAttachment::DepthStencil,
                    renderbuffer,
                );
            }
            Renderbuffers::CombinedDepthStencil(None) => {}
            Renderbuffers::IndividualDepthStencil { depth, stencil } => {
                if let Some(depth) = depth {
                    device.attach_renderbuffer(framebuffer, RenderbufferAttachment::Depth, depth);
                }
                if let Some(stencil) = stencil {
                    device.attach_renderbuffer(
                        framebuffer,
                        RenderbufferAttachment::Stencil,
                        stencil,
                    );
                }
            }
        }
    }

    pub(crate) fn destroy(&mut self, device: &D) {
        match *self {
            Renderbuffers::None => {}
            Renderbuffers::CombinedDepthStencil(ref mut renderbuffer) => {
                if let Some(renderbuffer) = renderbuffer.take() {
                    device.delete_renderbuffer(renderbuffer);
                }
            }
            Renderbuffers::IndividualDepthStencil {
                ref mut depth,
                ref mut stencil,
            } => {
                if let Some(stencil) = stencil.take() {
                    device.delete_renderbuffer(stencil);
                }
                if let Some(depth) = depth.take() {
                    device.delete_renderbuffer(depth);
                }
            }
        }
    }
}
