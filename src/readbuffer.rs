// glswap/src/readbuffer.rs
//
//! Read buffers: framebuffer objects wrapping a shared surface so GL draw
//! calls can target it directly.

use crate::device::Device;
use crate::error::Error;
use crate::renderbuffers::{RenderTargetFlags, Renderbuffers};
use crate::surface::SharedSurface;

use euclid::default::Size2D;
use std::sync::Arc;

/// A render target whose color attachment is a shared surface.
///
/// The surface can be swapped out with [`ReadBuffer::attach`] as long as the
/// replacement has the same size; resizing goes through discarding and
/// recreating the read buffer instead.
pub struct ReadBuffer<D: Device> {
    device: Arc<D>,
    framebuffer: D::Framebuffer,
    renderbuffers: Renderbuffers<D>,
    surface: Arc<SharedSurface<D>>,
}

impl<D: Device> ReadBuffer<D> {
    /// Wraps `surface` in a complete framebuffer, or fails with everything
    /// torn down again. Never returns a partially-constructed read buffer.
    pub fn create(
        device: &Arc<D>,
        surface: &Arc<SharedSurface<D>>,
        flags: RenderTargetFlags,
    ) -> Result<ReadBuffer<D>, Error> {
        let framebuffer = device.create_framebuffer()?;

        if let Err(err) = device.attach_buffer_to_framebuffer(framebuffer, surface.buffer()) {
            device.delete_framebuffer(framebuffer);
            return Err(err);
        }

        let mut renderbuffers = match Renderbuffers::new(&**device, &surface.size(), flags) {
            Ok(renderbuffers) => renderbuffers,
            Err(err) => {
                device.delete_framebuffer(framebuffer);
                return Err(err);
            }
        };
        renderbuffers.attach_to_framebuffer(&**device, framebuffer);

        // Completeness can only be validated while the producer side holds
        // the surface; acquire transiently if nobody has, and let go again
        // so construction doesn't leave a lock behind.
        let needs_acquire = !surface.is_producer_acquired();
        if needs_acquire {
            surface.producer_read_acquire();
        }
        let complete = device.framebuffer_complete(framebuffer);
        if needs_acquire {
            surface.producer_read_release();
        }

        if !complete {
            renderbuffers.destroy(&**device);
            device.delete_framebuffer(framebuffer);
            return Err(Error::FramebufferIncomplete);
        }

        Ok(ReadBuffer {
            device: device.clone(),
            framebuffer,
            renderbuffers,
            surface: surface.clone(),
        })
    }

    /// Rebinds the color attachment to a different surface of identical
    /// size.
    ///
    /// Panics if the sizes differ.
    pub fn attach(&mut self, surface: &Arc<SharedSurface<D>>) -> Result<(), Error> {
        assert_eq!(
            surface.size(),
            self.surface.size(),
            "cannot re-attach a surface of a different size"
        );

        self.device
            .attach_buffer_to_framebuffer(self.framebuffer, surface.buffer())?;
        debug_assert!(self.device.framebuffer_complete(self.framebuffer));

        self.surface = surface.clone();
        Ok(())
    }

    /// The framebuffer object draw calls should target.
    pub fn framebuffer(&self) -> D::Framebuffer {
        self.framebuffer
    }

    /// The currently attached surface.
    pub fn shared_surf(&self) -> &Arc<SharedSurface<D>> {
        &self.surface
    }

    /// The size of the currently attached surface.
    pub fn size(&self) -> Size2D<i32> {
        self.surface.size()
    }
}

impl<D: Device> Drop for ReadBuffer<D> {
    fn drop(&mut self) {
        self.renderbuffers.destroy(&*self.device);
        self.device.delete_framebuffer(self.framebuffer);
    }
}
