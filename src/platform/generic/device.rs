// glswap/src/platform/generic/device.rs
//
//! A device backed by a plain `glow` context.
//!
//! Buffers are ordinary RGBA8 textures, for readback and bootstrapping; the
//! cross-process ownership primitives are single-process no-ops except
//! `commit`, which flushes. Consumers wanting zero-copy sharing need a
//! platform interop device instead.

use crate::device::{
    Buffer, Device, DeviceCapabilities, FramebufferTarget, RenderbufferAttachment,
    RenderbufferFormat,
};
use crate::error::Error;
use crate::surface::SurfaceKind;

use euclid::default::Size2D;
use glow::HasContext;
use std::rc::Rc;

/// A device issuing GL calls through a `glow` context.
pub struct GlowDevice {
    gl: Rc<glow::Context>,
}

impl GlowDevice {
    /// Wraps a `glow` context. The context must be current on the calling
    /// thread whenever device methods run.
    pub fn new(gl: Rc<glow::Context>) -> GlowDevice {
        GlowDevice { gl }
    }

    /// The underlying `glow` context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl Device for GlowDevice {
    type Buffer = GlowBuffer;
    type Framebuffer = glow::NativeFramebuffer;
    type Renderbuffer = glow::NativeRenderbuffer;

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::SPLIT_FRAMEBUFFER
    }

    fn create_buffer(&self, kind: SurfaceKind, size: Size2D<i32>) -> Result<GlowBuffer, Error> {
        if kind != SurfaceKind::Basic {
            return Err(Error::UnsupportedConsumerTextureType);
        }
        if size.width < 1 || size.height < 1 {
            return Err(Error::SurfaceCreationFailed);
        }
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|_| Error::SurfaceCreationFailed)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_storage_2d(glow::TEXTURE_2D, 1, glow::RGBA8, size.width, size.height);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            if self.gl.get_error() != glow::NO_ERROR {
                self.gl.delete_texture(texture);
                return Err(Error::SurfaceCreationFailed);
            }
            Ok(GlowBuffer {
                gl: self.gl.clone(),
                texture,
                size,
            })
        }
    }

    fn create_framebuffer(&self) -> Result<glow::NativeFramebuffer, Error> {
        unsafe {
            self.gl
                .create_framebuffer()
                .map_err(|_| Error::FramebufferCreationFailed)
        }
    }

    fn delete_framebuffer(&self, framebuffer: glow::NativeFramebuffer) {
        unsafe {
            self.gl.delete_framebuffer(framebuffer);
        }
    }

    fn bind_framebuffer(
        &self,
        target: FramebufferTarget,
        framebuffer: Option<glow::NativeFramebuffer>,
    ) {
        let target = match target {
            FramebufferTarget::Framebuffer => glow::FRAMEBUFFER,
            FramebufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
            FramebufferTarget::Read => glow::READ_FRAMEBUFFER,
        };
        unsafe {
            self.gl.bind_framebuffer(target, framebuffer);
        }
    }

    fn attach_buffer_to_framebuffer(
        &self,
        framebuffer: glow::NativeFramebuffer,
        buffer: &GlowBuffer,
    ) -> Result<(), Error> {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(buffer.texture),
                0,
            );
            if self.gl.get_error() != glow::NO_ERROR {
                return Err(Error::AttachmentFailed);
            }
        }
        Ok(())
    }

    fn framebuffer_complete(&self, framebuffer: glow::NativeFramebuffer) -> bool {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.check_framebuffer_status(glow::FRAMEBUFFER) == glow::FRAMEBUFFER_COMPLETE
        }
    }

    fn create_renderbuffer(
        &self,
        format: RenderbufferFormat,
        size: Size2D<i32>,
    ) -> Result<glow::NativeRenderbuffer, Error> {
        let format = match format {
            RenderbufferFormat::Depth24 => glow::DEPTH_COMPONENT24,
            RenderbufferFormat::StencilIndex8 => glow::STENCIL_INDEX8,
            RenderbufferFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        };
        unsafe {
            let renderbuffer = self
                .gl
                .create_renderbuffer()
                .map_err(|_| Error::RenderbufferCreationFailed)?;
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, format, size.width, size.height);
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            if self.gl.get_error() != glow::NO_ERROR {
                self.gl.delete_renderbuffer(renderbuffer);
                return Err(Error::RenderbufferCreationFailed);
            }
            Ok(renderbuffer)
        }
    }

    fn attach_renderbuffer(
        &self,
        framebuffer: glow::NativeFramebuffer,
        attachment: RenderbufferAttachment,
        renderbuffer: glow::NativeRenderbuffer,
    ) {
        let attachment = match attachment {
            RenderbufferAttachment::Depth => glow::DEPTH_ATTACHMENT,
            RenderbufferAttachment::Stencil => glow::STENCIL_ATTACHMENT,
            RenderbufferAttachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
        };
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment,
                glow::RENDERBUFFER,
                Some(renderbuffer),
            );
        }
    }

    fn delete_renderbuffer(&self, renderbuffer: glow::NativeRenderbuffer) {
        unsafe {
            self.gl.delete_renderbuffer(renderbuffer);
        }
    }
}

/// A buffer backed by a plain GL texture.
pub struct GlowBuffer {
    gl: Rc<glow::Context>,
    texture: glow::NativeTexture,
    size: Size2D<i32>,
}

impl GlowBuffer {
    /// The texture holding the buffer contents.
    pub fn texture(&self) -> glow::NativeTexture {
        self.texture
    }
}

impl Buffer for GlowBuffer {
    fn size(&self) -> Size2D<i32> {
        self.size
    }

    // Plain textures are never owned by another process, so the ownership
    // handoff is bookkeeping-only.
    fn wait_for_buffer_ownership(&self) {}
    fn producer_acquire(&self) {}
    fn producer_release(&self) {}
    fn producer_read_acquire(&self) {}
    fn producer_read_release(&self) {}
    fn lock(&self) {}
    fn unlock(&self) {}

    fn commit(&self) {
        unsafe {
            self.gl.flush();
        }
    }
}

impl Drop for GlowBuffer {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_texture(self.texture);
        }
    }
}
