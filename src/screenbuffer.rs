// glswap/src/screenbuffer.rs
//
//! The screen buffer: the "default framebuffer" of an offscreen GL context.
//!
//! An offscreen context has no window-system framebuffer, so binds of the
//! nominal framebuffer 0 are intercepted here and redirected to an internal
//! read buffer wrapping the current back surface. Publishing a frame swaps
//! the back surface to the front slot, where the compositor side picks it
//! up.

use crate::device::{Device, DeviceCapabilities, FramebufferTarget};
use crate::error::Error;
use crate::factory::{SurfaceFactory, SurfaceFlags, TextureClient};
use crate::readbuffer::ReadBuffer;
use crate::renderbuffers::RenderTargetFlags;
use crate::surface::SharedSurface;

use euclid::default::Size2D;
use log::debug;
use std::sync::Arc;

/// The double-buffered render target standing in for framebuffer 0 on an
/// offscreen context.
pub struct GLScreenBuffer<D: Device> {
    device: Arc<D>,
    factory: SurfaceFactory<D>,
    render_target_flags: RenderTargetFlags,

    back: Option<TextureClient<D>>,
    front: Option<TextureClient<D>>,
    read: Option<ReadBuffer<D>>,

    // The parts that let us pretend to be framebuffer 0. `None` is the
    // nominal default framebuffer in user slots, and "nothing bound" in
    // internal slots after `deleting_fb` zeroed them.
    user_draw_fb: Option<D::Framebuffer>,
    user_read_fb: Option<D::Framebuffer>,
    internal_draw_fb: Option<D::Framebuffer>,
    internal_read_fb: Option<D::Framebuffer>,

    // True while an internal operation has rebound a target behind the
    // user's back; checked by the accessors when strict checks are on.
    in_internal_mode_draw: bool,
    in_internal_mode_read: bool,
    strict_binding_checks: bool,
}

impl<D: Device> GLScreenBuffer<D> {
    /// Creates a screen buffer with an initial back buffer of `size` pixels.
    pub fn create(
        device: Arc<D>,
        size: Size2D<i32>,
        flags: RenderTargetFlags,
    ) -> Result<GLScreenBuffer<D>, Error> {
        let factory = SurfaceFactory::basic(
            device.clone(),
            SurfaceFlags::RECYCLE | SurfaceFlags::ORIGIN_BOTTOM_LEFT,
        );
        let mut screen = GLScreenBuffer {
            device,
            factory,
            render_target_flags: flags,
            back: None,
            front: None,
            read: None,
            user_draw_fb: None,
            user_read_fb: None,
            internal_draw_fb: None,
            internal_read_fb: None,
            in_internal_mode_draw: true,
            in_internal_mode_read: true,
            strict_binding_checks: true,
        };
        screen.resize(size)?;
        Ok(screen)
    }

    /// The factory surfaces are allocated from.
    pub fn factory(&self) -> &SurfaceFactory<D> {
        &self.factory
    }

    /// The front buffer, if a frame has been published.
    pub fn front(&self) -> Option<&TextureClient<D>> {
        self.front.as_ref()
    }

    /// The surface currently attached as the render target.
    pub fn shared_surf(&self) -> &Arc<SharedSurface<D>> {
        self.read.as_ref().expect("no read buffer").shared_surf()
    }

    /// The current render-target size.
    pub fn size(&self) -> Size2D<i32> {
        self.read.as_ref().expect("no read buffer").size()
    }

    pub fn is_read_buffer_ready(&self) -> bool {
        self.read.is_some()
    }

    /// Toggles the stale-binding invariant checks. On by default.
    pub fn set_strict_binding_checks(&mut self, strict: bool) {
        self.strict_binding_checks = strict;
    }

    fn draw_fb(&self) -> D::Framebuffer {
        self.read_fb()
    }

    fn read_fb(&self) -> D::Framebuffer {
        self.read.as_ref().expect("no read buffer").framebuffer()
    }

    /// Binds `fb` as both the draw and read target. `None` is the nominal
    /// default framebuffer and is redirected to the internal read buffer.
    pub fn bind_fb(&mut self, fb: Option<D::Framebuffer>) {
        let draw_fb = self.draw_fb();
        let read_fb = self.read_fb();

        self.user_draw_fb = fb;
        self.user_read_fb = fb;
        self.internal_draw_fb = Some(fb.unwrap_or(draw_fb));
        self.internal_read_fb = Some(fb.unwrap_or(read_fb));

        if self.internal_draw_fb == self.internal_read_fb {
            self.device
                .bind_framebuffer(FramebufferTarget::Framebuffer, self.internal_draw_fb);
        } else {
            assert!(self.supports_split_framebuffer());
            self.device
                .bind_framebuffer(FramebufferTarget::Draw, self.internal_draw_fb);
            self.device
                .bind_framebuffer(FramebufferTarget::Read, self.internal_read_fb);
        }

        self.in_internal_mode_draw = false;
        self.in_internal_mode_read = false;
    }

    /// Binds `fb` as the draw target only. Requires split framebuffer
    /// support.
    pub fn bind_draw_fb(&mut self, fb: Option<D::Framebuffer>) {
        assert!(self.supports_split_framebuffer());

        let draw_fb = self.draw_fb();
        self.user_draw_fb = fb;
        self.internal_draw_fb = Some(fb.unwrap_or(draw_fb));

        self.device
            .bind_framebuffer(FramebufferTarget::Draw, self.internal_draw_fb);

        self.in_internal_mode_draw = false;
    }

    /// Binds `fb` as the read target only. Requires split framebuffer
    /// support.
    pub fn bind_read_fb(&mut self, fb: Option<D::Framebuffer>) {
        assert!(self.supports_split_framebuffer());

        let read_fb = self.read_fb();
        self.user_read_fb = fb;
        self.internal_read_fb = Some(fb.unwrap_or(read_fb));

        self.device
            .bind_framebuffer(FramebufferTarget::Read, self.internal_read_fb);

        self.in_internal_mode_read = false;
    }

    /// Must be called before the owning context destroys any framebuffer,
    /// so a stale id can't be rebound by a later `bind_fb(None)`.
    pub fn deleting_fb(&mut self, fb: D::Framebuffer) {
        if self.internal_draw_fb == Some(fb) {
            self.internal_draw_fb = None;
            self.user_draw_fb = None;
        }
        if self.internal_read_fb == Some(fb) {
            self.internal_read_fb = None;
            self.user_read_fb = None;
        }
    }

    /// The framebuffer currently bound to the draw target.
    ///
    /// Panics under strict checks if an internal operation has left the
    /// binding stale; rebind through `bind_fb` first.
    pub fn current_draw_fb(&self) -> Option<D::Framebuffer> {
        if self.strict_binding_checks {
            assert!(
                !self.in_internal_mode_draw,
                "draw framebuffer binding is stale after an internal rebind"
            );
        }
        self.internal_draw_fb
    }

    /// The framebuffer currently bound to the read target. See
    /// [`GLScreenBuffer::current_draw_fb`].
    pub fn current_read_fb(&self) -> Option<D::Framebuffer> {
        if self.strict_binding_checks {
            assert!(
                !self.in_internal_mode_read,
                "read framebuffer binding is stale after an internal rebind"
            );
        }
        self.internal_read_fb
    }

    fn supports_split_framebuffer(&self) -> bool {
        self.device
            .capabilities()
            .contains(DeviceCapabilities::SPLIT_FRAMEBUFFER)
    }

    /// Changes the factory used to create surfaces. Surfaces already in
    /// flight are unaffected.
    pub fn morph(&mut self, new_factory: SurfaceFactory<D>) {
        self.factory = new_factory;
    }

    fn attach(&mut self, surface: &Arc<SharedSurface<D>>, size: Size2D<i32>) -> Result<(), Error> {
        self.in_internal_mode_draw = true;
        self.in_internal_mode_read = true;

        let prev = self.read.as_ref().map(|read| read.shared_surf().clone());
        if let Some(prev) = &prev {
            prev.unlock_producer();
        }
        surface.lock_producer();

        let same_size = self.read.as_ref().map_or(false, |read| read.size() == size);
        let result = if same_size {
            // Same size, same type, ready for reuse.
            self.read
                .as_mut()
                .expect("no read buffer")
                .attach(surface)
        } else {
            ReadBuffer::create(&self.device, surface, self.render_target_flags)
                .map(|read| self.read = Some(read))
        };

        if let Err(err) = result {
            surface.unlock_producer();
            if let Some(prev) = &prev {
                prev.lock_producer();
            }
            // The failed attach clobbered the device binding too; rebind the
            // user's view against the surviving read buffer.
            if self.read.is_some() {
                self.restore_user_bindings();
            }
            return Err(err);
        }

        debug_assert!(Arc::ptr_eq(self.shared_surf(), surface));

        self.restore_user_bindings();

        Ok(())
    }

    // The attach path rebinds framebuffers behind the user's back; this puts
    // the user's bindings back against the current read buffer.
    fn restore_user_bindings(&mut self) {
        let user_draw_fb = self.user_draw_fb;
        let user_read_fb = self.user_read_fb;
        if user_draw_fb == user_read_fb {
            self.bind_fb(user_draw_fb);
        } else {
            self.bind_draw_fb(user_draw_fb);
            self.bind_read_fb(user_read_fb);
        }
    }

    /// Publishes the current back buffer and installs a fresh one of `size`
    /// pixels.
    ///
    /// On failure the front/back state is left untouched.
    pub fn publish_frame(&mut self, size: Size2D<i32>) -> Result<(), Error> {
        self.swap(size)
    }

    fn swap(&mut self, size: Size2D<i32>) -> Result<(), Error> {
        let new_back = self.factory.new_texture_client(size)?;

        // Shared-handle interop backends populate the GL-visible backing
        // store at acquire time, so the acquire has to happen before the
        // attach for the framebuffer to come out complete.
        new_back.surf().producer_acquire();

        let surface = new_back.surf().clone();
        if let Err(err) = self.attach(&surface, size) {
            new_back.surf().producer_release();
            return Err(err);
        }

        debug!("publishing frame, surface {}", surface.id());

        self.front = self.back.take();
        self.back = Some(new_back);

        if let Some(front) = &self.front {
            front.surf().producer_release();
        }

        Ok(())
    }

    /// Replaces the back buffer with one of `size` pixels without rotating
    /// front/back.
    pub fn resize(&mut self, size: Size2D<i32>) -> Result<(), Error> {
        let new_back = self.factory.new_texture_client(size)?;

        let surface = new_back.surf().clone();
        self.attach(&surface, size)?;

        if let Some(back) = &self.back {
            back.surf().producer_release();
        }

        let back = self.back.insert(new_back);
        back.surf().producer_acquire();

        Ok(())
    }
}

impl<D: Device> Drop for GLScreenBuffer<D> {
    fn drop(&mut self) {
        self.read = None;

        // Detach the back buffer cleanly.
        if let Some(back) = &self.back {
            back.surf().producer_release();
        }
    }
}
