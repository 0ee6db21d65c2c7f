// glswap/src/surface.rs
//
//! Shared surfaces: GPU-backed drawables handed between a producer GL
//! context and a consumer compositor.

use crate::device::{Buffer, Device};

use euclid::default::Size2D;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_SURFACE_ID: AtomicUsize = AtomicUsize::new(1);

/// The ID of a surface. This is globally unique for each currently-allocated
/// surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceID(pub usize);

impl Display for SurfaceID {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}", *self)
    }
}

/// The allocation backend a surface was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    /// A plain GL texture, for readback and bootstrapping.
    Basic,
    /// A buffer exportable as a cross-process shared handle.
    SharedHandle,
    /// A buffer bound to a window-system pixmap.
    Pixmap,
    /// A platform hardware buffer.
    HardwareBuffer,
}

/// What the consumer side is able to ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerTextureType {
    Unknown,
    GlTexture,
    SharedHandle,
    NativePixmap,
    HardwareBuffer,
}

/// The immutable description a surface is created from.
pub struct SharedSurfaceDesc<D: Device> {
    /// The device owning the GL context this surface was created on.
    pub device: Arc<D>,
    /// The allocation backend.
    pub kind: SurfaceKind,
    /// The consumer texture type the surface is destined for.
    pub consumer_type: ConsumerTextureType,
    /// Whether the surface may enter the factory's recycle pool.
    pub can_recycle: bool,
    /// The surface's size, in device pixels.
    pub size: Size2D<i32>,
}

impl<D: Device> Clone for SharedSurfaceDesc<D> {
    fn clone(&self) -> Self {
        SharedSurfaceDesc {
            device: self.device.clone(),
            kind: self.kind,
            consumer_type: self.consumer_type,
            can_recycle: self.can_recycle,
            size: self.size,
        }
    }
}

/// A surface description with everything but the size: the template a
/// factory stamps out surfaces from.
pub struct PartialSharedSurfaceDesc<D: Device> {
    pub device: Arc<D>,
    pub kind: SurfaceKind,
    pub consumer_type: ConsumerTextureType,
    pub can_recycle: bool,
}

impl<D: Device> PartialSharedSurfaceDesc<D> {
    pub(crate) fn with_size(&self, size: Size2D<i32>) -> SharedSurfaceDesc<D> {
        SharedSurfaceDesc {
            device: self.device.clone(),
            kind: self.kind,
            consumer_type: self.consumer_type,
            can_recycle: self.can_recycle,
            size,
        }
    }
}

/// A GPU-backed drawable shared between a producer and a consumer.
///
/// Two independent state bits govern access: `locked` (the producer-side GL
/// lock) and `producer_acquired` (ownership transferred to the producer for
/// drawing, as opposed to released to the consumer for display). Violating
/// the alternation panics; see the individual methods.
pub struct SharedSurface<D: Device> {
    desc: SharedSurfaceDesc<D>,
    buffer: D::Buffer,
    id: SurfaceID,
    locked: AtomicBool,
    producer_acquired: AtomicBool,
    // The render-target FBO for this surface, created on first use. `None`
    // inside the cell records a failed creation so we don't retry.
    framebuffer: OnceLock<Option<D::Framebuffer>>,
}

impl<D: Device> SharedSurface<D> {
    pub(crate) fn new(desc: SharedSurfaceDesc<D>, buffer: D::Buffer) -> SharedSurface<D> {
        SharedSurface {
            desc,
            buffer,
            id: SurfaceID(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            locked: AtomicBool::new(false),
            producer_acquired: AtomicBool::new(false),
            framebuffer: OnceLock::new(),
        }
    }

    /// The description this surface was created from.
    pub fn desc(&self) -> &SharedSurfaceDesc<D> {
        &self.desc
    }

    /// The surface's globally unique ID.
    pub fn id(&self) -> SurfaceID {
        self.id
    }

    /// The surface's size, in device pixels.
    pub fn size(&self) -> Size2D<i32> {
        self.desc.size
    }

    /// The GPU buffer backing this surface.
    pub fn buffer(&self) -> &D::Buffer {
        &self.buffer
    }

    /// The surface's own render-target framebuffer, created lazily.
    ///
    /// Returns `None` if framebuffer creation or attachment failed.
    pub fn framebuffer(&self) -> Option<D::Framebuffer> {
        *self.framebuffer.get_or_init(|| {
            let device = &self.desc.device;
            let framebuffer = device.create_framebuffer().ok()?;
            if device
                .attach_buffer_to_framebuffer(framebuffer, &self.buffer)
                .is_err()
                || !device.framebuffer_complete(framebuffer)
            {
                device.delete_framebuffer(framebuffer);
                return None;
            }
            Some(framebuffer)
        })
    }

    /// Takes the producer-side GL lock.
    ///
    /// Panics if the surface is already locked.
    pub fn lock_producer(&self) {
        let was_locked = self.locked.swap(true, Ordering::AcqRel);
        assert!(!was_locked, "surface {} is already producer-locked", self.id);
        self.buffer.lock();
    }

    /// Drops the producer-side GL lock. No-op if the surface isn't locked.
    pub fn unlock_producer(&self) {
        if !self.locked.swap(false, Ordering::AcqRel) {
            return;
        }
        self.buffer.unlock();
    }

    /// Transfers ownership of the surface to the producer for drawing.
    ///
    /// Panics if the producer has already acquired the surface.
    pub fn producer_acquire(&self) {
        let was_acquired = self.producer_acquired.swap(true, Ordering::AcqRel);
        assert!(
            !was_acquired,
            "surface {} is already producer-acquired",
            self.id
        );
        self.buffer.producer_acquire();
    }

    /// Releases ownership of the surface back to the consumer.
    ///
    /// Panics if the producer hasn't acquired the surface.
    pub fn producer_release(&self) {
        let was_acquired = self.producer_acquired.swap(false, Ordering::AcqRel);
        assert!(
            was_acquired,
            "surface {} was not producer-acquired",
            self.id
        );
        self.buffer.producer_release();
    }

    /// Whether the producer currently owns the surface.
    pub fn is_producer_acquired(&self) -> bool {
        self.producer_acquired.load(Ordering::Acquire)
    }

    /// Acquires the surface transiently for producer-side reads.
    pub fn producer_read_acquire(&self) {
        self.buffer.producer_read_acquire();
    }

    /// Releases a transient producer-side read acquisition.
    pub fn producer_read_release(&self) {
        self.buffer.producer_read_release();
    }

    /// Blocks until the consumer side has relinquished the surface.
    pub fn wait_for_buffer_ownership(&self) {
        self.buffer.wait_for_buffer_ownership();
    }

    /// Commits finished drawing.
    pub fn commit(&self) {
        self.buffer.commit();
    }
}

impl<D: Device> Drop for SharedSurface<D> {
    fn drop(&mut self) {
        if let Some(Some(framebuffer)) = self.framebuffer.get() {
            self.desc.device.delete_framebuffer(*framebuffer);
        }
    }
}
