// glswap/src/factory.rs
//
//! Surface factories and the texture clients they hand out.
//!
//! A factory stamps out `SharedSurface`s from a description template and
//! keeps a small recycle pool so that steady-state rendering doesn't churn
//! allocations. Recycling happens when the last reference to a
//! `TextureClient` is dropped: the surface is offered back to its factory,
//! which either parks it in the bounded free pool or evicts it for good.

use crate::device::Device;
use crate::error::Error;
use crate::registry;
use crate::surface::{
    ConsumerTextureType, PartialSharedSurfaceDesc, SharedSurface, SurfaceID, SurfaceKind,
};

use euclid::default::Size2D;
use fnv::FnvHashSet;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

// Bounds the memory retained by idle pooling: at most this many surfaces
// sit in the free pool waiting for reuse.
const RECYCLE_FREE_POOL_CAP: usize = 2;

bitflags::bitflags! {
    /// Flags describing the surfaces a factory produces.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SurfaceFlags: u8 {
        /// Surfaces may enter the recycle pool when their client drops.
        const RECYCLE = 1 << 0;
        /// The surface origin is the bottom-left corner.
        const ORIGIN_BOTTOM_LEFT = 1 << 1;
        /// The surface contents are not premultiplied by alpha.
        const NON_PREMULTIPLIED = 1 << 2;
    }
}

struct Pools<D: Device> {
    // Every outstanding recyclable surface, for teardown-time cleanup.
    total: FnvHashSet<SurfaceID>,
    // Surfaces parked for reuse, oldest first.
    free: VecDeque<Arc<SharedSurface<D>>>,
}

// The part of a factory that texture clients reach back into when they drop.
// Pool membership is the only thing the mutex protects; surface contents are
// governed by the producer/consumer acquire protocol.
struct FactoryShared<D: Device> {
    pools: Mutex<Pools<D>>,
}

impl<D: Device> FactoryShared<D> {
    fn lock(&self) -> MutexGuard<Pools<D>> {
        self.pools.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn start_recycling(&self, id: SurfaceID) {
        let inserted = self.lock().total.insert(id);
        assert!(inserted, "surface {} was already registered for recycling", id);
    }

    fn stop_recycling(&self, id: SurfaceID) {
        let erased = self.lock().total.remove(&id);
        assert!(erased, "surface {} was not registered for recycling", id);
    }

    fn recycle(&self, surface: Arc<SharedSurface<D>>) -> bool {
        let mut pools = self.lock();
        if pools.free.len() >= RECYCLE_FREE_POOL_CAP {
            return false;
        }
        pools.free.push_back(surface);
        true
    }

    fn pop_free(&self) -> Option<Arc<SharedSurface<D>>> {
        self.lock().free.pop_front()
    }
}

/// Creates `SharedSurface`s for one backend and manages their recycling.
pub struct SurfaceFactory<D: Device> {
    desc: PartialSharedSurfaceDesc<D>,
    flags: SurfaceFlags,
    shared: Arc<FactoryShared<D>>,
}

impl<D: Device> SurfaceFactory<D> {
    /// Creates a factory producing surfaces the given consumer texture type
    /// can ingest, or `None` if no backend on this device supports it.
    pub fn create(
        device: Arc<D>,
        consumer_type: ConsumerTextureType,
        flags: SurfaceFlags,
    ) -> Option<SurfaceFactory<D>> {
        let kind = registry::select_backend(device.capabilities(), consumer_type)?;
        Some(SurfaceFactory::with_kind(device, kind, consumer_type, flags))
    }

    /// Creates the basic readback factory. Always available.
    pub fn basic(device: Arc<D>, flags: SurfaceFlags) -> SurfaceFactory<D> {
        SurfaceFactory::with_kind(
            device,
            SurfaceKind::Basic,
            ConsumerTextureType::GlTexture,
            flags,
        )
    }

    fn with_kind(
        device: Arc<D>,
        kind: SurfaceKind,
        consumer_type: ConsumerTextureType,
        flags: SurfaceFlags,
    ) -> SurfaceFactory<D> {
        SurfaceFactory {
            desc: PartialSharedSurfaceDesc {
                device,
                kind,
                consumer_type,
                can_recycle: flags.contains(SurfaceFlags::RECYCLE),
            },
            flags,
            shared: Arc::new(FactoryShared {
                pools: Mutex::new(Pools {
                    total: FnvHashSet::default(),
                    free: VecDeque::new(),
                }),
            }),
        }
    }

    /// The device this factory allocates from.
    pub fn device(&self) -> &Arc<D> {
        &self.desc.device
    }

    /// The description template surfaces are stamped out from.
    pub fn desc(&self) -> &PartialSharedSurfaceDesc<D> {
        &self.desc
    }

    /// The flags surfaces are created with.
    pub fn flags(&self) -> SurfaceFlags {
        self.flags
    }

    /// Allocates a new surface of exactly `size` pixels.
    pub fn create_shared(&self, size: Size2D<i32>) -> Result<Arc<SharedSurface<D>>, Error> {
        let desc = self.desc.with_size(size);
        let buffer = self.desc.device.create_buffer(desc.kind, size)?;
        Ok(Arc::new(SharedSurface::new(desc, buffer)))
    }

    /// Returns a texture client for a surface of exactly `size` pixels,
    /// reusing a recycled surface when one of the right size is available.
    ///
    /// The free pool is drained FIFO; every mismatched entry scanned past is
    /// evicted from recycling permanently. The pool holds one size at a time.
    pub fn new_texture_client(&self, size: Size2D<i32>) -> Result<TextureClient<D>, Error> {
        while let Some(surface) = self.shared.pop_free() {
            if surface.desc().size == size {
                surface.wait_for_buffer_ownership();
                debug!("reusing recycled surface {} ({:?})", surface.id(), size);
                return Ok(self.wrap(surface));
            }
            self.shared.stop_recycling(surface.id());
            debug!("evicted recycled surface {} on size mismatch", surface.id());
        }

        let surface = self.create_shared(size)?;
        self.shared.start_recycling(surface.id());
        debug!("allocated surface {} ({:?})", surface.id(), size);
        Ok(self.wrap(surface))
    }

    fn wrap(&self, surface: Arc<SharedSurface<D>>) -> TextureClient<D> {
        TextureClient {
            surface: Some(surface),
            flags: self.flags,
            recycler: Arc::downgrade(&self.shared),
        }
    }

    #[cfg(test)]
    pub(crate) fn recycle_free_pool_len(&self) -> usize {
        self.shared.lock().free.len()
    }
}

impl<D: Device> Drop for SurfaceFactory<D> {
    fn drop(&mut self) {
        let mut pools = self.shared.lock();
        // Deregister pooled surfaces before dropping them, so a drop on the
        // way out can't offer a surface back to the pool we're clearing.
        let free: Vec<_> = pools.free.drain(..).collect();
        for surface in &free {
            let erased = pools.total.remove(&surface.id());
            assert!(erased, "pooled surface {} was not registered", surface.id());
        }
        // Whatever remains belongs to clients still outstanding; they
        // deregister through their weak handle, which dies with us.
        pools.total.clear();
    }
}

/// A reference-counted client wrapper around a shared surface.
///
/// Dropping the client offers the surface back to its factory for recycling.
pub struct TextureClient<D: Device> {
    surface: Option<Arc<SharedSurface<D>>>,
    flags: SurfaceFlags,
    recycler: Weak<FactoryShared<D>>,
}

impl<D: Device> TextureClient<D> {
    /// The wrapped surface.
    pub fn surf(&self) -> &Arc<SharedSurface<D>> {
        self.surface
            .as_ref()
            .expect("texture client surface already taken")
    }

    /// The flags the surface was created with.
    pub fn flags(&self) -> SurfaceFlags {
        self.flags
    }
}

impl<D: Device> Drop for TextureClient<D> {
    fn drop(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        let Some(shared) = self.recycler.upgrade() else {
            // The factory is gone; the surface just dies with us.
            return;
        };
        let id = surface.id();
        if surface.desc().can_recycle && shared.recycle(surface) {
            return;
        }
        // Did not recover the client. End the (re)cycle.
        shared.stop_recycling(id);
    }
}
