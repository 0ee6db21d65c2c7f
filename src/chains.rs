// glswap/src/chains.rs
//
//! Swap chains: double buffering over a small pool of shared surfaces.
//!
//! A caller acquires a [`SwapChainPresenter`], draws into its back buffer,
//! and drops it; the drop promotes the back buffer to the chain's front
//! buffer, where a consumer picks it up. The previous front buffer is
//! retained until the next promotion supersedes it, since outstanding GPU
//! reads of it may still be in flight.
//!
//! At most one presenter may be alive per swap chain at any time; acquiring
//! a second one panics.

use crate::device::Device;
use crate::error::Error;
use crate::factory::SurfaceFactory;
use crate::surface::SharedSurface;

use euclid::default::Size2D;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

// Pooling amortizes surface allocation on platforms where destruction is
// slow; elsewhere it is disabled and every acquire allocates.
const DEFAULT_POOL_SIZE: usize = if cfg!(target_os = "android") { 4 } else { 0 };

struct SwapChainData<D: Device> {
    factory: SurfaceFactory<D>,
    // Pooled surfaces, oldest first. Single-size: a head mismatch discards
    // the whole pool.
    pool: VecDeque<Arc<SharedSurface<D>>>,
    pool_size: usize,
    front_buffer: Option<Arc<SharedSurface<D>>>,
    // Held only to keep the superseded front buffer alive while its GPU
    // work may still be in flight.
    prev_front_buffer: Option<Arc<SharedSurface<D>>>,
    // The live presenter's back buffer lives here so that `resize` and
    // `publish_frame` can operate through it.
    presenter_back_buffer: Option<Arc<SharedSurface<D>>>,
    presenter_alive: bool,
}

impl<D: Device> SwapChainData<D> {
    // Replaces the presenter's back buffer, running the release protocol on
    // the outgoing buffer and the mirrored acquisition protocol on the
    // incoming one. The ordering matters: a buffer must never be unlocked
    // and let go on one side while still considered owned on the other.
    fn swap_back_buffer(
        &mut self,
        new_back: Option<Arc<SharedSurface<D>>>,
    ) -> Option<Arc<SharedSurface<D>>> {
        if let Some(back) = &self.presenter_back_buffer {
            back.unlock_producer();
            back.producer_release();
            back.commit();
        }
        let old = self.presenter_back_buffer.take();
        self.presenter_back_buffer = new_back;
        if let Some(back) = &self.presenter_back_buffer {
            back.wait_for_buffer_ownership();
            back.producer_acquire();
            back.lock_producer();
        }
        old
    }
}

/// A swap chain over surfaces from one factory.
///
/// Handles are cheap to clone and share one underlying chain.
pub struct SwapChain<D: Device>(Arc<Mutex<SwapChainData<D>>>);

// We can't derive Clone unfortunately
impl<D: Device> Clone for SwapChain<D> {
    fn clone(&self) -> Self {
        SwapChain(self.0.clone())
    }
}

impl<D: Device> SwapChain<D> {
    /// Creates a swap chain with the platform-default pool size.
    pub fn new(factory: SurfaceFactory<D>) -> SwapChain<D> {
        SwapChain::with_pool_size(factory, DEFAULT_POOL_SIZE)
    }

    /// Creates a swap chain retaining up to `pool_size` pooled surfaces.
    pub fn with_pool_size(factory: SurfaceFactory<D>, pool_size: usize) -> SwapChain<D> {
        SwapChain(Arc::new(Mutex::new(SwapChainData {
            factory,
            pool: VecDeque::new(),
            pool_size,
            front_buffer: None,
            prev_front_buffer: None,
            presenter_back_buffer: None,
            presenter_alive: false,
        })))
    }

    // Guarantee unique access to the swap chain data
    fn lock(&self) -> MutexGuard<SwapChainData<D>> {
        self.0.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// The most recently published surface, if any.
    pub fn front_buffer(&self) -> Option<Arc<SharedSurface<D>>> {
        self.lock().front_buffer.clone()
    }

    /// The published frame's size, if a frame has been published.
    pub fn size(&self) -> Option<Size2D<i32>> {
        self.lock().front_buffer.as_ref().map(|s| s.size())
    }

    /// The size being drawn at, if a presenter is live.
    pub fn offscreen_size(&self) -> Option<Size2D<i32>> {
        self.lock().presenter_back_buffer.as_ref().map(|s| s.size())
    }

    /// Discards the pool and the retained previous front buffer.
    pub fn clear_pool(&self) {
        let mut data = self.lock();
        data.pool.clear();
        data.prev_front_buffer = None;
    }

    /// Changes the factory used to create surfaces. Surfaces already in
    /// flight are unaffected.
    pub fn morph(&self, new_factory: SurfaceFactory<D>) {
        self.lock().factory = new_factory;
    }

    /// Hands out a presenter bound to a back buffer of `size` pixels.
    ///
    /// Panics if a presenter is already live for this chain.
    pub fn acquire(&self, size: Size2D<i32>) -> Result<SwapChainPresenter<D>, Error> {
        let surface = {
            let mut data = self.lock();
            assert!(
                !data.presenter_alive,
                "a presenter is already live for this swap chain"
            );

            if data
                .pool
                .front()
                .map_or(false, |surface| surface.size() != size)
            {
                data.pool.clear();
            }

            let mut surface = None;
            if data.pool_size != 0 && data.pool.len() == data.pool_size {
                surface = data.pool.pop_front();
            }
            let surface = match surface {
                Some(surface) => {
                    debug!("acquire: reusing pooled surface {}", surface.id());
                    surface
                }
                None => data.factory.create_shared(size)?,
            };

            // The surface just handed out is also retained as the
            // most-recently-used pool slot.
            data.pool.push_back(surface.clone());
            while data.pool.len() > data.pool_size {
                data.pool.pop_front();
            }

            data.presenter_alive = true;
            surface
        };

        let presenter = SwapChainPresenter {
            swap_chain: self.clone(),
        };
        let old = presenter.swap_back_buffer(Some(surface));
        assert!(old.is_none(), "fresh presenter started with a back buffer");
        Ok(presenter)
    }

    /// Publishes the presenter's back buffer as the new front buffer and
    /// hands the old front buffer back to the presenter for drawing.
    ///
    /// Panics if no presenter is live.
    pub fn publish_frame(&self, size: Size2D<i32>) -> Result<(), Error> {
        self.swap(size)
    }

    fn swap(&self, _size: Size2D<i32>) -> Result<(), Error> {
        let mut data = self.lock();
        assert!(data.presenter_alive, "publish requires a live presenter");
        let front = data.front_buffer.take();
        data.front_buffer = data.swap_back_buffer(front);
        Ok(())
    }

    /// Replaces the presenter's back buffer with a fresh surface of `size`
    /// pixels. Does not rotate front/back.
    ///
    /// Panics if no presenter is live.
    pub fn resize(&self, size: Size2D<i32>) -> Result<(), Error> {
        let mut data = self.lock();
        assert!(data.presenter_alive, "resize requires a live presenter");

        let new_back = data.factory.create_shared(size)?;
        // The outgoing buffer goes through the full release protocol and the
        // incoming one through the full acquisition protocol, same as any
        // other back-buffer replacement.
        data.swap_back_buffer(Some(new_back));

        Ok(())
    }
}

/// A scoped handle to a swap chain's back buffer.
///
/// Dropping the presenter promotes its back buffer to the chain's front
/// buffer.
pub struct SwapChainPresenter<D: Device> {
    swap_chain: SwapChain<D>,
}

impl<D: Device> SwapChainPresenter<D> {
    /// The back buffer the presenter is bound to.
    pub fn back_buffer(&self) -> Option<Arc<SharedSurface<D>>> {
        self.swap_chain.lock().presenter_back_buffer.clone()
    }

    /// Replaces the back buffer, returning the old one. The outgoing buffer
    /// is released (unlock, producer-release, commit) and the incoming one
    /// acquired (wait for ownership, producer-acquire, lock).
    pub fn swap_back_buffer(
        &self,
        new_back: Option<Arc<SharedSurface<D>>>,
    ) -> Option<Arc<SharedSurface<D>>> {
        self.swap_chain.lock().swap_back_buffer(new_back)
    }

    /// The framebuffer to draw through, or `None` if no back buffer is
    /// bound or its framebuffer couldn't be created.
    pub fn framebuffer(&self) -> Option<D::Framebuffer> {
        let back = self.swap_chain.lock().presenter_back_buffer.clone()?;
        back.framebuffer()
    }
}

impl<D: Device> Drop for SwapChainPresenter<D> {
    fn drop(&mut self) {
        let new_front = self.swap_back_buffer(None);

        let mut data = self.swap_chain.lock();
        assert!(data.presenter_alive, "presenter released twice");
        data.presenter_alive = false;

        if let Some(new_front) = new_front {
            debug!("promoting surface {} to front", new_front.id());
            data.prev_front_buffer = data.front_buffer.take();
            data.front_buffer = Some(new_front);
        }
    }
}
