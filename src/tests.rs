// glswap/src/tests.rs
//
//! Unit tests.

use crate::chains::SwapChain;
use crate::device::{
    Buffer, Device, DeviceCapabilities, FramebufferTarget, RenderbufferAttachment,
    RenderbufferFormat,
};
use crate::error::Error;
use crate::factory::{SurfaceFactory, SurfaceFlags};
use crate::readbuffer::ReadBuffer;
use crate::registry::select_backend;
use crate::renderbuffers::RenderTargetFlags;
use crate::screenbuffer::GLScreenBuffer;
use crate::surface::{ConsumerTextureType, SurfaceKind};

use euclid::default::Size2D;
use fnv::FnvHashSet;
use std::sync::{Arc, Mutex};

fn size(width: i32, height: i32) -> Size2D<i32> {
    Size2D::new(width, height)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MockFramebuffer(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MockRenderbuffer(u32);

#[derive(Default)]
struct MockState {
    next_id: u32,
    buffers_created: usize,
    live_buffers: usize,
    live_framebuffers: FnvHashSet<u32>,
    live_renderbuffers: FnvHashSet<u32>,
    fail_allocation: bool,
    incomplete_framebuffers: bool,
    // Per-buffer ownership operations, in call order.
    ops: Vec<(u32, &'static str)>,
    binds: Vec<(FramebufferTarget, Option<MockFramebuffer>)>,
}

struct MockDevice {
    caps: DeviceCapabilities,
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    fn new() -> Arc<MockDevice> {
        MockDevice::with_caps(DeviceCapabilities::SPLIT_FRAMEBUFFER)
    }

    fn with_caps(caps: DeviceCapabilities) -> Arc<MockDevice> {
        Arc::new(MockDevice {
            caps,
            state: Arc::new(Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            })),
        })
    }

    fn buffers_created(&self) -> usize {
        self.state.lock().unwrap().buffers_created
    }

    fn live_buffers(&self) -> usize {
        self.state.lock().unwrap().live_buffers
    }

    fn live_framebuffers(&self) -> usize {
        self.state.lock().unwrap().live_framebuffers.len()
    }

    fn set_fail_allocation(&self, fail: bool) {
        self.state.lock().unwrap().fail_allocation = fail;
    }

    fn set_incomplete_framebuffers(&self, incomplete: bool) {
        self.state.lock().unwrap().incomplete_framebuffers = incomplete;
    }

    fn ops_for(&self, id: u32) -> Vec<&'static str> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter(|(buffer, _)| *buffer == id)
            .map(|(_, op)| *op)
            .collect()
    }

    fn clear_binds(&self) {
        self.state.lock().unwrap().binds.clear();
    }

    fn last_bind(&self) -> Option<(FramebufferTarget, Option<MockFramebuffer>)> {
        self.state.lock().unwrap().binds.last().copied()
    }
}

struct MockBuffer {
    id: u32,
    size: Size2D<i32>,
    state: Arc<Mutex<MockState>>,
}

impl MockBuffer {
    fn log(&self, op: &'static str) {
        self.state.lock().unwrap().ops.push((self.id, op));
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> Size2D<i32> {
        self.size
    }
    fn wait_for_buffer_ownership(&self) {
        self.log("wait");
    }
    fn producer_acquire(&self) {
        self.log("acquire");
    }
    fn producer_release(&self) {
        self.log("release");
    }
    fn producer_read_acquire(&self) {
        self.log("read_acquire");
    }
    fn producer_read_release(&self) {
        self.log("read_release");
    }
    fn lock(&self) {
        self.log("lock");
    }
    fn unlock(&self) {
        self.log("unlock");
    }
    fn commit(&self) {
        self.log("commit");
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.state.lock().unwrap().live_buffers -= 1;
    }
}

impl Device for MockDevice {
    type Buffer = MockBuffer;
    type Framebuffer = MockFramebuffer;
    type Renderbuffer = MockRenderbuffer;

    fn capabilities(&self) -> DeviceCapabilities {
        self.caps
    }

    fn create_buffer(&self, _kind: SurfaceKind, size: Size2D<i32>) -> Result<MockBuffer, Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_allocation {
            return Err(Error::SurfaceCreationFailed);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.buffers_created += 1;
        state.live_buffers += 1;
        Ok(MockBuffer {
            id,
            size,
            state: self.state.clone(),
        })
    }

    fn create_framebuffer(&self) -> Result<MockFramebuffer, Error> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.live_framebuffers.insert(id);
        Ok(MockFramebuffer(id))
    }

    fn delete_framebuffer(&self, framebuffer: MockFramebuffer) {
        let erased = self
            .state
            .lock()
            .unwrap()
            .live_framebuffers
            .remove(&framebuffer.0);
        assert!(erased, "double-free of framebuffer {:?}", framebuffer);
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: Option<MockFramebuffer>) {
        self.state.lock().unwrap().binds.push((target, framebuffer));
    }

    fn attach_buffer_to_framebuffer(
        &self,
        _framebuffer: MockFramebuffer,
        _buffer: &MockBuffer,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn framebuffer_complete(&self, _framebuffer: MockFramebuffer) -> bool {
        !self.state.lock().unwrap().incomplete_framebuffers
    }

    fn create_renderbuffer(
        &self,
        _format: RenderbufferFormat,
        _size: Size2D<i32>,
    ) -> Result<MockRenderbuffer, Error> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.live_renderbuffers.insert(id);
        Ok(MockRenderbuffer(id))
    }

    fn attach_renderbuffer(
        &self,
        _framebuffer: MockFramebuffer,
        _attachment: RenderbufferAttachment,
        _renderbuffer: MockRenderbuffer,
    ) {
    }

    fn delete_renderbuffer(&self, renderbuffer: MockRenderbuffer) {
        let erased = self
            .state
            .lock()
            .unwrap()
            .live_renderbuffers
            .remove(&renderbuffer.0);
        assert!(erased, "double-free of renderbuffer {:?}", renderbuffer);
    }
}

fn recycling_factory(device: &Arc<MockDevice>) -> SurfaceFactory<MockDevice> {
    SurfaceFactory::basic(device.clone(), SurfaceFlags::RECYCLE)
}

// ---------------------------------------------------------------------------
// SurfaceFactory

#[test]
fn outstanding_clients_never_alias() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let a = factory.new_texture_client(size(64, 64)).unwrap();
    let b = factory.new_texture_client(size(64, 64)).unwrap();
    assert_ne!(a.surf().id(), b.surf().id());
    assert_eq!(device.buffers_created(), 2);
}

#[test]
fn free_pool_is_bounded_at_two() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);

    let a = factory.new_texture_client(size(64, 64)).unwrap();
    let b = factory.new_texture_client(size(64, 64)).unwrap();
    let c = factory.new_texture_client(size(64, 64)).unwrap();
    assert_eq!(device.buffers_created(), 3);

    drop(a);
    drop(b);
    drop(c);
    // The third recycle was rejected; its surface died instead of growing
    // the pool.
    assert_eq!(factory.recycle_free_pool_len(), 2);
    assert_eq!(device.live_buffers(), 2);

    let _a = factory.new_texture_client(size(64, 64)).unwrap();
    let _b = factory.new_texture_client(size(64, 64)).unwrap();
    let _c = factory.new_texture_client(size(64, 64)).unwrap();
    assert_eq!(device.buffers_created(), 4);
}

#[test]
fn recycle_pool_reuses_and_evicts_by_size() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);

    // Miss: allocates fresh.
    let client = factory.new_texture_client(size(100, 100)).unwrap();
    let first_id = client.surf().id();
    assert_eq!(device.buffers_created(), 1);

    // Dropping the client parks the surface in the free pool.
    drop(client);
    assert_eq!(factory.recycle_free_pool_len(), 1);

    // Hit: same size comes back out, re-synchronized with the GPU.
    let client = factory.new_texture_client(size(100, 100)).unwrap();
    assert_eq!(client.surf().id(), first_id);
    assert_eq!(device.buffers_created(), 1);
    // Reuse re-synchronized with the consumer side.
    let buffer_id = client.surf().buffer().id;
    assert!(device.ops_for(buffer_id).contains(&"wait"));
    drop(client);
    assert_eq!(factory.recycle_free_pool_len(), 1);

    // A different size evicts the pooled entry permanently and allocates
    // fresh.
    let big = factory.new_texture_client(size(200, 200)).unwrap();
    assert_eq!(device.buffers_created(), 2);
    assert_eq!(factory.recycle_free_pool_len(), 0);
    drop(big);

    // The evicted 100x100 surface is gone for good.
    let client = factory.new_texture_client(size(100, 100)).unwrap();
    assert_ne!(client.surf().id(), first_id);
    assert_eq!(device.buffers_created(), 3);
}

#[test]
fn non_recyclable_surfaces_die_on_drop() {
    let device = MockDevice::new();
    let factory = SurfaceFactory::basic(device.clone(), SurfaceFlags::empty());
    let client = factory.new_texture_client(size(32, 32)).unwrap();
    drop(client);
    assert_eq!(factory.recycle_free_pool_len(), 0);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn factory_teardown_frees_pooled_surfaces() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let client = factory.new_texture_client(size(32, 32)).unwrap();
    drop(client);
    assert_eq!(device.live_buffers(), 1);
    drop(factory);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn clients_outlive_their_factory_and_detach_silently() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let client = factory.new_texture_client(size(8, 8)).unwrap();
    drop(factory);
    assert_eq!(device.live_buffers(), 1);

    // With the factory gone there is no pool to return to; the surface just
    // dies with the client.
    drop(client);
    assert_eq!(device.live_buffers(), 0);
}

// ---------------------------------------------------------------------------
// Backend registry

#[test]
fn registry_selection_is_capability_gated() {
    assert_eq!(
        select_backend(DeviceCapabilities::empty(), ConsumerTextureType::GlTexture),
        Some(SurfaceKind::Basic)
    );
    assert_eq!(
        select_backend(
            DeviceCapabilities::empty(),
            ConsumerTextureType::SharedHandle
        ),
        None
    );
    assert_eq!(
        select_backend(
            DeviceCapabilities::SHARED_HANDLES,
            ConsumerTextureType::SharedHandle
        ),
        Some(SurfaceKind::SharedHandle)
    );
    assert_eq!(
        select_backend(DeviceCapabilities::all(), ConsumerTextureType::Unknown),
        None
    );
}

#[test]
fn no_factory_for_unsupported_consumer_type() {
    let device = MockDevice::with_caps(DeviceCapabilities::empty());
    assert!(SurfaceFactory::create(
        device,
        ConsumerTextureType::NativePixmap,
        SurfaceFlags::RECYCLE
    )
    .is_none());
}

// ---------------------------------------------------------------------------
// SharedSurface state machine

#[test]
#[should_panic(expected = "already producer-locked")]
fn double_lock_panics() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(8, 8)).unwrap();
    surface.lock_producer();
    surface.lock_producer();
}

#[test]
fn unlock_when_not_locked_is_a_noop() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(8, 8)).unwrap();
    surface.unlock_producer();
    surface.unlock_producer();
    assert!(!device.ops_for(surface.buffer().id).contains(&"unlock"));
}

#[test]
#[should_panic(expected = "already producer-acquired")]
fn double_producer_acquire_panics() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(8, 8)).unwrap();
    surface.producer_acquire();
    surface.producer_acquire();
}

#[test]
#[should_panic(expected = "not producer-acquired")]
fn release_without_acquire_panics() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(8, 8)).unwrap();
    surface.producer_release();
}

// ---------------------------------------------------------------------------
// ReadBuffer

#[test]
#[should_panic(expected = "different size")]
fn read_buffer_rejects_size_mismatch_on_attach() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let small = factory.create_shared(size(100, 100)).unwrap();
    let big = factory.create_shared(size(200, 200)).unwrap();
    let mut read =
        ReadBuffer::create(&device, &small, RenderTargetFlags::empty()).unwrap();
    let _ = read.attach(&big);
}

#[test]
fn read_buffer_create_is_all_or_nothing() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(64, 64)).unwrap();

    device.set_incomplete_framebuffers(true);
    assert!(matches!(
        ReadBuffer::create(&device, &surface, RenderTargetFlags::DEPTH),
        Err(Error::FramebufferIncomplete)
    ));
    // Everything allocated during the attempt was torn down again.
    assert_eq!(device.live_framebuffers(), 0);
}

#[test]
fn read_buffer_validates_completeness_under_transient_read_acquire() {
    let device = MockDevice::new();
    let factory = recycling_factory(&device);
    let surface = factory.create_shared(size(64, 64)).unwrap();

    let read = ReadBuffer::create(&device, &surface, RenderTargetFlags::empty()).unwrap();
    let ops = device.ops_for(surface.buffer().id);
    assert_eq!(ops, vec!["read_acquire", "read_release"]);
    // Construction holds no producer lock afterwards.
    assert!(!surface.is_producer_acquired());
    drop(read);
    assert_eq!(device.live_framebuffers(), 0);
}

// ---------------------------------------------------------------------------
// GLScreenBuffer

#[test]
fn screen_buffer_redirects_default_framebuffer() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();

    device.clear_binds();
    screen.bind_fb(None);
    let (target, bound) = device.last_bind().unwrap();
    assert_eq!(target, FramebufferTarget::Framebuffer);
    assert!(bound.is_some());
    assert_eq!(screen.current_draw_fb(), bound);
    assert_eq!(screen.current_read_fb(), bound);

    // Non-default framebuffers pass through unchanged.
    let user_fb = device.create_framebuffer().unwrap();
    screen.bind_fb(Some(user_fb));
    assert_eq!(screen.current_draw_fb(), Some(user_fb));

    // Deleting a framebuffer zeroes any slot naming it, so a later bind
    // can't resurrect the stale id.
    screen.deleting_fb(user_fb);
    assert_eq!(screen.current_draw_fb(), None);
    assert_eq!(screen.current_read_fb(), None);
    device.delete_framebuffer(user_fb);
}

#[test]
fn screen_buffer_publish_rotates_back_to_front() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();
    let drawn = screen.shared_surf().id();

    screen.publish_frame(size(16, 16)).unwrap();
    assert_eq!(screen.front().unwrap().surf().id(), drawn);
    // The demoted front buffer had producer ownership released.
    let front_buffer = screen.front().unwrap().surf().buffer().id;
    assert_eq!(device.ops_for(front_buffer).last(), Some(&"release"));
}

#[test]
fn screen_buffer_double_publish_does_not_leak() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();

    screen.publish_frame(size(16, 16)).unwrap();
    screen.publish_frame(size(16, 16)).unwrap();

    drop(screen);
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.live_framebuffers(), 0);
}

#[test]
fn screen_buffer_failures_leave_state_untouched() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();
    screen.publish_frame(size(16, 16)).unwrap();
    let front = screen.front().unwrap().surf().id();
    let back = screen.shared_surf().id();

    // Allocation failure.
    device.set_fail_allocation(true);
    assert!(screen.publish_frame(size(16, 16)).is_err());
    assert_eq!(screen.front().unwrap().surf().id(), front);
    assert_eq!(screen.shared_surf().id(), back);
    device.set_fail_allocation(false);

    // Attachment failure: the size change forces a fresh read buffer, which
    // comes out incomplete.
    device.set_incomplete_framebuffers(true);
    assert!(screen.publish_frame(size(32, 32)).is_err());
    assert_eq!(screen.front().unwrap().surf().id(), front);
    assert_eq!(screen.shared_surf().id(), back);
    assert_eq!(screen.size(), size(16, 16));
    device.set_incomplete_framebuffers(false);

    assert!(screen.publish_frame(size(32, 32)).is_ok());
    assert_eq!(screen.size(), size(32, 32));
}

#[test]
fn failed_publish_leaves_bindings_usable() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();
    screen.bind_fb(None);
    let bound = screen.current_draw_fb();

    // The size change forces a fresh read buffer, which comes out
    // incomplete.
    device.set_incomplete_framebuffers(true);
    assert!(screen.publish_frame(size(32, 32)).is_err());
    device.set_incomplete_framebuffers(false);

    // The user's bindings survived the failed attach; querying them is not
    // a stale-state violation, and the device was rebound to match.
    assert_eq!(screen.current_draw_fb(), bound);
    assert_eq!(screen.current_read_fb(), bound);
    let (target, framebuffer) = device.last_bind().unwrap();
    assert_eq!(target, FramebufferTarget::Framebuffer);
    assert_eq!(framebuffer, bound);
}

#[test]
fn screen_buffer_morph_detaches_in_flight_clients() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();
    screen.publish_frame(size(16, 16)).unwrap();
    assert_eq!(device.buffers_created(), 2);

    // The old factory dies here; the front and back clients still hold its
    // surfaces.
    screen.morph(SurfaceFactory::basic(device.clone(), SurfaceFlags::RECYCLE));

    // The next publish allocates from the new factory. The demoted front
    // client's factory is gone, so its surface just dies instead of being
    // recycled into the new factory's pool.
    screen.publish_frame(size(16, 16)).unwrap();
    assert_eq!(device.buffers_created(), 3);
    assert_eq!(device.live_buffers(), 2);
    assert_eq!(screen.factory().recycle_free_pool_len(), 0);
}

#[test]
fn screen_buffer_resize_does_not_rotate() {
    let device = MockDevice::new();
    let mut screen =
        GLScreenBuffer::create(device.clone(), size(16, 16), RenderTargetFlags::empty()).unwrap();
    screen.publish_frame(size(16, 16)).unwrap();
    let front = screen.front().unwrap().surf().id();

    screen.resize(size(32, 32)).unwrap();
    assert_eq!(screen.front().unwrap().surf().id(), front);
    assert_eq!(screen.size(), size(32, 32));
}

// ---------------------------------------------------------------------------
// SwapChain

#[test]
fn presenter_release_promotes_back_to_front() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(32, 32)).unwrap();
    let drawn = presenter.back_buffer().unwrap().id();
    assert!(chain.front_buffer().is_none());
    assert!(presenter.framebuffer().is_some());

    drop(presenter);
    assert_eq!(chain.front_buffer().unwrap().id(), drawn);
    assert_eq!(chain.size(), Some(size(32, 32)));
}

#[test]
#[should_panic(expected = "already live")]
fn second_acquire_with_live_presenter_panics() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);
    let _presenter = chain.acquire(size(32, 32)).unwrap();
    let _ = chain.acquire(size(32, 32));
}

#[test]
fn presenter_follows_ownership_protocol_order() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(32, 32)).unwrap();
    let buffer = presenter.back_buffer().unwrap().buffer().id;
    assert_eq!(device.ops_for(buffer), vec!["wait", "acquire", "lock"]);

    drop(presenter);
    assert_eq!(
        device.ops_for(buffer),
        vec!["wait", "acquire", "lock", "unlock", "release", "commit"]
    );
}

#[test]
fn chain_pool_reuses_oldest_and_discards_on_size_change() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 1);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    let first = presenter.back_buffer().unwrap().id();
    drop(presenter);
    assert_eq!(device.buffers_created(), 1);

    // At capacity with a matching size: the oldest pooled entry is reused.
    let presenter = chain.acquire(size(8, 8)).unwrap();
    assert_eq!(presenter.back_buffer().unwrap().id(), first);
    assert_eq!(device.buffers_created(), 1);
    drop(presenter);

    // A size change throws the whole pool away.
    let presenter = chain.acquire(size(9, 9)).unwrap();
    assert_ne!(presenter.back_buffer().unwrap().id(), first);
    assert_eq!(device.buffers_created(), 2);
    drop(presenter);

    chain.clear_pool();
    assert!(chain.front_buffer().is_some());
}

#[test]
fn chain_publish_swaps_through_live_presenter() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    let first = presenter.back_buffer().unwrap().id();

    chain.publish_frame(size(8, 8)).unwrap();
    assert_eq!(chain.front_buffer().unwrap().id(), first);
    // There was no previous front buffer to hand back.
    assert!(presenter.back_buffer().is_none());

    drop(presenter);
    assert_eq!(chain.front_buffer().unwrap().id(), first);
}

#[test]
fn chain_resize_replaces_back_without_rotation() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    let old_buffer = presenter.back_buffer().unwrap().buffer().id;
    chain.resize(size(16, 16)).unwrap();
    assert_eq!(chain.offscreen_size(), Some(size(16, 16)));
    assert!(chain.front_buffer().is_none());

    // The outgoing and incoming buffers went through the same protocol as
    // any other back-buffer replacement.
    assert_eq!(
        device.ops_for(old_buffer),
        vec!["wait", "acquire", "lock", "unlock", "release", "commit"]
    );
    let new_buffer = presenter.back_buffer().unwrap().buffer().id;
    assert_eq!(device.ops_for(new_buffer), vec!["wait", "acquire", "lock"]);

    let resized = presenter.back_buffer().unwrap().id();
    drop(presenter);
    assert_eq!(chain.front_buffer().unwrap().id(), resized);
    assert_eq!(chain.size(), Some(size(16, 16)));
}

#[test]
fn chain_morph_keeps_in_flight_surfaces_working() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    chain.morph(SurfaceFactory::basic(device.clone(), SurfaceFlags::empty()));

    // The pre-morph back buffer still publishes normally.
    let first = presenter.back_buffer().unwrap().id();
    drop(presenter);
    assert_eq!(chain.front_buffer().unwrap().id(), first);

    // New acquisitions come from the new factory.
    let presenter = chain.acquire(size(8, 8)).unwrap();
    assert_ne!(presenter.back_buffer().unwrap().id(), first);
    assert_eq!(device.buffers_created(), 2);
}

#[test]
fn chain_retains_previous_front_until_superseded() {
    let device = MockDevice::new();
    let chain = SwapChain::with_pool_size(recycling_factory(&device), 0);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    let first = presenter.back_buffer().unwrap().id();
    drop(presenter);

    let presenter = chain.acquire(size(8, 8)).unwrap();
    drop(presenter);

    // Both generations are still alive: the new front, and the previous
    // front retained for in-flight GPU work.
    assert_ne!(chain.front_buffer().unwrap().id(), first);
    assert_eq!(device.live_buffers(), 2);

    chain.clear_pool();
    assert_eq!(device.live_buffers(), 1);
}
