// glswap/src/registry.rs
//
//! The backend capability registry.
//!
//! Backend selection is a pure function of the requested consumer texture
//! type and the device's advertised capabilities: the ranked table below is
//! scanned in order and the first entry whose requirements are met wins.
//! Unsupported combinations yield `None` rather than panicking, so callers
//! can fall back to a different consumer type.

use crate::device::DeviceCapabilities;
use crate::surface::{ConsumerTextureType, SurfaceKind};

struct BackendEntry {
    kind: SurfaceKind,
    consumer_type: ConsumerTextureType,
    requires: DeviceCapabilities,
}

// Ranked highest-preference first. `Basic` requires nothing and serves the
// readback path; it never matches a cross-process consumer type.
static RANKED_BACKENDS: [BackendEntry; 4] = [
    BackendEntry {
        kind: SurfaceKind::SharedHandle,
        consumer_type: ConsumerTextureType::SharedHandle,
        requires: DeviceCapabilities::SHARED_HANDLES,
    },
    BackendEntry {
        kind: SurfaceKind::HardwareBuffer,
        consumer_type: ConsumerTextureType::HardwareBuffer,
        requires: DeviceCapabilities::HARDWARE_BUFFERS,
    },
    BackendEntry {
        kind: SurfaceKind::Pixmap,
        consumer_type: ConsumerTextureType::NativePixmap,
        requires: DeviceCapabilities::PIXMAP_BINDING,
    },
    BackendEntry {
        kind: SurfaceKind::Basic,
        consumer_type: ConsumerTextureType::GlTexture,
        requires: DeviceCapabilities::empty(),
    },
];

/// Selects the backend for `consumer_type` on a device with `capabilities`,
/// or `None` if no backend supports the combination.
pub fn select_backend(
    capabilities: DeviceCapabilities,
    consumer_type: ConsumerTextureType,
) -> Option<SurfaceKind> {
    RANKED_BACKENDS
        .iter()
        .find(|entry| entry.consumer_type == consumer_type && capabilities.contains(entry.requires))
        .map(|entry| entry.kind)
}
