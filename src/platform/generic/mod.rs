// glswap/src/platform/generic/mod.rs
//
//! The generic GL backend, usable wherever a `glow` context is available.

pub mod device;

pub use device::{GlowBuffer, GlowDevice};
