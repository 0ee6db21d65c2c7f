// glswap/src/platform/mod.rs
//
//! Concrete device backends.

pub mod generic;
