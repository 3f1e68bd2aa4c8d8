//! Inference backends
//!
//! - Tract backend (pure Rust ONNX inference, feature `tract`)
//! - Mock backends and removers for tests and benchmarks

pub mod mock;

#[cfg(feature = "tract")]
pub mod tract;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

pub use self::mock::{FailingRemover, FixedRemover, MockBackend, PassthroughRemover};
