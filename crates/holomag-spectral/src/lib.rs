//! # Holomag Spectral
//!
//! Spectral transform backends for the holomag framework. This crate
//! provides a [`SpectralBackend`](backend::SpectralBackend) trait that isolates
//! the convolution code from the padding policy and plan management of the
//! underlying FFT engine.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Padding policy |
//! |---------|-------------|----------------|
//! | Power of two | `pow2` (default) | smallest power of two >= `2 * len` |
//! | Even | `even` (default) | `2 * len`, plans cached across calls |
//!
//! Both backends produce the same linear convolution once the caller crops
//! the result; they differ only in transform size and therefore in the last
//! few bits of the output.

pub mod backend;
mod transform;

#[cfg(feature = "pow2")]
pub mod pow2;

#[cfg(feature = "even")]
pub mod even;

pub use backend::{create_backend, BackendType, SpectralBackend, SpectralError};

#[cfg(feature = "pow2")]
pub use pow2::PowerOfTwoBackend;

#[cfg(feature = "even")]
pub use even::EvenBackend;
