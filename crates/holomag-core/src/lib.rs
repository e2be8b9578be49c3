//! # Holomag Core
//!
//! The numerical core of the holomag framework. This crate turns a 3-D
//! magnetization distribution into its magnetic vector potential and
//! B-field, simulates electron-holography phase images of it, and inverts
//! those images back into a magnetization estimate.
//!
//! ## Architecture
//!
//! All FFT work goes through an injected
//! [`holomag_spectral::SpectralBackend`], selected once via
//! [`config::PipelineConfig`]. The forward model is a chain of linear
//! operators (projector, then phase mapper) gathered into a
//! [`dataset::DataSet`] and exposed with its Jacobian and adjoint by
//! [`forward_model::ForwardModel`].
//!
//! ## Modules
//!
//! - [`types`] - [`types::VectorField`], [`types::PhaseMap`] and physical constants.
//! - [`converter`] - Magnetization to vector potential and B-field.
//! - [`projection`] - Simple and tilted projections of 3-D fields.
//! - [`phasemapper`] - Projected magnetization to holography phase.
//! - [`dataset`] - Phase maps paired with their projections.
//! - [`forward_model`] - The linear forward model and its adjoint.
//! - [`reconstruction`] - Tikhonov cost function and conjugate gradients.
//! - [`analytic`] - Closed-form phase maps for validation.
//! - [`config`] - TOML pipeline configuration.
//! - [`error`] - The shared error type.

pub mod analytic;
pub mod config;
pub mod converter;
pub mod dataset;
pub mod error;
pub mod forward_model;
pub mod phasemapper;
pub mod projection;
pub mod reconstruction;
pub mod types;

pub use error::{HoloError, Result};
