//! # ModalKit Diffusion
//!
//! Sampler configuration and request building for latent diffusion
//! (SDXL-style) pipelines.
//!
//! The diffusion engine itself is opaque ([`DiffusionEngine`]). This crate
//! resolves user-facing [`SamplingParams`] into closed sampler, guider and
//! discretization types, rejecting unknown tags up front, and assembles the
//! conditioning value dictionaries for text-to-image, image-to-image and
//! refiner requests.

pub mod config;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod sampler;

pub use config::PipelineConfig;
pub use error::{DiffusionError, DiffusionResult};
pub use params::SamplingParams;
pub use pipeline::{DiffusionEngine, Img2ImgRequest, SampleRequest, SamplingPipeline, ValueDict};
pub use sampler::{DiscretizationConfig, GuiderConfig, SamplerConfig, SamplerKind, Thresholding};
