//! Text-to-image, image-to-image and refiner entry points over an opaque
//! diffusion engine.

use crate::config::PipelineConfig;
use crate::error::{DiffusionError, DiffusionResult};
use crate::params::SamplingParams;
use crate::sampler::SamplerConfig;
use ndarray::{Array4, ArrayView4};
use serde_json::{Map, Value};
use std::path::Path;

/// Conditioning values handed to the engine's conditioner.
pub type ValueDict = Map<String, Value>;

/// Request to sample from pure noise.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub sampler: SamplerConfig,
    pub values: ValueDict,
    pub num_samples: usize,
    pub height: usize,
    pub width: usize,
    /// Latent channels of the denoiser input
    pub latent_channels: usize,
    pub vae_scale_factor: usize,
    pub force_uc_zero_embeddings: Vec<String>,
    pub return_latents: bool,
}

/// Request to sample starting from an input image.
#[derive(Debug, Clone, PartialEq)]
pub struct Img2ImgRequest<'a> {
    /// `(B, C, H, W)` input image, or latents when `skip_encode` is set
    pub image: ArrayView4<'a, f32>,
    pub sampler: SamplerConfig,
    pub values: ValueDict,
    pub num_samples: usize,
    pub force_uc_zero_embeddings: Vec<String>,
    /// The input is already in latent space
    pub skip_encode: bool,
    pub return_latents: bool,
}

/// The model that actually runs conditioning, denoising and decoding.
pub trait DiffusionEngine: Send + Sync {
    /// `(N, C, H, W)` samples.
    fn sample(&self, request: SampleRequest) -> DiffusionResult<Array4<f32>>;

    fn img2img(&self, request: Img2ImgRequest<'_>) -> DiffusionResult<Array4<f32>>;
}

/// Builds engine requests from [`SamplingParams`].
#[derive(Debug)]
pub struct SamplingPipeline<E> {
    engine: E,
    config: PipelineConfig,
}

impl<E: DiffusionEngine> SamplingPipeline<E> {
    pub fn new(engine: E, config: PipelineConfig) -> DiffusionResult<Self> {
        config.validate()?;
        log::info!(
            "sampling pipeline ready: vae_scale_factor={}, legacy={}",
            config.vae_scale_factor(),
            config.is_legacy
        );
        Ok(Self { engine, config })
    }

    /// Load the pipeline configuration from a JSON or TOML file.
    pub fn from_config_file(engine: E, path: impl AsRef<Path>) -> DiffusionResult<Self> {
        Self::new(engine, PipelineConfig::from_file(path)?)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn vae_scale_factor(&self) -> usize {
        self.config.vae_scale_factor()
    }

    pub fn text_to_image(
        &self,
        params: &SamplingParams,
        prompt: &str,
        negative_prompt: &str,
        samples: usize,
        return_latents: bool,
    ) -> DiffusionResult<Array4<f32>> {
        params.validate()?;
        let sampler = SamplerConfig::from_params(params)?;

        let mut values = params.to_value_map()?;
        values.insert("prompt".into(), prompt.into());
        values.insert("negative_prompt".into(), negative_prompt.into());
        values.insert("target_width".into(), params.width.into());
        values.insert("target_height".into(), params.height.into());

        log::debug!(
            "text_to_image: {samples} samples at {}x{} with {}",
            params.width,
            params.height,
            sampler.kind
        );
        self.engine.sample(SampleRequest {
            sampler,
            values,
            num_samples: samples,
            height: params.height,
            width: params.width,
            latent_channels: self.config.in_channels,
            vae_scale_factor: self.config.vae_scale_factor(),
            force_uc_zero_embeddings: self.config.force_uc_zero_embeddings(),
            return_latents,
        })
    }

    /// Sample starting from `image`; the target size is the image's own size.
    pub fn image_to_image(
        &self,
        params: &SamplingParams,
        image: ArrayView4<'_, f32>,
        prompt: &str,
        negative_prompt: &str,
        samples: usize,
        return_latents: bool,
    ) -> DiffusionResult<Array4<f32>> {
        params.validate()?;
        check_image(image)?;
        let sampler =
            SamplerConfig::from_params(params)?.with_img2img_strength(params.img2img_strength)?;
        let (_, _, height, width) = image.dim();

        let mut values = params.to_value_map()?;
        values.insert("prompt".into(), prompt.into());
        values.insert("negative_prompt".into(), negative_prompt.into());
        values.insert("target_width".into(), width.into());
        values.insert("target_height".into(), height.into());

        log::debug!("image_to_image: {samples} samples from a {width}x{height} image");
        self.engine.img2img(Img2ImgRequest {
            image,
            sampler,
            values,
            num_samples: samples,
            force_uc_zero_embeddings: self.config.force_uc_zero_embeddings(),
            skip_encode: false,
            return_latents,
        })
    }

    /// Refine first-stage latents. `latents` is `(B, C, h, w)` in latent
    /// space; original and target sizes are reported in pixels (`x8`).
    pub fn refiner(
        &self,
        params: &SamplingParams,
        latents: ArrayView4<'_, f32>,
        prompt: &str,
        negative_prompt: Option<&str>,
        samples: usize,
        return_latents: bool,
    ) -> DiffusionResult<Array4<f32>> {
        params.validate()?;
        check_image(latents)?;
        let sampler =
            SamplerConfig::from_params(params)?.with_img2img_strength(params.img2img_strength)?;
        let (_, _, height, width) = latents.dim();
        let (pixel_width, pixel_height) = (width * 8, height * 8);

        let mut values = ValueDict::new();
        values.insert("orig_width".into(), pixel_width.into());
        values.insert("orig_height".into(), pixel_height.into());
        values.insert("target_width".into(), pixel_width.into());
        values.insert("target_height".into(), pixel_height.into());
        values.insert("prompt".into(), prompt.into());
        values.insert(
            "negative_prompt".into(),
            negative_prompt.map_or(Value::Null, Value::from),
        );
        values.insert("crop_coords_top".into(), params.crop_coords_top.into());
        values.insert("crop_coords_left".into(), params.crop_coords_left.into());
        values.insert("aesthetic_score".into(), params.aesthetic_score.into());
        values.insert(
            "negative_aesthetic_score".into(),
            params.negative_aesthetic_score.into(),
        );

        log::debug!("refiner: {samples} samples at {pixel_width}x{pixel_height}");
        self.engine.img2img(Img2ImgRequest {
            image: latents,
            sampler,
            values,
            num_samples: samples,
            force_uc_zero_embeddings: Vec::new(),
            skip_encode: true,
            return_latents,
        })
    }
}

fn check_image(image: ArrayView4<'_, f32>) -> DiffusionResult<()> {
    if image.is_empty() {
        return Err(DiffusionError::InvalidImage(format!(
            "image has an empty dimension: {:?}",
            image.shape()
        )));
    }
    Ok(())
}
