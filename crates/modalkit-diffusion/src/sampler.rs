//! Closed sampler, guider and discretization configurations.

use crate::error::{DiffusionError, DiffusionResult};
use crate::params::SamplingParams;
use serde::{Deserialize, Serialize};

/// Dynamic thresholding applied by classifier-free guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Thresholding {
    None,
}

impl std::str::FromStr for Thresholding {
    type Err = DiffusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Thresholding::None),
            _ => Err(DiffusionError::unsupported("thresholder", s)),
        }
    }
}

/// How the conditional and unconditional predictions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GuiderConfig {
    #[serde(rename = "IdentityGuider")]
    Identity,
    #[serde(rename = "VanillaCFG")]
    VanillaCfg {
        scale: f32,
        thresholding: Thresholding,
    },
}

impl GuiderConfig {
    pub fn from_params(params: &SamplingParams) -> DiffusionResult<Self> {
        match params.guider.as_str() {
            "IdentityGuider" => Ok(GuiderConfig::Identity),
            "VanillaCFG" => Ok(GuiderConfig::VanillaCfg {
                scale: params.scale,
                thresholding: params.thresholder.parse()?,
            }),
            other => Err(DiffusionError::unsupported("guider", other)),
        }
    }
}

/// Noise-level schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiscretizationConfig {
    #[serde(rename = "LegacyDDPMDiscretization")]
    LegacyDdpm,
    #[serde(rename = "EDMDiscretization")]
    Edm {
        sigma_min: f32,
        sigma_max: f32,
        rho: f32,
    },
    /// Keeps only the last `strength` fraction of the inner schedule.
    #[serde(rename = "Img2ImgDiscretizationWrapper")]
    Img2Img {
        inner: Box<DiscretizationConfig>,
        strength: f32,
    },
}

impl DiscretizationConfig {
    pub fn from_params(params: &SamplingParams) -> DiffusionResult<Self> {
        match params.discretization.as_str() {
            "LegacyDDPMDiscretization" => Ok(DiscretizationConfig::LegacyDdpm),
            "EDMDiscretization" => Ok(DiscretizationConfig::Edm {
                sigma_min: params.sigma_min,
                sigma_max: params.sigma_max,
                rho: params.rho,
            }),
            other => Err(DiffusionError::unsupported("discretization", other)),
        }
    }
}

/// Sampler family together with its family-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SamplerKind {
    #[serde(rename = "EulerEDMSampler")]
    EulerEdm {
        s_churn: f32,
        s_tmin: f32,
        s_tmax: f32,
        s_noise: f32,
    },
    #[serde(rename = "HeunEDMSampler")]
    HeunEdm {
        s_churn: f32,
        s_tmin: f32,
        s_tmax: f32,
        s_noise: f32,
    },
    #[serde(rename = "EulerAncestralSampler")]
    EulerAncestral { eta: f32, s_noise: f32 },
    #[serde(rename = "DPMPP2SAncestralSampler")]
    Dpmpp2sAncestral { eta: f32, s_noise: f32 },
    #[serde(rename = "DPMPP2MSampler")]
    Dpmpp2m,
    #[serde(rename = "LinearMultistepSampler")]
    LinearMultistep { order: usize },
}

impl SamplerKind {
    pub fn from_params(params: &SamplingParams) -> DiffusionResult<Self> {
        let kind = match params.sampler.as_str() {
            "EulerEDMSampler" => SamplerKind::EulerEdm {
                s_churn: params.s_churn,
                s_tmin: params.s_tmin,
                s_tmax: params.s_tmax,
                s_noise: params.s_noise,
            },
            "HeunEDMSampler" => SamplerKind::HeunEdm {
                s_churn: params.s_churn,
                s_tmin: params.s_tmin,
                s_tmax: params.s_tmax,
                s_noise: params.s_noise,
            },
            "EulerAncestralSampler" => SamplerKind::EulerAncestral {
                eta: params.eta,
                s_noise: params.s_noise,
            },
            "DPMPP2SAncestralSampler" => SamplerKind::Dpmpp2sAncestral {
                eta: params.eta,
                s_noise: params.s_noise,
            },
            "DPMPP2MSampler" => SamplerKind::Dpmpp2m,
            "LinearMultistepSampler" => SamplerKind::LinearMultistep {
                order: params.order,
            },
            other => return Err(DiffusionError::unsupported("sampler", other)),
        };
        Ok(kind)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SamplerKind::EulerEdm { .. } => "EulerEDMSampler",
            SamplerKind::HeunEdm { .. } => "HeunEDMSampler",
            SamplerKind::EulerAncestral { .. } => "EulerAncestralSampler",
            SamplerKind::Dpmpp2sAncestral { .. } => "DPMPP2SAncestralSampler",
            SamplerKind::Dpmpp2m => "DPMPP2MSampler",
            SamplerKind::LinearMultistep { .. } => "LinearMultistepSampler",
        }
    }
}

impl std::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Everything a diffusion engine needs to instantiate a sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub kind: SamplerKind,
    pub num_steps: usize,
    pub discretization: DiscretizationConfig,
    pub guider: GuiderConfig,
    pub verbose: bool,
}

impl SamplerConfig {
    /// Resolve the tag strings of `params` into a sampler configuration.
    pub fn from_params(params: &SamplingParams) -> DiffusionResult<Self> {
        let config = Self {
            discretization: DiscretizationConfig::from_params(params)?,
            guider: GuiderConfig::from_params(params)?,
            kind: SamplerKind::from_params(params)?,
            num_steps: params.steps,
            verbose: true,
        };
        log::debug!(
            "resolved {} with {} steps over {:?}",
            config.kind,
            config.num_steps,
            config.discretization
        );
        Ok(config)
    }

    /// Truncate the schedule for image-to-image sampling. A strength of
    /// exactly 1.0 leaves the discretization untouched.
    pub fn with_img2img_strength(mut self, strength: f32) -> DiffusionResult<Self> {
        if !(strength > 0.0 && strength <= 1.0) {
            return Err(DiffusionError::InvalidParameter(format!(
                "img2img_strength must be in (0, 1], got {strength}"
            )));
        }
        if strength < 1.0 {
            self.discretization = DiscretizationConfig::Img2Img {
                inner: Box::new(self.discretization),
                strength,
            };
        }
        Ok(self)
    }
}
