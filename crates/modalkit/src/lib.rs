// Re-export for convenience
pub use modalkit_data::{self as data, error as data_error};
pub use modalkit_diffusion::{self as diffusion, error as diffusion_error};
pub use modalkit_prompts::{self as prompts, error as prompts_error};
pub use modalkit_tts::{self as tts, error as tts_error};
pub mod prelude;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
