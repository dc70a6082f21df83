use crate::config::ConfigError;

/// Failures at the platform edges. Gameplay itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("pointer lock is not supported on this platform")]
    PointerLockUnsupported,
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("gpu initialisation failed: {0}")]
    Gpu(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("platform error: {0}")]
    Platform(String),
}
