// ===============================================================================
// 错误类型定义
// ===============================================================================

use grid_nano::{ComputeError, Resolution};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// 原始帧采样数与分辨率不符
    #[error("Frame length mismatch: {} requires {} samples, got {}", .resolution.spec(), .expected, .actual)]
    FrameLength {
        resolution: Resolution,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid depth range: min {min} must be below max {max}")]
    InvalidRange { min: f32, max: f32 },

    #[error(transparent)]
    Compute(#[from] ComputeError),
}
