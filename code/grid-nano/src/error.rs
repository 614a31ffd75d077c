// ===============================================================================
// 错误类型定义
// ===============================================================================

use crate::resolution::Resolution;
use crate::grid::{ChannelFormat, ChannelType, ImageLayout};

/// 计算错误类型
/// 所有错误都在调度(dispatch)之前同步返回，调用要么完整执行，要么完全不执行
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// 成对缓冲区（深度/高度图 与 颜色图 等）分辨率不一致
    #[error("Resolution mismatch between {}[{}] and {}[{}]", .name, .expected.spec(), .other, .actual.spec())]
    ResolutionMismatch {
        name: &'static str,
        other: &'static str,
        expected: Resolution,
        actual: Resolution,
    },

    #[error("Buffer length mismatch: {} requires {} elements, got {}", .resolution.spec(), .expected, .actual)]
    BufferLength {
        resolution: Resolution,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Canvas side {0} is not a power of two")]
    NotPowerOfTwo(u32),

    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("No suitable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("Buffer readback failed: {0}")]
    Readback(String),

    #[error("GPU execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// 图像格式错误
/// 对应不受支持的 (通道格式, 通道类型) 组合，在生成器构造时报告
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported layout: {0:?}/{1:?}")]
    Unsupported(ChannelFormat, ChannelType),

    #[error("Layout mismatch: generator expects {expected:?}, got {actual:?}")]
    Mismatch {
        expected: ImageLayout,
        actual: ImageLayout,
    },
}
