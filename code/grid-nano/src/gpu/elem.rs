use bytemuck::{Pod, Zeroable};
use wgpu::BufferSize;

// ============================================================================
// 1. 统一的 compile-time stride 计算器
// ============================================================================
const fn gpu_stride(bytes: usize) -> usize {
    match bytes {
        0..=4 => 4,
        5..=8 => 8,
        9..=12 => 16,
        _ => bytes.div_ceil(16) * 16,
    }
}

const fn stride_to_bufsize(n: usize) -> BufferSize {
    match BufferSize::new(n as u64) {
        Some(size) => size,
        None => panic!("zero sized gpu element"),
    }
}

/// 计算满足 GPU 对齐要求的缓冲区大小（至少一个元素）
#[inline]
pub fn padded_size<E: GpuElement>(count: usize) -> u64 {
    let stride = E::STRIDE_SIZE as u64;
    (count as u64).saturating_mul(stride).max(stride)
}

// ============================================================================
// 2. Trait：可直接放入 storage buffer 的元素
// ============================================================================
/// 内存布局与 WGSL std430 完全一致的元素类型
/// ⚠️ 实现者必须保证 `size_of::<Self>() == STRIDE_SIZE`，否则数组步长会错位
pub trait GpuElement: Pod + Zeroable + Send + Sync + 'static {
    const WGSL_TYPE: &'static str;
    const SIZE: usize = core::mem::size_of::<Self>();
    const STRIDE_SIZE: usize = gpu_stride(Self::SIZE);
    const MIN_BINDING_SIZE: BufferSize = stride_to_bufsize(Self::STRIDE_SIZE);
}

macro_rules! impl_gpu_element {
    ($ty:ty, $wgsl:literal) => {
        impl GpuElement for $ty {
            const WGSL_TYPE: &'static str = $wgsl;
        }
    };
}

// ====== 标量和常规向量 ======
impl_gpu_element!(i32, "i32");
impl_gpu_element!(u32, "u32");
impl_gpu_element!(f32, "f32");
impl_gpu_element!(glam::IVec2, "vec2<i32>");
impl_gpu_element!(glam::UVec2, "vec2<u32>");
impl_gpu_element!(glam::Vec2, "vec2<f32>");
impl_gpu_element!(glam::Vec4, "vec4<f32>");
