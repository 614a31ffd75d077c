// ===============================================================================
// 网格采样缓冲区
// ===============================================================================

use crate::error::{ComputeError, FormatError};
use crate::resolution::Resolution;
use glam::{UVec2, Vec4};
use half::f16;
use serde::{Deserialize, Serialize};

/// 二维网格采样缓冲区（行优先）
/// 深度图、高度图、掩码、颜色图都是它的特例
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    resolution: Resolution,
    data: Vec<T>,
}

/// RED 通道存储深度（米或原始值）
pub type DepthMap = Grid<f32>;
/// RED 通道存储高度
pub type HeightMap = Grid<f32>;
/// 非零即种子/前景
pub type Mask = Grid<f32>;
/// 每个采样点的 RGBA 颜色
pub type ColorMap = Grid<Vec4>;

impl<T> Grid<T> {
    pub fn from_vec(resolution: Resolution, data: Vec<T>) -> Result<Self, ComputeError> {
        if data.len() != resolution.len() {
            return Err(ComputeError::BufferLength {
                resolution,
                expected: resolution.len(),
                actual: data.len(),
            });
        }
        Ok(Self { resolution, data })
    }

    pub fn from_fn(resolution: Resolution, mut f: impl FnMut(UVec2) -> T) -> Self {
        let data = (0..resolution.len()).map(|i| f(resolution.cell(i))).collect();
        Self { resolution, data }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&T> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        self.data.get(self.resolution.index(x, y))
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(resolution: Resolution, value: T) -> Self {
        Self {
            resolution,
            data: vec![value; resolution.len()],
        }
    }
}

impl<T: Copy> Grid<T> {
    /// 越界时 panic，仅用于已知坐标合法的内核
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> T {
        self.data[self.resolution.index(x, y)]
    }
}

// ===============================================================================
// 图像布局（通道格式 x 通道类型）
// ===============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelFormat {
    R,
    Rg,
    Rgba,
}

impl ChannelFormat {
    pub const fn channels(self) -> usize {
        match self {
            ChannelFormat::R => 1,
            ChannelFormat::Rg => 2,
            ChannelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// 归一化到 0..1
    Uint8,
    Uint8Int,
    Sint8Int,
    /// 归一化到 0..1
    Uint16,
    Uint16Int,
    Sint16Int,
    Uint32Int,
    Sint32Int,
    Float16,
    Float32,
}

impl ChannelType {
    pub const fn bytes(self) -> usize {
        match self {
            ChannelType::Uint8 | ChannelType::Uint8Int | ChannelType::Sint8Int => 1,
            ChannelType::Uint16
            | ChannelType::Uint16Int
            | ChannelType::Sint16Int
            | ChannelType::Float16 => 2,
            ChannelType::Uint32Int | ChannelType::Sint32Int | ChannelType::Float32 => 4,
        }
    }

    /// 读取一个通道值（小端序）
    fn decode(self, b: &[u8]) -> f32 {
        match self {
            ChannelType::Uint8 => b[0] as f32 / u8::MAX as f32,
            ChannelType::Uint8Int => b[0] as f32,
            ChannelType::Sint8Int => b[0] as i8 as f32,
            ChannelType::Uint16 => u16::from_le_bytes([b[0], b[1]]) as f32 / u16::MAX as f32,
            ChannelType::Uint16Int => u16::from_le_bytes([b[0], b[1]]) as f32,
            ChannelType::Sint16Int => i16::from_le_bytes([b[0], b[1]]) as f32,
            ChannelType::Uint32Int => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
            ChannelType::Sint32Int => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
            ChannelType::Float16 => f16::from_le_bytes([b[0], b[1]]).to_f32(),
            ChannelType::Float32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }
}

/// 受支持的 (格式, 类型) 组合
/// 只能通过 [`ImageLayout::resolve`] 构造
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageLayout {
    format: ChannelFormat,
    ty: ChannelType,
}

impl ImageLayout {
    pub const R32F: ImageLayout = ImageLayout {
        format: ChannelFormat::R,
        ty: ChannelType::Float32,
    };
    pub const RGBA8: ImageLayout = ImageLayout {
        format: ChannelFormat::Rgba,
        ty: ChannelType::Uint8,
    };

    pub fn resolve(format: ChannelFormat, ty: ChannelType) -> Result<Self, FormatError> {
        // 32 位整数只支持单通道
        let supported = match ty {
            ChannelType::Uint32Int | ChannelType::Sint32Int => format == ChannelFormat::R,
            _ => true,
        };
        if !supported {
            return Err(FormatError::Unsupported(format, ty));
        }
        Ok(Self { format, ty })
    }

    pub fn format(&self) -> ChannelFormat {
        self.format
    }

    pub fn channel_type(&self) -> ChannelType {
        self.ty
    }

    pub fn texel_bytes(&self) -> usize {
        self.format.channels() * self.ty.bytes()
    }

    /// GLSL/WGSL 风格的存储格式名，如 `r32f`、`rgba8`
    pub fn name(&self) -> String {
        let prefix = match self.format {
            ChannelFormat::R => "r",
            ChannelFormat::Rg => "rg",
            ChannelFormat::Rgba => "rgba",
        };
        let suffix = match self.ty {
            ChannelType::Uint8 => "8",
            ChannelType::Uint8Int => "8u",
            ChannelType::Sint8Int => "8i",
            ChannelType::Uint16 => "16",
            ChannelType::Uint16Int => "16u",
            ChannelType::Sint16Int => "16i",
            ChannelType::Uint32Int => "32u",
            ChannelType::Sint32Int => "32i",
            ChannelType::Float16 => "16f",
            ChannelType::Float32 => "32f",
        };
        format!("{prefix}{suffix}")
    }

    pub fn require(&self, actual: ImageLayout) -> Result<(), FormatError> {
        if *self != actual {
            return Err(FormatError::Mismatch {
                expected: *self,
                actual,
            });
        }
        Ok(())
    }
}

/// 设备/宿主提供的原始图像字节
#[derive(Debug, Clone)]
pub struct RawImage {
    resolution: Resolution,
    layout: ImageLayout,
    bytes: Vec<u8>,
}

impl RawImage {
    pub fn new(
        resolution: Resolution,
        layout: ImageLayout,
        bytes: Vec<u8>,
    ) -> Result<Self, ComputeError> {
        let expected = resolution.len() * layout.texel_bytes();
        if bytes.len() != expected {
            return Err(ComputeError::BufferLength {
                resolution,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            resolution,
            layout,
            bytes,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 解码 RED 通道
    pub fn red_channel(&self) -> Grid<f32> {
        let texel = self.layout.texel_bytes();
        let ty = self.layout.ty;
        let data = self
            .bytes
            .chunks_exact(texel)
            .map(|t| ty.decode(t))
            .collect();
        Grid {
            resolution: self.resolution,
            data,
        }
    }

    /// 解码为 RGBA，缺失通道补 0，缺失 alpha 补 1
    pub fn rgba(&self) -> Grid<Vec4> {
        let texel = self.layout.texel_bytes();
        let ty = self.layout.ty;
        let channels = self.layout.format.channels();
        let data = self
            .bytes
            .chunks_exact(texel)
            .map(|t| {
                let mut c = [0.0, 0.0, 0.0, 1.0];
                for (i, raw) in t.chunks_exact(ty.bytes()).take(channels).enumerate() {
                    c[i] = ty.decode(raw);
                }
                Vec4::from_array(c)
            })
            .collect();
        Grid {
            resolution: self.resolution,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rejects_wrong_length() {
        let err = Grid::from_vec(Resolution::new(3, 2), vec![0.0f32; 5]).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::BufferLength {
                expected: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn grid_from_fn_is_row_major() {
        let g = Grid::from_fn(Resolution::new(3, 2), |c| c.x + 10 * c.y);
        assert_eq!(g.data(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(g.at(2, 1), 12);
        assert_eq!(g.get(3, 0), None);
    }

    #[test]
    fn unsupported_layouts_are_rejected() {
        assert_eq!(
            ImageLayout::resolve(ChannelFormat::Rgba, ChannelType::Uint32Int),
            Err(FormatError::Unsupported(
                ChannelFormat::Rgba,
                ChannelType::Uint32Int
            ))
        );
        assert!(ImageLayout::resolve(ChannelFormat::R, ChannelType::Sint32Int).is_ok());
        assert_eq!(ImageLayout::R32F.name(), "r32f");
        assert_eq!(ImageLayout::RGBA8.name(), "rgba8");
    }

    #[test]
    fn red_channel_decodes_normalized_and_integer_types() {
        let r16 = ImageLayout::resolve(ChannelFormat::R, ChannelType::Uint16).unwrap();
        let img = RawImage::new(
            Resolution::new(2, 1),
            r16,
            [0u16, u16::MAX]
                .iter()
                .flat_map(|v| v.to_le_bytes())
                .collect(),
        )
        .unwrap();
        assert_eq!(img.red_channel().data(), &[0.0, 1.0]);

        let r16u = ImageLayout::resolve(ChannelFormat::R, ChannelType::Uint16Int).unwrap();
        let img = RawImage::new(Resolution::new(1, 1), r16u, 2047u16.to_le_bytes().to_vec())
            .unwrap();
        assert_eq!(img.red_channel().data(), &[2047.0]);
    }

    #[test]
    fn rgba_fills_missing_channels() {
        let rg8 = ImageLayout::resolve(ChannelFormat::Rg, ChannelType::Uint8).unwrap();
        let img = RawImage::new(Resolution::new(1, 1), rg8, vec![255, 0]).unwrap();
        assert_eq!(img.rgba().data(), &[Vec4::new(1.0, 0.0, 0.0, 1.0)]);
    }

    #[test]
    fn half_float_red_channel_decodes() {
        let r16f = ImageLayout::resolve(ChannelFormat::R, ChannelType::Float16).unwrap();
        // 1.0, -2.0, 最小次正规数, +inf
        let bits: [u16; 4] = [0x3c00, 0xc000, 0x0001, 0x7c00];
        let bytes = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
        let img = RawImage::new(Resolution::new(4, 1), r16f, bytes).unwrap();
        let red = img.red_channel();
        assert_eq!(&red.data()[..2], &[1.0, -2.0]);
        assert_eq!(red.at(2, 0), 2f32.powi(-24));
        assert_eq!(red.at(3, 0), f32::INFINITY);
    }

    #[test]
    fn raw_image_checks_byte_count() {
        assert!(RawImage::new(Resolution::new(2, 2), ImageLayout::R32F, vec![0; 15]).is_err());
    }
}
