// ===============================================================================
// 帧翻转
// ===============================================================================

use crate::error::CameraError;
use bitflags::bitflags;
use glam::UVec2;
use grid_nano::{Grid, Resolution};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

bitflags! {
    /// 源深度帧的翻转方式
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FlipFlags: u8 {
        /// 左右镜像
        const HORIZONTAL = 0b01;
        /// 上下颠倒
        const VERTICAL   = 0b10;
    }
}

impl Default for FlipFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl FlipFlags {
    /// 输出单元 (x, y) 对应的源单元
    #[inline]
    pub fn source_cell(self, x: u32, y: u32, resolution: Resolution) -> UVec2 {
        let sx = if self.contains(Self::HORIZONTAL) {
            resolution.width - 1 - x
        } else {
            x
        };
        let sy = if self.contains(Self::VERTICAL) {
            resolution.height - 1 - y
        } else {
            y
        };
        UVec2::new(sx, sy)
    }

    /// 把翻转后的 `source` 写入 `out`，两者分辨率必须一致
    pub fn apply_into<T: Copy + Send + Sync>(
        self,
        source: &Grid<T>,
        out: &mut Grid<T>,
    ) -> Result<(), CameraError> {
        let resolution = source.resolution();
        resolution.require_match(out.resolution(), "frame", "flipped")?;
        if self.is_empty() || resolution.is_empty() {
            out.data_mut().copy_from_slice(source.data());
            return Ok(());
        }
        out.data_mut()
            .par_chunks_mut(resolution.width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let src = self.source_cell(x as u32, y as u32, resolution);
                    *out = source.at(src.x, src.y);
                }
            });
        Ok(())
    }
}
