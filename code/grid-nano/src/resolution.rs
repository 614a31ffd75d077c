// ===============================================================================
// 分辨率与计算调度尺寸
// ===============================================================================

use crate::error::ComputeError;
use glam::{UVec2, UVec3};
use serde::{Deserialize, Serialize};

/// 所有 2D 计算着色器统一使用的工作组尺寸
/// ⚠️ 必须与 WGSL 中的 `@workgroup_size(16, 16, 1)` 保持一致
pub const WORKGROUP_SIZE: UVec2 = UVec2::new(16, 16);

/// 网格分辨率 (宽 x 高)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 网格单元总数 W*H
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `640x480` 形式的描述，用于错误信息
    pub fn spec(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn as_uvec2(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// 行优先线性索引
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// 线性索引 -> (x, y)
    #[inline]
    pub fn cell(&self, i: usize) -> UVec2 {
        let w = self.width as usize;
        UVec2::new((i % w) as u32, (i / w) as u32)
    }

    pub fn require_non_empty(&self) -> Result<(), ComputeError> {
        if self.is_empty() {
            return Err(ComputeError::InvalidResolution(self.spec()));
        }
        Ok(())
    }

    /// 校验两个成对缓冲区的分辨率一致
    pub fn require_match(
        &self,
        other: Resolution,
        name: &'static str,
        other_name: &'static str,
    ) -> Result<(), ComputeError> {
        if *self != other {
            return Err(ComputeError::ResolutionMismatch {
                name,
                other: other_name,
                expected: *self,
                actual: other,
            });
        }
        Ok(())
    }
}

impl From<UVec2> for Resolution {
    fn from(v: UVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// 计算覆盖整个分辨率所需的工作组数量 (ceil(W/lx), ceil(H/ly), 1)
pub fn compute_dispatch_size(resolution: Resolution, local_size: UVec2) -> UVec3 {
    UVec3::new(
        resolution.width.div_ceil(local_size.x),
        resolution.height.div_ceil(local_size.y),
        1,
    )
}

/// 容纳整个分辨率的最小 2 的幂正方形画布边长
pub fn power_of_two_canvas(resolution: Resolution) -> u32 {
    resolution
        .width
        .max(1)
        .next_power_of_two()
        .max(resolution.height.max(1).next_power_of_two())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_size_rounds_up_partial_tiles() {
        let local = UVec2::new(8, 8);
        assert_eq!(
            compute_dispatch_size(Resolution::new(639, 480), local),
            UVec3::new(80, 60, 1)
        );
        assert_eq!(
            compute_dispatch_size(Resolution::new(640, 480), local),
            UVec3::new(80, 60, 1)
        );
        assert_eq!(
            compute_dispatch_size(Resolution::new(641, 480), local),
            UVec3::new(81, 60, 1)
        );
        assert_eq!(
            compute_dispatch_size(Resolution::new(641, 481), local),
            UVec3::new(81, 61, 1)
        );
    }

    #[test]
    fn dispatch_size_with_default_workgroup() {
        assert_eq!(
            compute_dispatch_size(Resolution::new(640, 480), WORKGROUP_SIZE),
            UVec3::new(40, 30, 1)
        );
        assert_eq!(
            compute_dispatch_size(Resolution::new(17, 1), WORKGROUP_SIZE),
            UVec3::new(2, 1, 1)
        );
    }

    #[test]
    fn resolution_spec() {
        assert_eq!(Resolution::new(640, 480).spec(), "640x480");
    }

    #[test]
    fn canvas_is_next_power_of_two_of_longer_side() {
        assert_eq!(power_of_two_canvas(Resolution::new(640, 480)), 1024);
        assert_eq!(power_of_two_canvas(Resolution::new(512, 512)), 512);
        assert_eq!(power_of_two_canvas(Resolution::new(3, 17)), 32);
        assert_eq!(power_of_two_canvas(Resolution::new(1, 1)), 1);
    }

    #[test]
    fn index_and_cell_are_row_major() {
        let r = Resolution::new(5, 3);
        assert_eq!(r.index(2, 1), 7);
        assert_eq!(r.cell(7), UVec2::new(2, 1));
        assert_eq!(r.cell(14), UVec2::new(4, 2));
    }
}
