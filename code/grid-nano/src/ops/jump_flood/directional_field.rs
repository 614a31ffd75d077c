//! 方向场滤镜：源图 -> 2 的幂画布 -> 阈值 -> 轮廓 -> jump flood -> 解码 -> 裁剪
//!
//! 中间缓冲区只在画布边长变化时重新分配，静态分辨率的逐帧调用不产生分配。

use super::{ContourPoints, FieldTexel, JumpFlooder, Threshold, decode_window};
use crate::error::ComputeError;
use crate::grid::{Grid, Mask};
use crate::resolution::{Resolution, power_of_two_canvas};
use glam::UVec2;
use serde::{Deserialize, Serialize};

/// 源图在画布中的放置位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CanvasAnchor {
    /// 贴住画布底边：(0, N - H)
    #[default]
    BottomLeft,
    /// 贴住画布顶边：(0, 0)
    TopLeft,
}

impl CanvasAnchor {
    pub fn origin(self, canvas: u32, source: Resolution) -> UVec2 {
        match self {
            CanvasAnchor::BottomLeft => UVec2::new(0, canvas - source.height),
            CanvasAnchor::TopLeft => UVec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalFieldConfig {
    /// 阈值，范围 [0, 1]
    pub threshold: f32,
    /// 距离缩放，范围 [0, 1]
    pub distance_scale: f32,
    pub anchor: CanvasAnchor,
}

impl Default for DirectionalFieldConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            distance_scale: 1.0,
            anchor: CanvasAnchor::default(),
        }
    }
}

#[derive(Debug)]
enum FieldState {
    Uninitialized,
    Allocated {
        canvas: u32,
        thresholded: Mask,
        contoured: Mask,
        flooder: JumpFlooder,
    },
}

#[derive(Debug)]
pub struct DirectionalField {
    config: DirectionalFieldConfig,
    state: FieldState,
}

impl DirectionalField {
    pub fn new(config: DirectionalFieldConfig) -> Self {
        Self {
            config,
            state: FieldState::Uninitialized,
        }
    }

    pub fn config(&self) -> &DirectionalFieldConfig {
        &self.config
    }

    /// 阈值等参数可以逐帧修改，不触发重新分配
    pub fn config_mut(&mut self) -> &mut DirectionalFieldConfig {
        &mut self.config
    }

    /// 已分配的画布边长
    pub fn canvas(&self) -> Option<u32> {
        match &self.state {
            FieldState::Uninitialized => None,
            FieldState::Allocated { canvas, .. } => Some(*canvas),
        }
    }

    /// 保证中间缓冲区与源分辨率对应的画布匹配，返回画布边长
    pub fn ensure_capacity(&mut self, source: Resolution) -> Result<u32, ComputeError> {
        source.require_non_empty()?;
        let canvas = power_of_two_canvas(source);
        if self.canvas() == Some(canvas) {
            return Ok(canvas);
        }
        if let Some(previous) = self.canvas() {
            log::debug!("directional field canvas {previous} -> {canvas}");
        }
        let resolution = Resolution::new(canvas, canvas);
        self.state = FieldState::Allocated {
            canvas,
            thresholded: Grid::filled(resolution, 0.0),
            contoured: Grid::filled(resolution, 0.0),
            flooder: JumpFlooder::new(canvas)?,
        };
        Ok(canvas)
    }

    /// 释放所有中间缓冲区
    pub fn release(&mut self) {
        self.state = FieldState::Uninitialized;
    }

    pub fn apply(&mut self, source: &Grid<f32>) -> Result<Grid<FieldTexel>, ComputeError> {
        let mut target = Grid::filled(source.resolution(), FieldTexel::default());
        self.apply_into(source, &mut target)?;
        Ok(target)
    }

    pub fn apply_into(
        &mut self,
        source: &Grid<f32>,
        target: &mut Grid<FieldTexel>,
    ) -> Result<(), ComputeError> {
        source
            .resolution()
            .require_match(target.resolution(), "source", "target")?;
        let canvas = self.ensure_capacity(source.resolution())?;
        let origin = self.config.anchor.origin(canvas, source.resolution());
        let config = self.config;

        let FieldState::Allocated {
            thresholded,
            contoured,
            flooder,
            ..
        } = &mut self.state
        else {
            return Err(ComputeError::Execution(
                "directional field buffers missing".to_string(),
            ));
        };

        Threshold::new(config.threshold).apply_at(source, origin, thresholded)?;
        ContourPoints.apply(thresholded, contoured)?;
        let field = flooder.jump_flood(contoured)?;
        decode_window(field, thresholded, config.distance_scale, origin, target);
        Ok(())
    }
}

impl Default for DirectionalField {
    fn default() -> Self {
        Self::new(DirectionalFieldConfig::default())
    }
}
