// ===============================================================================
// 原始深度 -> 深度值
// ===============================================================================

use crate::error::CameraError;
use grid_nano::{DepthMap, Grid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinect v1 的 11 位原始深度上限，同时表示“无读数”
pub const KINECT_V1_MAX_RAW: u16 = 2047;

/// 深度图中采样值的含义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthMeasurement {
    /// 原始值归一化到 [0, 1]，可以直接当作纹理显示
    #[default]
    RawNormalized,
    /// 设备给出的原始值
    Raw,
    /// 米
    Meters,
}

/// Kinect v1 原始值 -> 米
/// 无读数或超出拟合范围（分母 <= 0）时返回 0
#[inline]
pub fn raw_to_meters(raw: u16) -> f32 {
    if raw >= KINECT_V1_MAX_RAW {
        return 0.0;
    }
    let denom = raw as f32 * -0.003_071_101_6 + 3.330_949_5;
    if denom <= 0.0 { 0.0 } else { 1.0 / denom }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthMapper {
    measurement: DepthMeasurement,
    max_raw: u16,
}

impl DepthMapper {
    pub fn new(measurement: DepthMeasurement) -> Self {
        Self {
            measurement,
            max_raw: KINECT_V1_MAX_RAW,
        }
    }

    pub fn measurement(&self) -> DepthMeasurement {
        self.measurement
    }

    /// 单个采样；无读数在所有度量下都映射为 0
    #[inline]
    pub fn map_sample(&self, raw: u16) -> f32 {
        if raw >= self.max_raw {
            return 0.0;
        }
        match self.measurement {
            DepthMeasurement::RawNormalized => raw as f32 / self.max_raw as f32,
            DepthMeasurement::Raw => raw as f32,
            DepthMeasurement::Meters => raw_to_meters(raw),
        }
    }

    /// 换算整帧并按区间裁剪
    /// `image` 为当前度量下的深度，`metric` 为米；区间外的采样两者都写 0
    pub fn map_in_range(
        &self,
        raw: &Grid<u16>,
        range: &DepthRange,
        image: &mut DepthMap,
        metric: &mut DepthMap,
    ) -> Result<(), CameraError> {
        raw.resolution()
            .require_match(image.resolution(), "rawFrame", "depthMap")?;
        raw.resolution()
            .require_match(metric.resolution(), "rawFrame", "metricDepthMap")?;
        image
            .data_mut()
            .par_iter_mut()
            .zip(metric.data_mut().par_iter_mut())
            .zip(raw.data().par_iter())
            .for_each(|((image, metric), &raw)| {
                let meters = raw_to_meters(raw);
                (*image, *metric) = if range.contains(meters) {
                    (self.map_sample(raw), meters)
                } else {
                    (0.0, 0.0)
                };
            });
        Ok(())
    }
}

impl Default for DepthMapper {
    fn default() -> Self {
        Self::new(DepthMeasurement::default())
    }
}

/// 有效深度区间（米），区间外的采样作为空洞
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl DepthRange {
    pub fn new(min: f32, max: f32) -> Result<Self, CameraError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        // NaN 也在这里被拒绝
        if !(self.min < self.max) {
            return Err(CameraError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, meters: f32) -> bool {
        meters >= self.min && meters <= self.max
    }
}

impl Default for DepthRange {
    fn default() -> Self {
        Self { min: 0.2, max: 10.0 }
    }
}
