// ===============================================================================
// 采样网格 -> 有组织点云
// ===============================================================================
//! 深度图按针孔相机模型反投影，高度图按归一化网格坐标展开。
//! 输出点云与输入网格同分辨率、同行优先顺序：`point[y*W + x]` 对应单元 `(x, y)`。

pub mod gpu;

use crate::error::{ComputeError, FormatError};
use crate::grid::{
    ChannelFormat, ChannelType, ColorMap, DepthMap, Grid, HeightMap, ImageLayout, RawImage,
};
use crate::ops::for_each_cell;
use crate::resolution::Resolution;
use crate::vertex::{ColoredPointVertex, PointVertex};
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// 有组织点云：分辨率与源网格一致
pub type PointCloud<P> = Grid<P>;

// ===============================================================================
// 参数
// ===============================================================================

/// 深度相机内参
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthMapIntrinsicParameters {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    /// 反投影后整体平移
    #[serde(default)]
    pub space_shift: Vec3,
}

impl DepthMapIntrinsicParameters {
    /// Kinect v1 深度相机的标定内参
    pub const KINECT_V1: Self = Self {
        fx: 5.942_143_4e2,
        fy: 5.910_405_4e2,
        cx: 3.393_078e2,
        cy: 2.427_391_4e2,
        space_shift: Vec3::ZERO,
    };

    pub fn with_space_shift(mut self, space_shift: Vec3) -> Self {
        self.space_shift = space_shift;
        self
    }

    /// 像素 (x, y) + 深度 d -> 三维点
    #[inline]
    pub fn unproject(&self, x: u32, y: u32, depth: f32) -> Vec3 {
        Vec3::new(
            (x as f32 - self.cx) / self.fx * depth,
            (y as f32 - self.cy) / self.fy * depth,
            depth,
        ) + self.space_shift
    }
}

impl Default for DepthMapIntrinsicParameters {
    fn default() -> Self {
        Self::KINECT_V1
    }
}

/// 高度图展开方式
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapOptions {
    /// true：以原点为中心，长边映射到 [-1, 1]，短边保持宽高比
    /// false：每个轴独立映射到 [0, 1]
    pub preserve_proportions: bool,
    pub height_scale: f32,
}

impl Default for HeightMapOptions {
    fn default() -> Self {
        Self {
            preserve_proportions: true,
            height_scale: 1.0,
        }
    }
}

/// 网格坐标到平面坐标的仿射映射 `xy = origin + (x, y) * step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneMapping {
    pub step: Vec2,
    pub origin: Vec2,
}

impl HeightMapOptions {
    pub fn plane_mapping(&self, resolution: Resolution) -> PlaneMapping {
        let (w, h) = (resolution.width, resolution.height);
        if self.preserve_proportions {
            let longest = w.max(h);
            let unit = if longest > 1 {
                2.0 / (longest - 1) as f32
            } else {
                0.0
            };
            PlaneMapping {
                step: Vec2::splat(unit),
                origin: Vec2::new(
                    -(w.saturating_sub(1) as f32) * unit * 0.5,
                    -(h.saturating_sub(1) as f32) * unit * 0.5,
                ),
            }
        } else {
            let axis = |n: u32| if n > 1 { 1.0 / (n - 1) as f32 } else { 0.0 };
            PlaneMapping {
                step: Vec2::new(axis(w), axis(h)),
                origin: Vec2::ZERO,
            }
        }
    }
}

impl PlaneMapping {
    #[inline]
    pub fn apply(&self, x: u32, y: u32, sample: f32, height_scale: f32) -> Vec3 {
        let xy = self.origin + Vec2::new(x as f32, y as f32) * self.step;
        xy.extend(sample * height_scale)
    }
}

#[inline]
fn depth_point(k: &DepthMapIntrinsicParameters, x: u32, y: u32, d: f32) -> (Vec3, f32) {
    let size = if d > 0.0 { 1.0 } else { 0.0 };
    (k.unproject(x, y, d), size)
}

/// 校验 点云 / 采样 / 颜色 三者分辨率一致，任何写入之前完成
fn check_inputs<P>(
    cloud: &PointCloud<P>,
    samples: Resolution,
    sample_name: &'static str,
    colors: Option<&ColorMap>,
) -> Result<(), ComputeError> {
    if let Some(colors) = colors {
        samples.require_match(colors.resolution(), sample_name, "colors")?;
    }
    samples.require_match(cloud.resolution(), sample_name, "pointCloud")
}

// ===============================================================================
// 深度图
// ===============================================================================

/// 深度图 -> 点云
/// 深度 <= 0 的采样视为空洞，点大小为 0
#[derive(Debug, Clone)]
pub struct DepthMapToPointCloudGenerator {
    intrinsics: DepthMapIntrinsicParameters,
}

impl DepthMapToPointCloudGenerator {
    pub fn new(intrinsics: DepthMapIntrinsicParameters) -> Self {
        Self { intrinsics }
    }

    /// 使用 Kinect v1 内参
    pub fn default_kinect() -> Self {
        Self::new(DepthMapIntrinsicParameters::KINECT_V1)
    }

    pub fn intrinsics(&self) -> &DepthMapIntrinsicParameters {
        &self.intrinsics
    }

    pub fn populate(
        &self,
        cloud: &mut PointCloud<PointVertex>,
        depth: &DepthMap,
    ) -> Result<(), ComputeError> {
        check_inputs(cloud, depth.resolution(), "depthMap", None)?;
        let resolution = depth.resolution();
        for_each_cell(resolution, cloud.data_mut(), 1, |x, y, out| {
            let (position, size) = depth_point(&self.intrinsics, x, y, depth.at(x, y));
            out[0] = PointVertex::new(position, size);
        });
        Ok(())
    }

    pub fn generate(&self, depth: &DepthMap) -> Result<PointCloud<PointVertex>, ComputeError> {
        let mut cloud = Grid::filled(depth.resolution(), PointVertex::default());
        self.populate(&mut cloud, depth)?;
        Ok(cloud)
    }
}

/// 深度图 + 颜色图 -> 彩色点云
#[derive(Debug, Clone)]
pub struct ColoredDepthMapToPointCloudGenerator {
    intrinsics: DepthMapIntrinsicParameters,
}

impl ColoredDepthMapToPointCloudGenerator {
    pub fn new(intrinsics: DepthMapIntrinsicParameters) -> Self {
        Self { intrinsics }
    }

    pub fn intrinsics(&self) -> &DepthMapIntrinsicParameters {
        &self.intrinsics
    }

    pub fn populate(
        &self,
        cloud: &mut PointCloud<ColoredPointVertex>,
        depth: &DepthMap,
        colors: &ColorMap,
    ) -> Result<(), ComputeError> {
        check_inputs(cloud, depth.resolution(), "depthMap", Some(colors))?;
        for_each_cell(depth.resolution(), cloud.data_mut(), 1, |x, y, out| {
            let (position, size) = depth_point(&self.intrinsics, x, y, depth.at(x, y));
            out[0] = ColoredPointVertex::new(position, size, colors.at(x, y));
        });
        Ok(())
    }

    pub fn generate(
        &self,
        depth: &DepthMap,
        colors: &ColorMap,
    ) -> Result<PointCloud<ColoredPointVertex>, ComputeError> {
        let mut cloud = Grid::filled(depth.resolution(), ColoredPointVertex::default());
        self.populate(&mut cloud, depth, colors)?;
        Ok(cloud)
    }
}

// ===============================================================================
// 高度图
// ===============================================================================

/// 高度图 -> 点云
/// 原始高度图默认按 R/32F 存储，其他格式通过 `with_layout` 指定
#[derive(Debug, Clone)]
pub struct HeightMapToPointCloudGenerator {
    options: HeightMapOptions,
    layout: ImageLayout,
}

impl HeightMapToPointCloudGenerator {
    pub fn new(options: HeightMapOptions) -> Self {
        Self {
            options,
            layout: ImageLayout::R32F,
        }
    }

    /// 指定原始高度图的存储格式；不支持的组合在此处拒绝
    pub fn with_layout(
        mut self,
        format: ChannelFormat,
        ty: ChannelType,
    ) -> Result<Self, FormatError> {
        self.layout = ImageLayout::resolve(format, ty)?;
        Ok(self)
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn options(&self) -> &HeightMapOptions {
        &self.options
    }

    pub fn populate(
        &self,
        cloud: &mut PointCloud<PointVertex>,
        heights: &HeightMap,
    ) -> Result<(), ComputeError> {
        check_inputs(cloud, heights.resolution(), "heightMap", None)?;
        let mapping = self.options.plane_mapping(heights.resolution());
        let scale = self.options.height_scale;
        for_each_cell(heights.resolution(), cloud.data_mut(), 1, |x, y, out| {
            out[0] = PointVertex::new(mapping.apply(x, y, heights.at(x, y), scale), 1.0);
        });
        Ok(())
    }

    pub fn generate(&self, heights: &HeightMap) -> Result<PointCloud<PointVertex>, ComputeError> {
        let mut cloud = Grid::filled(heights.resolution(), PointVertex::default());
        self.populate(&mut cloud, heights)?;
        Ok(cloud)
    }

    /// 从原始图像的 RED 通道读取高度
    pub fn populate_image(
        &self,
        cloud: &mut PointCloud<PointVertex>,
        image: &RawImage,
    ) -> Result<(), ComputeError> {
        self.layout.require(image.layout())?;
        self.populate(cloud, &image.red_channel())
    }

    pub fn generate_image(
        &self,
        image: &RawImage,
    ) -> Result<PointCloud<PointVertex>, ComputeError> {
        self.layout.require(image.layout())?;
        self.generate(&image.red_channel())
    }
}

impl Default for HeightMapToPointCloudGenerator {
    fn default() -> Self {
        Self::new(HeightMapOptions::default())
    }
}

#[derive(Debug, Clone)]
pub struct ColoredHeightMapToPointCloudGenerator {
    options: HeightMapOptions,
    layout: ImageLayout,
}

impl ColoredHeightMapToPointCloudGenerator {
    pub fn new(options: HeightMapOptions) -> Self {
        Self {
            options,
            layout: ImageLayout::R32F,
        }
    }

    pub fn with_layout(
        mut self,
        format: ChannelFormat,
        ty: ChannelType,
    ) -> Result<Self, FormatError> {
        self.layout = ImageLayout::resolve(format, ty)?;
        Ok(self)
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn options(&self) -> &HeightMapOptions {
        &self.options
    }

    pub fn populate(
        &self,
        cloud: &mut PointCloud<ColoredPointVertex>,
        heights: &HeightMap,
        colors: &ColorMap,
    ) -> Result<(), ComputeError> {
        check_inputs(cloud, heights.resolution(), "heightMap", Some(colors))?;
        let mapping = self.options.plane_mapping(heights.resolution());
        let scale = self.options.height_scale;
        for_each_cell(heights.resolution(), cloud.data_mut(), 1, |x, y, out| {
            let position = mapping.apply(x, y, heights.at(x, y), scale);
            out[0] = ColoredPointVertex::new(position, 1.0, colors.at(x, y));
        });
        Ok(())
    }

    pub fn generate(
        &self,
        heights: &HeightMap,
        colors: &ColorMap,
    ) -> Result<PointCloud<ColoredPointVertex>, ComputeError> {
        let mut cloud = Grid::filled(heights.resolution(), ColoredPointVertex::default());
        self.populate(&mut cloud, heights, colors)?;
        Ok(cloud)
    }

    /// 高度取 RED 通道，颜色图照常传入
    pub fn populate_image(
        &self,
        cloud: &mut PointCloud<ColoredPointVertex>,
        image: &RawImage,
        colors: &ColorMap,
    ) -> Result<(), ComputeError> {
        self.layout.require(image.layout())?;
        self.populate(cloud, &image.red_channel(), colors)
    }

    pub fn generate_image(
        &self,
        image: &RawImage,
        colors: &ColorMap,
    ) -> Result<PointCloud<ColoredPointVertex>, ComputeError> {
        self.layout.require(image.layout())?;
        self.generate(&image.red_channel(), colors)
    }
}

impl Default for ColoredHeightMapToPointCloudGenerator {
    fn default() -> Self {
        Self::new(HeightMapOptions::default())
    }
}

// ====== 便捷入口 ======
impl Grid<f32> {
    pub fn to_height_point_cloud(&self, options: HeightMapOptions) -> PointCloud<PointVertex> {
        let mapping = options.plane_mapping(self.resolution());
        Grid::from_fn(self.resolution(), |c| {
            let position = mapping.apply(c.x, c.y, self.at(c.x, c.y), options.height_scale);
            PointVertex::new(position, 1.0)
        })
    }

    pub fn to_colored_height_point_cloud(
        &self,
        colors: &Grid<Vec4>,
        options: HeightMapOptions,
    ) -> Result<PointCloud<ColoredPointVertex>, ComputeError> {
        ColoredHeightMapToPointCloudGenerator::new(options).generate(self, colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_point_unprojects_onto_optical_axis() {
        let intrinsics = DepthMapIntrinsicParameters {
            fx: 2.0,
            fy: 4.0,
            cx: 1.0,
            cy: 1.0,
            space_shift: Vec3::ZERO,
        };
        assert_eq!(intrinsics.unproject(1, 1, 3.0), Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(intrinsics.unproject(3, 5, 2.0), Vec3::new(2.0, 2.0, 2.0));
        let shifted = intrinsics.with_space_shift(Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(shifted.unproject(1, 1, 3.0), Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn plain_mapping_spans_unit_square() {
        let options = HeightMapOptions {
            preserve_proportions: false,
            height_scale: 1.0,
        };
        let m = options.plane_mapping(Resolution::new(5, 3));
        assert_eq!(m.apply(0, 0, 0.0, 1.0), Vec3::ZERO);
        assert_eq!(m.apply(4, 2, 0.0, 1.0), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(m.apply(2, 1, 0.0, 1.0), Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn proportional_mapping_keeps_aspect_ratio() {
        let m = HeightMapOptions::default().plane_mapping(Resolution::new(5, 3));
        assert_eq!(m.apply(0, 1, 0.0, 1.0), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(m.apply(4, 1, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(m.apply(2, 0, 0.0, 1.0), Vec3::new(0.0, -0.5, 0.0));
        assert_eq!(m.apply(2, 2, 0.0, 1.0), Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn single_sample_axis_collapses_to_origin() {
        let plain = HeightMapOptions {
            preserve_proportions: false,
            height_scale: 1.0,
        };
        let m = plain.plane_mapping(Resolution::new(1, 1));
        assert_eq!(m.apply(0, 0, 2.0, 0.5), Vec3::new(0.0, 0.0, 1.0));
        let m = HeightMapOptions::default().plane_mapping(Resolution::new(1, 1));
        assert_eq!(m.apply(0, 0, 2.0, 1.0), Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn missing_depth_is_a_hole() {
        let depth = Grid::from_vec(Resolution::new(2, 1), vec![0.0, 1.5]).unwrap();
        let cloud = DepthMapToPointCloudGenerator::default_kinect()
            .generate(&depth)
            .unwrap();
        assert_eq!(cloud.data()[0].size, 0.0);
        assert_eq!(cloud.data()[1].size, 1.0);
        assert_eq!(cloud.data()[1].position.z, 1.5);
    }
}
