//! GPU operator: 采样网格 -> 点云
//!
//! 输入输出都是 storage buffer，适合每帧复用同一批缓冲区的连续流场景。

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2, Vec3, Vec4};

use super::{DepthMapIntrinsicParameters, HeightMapOptions};
use crate::error::ComputeError;
use crate::gpu::kernel::{self, Kernel};
use crate::gpu::{GpuContext, GpuElement, GpuGrid};
use crate::resolution::Resolution;
use crate::vertex::{ColoredPointVertex, PointVertex};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct DepthParams {
    pub resolution: UVec2,
    pub focal: Vec2,
    pub center: Vec2,
    _padding0: [u32; 2],
    pub space_shift: Vec3,
    _padding1: u32,
}

impl DepthParams {
    pub fn new(resolution: Resolution, intrinsics: &DepthMapIntrinsicParameters) -> Self {
        Self {
            resolution: resolution.as_uvec2(),
            focal: Vec2::new(intrinsics.fx, intrinsics.fy),
            center: Vec2::new(intrinsics.cx, intrinsics.cy),
            _padding0: [0; 2],
            space_shift: intrinsics.space_shift,
            _padding1: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct HeightParams {
    pub resolution: UVec2,
    pub step: Vec2,
    pub origin: Vec2,
    pub height_scale: f32,
    _padding: u32,
}

impl HeightParams {
    pub fn new(resolution: Resolution, options: &HeightMapOptions) -> Self {
        let mapping = options.plane_mapping(resolution);
        Self {
            resolution: resolution.as_uvec2(),
            step: mapping.step,
            origin: mapping.origin,
            height_scale: options.height_scale,
            _padding: 0,
        }
    }
}

// 布局：binding 0 采样、binding 1 输出点
fn plain_layout<P: Pod, O: GpuElement>() -> [wgpu::BindGroupLayoutEntry; 3] {
    [
        kernel::storage(0, true, f32::MIN_BINDING_SIZE),
        kernel::storage(1, false, O::MIN_BINDING_SIZE),
        kernel::uniform::<P>(2),
    ]
}

// 布局：binding 0 采样、binding 1 颜色、binding 2 输出点
fn colored_layout<P: Pod, O: GpuElement>() -> [wgpu::BindGroupLayoutEntry; 4] {
    [
        kernel::storage(0, true, f32::MIN_BINDING_SIZE),
        kernel::storage(1, true, Vec4::MIN_BINDING_SIZE),
        kernel::storage(2, false, O::MIN_BINDING_SIZE),
        kernel::uniform::<P>(3),
    ]
}

fn run_plain<P: Pod, O: GpuElement>(
    ctx: &GpuContext,
    op: &Kernel,
    samples: &GpuGrid<f32>,
    cloud: &GpuGrid<O>,
    params: &P,
) -> Result<(), ComputeError> {
    let resolution = samples.resolution();
    resolution.require_match(cloud.resolution(), "samples", "pointCloud")?;

    let params = kernel::uniform_buffer(ctx.device(), "point_cloud_params", params);
    let bind_group = op.bind(
        ctx.device(),
        &[
            (0, samples.buffer().as_entire_binding()),
            (1, cloud.buffer().as_entire_binding()),
            (2, params.as_entire_binding()),
        ],
    );
    kernel::submit_2d(
        ctx.device(),
        ctx.queue(),
        "point_cloud_encoder",
        &[(op, &bind_group, resolution)],
    );
    Ok(())
}

fn run_colored<P: Pod, O: GpuElement>(
    ctx: &GpuContext,
    op: &Kernel,
    samples: &GpuGrid<f32>,
    colors: &GpuGrid<Vec4>,
    cloud: &GpuGrid<O>,
    params: &P,
) -> Result<(), ComputeError> {
    let resolution = samples.resolution();
    resolution.require_match(colors.resolution(), "samples", "colors")?;
    resolution.require_match(cloud.resolution(), "samples", "pointCloud")?;

    let params = kernel::uniform_buffer(ctx.device(), "colored_point_cloud_params", params);
    let bind_group = op.bind(
        ctx.device(),
        &[
            (0, samples.buffer().as_entire_binding()),
            (1, colors.buffer().as_entire_binding()),
            (2, cloud.buffer().as_entire_binding()),
            (3, params.as_entire_binding()),
        ],
    );
    kernel::submit_2d(
        ctx.device(),
        ctx.queue(),
        "colored_point_cloud_encoder",
        &[(op, &bind_group, resolution)],
    );
    Ok(())
}

// ===============================================================================
// 深度图
// ===============================================================================

#[derive(Clone)]
pub struct GpuDepthMapToPointCloudGenerator {
    ctx: GpuContext,
    kernel: Kernel,
    intrinsics: DepthMapIntrinsicParameters,
}

impl GpuDepthMapToPointCloudGenerator {
    pub fn new(
        ctx: &GpuContext,
        intrinsics: DepthMapIntrinsicParameters,
    ) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "depth_map_to_point_cloud",
            include_str!("depth_map_to_point_cloud.wgsl"),
            &plain_layout::<DepthParams, PointVertex>(),
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            intrinsics,
        })
    }

    pub fn populate(
        &self,
        cloud: &GpuGrid<PointVertex>,
        depth: &GpuGrid<f32>,
    ) -> Result<(), ComputeError> {
        let params = DepthParams::new(depth.resolution(), &self.intrinsics);
        run_plain(&self.ctx, &self.kernel, depth, cloud, &params)
    }

    pub fn generate(&self, depth: &GpuGrid<f32>) -> Result<GpuGrid<PointVertex>, ComputeError> {
        let cloud = GpuGrid::zeroed(&self.ctx, "point_cloud", depth.resolution());
        self.populate(&cloud, depth)?;
        Ok(cloud)
    }
}

#[derive(Clone)]
pub struct GpuColoredDepthMapToPointCloudGenerator {
    ctx: GpuContext,
    kernel: Kernel,
    intrinsics: DepthMapIntrinsicParameters,
}

impl GpuColoredDepthMapToPointCloudGenerator {
    pub fn new(
        ctx: &GpuContext,
        intrinsics: DepthMapIntrinsicParameters,
    ) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "colored_depth_map_to_point_cloud",
            include_str!("colored_depth_map_to_point_cloud.wgsl"),
            &colored_layout::<DepthParams, ColoredPointVertex>(),
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            intrinsics,
        })
    }

    pub fn populate(
        &self,
        cloud: &GpuGrid<ColoredPointVertex>,
        depth: &GpuGrid<f32>,
        colors: &GpuGrid<Vec4>,
    ) -> Result<(), ComputeError> {
        let params = DepthParams::new(depth.resolution(), &self.intrinsics);
        run_colored(&self.ctx, &self.kernel, depth, colors, cloud, &params)
    }

    pub fn generate(
        &self,
        depth: &GpuGrid<f32>,
        colors: &GpuGrid<Vec4>,
    ) -> Result<GpuGrid<ColoredPointVertex>, ComputeError> {
        depth
            .resolution()
            .require_match(colors.resolution(), "depthMap", "colors")?;
        let cloud = GpuGrid::zeroed(&self.ctx, "colored_point_cloud", depth.resolution());
        self.populate(&cloud, depth, colors)?;
        Ok(cloud)
    }
}

// ===============================================================================
// 高度图
// ===============================================================================

#[derive(Clone)]
pub struct GpuHeightMapToPointCloudGenerator {
    ctx: GpuContext,
    kernel: Kernel,
    options: HeightMapOptions,
}

impl GpuHeightMapToPointCloudGenerator {
    pub fn new(ctx: &GpuContext, options: HeightMapOptions) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "height_map_to_point_cloud",
            include_str!("height_map_to_point_cloud.wgsl"),
            &plain_layout::<HeightParams, PointVertex>(),
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            options,
        })
    }

    pub fn populate(
        &self,
        cloud: &GpuGrid<PointVertex>,
        heights: &GpuGrid<f32>,
    ) -> Result<(), ComputeError> {
        let params = HeightParams::new(heights.resolution(), &self.options);
        run_plain(&self.ctx, &self.kernel, heights, cloud, &params)
    }

    pub fn generate(&self, heights: &GpuGrid<f32>) -> Result<GpuGrid<PointVertex>, ComputeError> {
        let cloud = GpuGrid::zeroed(&self.ctx, "point_cloud", heights.resolution());
        self.populate(&cloud, heights)?;
        Ok(cloud)
    }
}

#[derive(Clone)]
pub struct GpuColoredHeightMapToPointCloudGenerator {
    ctx: GpuContext,
    kernel: Kernel,
    options: HeightMapOptions,
}

impl GpuColoredHeightMapToPointCloudGenerator {
    pub fn new(ctx: &GpuContext, options: HeightMapOptions) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "colored_height_map_to_point_cloud",
            include_str!("colored_height_map_to_point_cloud.wgsl"),
            &colored_layout::<HeightParams, ColoredPointVertex>(),
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            options,
        })
    }

    pub fn populate(
        &self,
        cloud: &GpuGrid<ColoredPointVertex>,
        heights: &GpuGrid<f32>,
        colors: &GpuGrid<Vec4>,
    ) -> Result<(), ComputeError> {
        let params = HeightParams::new(heights.resolution(), &self.options);
        run_colored(&self.ctx, &self.kernel, heights, colors, cloud, &params)
    }

    pub fn generate(
        &self,
        heights: &GpuGrid<f32>,
        colors: &GpuGrid<Vec4>,
    ) -> Result<GpuGrid<ColoredPointVertex>, ComputeError> {
        heights
            .resolution()
            .require_match(colors.resolution(), "heightMap", "colors")?;
        let cloud = GpuGrid::zeroed(&self.ctx, "colored_point_cloud", heights.resolution());
        self.populate(&cloud, heights, colors)?;
        Ok(cloud)
    }
}
