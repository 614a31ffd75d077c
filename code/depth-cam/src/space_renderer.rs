// ===============================================================================
// 空间渲染：原始深度帧 -> 深度图 -> 点云 -> 网格
// ===============================================================================
//! 每帧调用一次。输出缓冲区按分辨率分配一次，之后逐帧原地覆盖。

use crate::camera::DepthCamera;
use crate::error::CameraError;
use crate::flip::FlipFlags;
use crate::frame_slot::Frame;
use crate::measurement::{DepthMapper, DepthMeasurement, DepthRange};
use glam::{Mat4, Vec3};
use grid_nano::ops::mesh::Mesh;
use grid_nano::vertex::{MeshVertex, PointVertex};
use grid_nano::{
    ComputeError, DepthMap, DepthMapIntrinsicParameters, DepthMapToPointCloudGenerator, Grid,
    Plain, PointCloud, PointCloudToMeshGenerator, Resolution,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 空间裁剪盒，变换之后的点落在盒外即成为空洞
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl ClipBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// 边界包含在内
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

impl Default for ClipBox {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-1000.0),
            max: Vec3::splat(1000.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceRendererConfig {
    pub intrinsics: DepthMapIntrinsicParameters,
    /// 区间外的深度在深度图和点云中都作为空洞
    pub range: DepthRange,
    /// 反投影之后作用在每个点上
    pub transform: Mat4,
    /// 只影响点云和网格，深度图保持不变
    pub clip: ClipBox,
}

#[derive(Debug)]
enum RenderState {
    Uninitialized,
    Allocated {
        resolution: Resolution,
        /// 翻转后的原始帧
        flipped: Grid<u16>,
        /// 按相机当前度量换算后的深度图
        depth_image: DepthMap,
        /// 以米为单位、已裁剪的深度，点云的输入
        metric: DepthMap,
        point_cloud: PointCloud<PointVertex>,
        mesh: Mesh<MeshVertex>,
    },
}

#[derive(Debug)]
pub struct SpaceRenderer {
    config: SpaceRendererConfig,
    point_cloud_generator: DepthMapToPointCloudGenerator,
    mesh_generator: PointCloudToMeshGenerator<Plain>,
    state: RenderState,
    sequence: u64,
}

impl SpaceRenderer {
    pub fn new(config: SpaceRendererConfig) -> Result<Self, CameraError> {
        config.range.validate()?;
        Ok(Self {
            config,
            point_cloud_generator: DepthMapToPointCloudGenerator::new(config.intrinsics),
            mesh_generator: PointCloudToMeshGenerator::new(),
            state: RenderState::Uninitialized,
            sequence: 0,
        })
    }

    pub fn config(&self) -> &SpaceRendererConfig {
        &self.config
    }

    /// 替换配置，已分配的缓冲区保留
    pub fn set_config(&mut self, config: SpaceRendererConfig) -> Result<(), CameraError> {
        config.range.validate()?;
        self.point_cloud_generator = DepthMapToPointCloudGenerator::new(config.intrinsics);
        self.config = config;
        Ok(())
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match &self.state {
            RenderState::Uninitialized => None,
            RenderState::Allocated { resolution, .. } => Some(*resolution),
        }
    }

    pub fn ensure_capacity(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        resolution.require_non_empty()?;
        if self.resolution() == Some(resolution) {
            return Ok(());
        }
        log::debug!("allocating space render buffers {}", resolution.spec());
        self.state = RenderState::Allocated {
            resolution,
            flipped: Grid::filled(resolution, 0),
            depth_image: Grid::filled(resolution, 0.0),
            metric: Grid::filled(resolution, 0.0),
            point_cloud: Grid::filled(resolution, PointVertex::default()),
            mesh: Mesh::for_resolution(resolution),
        };
        Ok(())
    }

    pub fn release(&mut self) {
        self.state = RenderState::Uninitialized;
        self.sequence = 0;
    }

    /// 从相机取最新帧并渲染；没有新帧时返回 false，上一帧的结果保持不变
    pub fn render(&mut self, camera: &mut impl DepthCamera) -> Result<bool, CameraError> {
        let measurement = camera.measurement();
        let flips = camera.flips();
        let Some(frame) = camera.latest_frame() else {
            return Ok(false);
        };
        self.render_frame(frame, measurement, flips)?;
        Ok(true)
    }

    /// 翻转 + 换算 + 裁剪，然后重新生成点云和网格
    pub fn render_frame(
        &mut self,
        frame: &Frame,
        measurement: DepthMeasurement,
        flips: FlipFlags,
    ) -> Result<(), CameraError> {
        self.ensure_capacity(frame.resolution())?;
        let mapper = DepthMapper::new(measurement);
        let SpaceRendererConfig {
            range,
            transform,
            clip,
            ..
        } = self.config;

        let RenderState::Allocated {
            flipped,
            depth_image,
            metric,
            point_cloud,
            mesh,
            ..
        } = &mut self.state
        else {
            return Err(ComputeError::Execution("space render buffers missing".to_string()).into());
        };

        flips.apply_into(frame.samples(), flipped)?;
        mapper.map_in_range(flipped, &range, depth_image, metric)?;
        self.point_cloud_generator.populate(point_cloud, metric)?;
        place_points(point_cloud, &transform, &clip);
        self.mesh_generator.populate(point_cloud, mesh)?;
        log::trace!("rendered depth frame {}", frame.sequence());
        self.sequence = frame.sequence();
        Ok(())
    }

    /// 最近一次渲染的帧序号，0 表示尚未渲染
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn depth_image(&self) -> Option<&DepthMap> {
        match &self.state {
            RenderState::Allocated { depth_image, .. } => Some(depth_image),
            RenderState::Uninitialized => None,
        }
    }

    pub fn point_cloud(&self) -> Option<&PointCloud<PointVertex>> {
        match &self.state {
            RenderState::Allocated { point_cloud, .. } => Some(point_cloud),
            RenderState::Uninitialized => None,
        }
    }

    pub fn mesh(&self) -> Option<&Mesh<MeshVertex>> {
        match &self.state {
            RenderState::Allocated { mesh, .. } => Some(mesh),
            RenderState::Uninitialized => None,
        }
    }
}

/// 变换有效点，落在裁剪盒外的点大小置 0
fn place_points(cloud: &mut PointCloud<PointVertex>, transform: &Mat4, clip: &ClipBox) {
    let identity = *transform == Mat4::IDENTITY;
    cloud
        .data_mut()
        .par_iter_mut()
        .filter(|p| p.size > 0.0)
        .for_each(|p| {
            if !identity {
                p.position = transform.transform_point3(p.position);
            }
            if !clip.contains(p.position) {
                p.size = 0.0;
            }
        });
}
