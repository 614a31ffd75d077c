// ===============================================================================
// 顶点布局
// ===============================================================================
//! 与 WGSL 结构体逐字节对应的顶点格式，以及 {Plain, Colored} 变体选择
//!
//! | 布局 | 字段 | 步长 |
//! |---|---|---|
//! | [`PointVertex`] | position, size | 16 |
//! | [`ColoredPointVertex`] | position, size, color | 32 |
//! | [`MeshVertex`] | position, weight, normal | 32 |
//! | [`ColoredMeshVertex`] | position, weight, normal, color | 48 |
//! | [`LineVertex`] | position | 16 |
//! | [`ColoredLineVertex`] | position, color | 32 |

use crate::gpu::elem::GpuElement;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use std::fmt::Debug;

/// 点云顶点：位置 + 点大小
/// size == 0 表示该采样没有有效数据（例如深度缺失）
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: Vec3,
    pub size: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ColoredPointVertex {
    pub position: Vec3,
    pub size: f32,
    pub color: Vec4,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: Vec3,
    pub weight: f32,
    pub normal: Vec3,
    _padding: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ColoredMeshVertex {
    pub position: Vec3,
    pub weight: f32,
    pub normal: Vec3,
    _padding: f32,
    pub color: Vec4,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: Vec3,
    _padding: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ColoredLineVertex {
    pub position: Vec3,
    _padding: f32,
    pub color: Vec4,
}

impl PointVertex {
    pub fn new(position: Vec3, size: f32) -> Self {
        Self { position, size }
    }
}

impl ColoredPointVertex {
    pub fn new(position: Vec3, size: f32, color: Vec4) -> Self {
        Self {
            position,
            size,
            color,
        }
    }
}

impl MeshVertex {
    pub fn new(position: Vec3, weight: f32, normal: Vec3) -> Self {
        Self {
            position,
            weight,
            normal,
            _padding: 0.0,
        }
    }
}

impl ColoredMeshVertex {
    pub fn new(position: Vec3, weight: f32, normal: Vec3, color: Vec4) -> Self {
        Self {
            position,
            weight,
            normal,
            _padding: 0.0,
            color,
        }
    }
}

impl LineVertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            _padding: 0.0,
        }
    }
}

impl ColoredLineVertex {
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position,
            _padding: 0.0,
            color,
        }
    }
}

impl GpuElement for PointVertex {
    const WGSL_TYPE: &'static str = "PointVertex";
}
impl GpuElement for ColoredPointVertex {
    const WGSL_TYPE: &'static str = "ColoredPointVertex";
}
impl GpuElement for MeshVertex {
    const WGSL_TYPE: &'static str = "MeshVertex";
}
impl GpuElement for ColoredMeshVertex {
    const WGSL_TYPE: &'static str = "ColoredMeshVertex";
}
impl GpuElement for LineVertex {
    const WGSL_TYPE: &'static str = "LineVertex";
}
impl GpuElement for ColoredLineVertex {
    const WGSL_TYPE: &'static str = "ColoredLineVertex";
}

// ===============================================================================
// 变体选择：编译期标记类型
// ===============================================================================

/// 有组织点云的顶点布局族
/// 每个标记类型绑定各自独立编译的计算着色器
pub trait PointLayout: Send + Sync + 'static {
    type Point: GpuElement + Debug + Default + PartialEq;
    type MeshVertex: GpuElement + Debug + Default + PartialEq;
    type LineVertex: GpuElement + Debug + Default + PartialEq;

    const NAME: &'static str;
    const MESH_SHADER: &'static str;
    const WIREFRAME_SHADER: &'static str;

    fn position(p: &Self::Point) -> Vec3;
    fn size(p: &Self::Point) -> f32;
    fn mesh_vertex(p: &Self::Point, weight: f32, normal: Vec3) -> Self::MeshVertex;
    fn line_vertex(p: &Self::Point) -> Self::LineVertex;
}

/// 仅位置
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

/// 位置 + 每点颜色
#[derive(Debug, Clone, Copy, Default)]
pub struct Colored;

impl PointLayout for Plain {
    type Point = PointVertex;
    type MeshVertex = MeshVertex;
    type LineVertex = LineVertex;

    const NAME: &'static str = "plain";
    const MESH_SHADER: &'static str = include_str!("ops/mesh/point_cloud_to_mesh.wgsl");
    const WIREFRAME_SHADER: &'static str =
        include_str!("ops/wireframe/point_cloud_to_wireframe.wgsl");

    #[inline]
    fn position(p: &PointVertex) -> Vec3 {
        p.position
    }

    #[inline]
    fn size(p: &PointVertex) -> f32 {
        p.size
    }

    #[inline]
    fn mesh_vertex(p: &PointVertex, weight: f32, normal: Vec3) -> MeshVertex {
        MeshVertex::new(p.position, weight, normal)
    }

    #[inline]
    fn line_vertex(p: &PointVertex) -> LineVertex {
        LineVertex::new(p.position)
    }
}

impl PointLayout for Colored {
    type Point = ColoredPointVertex;
    type MeshVertex = ColoredMeshVertex;
    type LineVertex = ColoredLineVertex;

    const NAME: &'static str = "colored";
    const MESH_SHADER: &'static str = include_str!("ops/mesh/colored_point_cloud_to_mesh.wgsl");
    const WIREFRAME_SHADER: &'static str =
        include_str!("ops/wireframe/colored_point_cloud_to_wireframe.wgsl");

    #[inline]
    fn position(p: &ColoredPointVertex) -> Vec3 {
        p.position
    }

    #[inline]
    fn size(p: &ColoredPointVertex) -> f32 {
        p.size
    }

    #[inline]
    fn mesh_vertex(p: &ColoredPointVertex, weight: f32, normal: Vec3) -> ColoredMeshVertex {
        ColoredMeshVertex::new(p.position, weight, normal, p.color)
    }

    #[inline]
    fn line_vertex(p: &ColoredPointVertex) -> ColoredLineVertex {
        ColoredLineVertex::new(p.position, p.color)
    }
}
