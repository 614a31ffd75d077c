// ===============================================================================
// 有组织点云 -> 三角网格
// ===============================================================================
//! 每个内部单元 (x, y) 的四个角点
//!
//! ```text
//! P00 = (x, y)      P10 = (x+1, y)
//! P01 = (x, y+1)    P11 = (x+1, y+1)
//! ```
//!
//! 输出两个三角形 `(P00, P10, P01)`、`(P10, P11, P01)`，非索引，顶点按三角形重复。
//! 单元的 6 个顶点固定写在 `((y * (W-1)) + x) * 6` 起始的槽位。

pub mod gpu;

use std::marker::PhantomData;

use crate::error::ComputeError;
use crate::ops::for_each_cell;
use crate::ops::point_cloud::PointCloud;
use crate::resolution::Resolution;
use crate::vertex::{
    Colored, ColoredMeshVertex, ColoredPointVertex, MeshVertex, Plain, PointLayout, PointVertex,
};
use glam::Vec3;

pub const VERTICES_PER_CELL: usize = 6;

/// 需要三角化的内部单元 (W-1) x (H-1)
pub fn mesh_cells(resolution: Resolution) -> Resolution {
    Resolution::new(
        resolution.width.saturating_sub(1),
        resolution.height.saturating_sub(1),
    )
}

/// 网格顶点总数 (W-1)(H-1)*6；任一边小于 2 时为 0
pub fn mesh_vertex_count(resolution: Resolution) -> usize {
    mesh_cells(resolution).len() * VERTICES_PER_CELL
}

/// 非索引三角网格，记录生成它的点云分辨率
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V> {
    resolution: Resolution,
    vertices: Vec<V>,
}

impl<V: Default + Clone> Mesh<V> {
    /// 为给定点云分辨率分配（可复用的）顶点缓冲区
    pub fn for_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            vertices: vec![V::default(); mesh_vertex_count(resolution)],
        }
    }
}

impl<V> Mesh<V> {
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<V> {
        self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = &[V]> {
        self.vertices.chunks_exact(3)
    }

    /// 单元 (x, y) 的 6 个顶点
    pub fn cell(&self, x: u32, y: u32) -> &[V] {
        let start = mesh_cells(self.resolution).index(x, y) * VERTICES_PER_CELL;
        &self.vertices[start..start + VERTICES_PER_CELL]
    }
}

/// 三角形面法线，退化三角形返回零向量
#[inline]
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

fn triangulate<L: PointLayout>(cloud: &PointCloud<L::Point>, out: &mut [L::MeshVertex]) {
    let cells = mesh_cells(cloud.resolution());
    for_each_cell(cells, out, VERTICES_PER_CELL, |x, y, slot| {
        let p00 = cloud.at(x, y);
        let p10 = cloud.at(x + 1, y);
        let p01 = cloud.at(x, y + 1);
        let p11 = cloud.at(x + 1, y + 1);

        // 任一角点是空洞，整个单元权重为 0
        let weight = L::size(&p00)
            .min(L::size(&p10))
            .min(L::size(&p01))
            .min(L::size(&p11));

        let n0 = face_normal(L::position(&p00), L::position(&p10), L::position(&p01));
        let n1 = face_normal(L::position(&p10), L::position(&p11), L::position(&p01));

        slot[0] = L::mesh_vertex(&p00, weight, n0);
        slot[1] = L::mesh_vertex(&p10, weight, n0);
        slot[2] = L::mesh_vertex(&p01, weight, n0);
        slot[3] = L::mesh_vertex(&p10, weight, n1);
        slot[4] = L::mesh_vertex(&p11, weight, n1);
        slot[5] = L::mesh_vertex(&p01, weight, n1);
    });
}

/// 点云 -> 网格，`L` 选择 [`Plain`] 或 [`Colored`] 顶点布局
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCloudToMeshGenerator<L: PointLayout> {
    _layout: PhantomData<L>,
}

impl<L: PointLayout> PointCloudToMeshGenerator<L> {
    pub fn new() -> Self {
        Self {
            _layout: PhantomData,
        }
    }

    pub fn populate(
        &self,
        cloud: &PointCloud<L::Point>,
        mesh: &mut Mesh<L::MeshVertex>,
    ) -> Result<(), ComputeError> {
        cloud
            .resolution()
            .require_match(mesh.resolution, "pointCloud", "mesh")?;
        triangulate::<L>(cloud, &mut mesh.vertices);
        Ok(())
    }

    pub fn generate(&self, cloud: &PointCloud<L::Point>) -> Mesh<L::MeshVertex> {
        let mut mesh = Mesh::for_resolution(cloud.resolution());
        triangulate::<L>(cloud, &mut mesh.vertices);
        mesh
    }
}

impl PointCloud<PointVertex> {
    pub fn to_mesh(&self) -> Mesh<MeshVertex> {
        PointCloudToMeshGenerator::<Plain>::new().generate(self)
    }
}

impl PointCloud<ColoredPointVertex> {
    pub fn to_mesh(&self) -> Mesh<ColoredMeshVertex> {
        PointCloudToMeshGenerator::<Colored>::new().generate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_ignores_last_row_and_column() {
        assert_eq!(mesh_vertex_count(Resolution::new(2, 2)), 6);
        assert_eq!(mesh_vertex_count(Resolution::new(640, 480)), 639 * 479 * 6);
        assert_eq!(mesh_vertex_count(Resolution::new(1, 480)), 0);
        assert_eq!(mesh_vertex_count(Resolution::new(5, 0)), 0);
    }

    #[test]
    fn counter_clockwise_triangle_faces_positive_z() {
        let n = face_normal(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert_eq!(n, Vec3::Z);
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let n = face_normal(Vec3::ONE, Vec3::ONE, Vec3::ONE);
        assert_eq!(n, Vec3::ZERO);
        assert!(!n.is_nan());
    }
}
