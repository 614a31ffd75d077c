//! GPU operator: 有组织点云 -> 三角网格

use std::marker::PhantomData;

use super::{mesh_cells, mesh_vertex_count};
use crate::error::ComputeError;
use crate::gpu::kernel::{self, GridParams, Kernel};
use crate::gpu::{GpuBuffer, GpuContext, GpuElement, GpuGrid};
use crate::vertex::PointLayout;

/// binding 0: 点云（只读）
/// binding 1: 网格顶点（6 个/单元）
/// binding 2: GridParams
pub struct GpuPointCloudToMeshGenerator<L: PointLayout> {
    ctx: GpuContext,
    kernel: Kernel,
    _layout: PhantomData<L>,
}

impl<L: PointLayout> GpuPointCloudToMeshGenerator<L> {
    pub fn new(ctx: &GpuContext) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "point_cloud_to_mesh",
            L::MESH_SHADER,
            &[
                kernel::storage(0, true, L::Point::MIN_BINDING_SIZE),
                kernel::storage(1, false, L::MeshVertex::MIN_BINDING_SIZE),
                kernel::uniform::<GridParams>(2),
            ],
        )?;
        log::debug!("mesh generator ready ({})", L::NAME);
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            _layout: PhantomData,
        })
    }

    /// 写入已分配的网格缓冲区，长度必须为 (W-1)(H-1)*6
    pub fn populate(
        &self,
        cloud: &GpuGrid<L::Point>,
        mesh: &GpuBuffer<L::MeshVertex>,
    ) -> Result<(), ComputeError> {
        let resolution = cloud.resolution();
        let expected = mesh_vertex_count(resolution);
        if mesh.len() != expected {
            return Err(ComputeError::BufferLength {
                resolution,
                expected,
                actual: mesh.len(),
            });
        }

        let cells = mesh_cells(resolution);
        let params = kernel::uniform_buffer(
            self.ctx.device(),
            "mesh_params",
            &GridParams::new(resolution, cells),
        );
        let bind_group = self.kernel.bind(
            self.ctx.device(),
            &[
                (0, cloud.buffer().as_entire_binding()),
                (1, mesh.as_entire_binding()),
                (2, params.as_entire_binding()),
            ],
        );
        kernel::submit_2d(
            self.ctx.device(),
            self.ctx.queue(),
            "mesh_encoder",
            &[(&self.kernel, &bind_group, cells)],
        );
        Ok(())
    }

    pub fn generate(
        &self,
        cloud: &GpuGrid<L::Point>,
    ) -> Result<GpuBuffer<L::MeshVertex>, ComputeError> {
        let mesh = GpuBuffer::zeroed(&self.ctx, "mesh", mesh_vertex_count(cloud.resolution()));
        self.populate(cloud, &mesh)?;
        Ok(mesh)
    }
}
