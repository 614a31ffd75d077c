//! GPU operator: 有组织点云 -> 线框

use std::marker::PhantomData;

use super::wireframe_vertex_count;
use crate::error::ComputeError;
use crate::gpu::kernel::{self, GridParams, Kernel};
use crate::gpu::{GpuBuffer, GpuContext, GpuElement, GpuGrid};
use crate::vertex::PointLayout;

/// 每个点一个线程，负责自己向右、向下的两条线段
pub struct GpuPointCloudToWireframeGenerator<L: PointLayout> {
    ctx: GpuContext,
    kernel: Kernel,
    _layout: PhantomData<L>,
}

impl<L: PointLayout> GpuPointCloudToWireframeGenerator<L> {
    pub fn new(ctx: &GpuContext) -> Result<Self, ComputeError> {
        let kernel = Kernel::new(
            ctx.device(),
            "point_cloud_to_wireframe",
            L::WIREFRAME_SHADER,
            &[
                kernel::storage(0, true, L::Point::MIN_BINDING_SIZE),
                kernel::storage(1, false, L::LineVertex::MIN_BINDING_SIZE),
                kernel::uniform::<GridParams>(2),
            ],
        )?;
        log::debug!("wireframe generator ready ({})", L::NAME);
        Ok(Self {
            ctx: ctx.clone(),
            kernel,
            _layout: PhantomData,
        })
    }

    pub fn populate(
        &self,
        cloud: &GpuGrid<L::Point>,
        wireframe: &GpuBuffer<L::LineVertex>,
    ) -> Result<(), ComputeError> {
        let resolution = cloud.resolution();
        let expected = wireframe_vertex_count(resolution);
        if wireframe.len() != expected {
            return Err(ComputeError::BufferLength {
                resolution,
                expected,
                actual: wireframe.len(),
            });
        }

        let params = kernel::uniform_buffer(
            self.ctx.device(),
            "wireframe_params",
            &GridParams::new(resolution, resolution),
        );
        let bind_group = self.kernel.bind(
            self.ctx.device(),
            &[
                (0, cloud.buffer().as_entire_binding()),
                (1, wireframe.as_entire_binding()),
                (2, params.as_entire_binding()),
            ],
        );
        kernel::submit_2d(
            self.ctx.device(),
            self.ctx.queue(),
            "wireframe_encoder",
            &[(&self.kernel, &bind_group, resolution)],
        );
        Ok(())
    }

    pub fn generate(
        &self,
        cloud: &GpuGrid<L::Point>,
    ) -> Result<GpuBuffer<L::LineVertex>, ComputeError> {
        let count = wireframe_vertex_count(cloud.resolution());
        let wireframe = GpuBuffer::zeroed(&self.ctx, "wireframe", count);
        self.populate(cloud, &wireframe)?;
        Ok(wireframe)
    }
}
