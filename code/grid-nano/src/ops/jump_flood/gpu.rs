//! GPU operator: jump flooding 与方向场滤镜
//!
//! 所有步长在同一个 command encoder 中录制，但每一步各占一个 compute pass，
//! 保证第 k 步写完之后第 k+1 步才读取。

use bytemuck::{Pod, Zeroable};
use glam::{IVec2, UVec2};

use super::{DirectionalFieldConfig, FieldTexel, jump_steps, require_power_of_two};
use crate::error::ComputeError;
use crate::gpu::kernel::{self, Kernel};
use crate::gpu::{GpuBuffer, GpuContext, GpuElement, GpuGrid};
use crate::grid::Grid;
use crate::resolution::{Resolution, power_of_two_canvas};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CanvasParams {
    pub canvas: u32,
    pub step: u32,
    _padding: [u32; 2],
}

impl CanvasParams {
    pub fn new(canvas: u32, step: u32) -> Self {
        Self {
            canvas,
            step,
            _padding: [0; 2],
        }
    }
}

/// 画布中的源图窗口；value 对阈值 pass 是阈值，对解码 pass 是距离缩放
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct WindowParams {
    pub source_resolution: UVec2,
    pub origin: UVec2,
    pub canvas: u32,
    pub value: f32,
    _padding: [u32; 2],
}

impl WindowParams {
    pub fn new(source: Resolution, origin: UVec2, canvas: u32, value: f32) -> Self {
        Self {
            source_resolution: source.as_uvec2(),
            origin,
            canvas,
            value,
            _padding: [0; 2],
        }
    }
}

fn pass_layout<I: GpuElement, O: GpuElement, P: Pod>() -> [wgpu::BindGroupLayoutEntry; 3] {
    [
        kernel::storage(0, true, I::MIN_BINDING_SIZE),
        kernel::storage(1, false, O::MIN_BINDING_SIZE),
        kernel::uniform::<P>(2),
    ]
}

// ===============================================================================
// GpuJumpFlooder
// ===============================================================================

/// 种子初始化与单步传播两个内核
#[derive(Clone)]
pub struct JumpFloodKernels {
    seed: Kernel,
    step: Kernel,
}

impl JumpFloodKernels {
    pub fn new(device: &wgpu::Device) -> Result<Self, ComputeError> {
        Ok(Self {
            seed: Kernel::new(
                device,
                "jump_flood_seed",
                include_str!("jump_flood_seed.wgsl"),
                &pass_layout::<f32, IVec2, CanvasParams>(),
            )?,
            step: Kernel::new(
                device,
                "jump_flood_step",
                include_str!("jump_flood_step.wgsl"),
                &pass_layout::<IVec2, IVec2, CanvasParams>(),
            )?,
        })
    }
}

/// GPU 端 jump flooder，拥有 ping-pong 缓冲区和每一步的 bind group
pub struct GpuJumpFlooder {
    ctx: GpuContext,
    kernels: JumpFloodKernels,
    canvas: u32,
    buffers: [GpuBuffer<IVec2>; 2],
    seed_params: wgpu::Buffer,
    // 第 k 步读 buffers[k % 2]，写 buffers[(k + 1) % 2]
    steps: Vec<wgpu::BindGroup>,
}

impl GpuJumpFlooder {
    pub fn new(ctx: &GpuContext, canvas: u32) -> Result<Self, ComputeError> {
        let kernels = JumpFloodKernels::new(ctx.device())?;
        Self::with_kernels(ctx, kernels, canvas)
    }

    pub fn with_kernels(
        ctx: &GpuContext,
        kernels: JumpFloodKernels,
        canvas: u32,
    ) -> Result<Self, ComputeError> {
        require_power_of_two(canvas)?;
        let cells = Resolution::new(canvas, canvas).len();
        let buffers = [
            GpuBuffer::zeroed(ctx, "jump_flood_ping", cells),
            GpuBuffer::zeroed(ctx, "jump_flood_pong", cells),
        ];
        let device = ctx.device();
        let seed_params = kernel::uniform_buffer(
            device,
            "jump_flood_seed_params",
            &CanvasParams::new(canvas, 0),
        );

        let steps = jump_steps(canvas)
            .enumerate()
            .map(|(k, step)| {
                let params = kernel::uniform_buffer(
                    device,
                    "jump_flood_step_params",
                    &CanvasParams::new(canvas, step),
                );
                kernels.step.bind(
                    device,
                    &[
                        (0, buffers[k % 2].as_entire_binding()),
                        (1, buffers[(k + 1) % 2].as_entire_binding()),
                        (2, params.as_entire_binding()),
                    ],
                )
            })
            .collect();

        Ok(Self {
            ctx: ctx.clone(),
            kernels,
            canvas,
            buffers,
            seed_params,
            steps,
        })
    }

    pub fn canvas(&self) -> u32 {
        self.canvas
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.canvas, self.canvas)
    }

    /// 保存最终结果的缓冲区
    pub fn result(&self) -> &GpuBuffer<IVec2> {
        &self.buffers[self.steps.len() % 2]
    }

    /// 初始化 + 全部步长，一次提交
    pub fn jump_flood(
        &self,
        mask: &GpuBuffer<f32>,
    ) -> Result<&GpuBuffer<IVec2>, ComputeError> {
        let resolution = self.resolution();
        if mask.len() != resolution.len() {
            return Err(ComputeError::BufferLength {
                resolution,
                expected: resolution.len(),
                actual: mask.len(),
            });
        }
        let device = self.ctx.device();
        let seed = self.kernels.seed.bind(
            device,
            &[
                (0, mask.as_entire_binding()),
                (1, self.buffers[0].as_entire_binding()),
                (2, self.seed_params.as_entire_binding()),
            ],
        );

        let mut passes = vec![(&self.kernels.seed, &seed, resolution)];
        passes.extend(
            self.steps
                .iter()
                .map(|bind_group| (&self.kernels.step, bind_group, resolution)),
        );
        kernel::submit_2d(device, self.ctx.queue(), "jump_flood_encoder", &passes);
        Ok(self.result())
    }

    /// 读回最近种子坐标
    pub fn read_blocking(&self) -> Result<Grid<IVec2>, ComputeError> {
        Grid::from_vec(self.resolution(), self.result().read_blocking(&self.ctx)?)
    }
}

// ===============================================================================
// GpuDirectionalField
// ===============================================================================

enum GpuFieldState {
    Uninitialized,
    Allocated {
        canvas: u32,
        thresholded: GpuBuffer<f32>,
        contoured: GpuBuffer<f32>,
        contour_bind_group: wgpu::BindGroup,
        flooder: GpuJumpFlooder,
    },
}

pub struct GpuDirectionalField {
    ctx: GpuContext,
    config: DirectionalFieldConfig,
    threshold: Kernel,
    contour: Kernel,
    decode: Kernel,
    flood: JumpFloodKernels,
    state: GpuFieldState,
}

impl GpuDirectionalField {
    pub fn new(ctx: &GpuContext, config: DirectionalFieldConfig) -> Result<Self, ComputeError> {
        let device = ctx.device();
        let threshold = Kernel::new(
            device,
            "threshold",
            include_str!("threshold.wgsl"),
            &pass_layout::<f32, f32, WindowParams>(),
        )?;
        let contour = Kernel::new(
            device,
            "contour_points",
            include_str!("contour_points.wgsl"),
            &pass_layout::<f32, f32, CanvasParams>(),
        )?;
        let decode = Kernel::new(
            device,
            "pixel_direction",
            include_str!("pixel_direction.wgsl"),
            &[
                kernel::storage(0, true, IVec2::MIN_BINDING_SIZE),
                kernel::storage(1, true, f32::MIN_BINDING_SIZE),
                kernel::storage(2, false, FieldTexel::MIN_BINDING_SIZE),
                kernel::uniform::<WindowParams>(3),
            ],
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            config,
            threshold,
            contour,
            decode,
            flood: JumpFloodKernels::new(device)?,
            state: GpuFieldState::Uninitialized,
        })
    }

    pub fn config(&self) -> &DirectionalFieldConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DirectionalFieldConfig {
        &mut self.config
    }

    pub fn canvas(&self) -> Option<u32> {
        match &self.state {
            GpuFieldState::Uninitialized => None,
            GpuFieldState::Allocated { canvas, .. } => Some(*canvas),
        }
    }

    pub fn ensure_capacity(&mut self, source: Resolution) -> Result<u32, ComputeError> {
        source.require_non_empty()?;
        let canvas = power_of_two_canvas(source);
        if self.canvas() == Some(canvas) {
            return Ok(canvas);
        }
        log::debug!("allocating directional field canvas {canvas}x{canvas}");

        // 先释放旧缓冲区再分配
        self.state = GpuFieldState::Uninitialized;
        let cells = Resolution::new(canvas, canvas).len();
        let thresholded = GpuBuffer::zeroed(&self.ctx, "thresholded", cells);
        let contoured = GpuBuffer::zeroed(&self.ctx, "contoured", cells);
        let params = kernel::uniform_buffer(
            self.ctx.device(),
            "contour_params",
            &CanvasParams::new(canvas, 0),
        );
        let contour_bind_group = self.contour.bind(
            self.ctx.device(),
            &[
                (0, thresholded.as_entire_binding()),
                (1, contoured.as_entire_binding()),
                (2, params.as_entire_binding()),
            ],
        );
        let flooder = GpuJumpFlooder::with_kernels(&self.ctx, self.flood.clone(), canvas)?;
        self.state = GpuFieldState::Allocated {
            canvas,
            thresholded,
            contoured,
            contour_bind_group,
            flooder,
        };
        Ok(canvas)
    }

    pub fn release(&mut self) {
        self.state = GpuFieldState::Uninitialized;
    }

    pub fn apply(&mut self, source: &GpuGrid<f32>) -> Result<GpuGrid<FieldTexel>, ComputeError> {
        let target = GpuGrid::zeroed(&self.ctx, "directional_field", source.resolution());
        self.apply_into(source, &target)?;
        Ok(target)
    }

    pub fn apply_into(
        &mut self,
        source: &GpuGrid<f32>,
        target: &GpuGrid<FieldTexel>,
    ) -> Result<(), ComputeError> {
        let resolution = source.resolution();
        resolution.require_match(target.resolution(), "source", "target")?;
        let canvas = self.ensure_capacity(resolution)?;
        let origin = self.config.anchor.origin(canvas, resolution);

        let GpuFieldState::Allocated {
            thresholded,
            contoured,
            contour_bind_group,
            flooder,
            ..
        } = &self.state
        else {
            return Err(ComputeError::Execution(
                "directional field buffers missing".to_string(),
            ));
        };
        let device = self.ctx.device();
        let square = Resolution::new(canvas, canvas);

        let threshold_params = kernel::uniform_buffer(
            device,
            "threshold_params",
            &WindowParams::new(resolution, origin, canvas, self.config.threshold),
        );
        let threshold_bind_group = self.threshold.bind(
            device,
            &[
                (0, source.buffer().as_entire_binding()),
                (1, thresholded.as_entire_binding()),
                (2, threshold_params.as_entire_binding()),
            ],
        );
        kernel::submit_2d(
            device,
            self.ctx.queue(),
            "directional_field_prepare",
            &[
                (&self.threshold, &threshold_bind_group, square),
                (&self.contour, contour_bind_group, square),
            ],
        );

        let seeds = flooder.jump_flood(contoured)?;

        let decode_params = kernel::uniform_buffer(
            device,
            "pixel_direction_params",
            &WindowParams::new(resolution, origin, canvas, self.config.distance_scale),
        );
        let decode_bind_group = self.decode.bind(
            device,
            &[
                (0, seeds.as_entire_binding()),
                (1, thresholded.as_entire_binding()),
                (2, target.buffer().as_entire_binding()),
                (3, decode_params.as_entire_binding()),
            ],
        );
        kernel::submit_2d(
            device,
            self.ctx.queue(),
            "directional_field_decode",
            &[(&self.decode, &decode_bind_group, resolution)],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<CanvasParams>(), 16);
        assert_eq!(std::mem::size_of::<WindowParams>(), 32);
        assert_eq!(std::mem::offset_of!(WindowParams, value), 20);
        assert_eq!(FieldTexel::STRIDE_SIZE, 16);
    }
}
