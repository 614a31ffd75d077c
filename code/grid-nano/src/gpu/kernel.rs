//! 计算管线的通用构造：绑定布局、着色器编译、2D 调度

use crate::error::ComputeError;
use crate::resolution::{Resolution, WORKGROUP_SIZE, compute_dispatch_size};
use bytemuck::{Pod, Zeroable};
use glam::UVec2;
use wgpu::{ShaderStages, util::DeviceExt};

/// 拓扑类算子共用的 uniform：点云分辨率 + 实际调度的单元范围
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct GridParams {
    pub resolution: UVec2,
    pub cells: UVec2,
}

impl GridParams {
    pub fn new(resolution: Resolution, cells: Resolution) -> Self {
        Self {
            resolution: resolution.as_uvec2(),
            cells: cells.as_uvec2(),
        }
    }
}

pub(crate) fn storage(
    binding: u32,
    read_only: bool,
    min_size: wgpu::BufferSize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: Some(min_size),
        },
        count: None,
    }
}

pub(crate) fn uniform<P: Pod>(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<P>() as u64),
        },
        count: None,
    }
}

pub(crate) fn uniform_buffer<P: Pod>(
    device: &wgpu::Device,
    label: &str,
    params: &P,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(params),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// 单入口（`cs_main`）计算内核
#[derive(Clone)]
pub(crate) struct Kernel {
    label: &'static str,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl Kernel {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        source: &'static str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<Self, ComputeError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ComputeError::ShaderCompilation(format!("{label}: {error}")));
        }
        log::debug!("compiled kernel {label}");

        Ok(Self {
            label,
            pipeline,
            layout,
        })
    }

    pub fn bind(
        &self,
        device: &wgpu::Device,
        resources: &[(u32, wgpu::BindingResource<'_>)],
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = resources
            .iter()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: resource.clone(),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &entries,
        })
    }

    /// 按 16x16 工作组覆盖整个分辨率
    pub fn dispatch_2d(
        &self,
        pass: &mut wgpu::ComputePass<'_>,
        bind_group: &wgpu::BindGroup,
        resolution: Resolution,
    ) {
        if resolution.is_empty() {
            return;
        }
        let groups = compute_dispatch_size(resolution, WORKGROUP_SIZE);
        log::trace!("dispatch {} {:?}", self.label, groups);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }
}

/// 录制若干 2D 调度并提交，每个调度一个 compute pass
pub(crate) fn submit_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    passes: &[(&Kernel, &wgpu::BindGroup, Resolution)],
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(label),
    });
    for (kernel, bind_group, resolution) in passes {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.label),
            timestamp_writes: None,
        });
        kernel.dispatch_2d(&mut pass, bind_group, *resolution);
    }
    queue.submit(std::iter::once(encoder.finish()));
}
