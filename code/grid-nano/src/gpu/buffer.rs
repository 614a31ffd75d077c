use super::GpuContext;
use super::elem::{GpuElement, padded_size};
use crate::error::ComputeError;
use crate::grid::Grid;
use crate::resolution::Resolution;
use std::marker::PhantomData;
use std::sync::mpsc;
use wgpu::util::DeviceExt;

/// 带元素类型的 storage buffer
/// 底层 wgpu::Buffer 至少容纳一个元素（wgpu 不允许绑定空缓冲区）
pub struct GpuBuffer<T: GpuElement> {
    buffer: wgpu::Buffer,
    len: usize,
    _phantom: PhantomData<T>,
}

const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::COPY_SRC)
    .union(wgpu::BufferUsages::COPY_DST);

impl<T: GpuElement> GpuBuffer<T> {
    /// 上传 CPU 数据
    pub fn upload(ctx: &GpuContext, label: &str, data: &[T]) -> Self {
        if data.is_empty() {
            return Self::zeroed(ctx, label, 0);
        }
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: USAGE,
            });
        Self {
            buffer,
            len: data.len(),
            _phantom: PhantomData,
        }
    }

    /// 分配 len 个元素，内容由 wgpu 置零
    pub fn zeroed(ctx: &GpuContext, label: &str, len: usize) -> Self {
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_size::<T>(len),
            usage: USAGE,
            mapped_at_creation: false,
        });
        log::debug!("allocated {label}: {len} x {}", T::WGSL_TYPE);
        Self {
            buffer,
            len,
            _phantom: PhantomData,
        }
    }

    /// 覆盖写入（长度必须一致）
    pub fn write(&self, ctx: &GpuContext, data: &[T]) -> Result<(), ComputeError> {
        if data.len() != self.len {
            return Err(ComputeError::Execution(format!(
                "write of {} elements into buffer of {}",
                data.len(),
                self.len
            )));
        }
        if !data.is_empty() {
            ctx.queue
                .write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// 拷贝到 staging buffer 并阻塞读回
    pub fn read_blocking(&self, ctx: &GpuContext) -> Result<Vec<T>, ComputeError> {
        if self.len == 0 {
            return Ok(Vec::new());
        }
        let size = (self.len * T::STRIDE_SIZE) as u64;
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.wait_idle();

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("Buffer map failed: {:?}", e);
                return Err(ComputeError::Readback(e.to_string()));
            }
            Err(_) => {
                log::error!("Buffer map channel disconnected - possible device lost");
                return Err(ComputeError::Readback("channel disconnected".to_string()));
            }
        }

        // 映射区只保证 8 字节对齐，含 vec4 的元素需要拷贝而不是直接 cast
        let data = slice.get_mapped_range();
        let mut result = vec![T::zeroed(); self.len];
        bytemuck::cast_slice_mut::<T, u8>(&mut result).copy_from_slice(&data);
        drop(data);
        staging.unmap();
        Ok(result)
    }
}

/// GPU 端的网格：分辨率 + 行优先 storage buffer
pub struct GpuGrid<T: GpuElement> {
    resolution: Resolution,
    data: GpuBuffer<T>,
}

impl<T: GpuElement> GpuGrid<T> {
    pub fn upload(ctx: &GpuContext, label: &str, grid: &Grid<T>) -> Self {
        Self {
            resolution: grid.resolution(),
            data: GpuBuffer::upload(ctx, label, grid.data()),
        }
    }

    pub fn zeroed(ctx: &GpuContext, label: &str, resolution: Resolution) -> Self {
        Self {
            resolution,
            data: GpuBuffer::zeroed(ctx, label, resolution.len()),
        }
    }

    /// 连续流场景：同分辨率帧直接覆盖
    pub fn write(&self, ctx: &GpuContext, grid: &Grid<T>) -> Result<(), ComputeError> {
        self.resolution
            .require_match(grid.resolution(), "gpuGrid", "grid")?;
        self.data.write(ctx, grid.data())
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn buffer(&self) -> &GpuBuffer<T> {
        &self.data
    }

    pub fn read_blocking(&self, ctx: &GpuContext) -> Result<Grid<T>, ComputeError> {
        Grid::from_vec(self.resolution, self.data.read_blocking(ctx)?)
    }
}
