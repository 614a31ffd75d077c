// ===============================================================================
// GPU 上下文
// ===============================================================================

mod buffer;
pub mod elem;
pub(crate) mod kernel;

pub use buffer::{GpuBuffer, GpuGrid};
pub use elem::GpuElement;

use crate::error::ComputeError;
use std::sync::Arc;

/// wgpu 设备与队列句柄
/// 所有 GPU 生成器共享同一个上下文，命令在调用线程上同步提交
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// 复用宿主程序已有的设备
    pub fn from_parts(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// 请求一个无窗口（headless）适配器并创建设备
    pub async fn new() -> Result<Self, ComputeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ComputeError::AdapterUnavailable(e.to_string()))?;

        log::info!("Using GPU: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("grid_nano_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ComputeError::AdapterUnavailable(e.to_string()))?;

        Ok(Self::from_parts(Arc::new(device), Arc::new(queue)))
    }

    pub fn new_blocking() -> Result<Self, ComputeError> {
        pollster::block_on(Self::new())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// 阻塞直到已提交的命令全部完成
    pub fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::MaintainBase::Wait);
    }
}
