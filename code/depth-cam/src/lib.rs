//! 深度相机接入：原始帧交接、深度换算、翻转、裁剪与空间变换，
//! 以及每帧把深度图展开成点云和网格的 [`SpaceRenderer`]。
//!
//! 设备驱动不在本 crate 内，驱动回调通过 [`FrameProducer`] 推送原始帧。

mod error;

pub mod camera;
pub mod flip;
pub mod frame_slot;
pub mod measurement;
pub mod space_renderer;

pub use camera::{DepthCamera, SlotDepthCamera};
pub use error::CameraError;
pub use flip::FlipFlags;
pub use frame_slot::{Frame, FrameConsumer, FrameProducer, FrameSlot};
pub use measurement::{
    DepthMapper, DepthMeasurement, DepthRange, KINECT_V1_MAX_RAW, raw_to_meters,
};
pub use space_renderer::{ClipBox, SpaceRenderer, SpaceRendererConfig};
