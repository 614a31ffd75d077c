// ===============================================================================
// 深度相机接口
// ===============================================================================

use crate::flip::FlipFlags;
use crate::frame_slot::{Frame, FrameConsumer, FrameProducer, FrameSlot};
use crate::measurement::DepthMeasurement;
use grid_nano::Resolution;

/// 任意深度相机的通用接口
pub trait DepthCamera {
    /// 当前工作分辨率
    fn resolution(&self) -> Resolution;

    /// 深度图中采样值的含义
    fn measurement(&self) -> DepthMeasurement;

    fn set_measurement(&mut self, measurement: DepthMeasurement);

    fn flips(&self) -> FlipFlags;

    fn set_flips(&mut self, flips: FlipFlags);

    /// 自上次调用以来收到的最新原始帧
    fn latest_frame(&mut self) -> Option<&Frame>;
}

/// 由 [`FrameProducer`] 喂帧的相机，驱动回调只需持有生产端
#[derive(Debug)]
pub struct SlotDepthCamera {
    consumer: FrameConsumer,
    measurement: DepthMeasurement,
    flips: FlipFlags,
}

impl SlotDepthCamera {
    pub fn new(resolution: Resolution) -> (Self, FrameProducer) {
        let (producer, consumer) = FrameSlot::new(resolution).split();
        let camera = Self {
            consumer,
            measurement: DepthMeasurement::default(),
            flips: FlipFlags::empty(),
        };
        (camera, producer)
    }

    /// Kinect v1 深度流 640 x 480
    pub fn kinect_v1() -> (Self, FrameProducer) {
        Self::new(Resolution::new(640, 480))
    }

    pub fn skipped_frames(&self) -> u64 {
        self.consumer.skipped()
    }
}

impl DepthCamera for SlotDepthCamera {
    fn resolution(&self) -> Resolution {
        self.consumer.resolution()
    }

    fn measurement(&self) -> DepthMeasurement {
        self.measurement
    }

    fn set_measurement(&mut self, measurement: DepthMeasurement) {
        self.measurement = measurement;
    }

    fn flips(&self) -> FlipFlags {
        self.flips
    }

    fn set_flips(&mut self, flips: FlipFlags) {
        self.flips = flips;
    }

    fn latest_frame(&mut self) -> Option<&Frame> {
        self.consumer.take_latest()
    }
}
