// ===============================================================================
// 单生产者 / 单消费者的最新帧交接
// ===============================================================================
//! 驱动线程把原始帧写进自己的后台缓冲区，再通过 [`FrameProducer::publish`]
//! 与共享槽交换；渲染线程用 [`FrameConsumer::take_latest`] 取走最新一帧。
//!
//! 消费者来不及取走的帧会被下一帧覆盖（最新帧优先），
//! 序号不连续时可以通过 [`FrameConsumer::skipped`] 得知丢了多少帧。
//! 双缓冲：发布时后台缓冲区与共享槽互换，取帧时共享槽与消费端的前台缓冲区互换，
//! 稳定运行时不再分配内存。

use std::sync::Arc;

use crate::error::CameraError;
use grid_nano::{Grid, Resolution};
use parking_lot::Mutex;

/// 一帧原始深度数据
/// 序号从 1 开始，0 表示尚未发布过
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    sequence: u64,
    samples: Grid<u16>,
}

impl Frame {
    fn blank(resolution: Resolution) -> Self {
        Self {
            sequence: 0,
            samples: Grid::filled(resolution, 0),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn resolution(&self) -> Resolution {
        self.samples.resolution()
    }

    pub fn samples(&self) -> &Grid<u16> {
        &self.samples
    }
}

#[derive(Debug)]
struct Shared {
    frame: Frame,
    /// 共享槽中的帧尚未被消费
    fresh: bool,
}

/// 帧交接槽，[`FrameSlot::split`] 之后分别交给驱动线程和渲染线程
#[derive(Debug)]
pub struct FrameSlot {
    resolution: Resolution,
}

impl FrameSlot {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn split(self) -> (FrameProducer, FrameConsumer) {
        log::debug!("allocating frame slot {}", self.resolution.spec());
        let shared = Arc::new(Mutex::new(Shared {
            frame: Frame::blank(self.resolution),
            fresh: false,
        }));
        let producer = FrameProducer {
            shared: Arc::clone(&shared),
            back: Frame::blank(self.resolution),
            sequence: 0,
        };
        let consumer = FrameConsumer {
            shared,
            front: Frame::blank(self.resolution),
            skipped: 0,
        };
        (producer, consumer)
    }
}

/// 生产端，可以移动到驱动回调线程
#[derive(Debug)]
pub struct FrameProducer {
    shared: Arc<Mutex<Shared>>,
    back: Frame,
    sequence: u64,
}

impl FrameProducer {
    pub fn resolution(&self) -> Resolution {
        self.back.resolution()
    }

    /// 后台缓冲区，写完后调用 [`publish`](Self::publish)
    pub fn back_buffer(&mut self) -> &mut [u16] {
        self.back.samples.data_mut()
    }

    /// 发布后台缓冲区，返回该帧序号
    pub fn publish(&mut self) -> u64 {
        self.sequence += 1;
        self.back.sequence = self.sequence;
        let mut shared = self.shared.lock();
        std::mem::swap(&mut shared.frame, &mut self.back);
        if shared.fresh {
            log::trace!("frame {} overwritten before consumption", self.back.sequence);
        }
        shared.fresh = true;
        self.sequence
    }

    /// 拷贝一整帧并发布
    pub fn write(&mut self, samples: &[u16]) -> Result<u64, CameraError> {
        let resolution = self.resolution();
        if samples.len() != resolution.len() {
            return Err(CameraError::FrameLength {
                resolution,
                expected: resolution.len(),
                actual: samples.len(),
            });
        }
        self.back_buffer().copy_from_slice(samples);
        Ok(self.publish())
    }
}

/// 消费端，由渲染循环持有
#[derive(Debug)]
pub struct FrameConsumer {
    shared: Arc<Mutex<Shared>>,
    front: Frame,
    skipped: u64,
}

impl FrameConsumer {
    pub fn resolution(&self) -> Resolution {
        self.front.resolution()
    }

    /// 取走最新发布的帧；自上次调用以来没有新帧时返回 None
    pub fn take_latest(&mut self) -> Option<&Frame> {
        let last = self.front.sequence;
        {
            let mut shared = self.shared.lock();
            if !shared.fresh {
                return None;
            }
            std::mem::swap(&mut shared.frame, &mut self.front);
            shared.fresh = false;
        }
        let gap = self.front.sequence - last - 1;
        if gap > 0 {
            log::debug!("skipped {gap} depth frame(s) before {}", self.front.sequence);
            self.skipped += gap;
        }
        Some(&self.front)
    }

    /// 最近一次取走的帧，尚未取过时为 None
    pub fn current(&self) -> Option<&Frame> {
        (self.front.sequence > 0).then_some(&self.front)
    }

    /// 累计被覆盖、从未被消费的帧数
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// 生产端是否已被丢弃
    pub fn is_disconnected(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}
