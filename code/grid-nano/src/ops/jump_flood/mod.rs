// ===============================================================================
// Jump flooding：最近种子传播
// ===============================================================================
//! N x N（N 为 2 的幂）画布上的经典 jump flooding：
//!
//! 1. 初始化：种子单元记录自身坐标，其他单元记录 [`NO_SEED`]
//! 2. 步长 s = N/2, N/4, ..., 1，每个单元检查自身与 8 个 ±s 偏移邻居，
//!    仅当邻居记录的种子严格更近时才采用（距离相等保留原值）
//! 3. 解码：最近种子坐标 -> 方向向量 + 距离
//!
//! 每一步都完整读取上一步结果并写入另一块缓冲区（ping-pong），步与步之间不可融合。

mod directional_field;
pub mod gpu;

pub use directional_field::{CanvasAnchor, DirectionalField, DirectionalFieldConfig};

use crate::error::ComputeError;
use crate::gpu::GpuElement;
use crate::grid::{Grid, Mask};
use crate::ops::for_each_cell;
use crate::resolution::Resolution;
use bytemuck::{Pod, Zeroable};
use glam::{IVec2, UVec2, Vec2};

/// “尚未找到种子”的哨兵坐标
pub const NO_SEED: IVec2 = IVec2::new(-1, -1);

/// 固定的邻居检查顺序，同距离时先检查到的生效（自身最先）
const OFFSETS: [IVec2; 9] = [
    IVec2::new(0, 0),
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// N/2, N/4, ..., 1
pub fn jump_steps(canvas: u32) -> impl Iterator<Item = u32> {
    std::iter::successors(Some(canvas / 2), |&s| Some(s / 2)).take_while(|&s| s > 0)
}

pub(crate) fn require_power_of_two(canvas: u32) -> Result<(), ComputeError> {
    if canvas == 0 || !canvas.is_power_of_two() {
        return Err(ComputeError::NotPowerOfTwo(canvas));
    }
    Ok(())
}

#[inline]
fn distance_squared(a: IVec2, b: IVec2) -> i64 {
    let d = (a - b).as_i64vec2();
    d.dot(d)
}

// ===============================================================================
// JumpFlooder
// ===============================================================================

/// CPU 端 jump flooder，拥有两块 N x N 的 ping-pong 缓冲区
#[derive(Debug, Clone)]
pub struct JumpFlooder {
    canvas: u32,
    front: Grid<IVec2>,
    back: Grid<IVec2>,
}

impl JumpFlooder {
    pub fn new(canvas: u32) -> Result<Self, ComputeError> {
        require_power_of_two(canvas)?;
        let resolution = Resolution::new(canvas, canvas);
        log::debug!("allocating jump flood buffers {}", resolution.spec());
        Ok(Self {
            canvas,
            front: Grid::filled(resolution, NO_SEED),
            back: Grid::filled(resolution, NO_SEED),
        })
    }

    pub fn canvas(&self) -> u32 {
        self.canvas
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.canvas, self.canvas)
    }

    /// 非零即种子；返回种子数量
    pub fn seed(&mut self, mask: &Mask) -> Result<usize, ComputeError> {
        self.resolution()
            .require_match(mask.resolution(), "jumpFlooder", "mask")?;
        for_each_cell(self.resolution(), self.front.data_mut(), 1, |x, y, out| {
            out[0] = if mask.at(x, y) != 0.0 {
                IVec2::new(x as i32, y as i32)
            } else {
                NO_SEED
            };
        });
        Ok(self.front.data().iter().filter(|&&s| s != NO_SEED).count())
    }

    /// 单步传播：front -> back，然后交换
    pub fn step(&mut self, step: u32) {
        let canvas = self.canvas as i32;
        let step = step as i32;
        let src = &self.front;
        for_each_cell(self.resolution(), self.back.data_mut(), 1, |x, y, out| {
            let cell = IVec2::new(x as i32, y as i32);
            let mut best = src.at(x, y);
            let mut best_d = if best == NO_SEED {
                i64::MAX
            } else {
                distance_squared(best, cell)
            };
            for offset in OFFSETS {
                let q = cell + offset * step;
                if q.x < 0 || q.y < 0 || q.x >= canvas || q.y >= canvas {
                    continue;
                }
                let candidate = src.at(q.x as u32, q.y as u32);
                if candidate == NO_SEED {
                    continue;
                }
                let d = distance_squared(candidate, cell);
                if d < best_d {
                    best = candidate;
                    best_d = d;
                }
            }
            out[0] = best;
        });
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// 依次执行全部步长
    pub fn flood(&mut self) -> &Grid<IVec2> {
        for s in jump_steps(self.canvas) {
            log::trace!("jump flood step {s}");
            self.step(s);
        }
        &self.front
    }

    pub fn jump_flood(&mut self, mask: &Mask) -> Result<&Grid<IVec2>, ComputeError> {
        if self.seed(mask)? == 0 {
            log::warn!("jump flood mask has no seed, field stays empty");
        }
        Ok(self.flood())
    }

    /// 当前结果（最近种子坐标）
    pub fn result(&self) -> &Grid<IVec2> {
        &self.front
    }
}

// ===============================================================================
// 解码
// ===============================================================================

/// 解码后的方向场单元
/// offset 指向最近种子（已乘距离缩放），inside 标记单元是否在阈值化前景内
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FieldTexel {
    pub offset: Vec2,
    pub distance: f32,
    pub inside: u32,
}

impl FieldTexel {
    pub fn is_inside(&self) -> bool {
        self.inside != 0
    }
}

impl GpuElement for FieldTexel {
    const WGSL_TYPE: &'static str = "FieldTexel";
}

#[inline]
fn decode_texel(seed: IVec2, cell: IVec2, inside: f32, distance_scale: f32) -> FieldTexel {
    // 哨兵不参与缩放，直接输出零向量
    let offset = if seed == NO_SEED {
        Vec2::ZERO
    } else {
        (seed - cell).as_vec2() * distance_scale
    };
    FieldTexel {
        offset,
        distance: offset.length(),
        inside: (inside > 0.0) as u32,
    }
}

/// 从画布 `origin` 处取出与 `out` 同尺寸的窗口并解码
pub(crate) fn decode_window(
    field: &Grid<IVec2>,
    inside: &Mask,
    distance_scale: f32,
    origin: UVec2,
    out: &mut Grid<FieldTexel>,
) {
    let resolution = out.resolution();
    for_each_cell(resolution, out.data_mut(), 1, |x, y, texel| {
        let (cx, cy) = (x + origin.x, y + origin.y);
        let cell = IVec2::new(cx as i32, cy as i32);
        texel[0] = decode_texel(field.at(cx, cy), cell, inside.at(cx, cy), distance_scale);
    });
}

/// 最近种子坐标 -> 方向/距离
pub fn decode(
    field: &Grid<IVec2>,
    inside: &Mask,
    distance_scale: f32,
) -> Result<Grid<FieldTexel>, ComputeError> {
    field
        .resolution()
        .require_match(inside.resolution(), "field", "insideMask")?;
    let mut out = Grid::filled(field.resolution(), FieldTexel::default());
    decode_window(field, inside, distance_scale, UVec2::ZERO, &mut out);
    Ok(out)
}

// ===============================================================================
// 预处理滤镜
// ===============================================================================

/// 亮度 > threshold -> 1，否则 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub threshold: f32,
}

impl Default for Threshold {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Threshold {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn apply(&self, source: &Grid<f32>, target: &mut Mask) -> Result<(), ComputeError> {
        source
            .resolution()
            .require_match(target.resolution(), "source", "target")?;
        self.apply_at(source, UVec2::ZERO, target)
    }

    /// 把 source 放在 target 的 `origin` 处阈值化，窗口外填 0
    pub fn apply_at(
        &self,
        source: &Grid<f32>,
        origin: UVec2,
        target: &mut Mask,
    ) -> Result<(), ComputeError> {
        let end = origin + source.resolution().as_uvec2();
        if end.x > target.width() || end.y > target.height() {
            return Err(ComputeError::InvalidResolution(format!(
                "{} at {origin} exceeds {}",
                source.resolution().spec(),
                target.resolution().spec()
            )));
        }
        let threshold = self.threshold;
        for_each_cell(target.resolution(), target.data_mut(), 1, |x, y, out| {
            let inside = x >= origin.x && y >= origin.y && x < end.x && y < end.y;
            out[0] = if inside && source.at(x - origin.x, y - origin.y) > threshold {
                1.0
            } else {
                0.0
            };
        });
        Ok(())
    }
}

/// 前景中至少有一个 8 邻域背景邻居的单元；画布外视为背景
#[derive(Debug, Clone, Copy, Default)]
pub struct ContourPoints;

impl ContourPoints {
    pub fn apply(&self, source: &Mask, target: &mut Mask) -> Result<(), ComputeError> {
        let resolution = source.resolution();
        resolution.require_match(target.resolution(), "source", "target")?;
        let (w, h) = (resolution.width as i32, resolution.height as i32);
        for_each_cell(resolution, target.data_mut(), 1, |x, y, out| {
            if source.at(x, y) == 0.0 {
                out[0] = 0.0;
                return;
            }
            let cell = IVec2::new(x as i32, y as i32);
            let edge = OFFSETS[1..].iter().any(|&o| {
                let q = cell + o;
                let outside = q.x < 0 || q.y < 0 || q.x >= w || q.y >= h;
                outside || source.at(q.x as u32, q.y as u32) == 0.0
            });
            out[0] = if edge { 1.0 } else { 0.0 };
        });
        Ok(())
    }
}
