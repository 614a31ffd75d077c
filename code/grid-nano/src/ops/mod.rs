// ===============================================================================
// 网格变换算子
// ===============================================================================
//! 每个算子都有 CPU（rayon）与 GPU（wgpu）两种实现，语义逐字节一致：
//! 每个网格单元只读取固定偏移的邻居，只写入自己的输出槽位

pub mod jump_flood;
pub mod mesh;
pub mod point_cloud;
pub mod wireframe;

use crate::resolution::Resolution;
use rayon::prelude::*;

/// 按单元并行写入输出：单元 (x, y) 独占 `out[i*stride .. (i+1)*stride]`
pub(crate) fn for_each_cell<T, F>(resolution: Resolution, out: &mut [T], stride: usize, kernel: F)
where
    T: Send,
    F: Fn(u32, u32, &mut [T]) + Sync,
{
    if resolution.is_empty() || stride == 0 {
        return;
    }
    debug_assert_eq!(out.len(), resolution.len() * stride);
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(i, slot)| {
            let cell = resolution.cell(i);
            kernel(cell.x, cell.y, slot);
        });
}
