// ===============================================================================
// 有组织点云 -> 线框
// ===============================================================================
//! 线段列表（line list），每条线段 2 个顶点：
//!
//! - 先是水平线段 `(x, y)-(x+1, y)`，共 (W-1)*H 条，编号 `y*(W-1) + x`
//! - 再是竖直线段 `(x, y)-(x, y+1)`，共 W*(H-1) 条，编号 `(W-1)*H + y*W + x`
//!
//! 最后一列没有向右的线段，最后一行没有向下的线段，不存在对角线。

pub mod gpu;

use std::marker::PhantomData;

use crate::error::ComputeError;
use crate::ops::for_each_cell;
use crate::ops::point_cloud::PointCloud;
use crate::resolution::Resolution;
use crate::vertex::{
    Colored, ColoredLineVertex, ColoredPointVertex, LineVertex, Plain, PointLayout, PointVertex,
};

pub const VERTICES_PER_SEGMENT: usize = 2;

/// 拥有向右线段的单元 (W-1) x H
pub fn horizontal_segments(resolution: Resolution) -> Resolution {
    Resolution::new(resolution.width.saturating_sub(1), resolution.height)
}

/// 拥有向下线段的单元 W x (H-1)
pub fn vertical_segments(resolution: Resolution) -> Resolution {
    Resolution::new(resolution.width, resolution.height.saturating_sub(1))
}

/// 线段总数 W(H-1) + (W-1)H
pub fn wireframe_segment_count(resolution: Resolution) -> usize {
    horizontal_segments(resolution).len() + vertical_segments(resolution).len()
}

pub fn wireframe_vertex_count(resolution: Resolution) -> usize {
    wireframe_segment_count(resolution) * VERTICES_PER_SEGMENT
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wireframe<V> {
    resolution: Resolution,
    vertices: Vec<V>,
}

impl<V: Default + Clone> Wireframe<V> {
    pub fn for_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            vertices: vec![V::default(); wireframe_vertex_count(resolution)],
        }
    }
}

impl<V> Wireframe<V> {
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<V> {
        self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &[V]> {
        self.vertices.chunks_exact(VERTICES_PER_SEGMENT)
    }
}

fn connect<L: PointLayout>(cloud: &PointCloud<L::Point>, out: &mut [L::LineVertex]) {
    let resolution = cloud.resolution();
    let horizontal = horizontal_segments(resolution);
    let (right, down) = out.split_at_mut(horizontal.len() * VERTICES_PER_SEGMENT);

    for_each_cell(horizontal, right, VERTICES_PER_SEGMENT, |x, y, slot| {
        slot[0] = L::line_vertex(&cloud.at(x, y));
        slot[1] = L::line_vertex(&cloud.at(x + 1, y));
    });
    for_each_cell(
        vertical_segments(resolution),
        down,
        VERTICES_PER_SEGMENT,
        |x, y, slot| {
            slot[0] = L::line_vertex(&cloud.at(x, y));
            slot[1] = L::line_vertex(&cloud.at(x, y + 1));
        },
    );
}

/// 点云 -> 线框，颜色变体把每个点的颜色复制到线段两端
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCloudToWireframeGenerator<L: PointLayout> {
    _layout: PhantomData<L>,
}

impl<L: PointLayout> PointCloudToWireframeGenerator<L> {
    pub fn new() -> Self {
        Self {
            _layout: PhantomData,
        }
    }

    pub fn populate(
        &self,
        cloud: &PointCloud<L::Point>,
        wireframe: &mut Wireframe<L::LineVertex>,
    ) -> Result<(), ComputeError> {
        cloud
            .resolution()
            .require_match(wireframe.resolution, "pointCloud", "wireframe")?;
        connect::<L>(cloud, &mut wireframe.vertices);
        Ok(())
    }

    pub fn generate(&self, cloud: &PointCloud<L::Point>) -> Wireframe<L::LineVertex> {
        let mut wireframe = Wireframe::for_resolution(cloud.resolution());
        connect::<L>(cloud, &mut wireframe.vertices);
        wireframe
    }
}

impl PointCloud<PointVertex> {
    pub fn to_wireframe(&self) -> Wireframe<LineVertex> {
        PointCloudToWireframeGenerator::<Plain>::new().generate(self)
    }
}

impl PointCloud<ColoredPointVertex> {
    pub fn to_wireframe(&self) -> Wireframe<ColoredLineVertex> {
        PointCloudToWireframeGenerator::<Colored>::new().generate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_count_links_right_and_bottom_neighbours() {
        assert_eq!(wireframe_segment_count(Resolution::new(1, 1)), 0);
        assert_eq!(wireframe_segment_count(Resolution::new(2, 1)), 1);
        assert_eq!(wireframe_segment_count(Resolution::new(1, 3)), 2);
        assert_eq!(wireframe_segment_count(Resolution::new(3, 2)), 3 + 4);
        assert_eq!(wireframe_vertex_count(Resolution::new(4, 4)), 24 * 2);
    }
}
