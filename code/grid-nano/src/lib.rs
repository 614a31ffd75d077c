mod error;
pub mod gpu;
pub mod grid;
pub mod ops;
pub mod resolution;
pub mod vertex;

pub use error::{ComputeError, FormatError};
pub use grid::{
    ChannelFormat, ChannelType, ColorMap, DepthMap, Grid, HeightMap, ImageLayout, Mask, RawImage,
};
pub use ops::jump_flood::{
    CanvasAnchor, ContourPoints, DirectionalField, DirectionalFieldConfig, FieldTexel,
    JumpFlooder, Threshold,
};
pub use ops::mesh::{Mesh, PointCloudToMeshGenerator};
pub use ops::point_cloud::{
    ColoredDepthMapToPointCloudGenerator, ColoredHeightMapToPointCloudGenerator,
    DepthMapIntrinsicParameters, DepthMapToPointCloudGenerator, HeightMapOptions,
    HeightMapToPointCloudGenerator, PointCloud,
};
pub use ops::wireframe::{PointCloudToWireframeGenerator, Wireframe};
pub use resolution::{Resolution, WORKGROUP_SIZE, compute_dispatch_size, power_of_two_canvas};
pub use vertex::{Colored, Plain, PointLayout};
