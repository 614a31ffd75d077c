use glam::{Vec3, Vec4};
use grid_nano::vertex::ColoredPointVertex;
use grid_nano::{
    ChannelFormat, ChannelType, ColoredDepthMapToPointCloudGenerator,
    ColoredHeightMapToPointCloudGenerator, ComputeError, DepthMapIntrinsicParameters,
    DepthMapToPointCloudGenerator, FormatError, Grid, HeightMapOptions,
    HeightMapToPointCloudGenerator, ImageLayout, RawImage, Resolution,
};

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < 1e-5
}

#[test]
fn flat_height_map_spans_unit_square() {
    let heights = Grid::filled(Resolution::new(4, 4), 0.0f32);
    let options = HeightMapOptions {
        preserve_proportions: false,
        height_scale: 1.0,
    };
    let cloud = HeightMapToPointCloudGenerator::new(options)
        .generate(&heights)
        .unwrap();

    assert_eq!(cloud.data().len(), 16);
    for (i, p) in cloud.data().iter().enumerate() {
        let (x, y) = ((i % 4) as f32, (i / 4) as f32);
        assert!(approx(p.position, Vec3::new(x / 3.0, y / 3.0, 0.0)), "{i}: {p:?}");
        assert_eq!(p.size, 1.0);
    }
    assert_eq!(cloud.data()[0].position, Vec3::ZERO);
    assert!(approx(cloud.data()[15].position, Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn proportional_height_map_is_centered() {
    let heights = Grid::from_fn(Resolution::new(5, 3), |c| c.x as f32);
    let options = HeightMapOptions {
        preserve_proportions: true,
        height_scale: 0.5,
    };
    let cloud = heights.to_height_point_cloud(options);
    assert!(approx(cloud.at(0, 0).position, Vec3::new(-1.0, -0.5, 0.0)));
    assert!(approx(cloud.at(4, 2).position, Vec3::new(1.0, 0.5, 2.0)));
    assert!(approx(cloud.at(2, 1).position, Vec3::new(0.0, 0.0, 1.0)));
}

#[test]
fn point_order_mirrors_grid() {
    let resolution = Resolution::new(7, 5);
    let heights = Grid::from_fn(resolution, |c| (c.y * 7 + c.x) as f32);
    let cloud = heights.to_height_point_cloud(HeightMapOptions::default());
    assert_eq!(cloud.resolution(), resolution);
    for (i, p) in cloud.data().iter().enumerate() {
        assert_eq!(p.position.z, i as f32);
    }
}

#[test]
fn depth_unprojection_uses_intrinsics() {
    let intrinsics = DepthMapIntrinsicParameters {
        fx: 100.0,
        fy: 50.0,
        cx: 2.0,
        cy: 1.0,
        space_shift: Vec3::new(0.0, 0.0, 1.0),
    };
    let depth = Grid::filled(Resolution::new(4, 3), 2.0f32);
    let cloud = DepthMapToPointCloudGenerator::new(intrinsics)
        .generate(&depth)
        .unwrap();
    assert!(approx(cloud.at(2, 1).position, Vec3::new(0.0, 0.0, 3.0)));
    assert!(approx(cloud.at(0, 0).position, Vec3::new(-0.04, -0.04, 3.0)));
    assert!(approx(cloud.at(3, 2).position, Vec3::new(0.02, 0.04, 3.0)));
}

#[test]
fn colored_generators_reject_resolution_mismatch() {
    let depth = Grid::filled(Resolution::new(64, 64), 1.0f32);
    let colors = Grid::filled(Resolution::new(32, 32), Vec4::ONE);

    let err = ColoredDepthMapToPointCloudGenerator::new(DepthMapIntrinsicParameters::KINECT_V1)
        .generate(&depth, &colors)
        .unwrap_err();
    match err {
        ComputeError::ResolutionMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, Resolution::new(64, 64));
            assert_eq!(actual, Resolution::new(32, 32));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err_message_names_both(&depth, &colors));

    let err = ColoredHeightMapToPointCloudGenerator::default()
        .generate(&depth, &colors)
        .unwrap_err();
    assert!(matches!(err, ComputeError::ResolutionMismatch { .. }));
}

fn err_message_names_both(depth: &Grid<f32>, colors: &Grid<Vec4>) -> bool {
    let err = depth
        .to_colored_height_point_cloud(colors, HeightMapOptions::default())
        .unwrap_err()
        .to_string();
    err.contains("64x64") && err.contains("32x32")
}

#[test]
fn colored_point_cloud_copies_colors() {
    let resolution = Resolution::new(3, 2);
    let heights = Grid::filled(resolution, 0.25f32);
    let colors = Grid::from_fn(resolution, |c| Vec4::new(c.x as f32, c.y as f32, 0.0, 1.0));
    let cloud = heights
        .to_colored_height_point_cloud(&colors, HeightMapOptions::default())
        .unwrap();
    assert_eq!(cloud.at(2, 1).color, Vec4::new(2.0, 1.0, 0.0, 1.0));
    assert_eq!(cloud.at(2, 1).position.z, 0.25);
}

#[test]
fn populate_reuses_buffer_and_checks_resolution() {
    let generator = HeightMapToPointCloudGenerator::default();
    let mut cloud = generator
        .generate(&Grid::filled(Resolution::new(4, 4), 0.0))
        .unwrap();

    generator
        .populate(&mut cloud, &Grid::filled(Resolution::new(4, 4), 2.0))
        .unwrap();
    assert!(cloud.data().iter().all(|p| p.position.z == 2.0));

    let err = generator
        .populate(&mut cloud, &Grid::filled(Resolution::new(4, 5), 2.0))
        .unwrap_err();
    assert!(matches!(err, ComputeError::ResolutionMismatch { .. }));
    // 失败的调用不写入
    assert!(cloud.data().iter().all(|p| p.position.z == 2.0));
}

#[test]
fn sixteen_bit_height_map_is_decoded() {
    let resolution = Resolution::new(2, 2);
    let samples: [u16; 4] = [0, u16::MAX, 0, u16::MAX];
    let bytes = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
    let r16 = ImageLayout::resolve(ChannelFormat::R, ChannelType::Uint16).unwrap();
    let image = RawImage::new(resolution, r16, bytes).unwrap();

    let options = HeightMapOptions {
        preserve_proportions: false,
        height_scale: 2.0,
    };
    let generator = HeightMapToPointCloudGenerator::new(options)
        .with_layout(ChannelFormat::R, ChannelType::Uint16)
        .unwrap();
    let cloud = generator.generate_image(&image).unwrap();
    assert_eq!(cloud.at(0, 0).position, Vec3::new(0.0, 0.0, 0.0));
    assert_eq!(cloud.at(1, 0).position, Vec3::new(1.0, 0.0, 2.0));
    assert_eq!(cloud.at(1, 1).position, Vec3::new(1.0, 1.0, 2.0));

    let colors = Grid::filled(resolution, Vec4::ONE);
    let mut colored = Grid::filled(resolution, ColoredPointVertex::default());
    ColoredHeightMapToPointCloudGenerator::new(options)
        .with_layout(ChannelFormat::R, ChannelType::Uint16)
        .unwrap()
        .populate_image(&mut colored, &image, &colors)
        .unwrap();
    assert_eq!(colored.at(1, 0).position.z, 2.0);
}

#[test]
fn height_map_layout_is_enforced() {
    let resolution = Resolution::new(2, 1);
    let bytes: Vec<u8> = [0.25f32, 0.5].iter().flat_map(|v| v.to_le_bytes()).collect();
    let image = RawImage::new(resolution, ImageLayout::R32F, bytes).unwrap();

    // 默认 R/32F
    let cloud = HeightMapToPointCloudGenerator::default()
        .generate_image(&image)
        .unwrap();
    assert_eq!(cloud.at(1, 0).position.z, 0.5);

    let half_generator = HeightMapToPointCloudGenerator::default()
        .with_layout(ChannelFormat::R, ChannelType::Float16)
        .unwrap();
    let err = half_generator.generate_image(&image).unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Format(FormatError::Mismatch { .. })
    ));

    let colors = Grid::filled(resolution, Vec4::ONE);
    let err = ColoredHeightMapToPointCloudGenerator::default()
        .with_layout(ChannelFormat::Rgba, ChannelType::Uint16Int)
        .unwrap()
        .generate_image(&image, &colors)
        .unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Format(FormatError::Mismatch { .. })
    ));

    let err = HeightMapToPointCloudGenerator::default()
        .with_layout(ChannelFormat::Rg, ChannelType::Sint32Int)
        .unwrap_err();
    assert_eq!(
        err,
        FormatError::Unsupported(ChannelFormat::Rg, ChannelType::Sint32Int)
    );
    let err = ColoredHeightMapToPointCloudGenerator::default()
        .with_layout(ChannelFormat::Rgba, ChannelType::Uint32Int)
        .unwrap_err();
    assert_eq!(
        err,
        FormatError::Unsupported(ChannelFormat::Rgba, ChannelType::Uint32Int)
    );
}

#[test]
fn options_round_trip_through_json() {
    let options = HeightMapOptions {
        preserve_proportions: false,
        height_scale: 3.5,
    };
    let json = serde_json::to_string(&options).unwrap();
    assert_eq!(serde_json::from_str::<HeightMapOptions>(&json).unwrap(), options);

    let defaults: HeightMapOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, HeightMapOptions::default());

    let intrinsics = DepthMapIntrinsicParameters::KINECT_V1.with_space_shift(Vec3::Z);
    let json = serde_json::to_string(&intrinsics).unwrap();
    assert_eq!(
        serde_json::from_str::<DepthMapIntrinsicParameters>(&json).unwrap(),
        intrinsics
    );
}
