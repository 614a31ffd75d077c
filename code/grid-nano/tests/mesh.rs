use glam::{Vec3, Vec4};
use grid_nano::ops::mesh::{Mesh, mesh_vertex_count};
use grid_nano::vertex::{ColoredPointVertex, PointVertex};
use grid_nano::{
    Colored, ComputeError, Grid, HeightMapOptions, Plain, PointCloudToMeshGenerator, Resolution,
};

fn flat_cloud(width: u32, height: u32) -> Grid<PointVertex> {
    let options = HeightMapOptions {
        preserve_proportions: false,
        height_scale: 1.0,
    };
    Grid::filled(Resolution::new(width, height), 0.0f32).to_height_point_cloud(options)
}

#[test]
fn vertex_count_is_six_per_interior_cell() {
    for w in 1..7 {
        for h in 1..7 {
            let mesh = flat_cloud(w, h).to_mesh();
            let expected = (w as usize).saturating_sub(1) * (h as usize).saturating_sub(1) * 6;
            assert_eq!(mesh.len(), expected, "{w}x{h}");
            assert_eq!(mesh_vertex_count(Resolution::new(w, h)), expected);
        }
    }
}

#[test]
fn cell_triangles_cover_the_quad() {
    let cloud = Grid::from_fn(Resolution::new(3, 3), |c| {
        PointVertex::new(Vec3::new(c.x as f32, c.y as f32, 0.0), 1.0)
    });
    let mesh = cloud.to_mesh();

    let cell = mesh.cell(1, 1);
    let positions: Vec<Vec3> = cell.iter().map(|v| v.position).collect();
    assert_eq!(
        positions,
        vec![
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
        ]
    );
    // 单元 (1, 1) 的槽位从 ((1 * 2) + 1) * 6 开始
    assert_eq!(&mesh.vertices()[18..24], cell);
}

#[test]
fn flat_mesh_normals_face_positive_z() {
    let mesh = flat_cloud(5, 4).to_mesh();
    for v in mesh.vertices() {
        assert!((v.normal - Vec3::Z).length() < 1e-6, "{v:?}");
        assert_eq!(v.weight, 1.0);
    }
}

#[test]
fn normals_follow_the_slope() {
    // z = x 的斜面，法线为 (-1, 0, 1) / sqrt(2)
    let cloud = Grid::from_fn(Resolution::new(3, 2), |c| {
        PointVertex::new(Vec3::new(c.x as f32, c.y as f32, c.x as f32), 1.0)
    });
    let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
    for triangle in cloud.to_mesh().triangles() {
        for v in triangle {
            assert!((v.normal - expected).length() < 1e-6);
        }
    }
}

#[test]
fn holes_zero_the_weight_of_touching_cells() {
    let mut cloud = flat_cloud(3, 3);
    // (2, 2) 是空洞，只影响单元 (1, 1)
    cloud.data_mut()[8].size = 0.0;
    let mesh = cloud.to_mesh();
    assert!(mesh.cell(0, 0).iter().all(|v| v.weight == 1.0));
    assert!(mesh.cell(1, 0).iter().all(|v| v.weight == 1.0));
    assert!(mesh.cell(1, 1).iter().all(|v| v.weight == 0.0));
}

#[test]
fn degenerate_quads_produce_zero_normals() {
    let cloud = Grid::filled(Resolution::new(2, 2), PointVertex::new(Vec3::ONE, 1.0));
    let mesh = cloud.to_mesh();
    assert!(mesh.vertices().iter().all(|v| v.normal == Vec3::ZERO));
}

#[test]
fn colored_mesh_copies_point_colors() {
    let cloud = Grid::from_fn(Resolution::new(2, 2), |c| {
        let color = Vec4::new(c.x as f32, c.y as f32, 0.5, 1.0);
        ColoredPointVertex::new(Vec3::new(c.x as f32, c.y as f32, 0.0), 1.0, color)
    });
    let mesh = cloud.to_mesh();
    for v in mesh.vertices() {
        assert_eq!(v.color.truncate().truncate(), v.position.truncate());
    }
}

#[test]
fn populate_rejects_mesh_of_other_resolution() {
    let generator = PointCloudToMeshGenerator::<Plain>::new();
    let mut mesh = Mesh::for_resolution(Resolution::new(4, 4));
    generator.populate(&flat_cloud(4, 4), &mut mesh).unwrap();

    let err = generator
        .populate(&flat_cloud(5, 4), &mut mesh)
        .unwrap_err();
    assert!(matches!(err, ComputeError::ResolutionMismatch { .. }));

    let colored = PointCloudToMeshGenerator::<Colored>::new();
    let cloud = Grid::filled(Resolution::new(3, 3), ColoredPointVertex::default());
    assert_eq!(colored.generate(&cloud).len(), 24);
}
