//! Integration tests: adaptive sliding marching cubes
//!
//! Watertightness, geometric accuracy, detail scaling and the split mode.

mod common;

use approx::assert_relative_eq;
use blobtree::kernel::point_kernel_inverse;
use blobtree::prelude::*;
use common::*;
use glam::{DVec3, Vec3};

// ============================================================================
// Single point
// ============================================================================

#[test]
fn point_polygonizes_to_closed_sphere() {
    init_logging();
    let (mut tree, _) = single_point(0.5, 1.0);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();

    assert!(mesh.triangle_count() > 100, "got {} triangles", mesh.triangle_count());
    let topology = mesh.topology();
    assert!(topology.is_closed(), "{}", topology);
    assert!(topology.is_consistently_oriented(), "{}", topology);
    assert_eq!(topology.euler_characteristic(), 2);
    assert_eq!(topology.components, 1);
}

#[test]
fn sphere_vertices_lie_on_iso_surface() {
    let (mut tree, _) = single_point(0.5, 1.0);
    let radius = point_kernel_inverse(0.5, 1.0).unwrap();
    assert_relative_eq!(radius, 1.2724, epsilon = 1e-3);

    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    let distances = vertex_distances(&mesh, Vec3::ZERO);
    assert_relative_eq!(mean(&distances), radius, epsilon = 0.01);
    let within = distances.iter().filter(|&&d| (d - radius).abs() < 0.02).count();
    assert!(within * 10 >= distances.len() * 9, "{} of {}", within, distances.len());
    assert!(distances.iter().all(|&d| (d - radius).abs() < 0.3));
}

#[test]
fn sphere_is_wound_outward_with_outward_normals() {
    let (mut tree, _) = single_point(0.5, 1.0);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    let radius = point_kernel_inverse(0.5, 1.0).unwrap();
    let expected = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    let volume = signed_volume(&mesh);
    assert!(volume > 0.0);
    assert_relative_eq!(volume, expected, max_relative = 0.1);

    let outward = mesh
        .vertices
        .iter()
        .filter(|v| v.normal.dot(v.position.normalize()) > 0.9)
        .count();
    assert!(outward * 10 >= mesh.vertex_count() * 9);
}

#[test]
fn finer_detail_gives_more_vertices() {
    let mut counts = Vec::new();
    for detail in [1.0, 0.7, 0.5] {
        let (mut tree, _) = single_point(0.5, 1.0);
        let config = PolygonizerConfig::default().with_detail_ratio(detail);
        let mesh = polygonize(&mut tree, &config).unwrap();
        assert!(mesh.is_closed(), "detail {}", detail);
        counts.push(mesh.vertex_count());
    }
    assert!(counts[0] < counts[1] && counts[1] < counts[2], "{:?}", counts);
}

#[test]
fn uninterpolated_vertices_without_convergence() {
    let (mut tree, _) = single_point(0.5, 1.0);
    let config = PolygonizerConfig::default().with_convergence(None);
    let mut smc = SlidingMarchingCubes::new(&mut tree, config);
    let mesh = smc.run().unwrap();
    assert_eq!(smc.stats().refined, 0);
    assert!(mesh.is_closed());

    let (mut tree, _) = single_point(0.5, 1.0);
    let mut smc = SlidingMarchingCubes::new(&mut tree, PolygonizerConfig::default());
    let refined = smc.run().unwrap();
    assert!(smc.stats().refined > 0);
    assert_eq!(refined.vertex_count(), mesh.vertex_count());
}

// ============================================================================
// Z stepping and progress
// ============================================================================

#[test]
fn adaptive_stepping_stays_closed_and_skips_empty_space() {
    let (mut tree, _) = point_pair(0.5, NodeOp::Ricci { power: 2.0 }, 0.0);
    let root = tree.root();
    let v = ThickVertex::new(DVec3::new(0.0, 0.0, 20.0), 1.0);
    let far = tree.create_point(v, Material::default());
    tree.add_child(root, far).unwrap();

    let (uniform_mesh, uniform_slices) = {
        let mut smc = SlidingMarchingCubes::new(&mut tree, PolygonizerConfig::default());
        let mesh = smc.run().unwrap();
        (mesh, smc.stats().slices)
    };

    let config = PolygonizerConfig::default().with_z_stepping(ZStepping::Adaptive);
    let (adaptive_mesh, adaptive_slices) = {
        let mut smc = SlidingMarchingCubes::new(&mut tree, config);
        let mesh = smc.run().unwrap();
        (mesh, smc.stats().slices)
    };

    assert!(adaptive_mesh.is_closed());
    assert_eq!(adaptive_mesh.connected_components(), 2);
    assert_eq!(uniform_mesh.connected_components(), 2);
    assert!(adaptive_slices < uniform_slices, "{} vs {}", adaptive_slices, uniform_slices);
}

#[test]
fn progress_is_monotonic_and_ends_at_100() {
    let (mut tree, _) = limb(2.0, 0.5);
    let mut reports = Vec::new();
    let mesh = polygonize_with_progress(&mut tree, &PolygonizerConfig::default(), |p| {
        reports.push(p)
    })
    .unwrap();
    assert!(!mesh.is_empty());
    assert!(reports.len() > 5);
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    assert!(reports.iter().all(|&p| (0.0..=100.0).contains(&p)));
    assert_eq!(*reports.last().unwrap(), 100.0);
}

// ============================================================================
// Composite trees
// ============================================================================

#[test]
fn max_of_far_points_gives_two_shells() {
    let (mut tree, _) = point_pair(0.5, NodeOp::Max, 4.0);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    let topology = mesh.topology();
    assert!(topology.is_closed(), "{}", topology);
    assert_eq!(topology.components, 2);
    assert_eq!(topology.euler_characteristic(), 4);

    // Each shell matches the lone point
    let (mut single, _) = single_point(0.5, 1.0);
    let lone = polygonize(&mut single, &PolygonizerConfig::default()).unwrap();
    let (lo, hi) = mesh.bounds().unwrap();
    let (slo, shi) = lone.bounds().unwrap();
    assert_relative_eq!(hi.x - 4.0, shi.x, epsilon = 0.1);
    assert_relative_eq!(lo.x + 4.0, slo.x, epsilon = 0.1);
    assert_relative_eq!(hi.y, shi.y, epsilon = 0.1);
}

#[test]
fn split_mode_matches_joint_polygonization() {
    let (mut tree, _) = point_pair(0.5, NodeOp::Max, 4.0);
    let joint = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    let split_config = PolygonizerConfig::default().with_ricci_threshold(8.0);
    let split = polygonize(&mut tree, &split_config).unwrap();

    assert!(split.is_closed());
    assert_eq!(split.connected_components(), 2);
    assert_relative_eq!(signed_volume(&split), signed_volume(&joint), max_relative = 0.1);
}

#[test]
fn blended_pair_is_one_shell() {
    let (mut tree, _) = point_pair(1.0, NodeOp::Ricci { power: 2.0 }, 0.7);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    assert!(mesh.is_closed());
    assert_eq!(mesh.connected_components(), 1);
    assert_eq!(mesh.euler_characteristic(), 2);

    // Materials blend across the shell
    let reds = mesh.vertices.iter().filter(|v| v.color[0] > 0.9).count();
    let greens = mesh.vertices.iter().filter(|v| v.color[1] > 0.9).count();
    assert!(reds > 0 && greens > 0);
}

#[test]
fn limb_surface_at_thickness() {
    let (mut tree, _) = limb(4.0, 0.5);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    assert!(mesh.is_closed());
    // Around the middle of the limb the radius is the thickness
    let mid: Vec<f64> = mesh
        .vertices
        .iter()
        .filter(|v| (v.position.x - 2.0).abs() < 0.5)
        .map(|v| f64::from(Vec3::new(0.0, v.position.y, v.position.z).length()))
        .collect();
    assert!(!mid.is_empty());
    assert_relative_eq!(mean(&mid), 0.5, epsilon = 0.02);
}

#[test]
fn tree_is_untouched_after_polygonization() {
    let (mut tree, parent) = point_pair(0.5, NodeOp::Ricci { power: 2.0 }, 3.0);
    let children = tree.children(parent).unwrap().to_vec();
    tree.prepare_for_eval();
    let before = tree.value_at(DVec3::new(2.5, 0.1, 0.0)).unwrap();

    polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    assert_eq!(tree.children(parent).unwrap(), children.as_slice());
    assert_eq!(tree.trim_depth(), 0);
    assert_eq!(tree.value_at(DVec3::new(2.5, 0.1, 0.0)).unwrap(), before);
}

#[test]
fn obj_export_writes_every_face() {
    let (mut tree, _) = single_point(0.5, 1.0);
    let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
    let path = std::env::temp_dir().join(format!("blobtree_test_{}.obj", std::process::id()));
    export_obj(&mesh, &path, &ObjConfig::default()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), mesh.vertex_count());
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), mesh.triangle_count());
}

#[test]
fn config_file_round_trip() {
    let config = PolygonizerConfig::default()
        .with_detail_ratio(0.7)
        .with_z_stepping(ZStepping::Adaptive)
        .with_ricci_threshold(10.0);
    let path = std::env::temp_dir().join(format!("blobtree_config_{}.json", std::process::id()));
    std::fs::write(&path, config.to_json().unwrap()).unwrap();
    let loaded = PolygonizerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, config);
    assert!(matches!(
        PolygonizerConfig::load("/nonexistent/blobtree.json"),
        Err(BlobtreeError::Io(_))
    ));
}
