//! Integration tests: tree structure, invalidation and trimming

mod common;

use blobtree::prelude::*;
use common::*;
use glam::DVec3;

fn row_of_points(xs: &[f64]) -> (Blobtree, Vec<ElementId>) {
    let mut tree = Blobtree::new();
    let root = tree.root();
    let ids = xs
        .iter()
        .map(|&x| {
            let v = ThickVertex::new(DVec3::new(x, 0.0, 0.0), 1.0);
            let p = tree.create_point(v, Material::default());
            tree.add_child(root, p).unwrap();
            p
        })
        .collect();
    (tree, ids)
}

// ============================================================================
// Invalidation
// ============================================================================

#[test]
fn root_follows_mutations_without_prepare() {
    let (mut tree, parent) = point_pair(1.0, NodeOp::Ricci { power: 2.0 }, 1.0);
    let leaf = tree.children(parent).unwrap()[0];
    let sibling = tree.children(parent).unwrap()[1];

    tree.set_vertex_position(leaf, 0, DVec3::new(-3.0, 0.0, 0.0)).unwrap();
    for id in [tree.root(), parent, leaf, sibling] {
        assert!(tree.is_valid(id).unwrap());
    }
    let aabb = tree.aabb(tree.root()).unwrap();
    assert!((aabb.min.x + 5.0).abs() < 1e-12);
    assert!((aabb.max.x - 3.0).abs() < 1e-12);
    assert!(tree.value_at(DVec3::new(-3.0, 0.0, 0.0)).unwrap() > 0.0);
}

#[test]
fn invalidation_stops_at_a_detached_top() {
    let mut tree = Blobtree::new();
    let outer = tree.create_ricci(2.0);
    let inner = tree.create_max();
    let p = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
    tree.add_child(inner, p).unwrap();
    tree.add_child(outer, inner).unwrap();
    tree.prepare_element(outer).unwrap();

    tree.set_vertex_thickness(p, 0, 2.0).unwrap();
    assert!(!tree.is_valid(p).unwrap());
    assert!(!tree.is_valid(inner).unwrap());
    assert!(!tree.is_valid(outer).unwrap());
    assert!(matches!(
        tree.field_of(outer),
        Err(BlobtreeError::InvalidAabb { .. })
    ));

    let root = tree.root();
    tree.add_child(root, outer).unwrap();
    assert!(tree.is_valid(p).unwrap());
    assert_eq!(tree.aabb(root).unwrap().max.x, 4.0);
}

#[test]
fn prepare_is_idempotent() {
    let (mut tree, _) = limb(2.0, 0.5);
    let first = tree.root_aabb();
    tree.prepare_for_eval();
    tree.prepare_for_eval();
    assert_eq!(tree.root_aabb(), first);
    assert!(first.contains(DVec3::new(-0.9, 0.0, 0.0)));
}

#[test]
fn operator_setters_take_effect_immediately() {
    let (mut tree, parent) = point_pair(1.0, NodeOp::Ricci { power: 2.0 }, 1.0);
    let before = tree.value_at(DVec3::ZERO).unwrap();
    tree.set_ricci_power(parent, 1.0).unwrap();
    assert!(tree.value_at(DVec3::ZERO).unwrap() > before);

    let leaf = tree.children(parent).unwrap()[0];
    assert!(matches!(
        tree.set_ricci_power(leaf, 2.0),
        Err(BlobtreeError::NotANode { .. })
    ));
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn destroyed_ids_go_stale() {
    let (mut tree, p) = single_point(1.0, 1.0);
    tree.destroy(p).unwrap();
    assert!(!tree.contains(p));
    assert!(tree.children(tree.root()).unwrap().is_empty());

    // The slot is reused under a new generation
    let q = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
    assert_eq!(q.index(), p.index());
    assert!(matches!(tree.get(p), Err(BlobtreeError::UnknownElement { .. })));
    assert!(tree.get(q).is_ok());
}

#[test]
fn destroy_releases_the_subtree() {
    let (mut tree, parent) = point_pair(1.0, NodeOp::Max, 1.0);
    let leaves = tree.children(parent).unwrap().to_vec();
    assert_eq!(tree.len(), 4);
    tree.destroy(parent).unwrap();
    assert_eq!(tree.len(), 1);
    assert!(tree.is_empty());
    assert!(leaves.iter().all(|&l| !tree.contains(l)));
}

#[test]
fn structural_preconditions() {
    let mut tree = Blobtree::new();
    let root = tree.root();
    let a = tree.create_ricci(2.0);
    let b = tree.create_max();
    tree.add_child(a, b).unwrap();
    assert!(matches!(tree.add_child(b, a), Err(BlobtreeError::CycleDetected { .. })));

    let diff = tree.create_difference(1.0);
    for _ in 0..2 {
        let p = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
        tree.add_child(diff, p).unwrap();
    }
    let extra = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
    assert!(matches!(
        tree.add_child(diff, extra),
        Err(BlobtreeError::ArityExceeded { max: 2, .. })
    ));

    let sphere = tree.create_sdf(SdfPrimitive::sphere(DVec3::ZERO, 1.0, Material::default()));
    assert!(matches!(
        tree.add_child(root, sphere),
        Err(BlobtreeError::IncompatibleChild { .. })
    ));
    assert!(matches!(tree.add_child(a, root), Err(BlobtreeError::RootImmutable(_))));
    assert!(matches!(tree.destroy(root), Err(BlobtreeError::RootImmutable(_))));
}

#[test]
fn add_child_moves_from_former_parent() {
    let (mut tree, parent) = point_pair(1.0, NodeOp::Ricci { power: 2.0 }, 1.0);
    let leaf = tree.children(parent).unwrap()[1];
    let other = tree.create_max();
    tree.add_child(tree.root(), other).unwrap();
    tree.add_child(other, leaf).unwrap();
    assert_eq!(tree.children(parent).unwrap().len(), 1);
    assert_eq!(tree.parent(leaf).unwrap(), Some(other));
    assert!(matches!(
        tree.remove_child(parent, leaf),
        Err(BlobtreeError::NotAChild { .. })
    ));
}

#[test]
fn vertex_setters_check_ranges() {
    let (mut tree, p) = single_point(1.0, 1.0);
    assert!(matches!(
        tree.set_vertex_position(p, 1, DVec3::ZERO),
        Err(BlobtreeError::VertexOutOfRange { index: 1, count: 1, .. })
    ));
    assert!(matches!(
        tree.set_density(tree.root(), 2.0),
        Err(BlobtreeError::NotAPrimitive { .. })
    ));
}

// ============================================================================
// Trimming
// ============================================================================

#[test]
fn external_trim_round_trips_child_order() {
    let (mut tree, ids) = row_of_points(&[-6.0, 0.0, 6.0, 12.0]);
    tree.prepare_for_eval();
    let region = Aabb::new(DVec3::new(5.0, -1.0, -1.0), DVec3::new(7.0, 1.0, 1.0));
    let record = tree.external_trim(&region);
    assert_eq!(record.len(), 3);
    assert_eq!(tree.children(tree.root()).unwrap(), &ids[2..3]);

    tree.prepare_for_eval();
    assert!(tree.value_at(DVec3::new(6.0, 0.0, 0.0)).unwrap() > 1.0);
    assert_eq!(tree.value_at(DVec3::ZERO).unwrap(), 0.0);

    tree.untrim(&record).unwrap();
    assert_eq!(tree.children(tree.root()).unwrap(), ids.as_slice());
    assert!(ids.iter().all(|&id| tree.parent(id).unwrap() == Some(tree.root())));
}

#[test]
fn internal_trims_stack() {
    let (mut tree, ids) = row_of_points(&[-6.0, 0.0, 6.0]);
    tree.prepare_for_eval();
    let wide = Aabb::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(7.0, 1.0, 1.0));
    assert_eq!(tree.trim(&wide), 1);
    tree.prepare_for_eval();
    let narrow = Aabb::new(DVec3::new(5.0, -1.0, -1.0), DVec3::new(7.0, 1.0, 1.0));
    assert_eq!(tree.trim(&narrow), 1);
    assert_eq!(tree.trim_depth(), 2);

    tree.untrim_last().unwrap();
    assert_eq!(tree.children(tree.root()).unwrap(), &ids[1..]);
    tree.untrim_all().unwrap();
    assert_eq!(tree.trim_depth(), 0);
    assert_eq!(tree.children(tree.root()).unwrap(), ids.as_slice());
}

#[test]
fn trim_keeps_binary_operands_together() {
    let (mut tree, diff) = point_pair(1.0, NodeOp::Difference { alpha: 1.0 }, 4.0);
    tree.prepare_for_eval();
    let region = Aabb::new(DVec3::new(-5.0, -1.0, -1.0), DVec3::new(-3.0, 1.0, 1.0));
    let record = tree.external_trim(&region);
    assert!(record.is_empty());
    assert_eq!(tree.children(diff).unwrap().len(), 2);
}

#[test]
fn trim_round_trip_preserves_field() {
    let (mut tree, _) = row_of_points(&[-3.0, -1.0, 0.5, 2.0, 4.0]);
    tree.prepare_for_eval();
    let aabb = tree.aabb(tree.root()).unwrap();
    let points = random_points(150, 5.0, 29);
    let before: Vec<f64> = points.iter().map(|&q| tree.value_at(q).unwrap()).collect();

    let region = Aabb::new(DVec3::new(-0.5, -2.0, -2.0), DVec3::new(0.5, 2.0, 2.0));
    let record = tree.external_trim(&region);
    assert!(!record.is_empty());
    tree.untrim(&record).unwrap();
    tree.prepare_for_eval();

    assert_eq!(tree.aabb(tree.root()).unwrap(), aabb);
    for (q, v) in points.iter().zip(&before) {
        assert_eq!(tree.value_at(*q).unwrap(), *v);
    }
}
