//! Mesh-level scenarios run through the OBB tree

use crate::assets::tessellator::tessellate_to_triangles;
use crate::foundation::logging;
use crate::foundation::math::{Quat, RigidTransform, Vec3};
use crate::physics::collision::{
    check_collision, sweep, sweep_obb_triangles, OrientedBox, QueryTrace, Ray, SweepConfig, SweepTarget, Triangle,
};
use crate::spatial::ObbTree;

/// Latitude/longitude sphere
fn uv_sphere(radius: f32, rings: usize, segments: usize) -> Vec<Triangle> {
    let point = |ring: usize, segment: usize| {
        let theta = std::f32::consts::PI * ring as f32 / rings as f32;
        let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
        Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()) * radius
    };

    let mut triangles = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, segment + 1);
            let d = point(ring, segment + 1);
            if ring != 0 {
                triangles.push(Triangle::new(a, b, d));
            }
            if ring + 1 != rings {
                triangles.push(Triangle::new(b, c, d));
            }
        }
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_tree_invariants() {
        logging::try_init_for_tests();
        let tree = ObbTree::new(uv_sphere(3.0, 12, 16));
        assert!(tree.validate());

        // Every node's box holds every vertex of every triangle beneath it
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            let node = tree.node(id);
            let obb = node.bounding_box();
            for &tri in tree.triangle_indices(id) {
                for vertex in tree.triangle(tri).vertices() {
                    assert!(obb.contains_point(&vertex, 1e-3));
                }
            }
            if let Some(children) = node.children() {
                stack.extend(children);
            }
        }
    }

    #[test]
    fn test_sphere_tree_agrees_with_brute_force() {
        let triangles = uv_sphere(3.0, 10, 14);
        let mut tree = ObbTree::new(triangles.clone());
        let transform = RigidTransform::new(
            Quat::from_axis_angle(&Vec3::x_axis(), 0.4),
            1.5,
            Vec3::new(2.0, -1.0, 0.5),
        );
        tree.set_transform(transform);
        let world: Vec<Triangle> = triangles
            .iter()
            .map(|t| {
                Triangle::new(
                    transform.transform_point(&t.p0),
                    transform.transform_point(&t.p1),
                    transform.transform_point(&t.p2),
                )
            })
            .collect();

        let config = SweepConfig::default();
        let mut hits = 0;
        for i in 0..24 {
            let angle = i as f32 * 0.61;
            let start = Vec3::new(angle.cos() * 9.0, (i as f32 * 0.37).sin() * 3.0, angle.sin() * 9.0) + transform.translation;
            let displacement = (transform.translation - start) * 0.8;
            let obb = OrientedBox::new(
                start,
                Quat::from_axis_angle(&Vec3::y_axis(), angle),
                Vec3::new(0.8, 1.2, 0.6),
            );

            let brute = sweep_obb_triangles(&obb, &displacement, &world, &config);
            let pruned = check_collision(&obb, &tree, &displacement, &config, None);
            assert_eq!(brute.is_some(), pruned.is_some(), "sweep {i}");
            if let (Some((_, a)), Some(b)) = (brute, pruned) {
                hits += 1;
                assert_relative_eq!(a.portion, b.portion, epsilon = 1e-3);
                assert!(b.normal.dot(&displacement) <= 0.0);
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_pruning_skips_most_of_the_mesh() {
        let tree = ObbTree::new(uv_sphere(3.0, 16, 24));
        let mut trace = QueryTrace::new();
        let obb = OrientedBox::axis_aligned(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.5, 0.5, 0.5));

        let hit = check_collision(&obb, &tree, &Vec3::new(0.0, -3.0, 0.0), &SweepConfig::default(), Some(&mut trace));

        let hit = hit.expect("dropping onto the north pole must hit");
        assert!(hit.portion > 0.5 && hit.portion < 0.65);
        assert!(trace.candidates.len() * 4 < tree.triangles().len());
    }

    #[test]
    fn test_sweep_target_tree_variant() {
        let tree = ObbTree::new(uv_sphere(2.0, 8, 12));
        let obb = OrientedBox::axis_aligned(Vec3::new(-6.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let hit = sweep(&obb, &Vec3::new(6.0, 0.0, 0.0), SweepTarget::Tree(&tree), &SweepConfig::default()).unwrap();

        // Right face at -5.5 meets the sphere near x = -2
        assert!(hit.portion > 0.55 && hit.portion < 0.6);
        assert!(hit.normal.x < -0.9);
    }

    #[test]
    fn test_picking_matches_single_triangle_case() {
        let triangle = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let tree = ObbTree::new(vec![triangle]);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));

        let hit = tree.intersect_ray(&ray).unwrap();
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
        assert_eq!(hit.triangle, 0);
    }

    #[test]
    fn test_tessellated_floor_catches_falling_box() {
        // L-shaped floor authored as a polygon
        let contour = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 4.0),
        ];
        let tree = ObbTree::new(tessellate_to_triangles(&contour).unwrap());
        let config = SweepConfig::default();
        let down = Vec3::new(0.0, -2.0, 0.0);

        let on_floor = OrientedBox::axis_aligned(Vec3::new(1.0, 1.0, 3.0), Vec3::new(1.0, 1.0, 1.0));
        let hit = check_collision(&on_floor, &tree, &down, &config, None).unwrap();
        // Bottom face at y = 0.5
        assert_relative_eq!(hit.portion, 0.25, epsilon = 1e-4);

        // Above the notch of the L there is nothing to land on
        let over_notch = OrientedBox::axis_aligned(Vec3::new(3.0, 1.0, 3.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(check_collision(&over_notch, &tree, &down, &config, None).is_none());
    }
}
