use proptest::prelude::*;
use tessera_geom::{Bounds2, Vec2, Vec3};

fn coord() -> impl Strategy<Value = f32> {
    -1.0e4f32..1.0e4
}

fn arb_vec2() -> impl Strategy<Value = Vec2> {
    (coord(), coord()).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_bounds() -> impl Strategy<Value = Bounds2> {
    (arb_vec2(), 0.5f32..500.0).prop_map(|(c, s)| Bounds2::new(c, Vec2::new(s, s)))
}

proptest! {
    // Points inside report zero distance, points outside a positive one
    #[test]
    fn sqr_distance_zero_iff_inside(b in arb_bounds(), p in arb_vec2()) {
        let d = b.sqr_distance(p);
        prop_assert!(d >= 0.0);
        if b.contains(p) {
            prop_assert_eq!(d, 0.0);
        } else {
            prop_assert!(d > 0.0);
        }
    }

    // Distance to the bounds never exceeds distance to its center
    #[test]
    fn nearest_edge_not_farther_than_center(b in arb_bounds(), p in arb_vec2()) {
        let to_center = (p - b.center).length();
        prop_assert!(b.distance(p) <= to_center + 5e-2);
    }

    // Cross product is orthogonal to both inputs (relative tolerance)
    #[test]
    fn cross_is_orthogonal(
        a in (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0),
        b in (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0),
    ) {
        let a = Vec3::new(a.0, a.1, a.2);
        let b = Vec3::new(b.0, b.1, b.2);
        let c = a.cross(b);
        let scale = a.length() * b.length() * (a.length() + b.length()) + 1.0;
        prop_assert!(a.dot(c).abs() <= 1e-4 * scale);
        prop_assert!(b.dot(c).abs() <= 1e-4 * scale);
    }
}
