use proptest::prelude::*;
use strata_geom::{Area, V3};

fn small_v3() -> impl Strategy<Value = V3> {
    (-40i32..40, -40i32..40, -40i32..40).prop_map(|(x, y, z)| V3::new(x, y, z))
}

fn small_area() -> impl Strategy<Value = Area> {
    (small_v3(), 0i32..6, 0i32..6, 0i32..6)
        .prop_map(|(min, ex, ey, ez)| Area::new(min, min + V3::new(ex, ey, ez)))
}

proptest! {
    // index is a bijection between the box and 0..volume
    #[test]
    fn index_is_unique_and_in_range(a in small_area()) {
        let vol = a.volume();
        let mut seen = vec![false; vol];
        for p in a.iter() {
            let i = a.index(p);
            prop_assert!(i < vol);
            prop_assert!(!seen[i]);
            seen[i] = true;
            prop_assert_eq!(a.position(i), p);
        }
        prop_assert!(seen.into_iter().all(|b| b));
    }

    #[test]
    fn union_contains_both(a in small_area(), b in small_area()) {
        let mut u = a;
        u.add_area(&b);
        prop_assert!(u.contains_area(&a));
        prop_assert!(u.contains_area(&b));
        prop_assert!(u.volume() >= a.volume().max(b.volume()));
    }

    #[test]
    fn intersection_is_contained(a in small_area(), b in small_area()) {
        let i = a.intersect(&b);
        prop_assert!(a.contains_area(&i));
        prop_assert!(b.contains_area(&i));
        for p in i.iter() {
            prop_assert!(a.contains(p) && b.contains(p));
        }
    }
}
