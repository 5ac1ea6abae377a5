//! Frame-by-frame behavior of the decoration clock over realistic settings.

use festoon::{
    AnimationClock, AnimationKind, BorderGeometry, DecorativeElement, ElementKind,
};

fn geometry() -> BorderGeometry {
    BorderGeometry {
        width_px: 6.0,
        radius_px: 16.0,
        container_width_px: 480.0,
        container_height_px: 270.0,
    }
}

fn element(id: &str, percent: f64, animation: AnimationKind) -> DecorativeElement {
    DecorativeElement {
        id: id.into(),
        kind: ElementKind::Emoji,
        content: "🎈".into(),
        position_percent: percent,
        size_px: 32.0,
        animation,
        period_seconds: 3.0,
    }
}

#[test]
fn revolving_elements_stay_inside_the_container_for_a_full_lap() {
    let mut clock = AnimationClock::new(
        vec![
            element("a", 0.0, AnimationKind::Revolve),
            element("b", 250.0, AnimationKind::Revolve), // interpreted mod 100
        ],
        geometry(),
    );

    for _ in 0..(3.0 * 120.0) as usize {
        for placement in clock.tick(1.0 / 120.0) {
            let cx = placement.x + 16.0;
            let cy = placement.y + 16.0;
            assert!(cx >= 0.0 && cx <= 480.0, "center x escaped: {cx}");
            assert!(cy >= 0.0 && cy <= 270.0, "center y escaped: {cy}");
        }
    }
}

#[test]
fn mixed_kinds_share_one_clock() {
    let mut clock = AnimationClock::new(
        vec![
            element("rev", 10.0, AnimationKind::Revolve),
            element("float", 10.0, AnimationKind::Float),
            element("pulse", 10.0, AnimationKind::Pulse),
        ],
        geometry(),
    );

    let first = clock.tick(0.4);
    let second = clock.tick(0.4);
    assert_eq!(first.len(), 3);

    // The revolving element moved; the floating one stayed near its anchor;
    // the pulsing one moved not at all.
    assert!(first[0].x != second[0].x || first[0].y != second[0].y);
    assert!((first[1].x - second[1].x).abs() < 1e-9);
    assert_eq!(first[2].x, second[2].x);
    assert_eq!(first[2].y, second[2].y);
    assert!(second[2].scale != first[2].scale);
}

#[test]
fn container_resize_resets_phase_without_losing_elements() {
    let mut clock = AnimationClock::new(vec![element("a", 0.0, AnimationKind::Revolve)], geometry());
    clock.tick(1.0);

    clock.set_geometry(BorderGeometry {
        container_width_px: 960.0,
        container_height_px: 540.0,
        ..geometry()
    });
    assert_eq!(clock.elapsed_seconds(), 0.0);
    assert_eq!(clock.elements().len(), 1);

    let placement = clock.tick(1.0 / 60.0)[0];
    assert!(placement.x.is_finite() && placement.y.is_finite());
}

#[test]
fn position_percent_is_cyclic_not_clamped() {
    let mut a = AnimationClock::new(vec![element("a", 130.0, AnimationKind::Float)], geometry());
    let mut b = AnimationClock::new(vec![element("b", 30.0, AnimationKind::Float)], geometry());
    let pa = a.tick(0.0)[0];
    let pb = b.tick(0.0)[0];
    assert!((pa.x - pb.x).abs() < 1e-9);
    assert!((pa.y - pb.y).abs() < 1e-9);
}
