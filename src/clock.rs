use std::f64::consts::TAU;

use crate::geometry::position_on_border;
use crate::model::{AnimationKind, BorderGeometry, DecorativeElement};

/// Guards against divide-by-zero from hostile period settings.
const MIN_PERIOD_SECONDS: f64 = 0.05;

/// Fraction of the element size used as the float/bounce travel.
const LIFT_AMPLITUDE_FRAC: f64 = 0.3;
/// Fraction of the element size used as the shake travel.
const SHAKE_AMPLITUDE_FRAC: f64 = 0.12;
const PULSE_SCALE_AMPLITUDE: f64 = 0.2;
const BLINK_LOW_OPACITY: f64 = 0.2;

/// Per-frame output for one decorative element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementPlacement {
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
    pub scale: f64,
    pub rotation_rad: f64,
}

/// Single shared per-frame driver for all decorative elements.
///
/// `Revolve` elements are routed through the perimeter geometry every tick;
/// every other kind keeps the anchor computed from its settings and animates
/// through a declarative periodic transform. Changing the element list or the
/// geometry restarts the clock (phase reset).
#[derive(Clone, Debug)]
pub struct AnimationClock {
    elements: Vec<DecorativeElement>,
    geometry: BorderGeometry,
    elapsed: f64,
}

impl AnimationClock {
    pub fn new(elements: Vec<DecorativeElement>, geometry: BorderGeometry) -> Self {
        Self {
            elements,
            geometry,
            elapsed: 0.0,
        }
    }

    pub fn elements(&self) -> &[DecorativeElement] {
        &self.elements
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn set_elements(&mut self, elements: Vec<DecorativeElement>) {
        self.elements = elements;
        self.restart();
    }

    pub fn set_geometry(&mut self, geometry: BorderGeometry) {
        self.geometry = geometry;
        self.restart();
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    /// Advances the clock and returns a placement per element, in element
    /// order. Negative deltas are treated as zero.
    pub fn tick(&mut self, dt_seconds: f64) -> Vec<ElementPlacement> {
        self.elapsed += dt_seconds.max(0.0);
        self.elements.iter().map(|el| self.place(el)).collect()
    }

    fn place(&self, el: &DecorativeElement) -> ElementPlacement {
        let period = el.period_seconds.max(MIN_PERIOD_SECONDS);
        let phase = self.elapsed / period;

        if el.animation == AnimationKind::Revolve {
            let progress = (el.position_percent / 100.0 + phase).rem_euclid(1.0);
            let p = position_on_border(progress * 100.0, &self.geometry, el.size_px);
            return ElementPlacement {
                x: p.x,
                y: p.y,
                opacity: 1.0,
                scale: 1.0,
                rotation_rad: 0.0,
            };
        }

        let anchor = position_on_border(el.position_percent, &self.geometry, el.size_px);
        let mut placement = ElementPlacement {
            x: anchor.x,
            y: anchor.y,
            opacity: 1.0,
            scale: 1.0,
            rotation_rad: 0.0,
        };
        let lift = el.size_px * LIFT_AMPLITUDE_FRAC;

        match el.animation {
            AnimationKind::Float => {
                placement.y -= lift * (phase * TAU).sin();
            }
            AnimationKind::Bounce => {
                placement.y -= lift * (phase * TAU).sin().abs();
            }
            AnimationKind::Shake => {
                placement.x += el.size_px * SHAKE_AMPLITUDE_FRAC * (phase * TAU).sin();
            }
            AnimationKind::Blink => {
                placement.opacity = if phase.fract() < 0.5 {
                    1.0
                } else {
                    BLINK_LOW_OPACITY
                };
            }
            AnimationKind::Pulse => {
                placement.scale = 1.0 + PULSE_SCALE_AMPLITUDE * (phase * TAU).sin();
            }
            AnimationKind::RotateCw => {
                placement.rotation_rad = TAU * phase;
            }
            AnimationKind::RotateCcw => {
                placement.rotation_rad = -TAU * phase;
            }
            // Handled by the early return above.
            AnimationKind::Revolve => {}
        }

        placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;

    fn geometry() -> BorderGeometry {
        BorderGeometry {
            width_px: 10.0,
            radius_px: 0.0,
            container_width_px: 300.0,
            container_height_px: 150.0,
        }
    }

    fn element(animation: AnimationKind, period: f64) -> DecorativeElement {
        DecorativeElement {
            id: "e1".into(),
            kind: ElementKind::Emoji,
            content: "⭐".into(),
            position_percent: 0.0,
            size_px: 24.0,
            animation,
            period_seconds: period,
        }
    }

    #[test]
    fn revolve_advances_along_the_perimeter() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Revolve, 4.0)], geometry());

        // A quarter period is a quarter lap: distance 215 lands on the top edge.
        let placements = clock.tick(1.0);
        assert_eq!(placements.len(), 1);
        assert!((placements[0].x - (220.0 - 12.0)).abs() < 1e-9);
        assert!((placements[0].y - (5.0 - 12.0)).abs() < 1e-9);
    }

    #[test]
    fn revolve_wraps_after_a_full_period() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Revolve, 2.0)], geometry());
        let one_lap = clock.tick(2.0)[0];
        clock.restart();
        let start = clock.tick(0.0)[0];
        assert!((one_lap.x - start.x).abs() < 1e-9);
        assert!((one_lap.y - start.y).abs() < 1e-9);
    }

    #[test]
    fn float_oscillates_around_a_static_anchor() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Float, 2.0)], geometry());
        let anchor_y = clock.tick(0.0)[0].y;
        let up = clock.tick(0.5)[0];
        assert!(up.y < anchor_y, "float should lift at the sine crest");
        assert_eq!(up.opacity, 1.0);
        assert_eq!(up.scale, 1.0);

        let back = clock.tick(0.5)[0];
        assert!((back.y - anchor_y).abs() < 1e-6);
    }

    #[test]
    fn blink_drops_opacity_in_the_second_half_period() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Blink, 1.0)], geometry());
        assert_eq!(clock.tick(0.1)[0].opacity, 1.0);
        assert_eq!(clock.tick(0.5)[0].opacity, BLINK_LOW_OPACITY);
        let p = clock.tick(0.5)[0];
        assert_eq!(p.opacity, 1.0);
        // Static kinds never move off their anchor through opacity changes.
        assert_eq!((p.x, p.y), (clock.tick(0.0)[0].x, clock.tick(0.0)[0].y));
    }

    #[test]
    fn rotation_directions_are_opposite() {
        let mut cw = AnimationClock::new(vec![element(AnimationKind::RotateCw, 4.0)], geometry());
        let mut ccw = AnimationClock::new(vec![element(AnimationKind::RotateCcw, 4.0)], geometry());
        let a = cw.tick(1.0)[0].rotation_rad;
        let b = ccw.tick(1.0)[0].rotation_rad;
        assert!(a > 0.0);
        assert!((a + b).abs() < 1e-12);
    }

    #[test]
    fn element_or_geometry_change_restarts_the_clock() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Revolve, 2.0)], geometry());
        clock.tick(1.3);
        assert!(clock.elapsed_seconds() > 0.0);

        clock.set_elements(vec![element(AnimationKind::Float, 1.0)]);
        assert_eq!(clock.elapsed_seconds(), 0.0);

        clock.tick(0.7);
        clock.set_geometry(BorderGeometry {
            container_width_px: 640.0,
            ..geometry()
        });
        assert_eq!(clock.elapsed_seconds(), 0.0);
        // Still ticks without crashing after the reset.
        assert_eq!(clock.tick(0.1).len(), 1);
    }

    #[test]
    fn zero_period_does_not_divide_by_zero() {
        let mut clock = AnimationClock::new(vec![element(AnimationKind::Revolve, 0.0)], geometry());
        let p = clock.tick(1.0)[0];
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
