use crate::backend::Backend;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::FestoonResult;
use crate::model::{AnimationSettings, scaled_count};
use crate::surface::SurfaceHandle;

/// Seconds between bursts at `speed = 1`.
const BASE_SPAWN_INTERVAL: f64 = 0.9;
/// Floor for the spawn interval under maximal speed settings.
const MIN_SPAWN_INTERVAL: f64 = 0.12;
/// Sparks per burst at intensity 100.
const BASE_BURST_COUNT: usize = 28;
const MIN_LIFE: f64 = 0.9;
const MAX_LIFE: f64 = 2.2;
/// Downward pull in px/s^2.
const GRAVITY: f64 = 90.0;
/// Fraction of velocity lost per second to drag.
const DRAG_PER_SECOND: f64 = 0.8;
/// Sparks leaving the surface by more than this margin are culled.
const CULL_MARGIN: f64 = 20.0;

#[derive(Clone, Copy, Debug)]
struct Spark {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    age: f64,
    life: f64,
    radius: f64,
    color: Rgba8Premul,
}

/// Self-contained burst simulation: no external module, a bounded spark
/// list, simple kinematics, full redraw each frame.
pub struct FireworksBackend {
    surface: SurfaceHandle,
    rng: fastrand::Rng,
    sparks: Vec<Spark>,
    palette: Vec<Rgba8Premul>,
    spawn_interval: f64,
    spawn_accum: f64,
    burst_count: usize,
    max_sparks: usize,
    width: f64,
    height: f64,
}

impl FireworksBackend {
    pub fn init(surface: &SurfaceHandle, settings: &AnimationSettings) -> Self {
        let spawn_interval = (BASE_SPAWN_INTERVAL / settings.speed).max(MIN_SPAWN_INTERVAL);
        let burst_count = scaled_count(BASE_BURST_COUNT, settings.intensity);

        // Hard cap: the most bursts that can be alive at once, times the
        // burst size. Enforced by eviction below, so pathological
        // speed/life combinations cannot grow the list without bound.
        let max_alive_bursts = (MAX_LIFE / spawn_interval).ceil() as usize + 1;
        let max_sparks = max_alive_bursts * burst_count;

        let palette = settings.option_palette().unwrap_or_else(default_palette);
        let (width, height) = {
            let s = surface.borrow();
            (f64::from(s.width()), f64::from(s.height()))
        };

        Self {
            surface: surface.clone(),
            rng: fastrand::Rng::new(),
            sparks: Vec::with_capacity(max_sparks.min(4096)),
            palette,
            spawn_interval,
            spawn_accum: 0.0,
            burst_count,
            max_sparks,
            width,
            height,
        }
    }

    pub fn spark_count(&self) -> usize {
        self.sparks.len()
    }

    pub fn max_sparks(&self) -> usize {
        self.max_sparks
    }

    fn burst(&mut self) {
        // Bursts originate in the upper portion of the surface.
        let cx = (0.15 + 0.7 * self.rng.f64()) * self.width;
        let cy = (0.1 + 0.3 * self.rng.f64()) * self.height;
        let color = self.palette[self.rng.usize(..self.palette.len())];

        for i in 0..self.burst_count {
            let angle = (i as f64 / self.burst_count as f64) * std::f64::consts::TAU
                + (self.rng.f64() - 0.5) * 0.3;
            let speed = 40.0 + self.rng.f64() * 100.0;
            self.sparks.push(Spark {
                x: cx,
                y: cy,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                age: 0.0,
                life: MIN_LIFE + self.rng.f64() * (MAX_LIFE - MIN_LIFE),
                radius: 1.0 + self.rng.f64() * 1.5,
                color,
            });
        }

        // Oldest sparks go first when the cap is hit.
        if self.sparks.len() > self.max_sparks {
            let excess = self.sparks.len() - self.max_sparks;
            self.sparks.drain(..excess);
        }
    }
}

impl Backend for FireworksBackend {
    fn update(&mut self, dt_seconds: f64) -> FestoonResult<()> {
        let dt = dt_seconds.clamp(0.0, 0.25);

        self.spawn_accum += dt;
        while self.spawn_accum >= self.spawn_interval {
            self.spawn_accum -= self.spawn_interval;
            self.burst();
        }

        let drag = (1.0 - DRAG_PER_SECOND * dt).max(0.0);
        for spark in &mut self.sparks {
            spark.vy += GRAVITY * dt;
            spark.vx *= drag;
            spark.vy *= drag;
            spark.x += spark.vx * dt;
            spark.y += spark.vy * dt;
            spark.age += dt;
        }

        let (width, height) = (self.width, self.height);
        self.sparks.retain(|s| {
            s.age <= s.life
                && s.x >= -CULL_MARGIN
                && s.x <= width + CULL_MARGIN
                && s.y >= -CULL_MARGIN
                && s.y <= height + CULL_MARGIN
        });

        let mut surface = self.surface.borrow_mut();
        surface.clear();
        for spark in &self.sparks {
            let fade = (1.0 - spark.age / spark.life).clamp(0.0, 1.0) as f32;
            surface.fill_circle(spark.x, spark.y, spark.radius, spark.color, fade);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Only the bounds move; in-flight sparks keep falling and are culled
        // against the new frame.
        self.width = f64::from(width);
        self.height = f64::from(height);
    }

    fn destroy(&mut self) {
        self.sparks.clear();
        self.surface.borrow_mut().clear();
    }
}

fn default_palette() -> Vec<Rgba8Premul> {
    [
        Rgba8Premul::from_straight_rgba(255, 82, 82, 255),
        Rgba8Premul::from_straight_rgba(255, 213, 79, 255),
        Rgba8Premul::from_straight_rgba(105, 240, 174, 255),
        Rgba8Premul::from_straight_rgba(64, 196, 255, 255),
        Rgba8Premul::from_straight_rgba(224, 64, 251, 255),
    ]
    .to_vec()
}
