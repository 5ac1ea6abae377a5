use std::sync::Arc;

use crate::backend::Backend;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::FestoonResult;
use crate::loader::{BUILTIN_MODULE_URL, ModuleLoader, ParticleModule, load_cached};
use crate::model::{AnimationSettings, ParticlePreset, scaled_count};
use crate::surface::SurfaceHandle;

/// Base drift speed in px/s at `speed = 1`.
const BASE_DRIFT_SPEED: f64 = 18.0;
/// Pairs closer than this many px get a connecting line when links are on.
const LINK_DISTANCE: f64 = 110.0;
const LINK_MAX_OPACITY: f32 = 0.35;

#[derive(Clone, Copy, Debug)]
struct Dot {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    radius: f64,
    color: Rgba8Premul,
    /// Phase offset for the per-preset sway term.
    sway: f64,
}

/// Derived adapter parameters for one provisioned preset.
#[derive(Clone, Debug)]
pub struct ParticleConfig {
    pub preset: ParticlePreset,
    pub count: usize,
    pub drift_speed: f64,
    pub palette: Vec<Rgba8Premul>,
    pub links: bool,
}

impl ParticleConfig {
    /// Translates the declarative preset plus sanitized settings into
    /// concrete adapter parameters.
    pub fn derive(settings: &AnimationSettings) -> Self {
        let preset = ParticlePreset::from_options(settings);
        Self {
            preset,
            count: scaled_count(preset.base_count(), settings.intensity),
            drift_speed: BASE_DRIFT_SPEED * settings.speed,
            palette: settings
                .option_palette()
                .unwrap_or_else(|| preset.default_palette()),
            links: settings.option_bool("links").unwrap_or(preset.links_by_default()),
        }
    }
}

/// Backdrop of drifting points rendered through a provisioned particle
/// module. The module itself comes from the cached loader so repeated mounts
/// of the same preset never refetch it.
pub struct ParticlePresetBackend {
    surface: SurfaceHandle,
    module: Arc<ParticleModule>,
    config: ParticleConfig,
    dots: Vec<Dot>,
    elapsed: f64,
    width: f64,
    height: f64,
}

impl ParticlePresetBackend {
    pub fn init(
        surface: &SurfaceHandle,
        settings: &AnimationSettings,
        loader: &dyn ModuleLoader,
    ) -> FestoonResult<Self> {
        let url = settings
            .option_str("module_url")
            .unwrap_or(BUILTIN_MODULE_URL);
        let module = load_cached(loader, url)?;

        let config = ParticleConfig::derive(settings);
        let (width, height) = {
            let s = surface.borrow();
            (f64::from(s.width()), f64::from(s.height()))
        };

        let mut rng = fastrand::Rng::new();
        let dots = (0..config.count)
            .map(|i| spawn_dot(&mut rng, &config, width, height, i))
            .collect();

        tracing::debug!(
            module = %module.name,
            preset = ?config.preset,
            count = config.count,
            "particle preset mounted"
        );

        Ok(Self {
            surface: surface.clone(),
            module,
            config,
            dots,
            elapsed: 0.0,
            width,
            height,
        })
    }

    pub fn module(&self) -> &ParticleModule {
        &self.module
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }

    fn draw(&self) {
        let mut surface = self.surface.borrow_mut();
        surface.clear();

        if self.config.links {
            let link_color = self.config.palette[0];
            for i in 0..self.dots.len() {
                for j in (i + 1)..self.dots.len() {
                    let a = &self.dots[i];
                    let b = &self.dots[j];
                    let dist = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                    if dist < LINK_DISTANCE {
                        let opacity = (1.0 - dist / LINK_DISTANCE) as f32 * LINK_MAX_OPACITY;
                        surface.draw_line(a.x, a.y, b.x, b.y, link_color, opacity);
                    }
                }
            }
        }

        for dot in &self.dots {
            surface.fill_circle(dot.x, dot.y, dot.radius, dot.color, 1.0);
        }
    }
}

impl Backend for ParticlePresetBackend {
    fn update(&mut self, dt_seconds: f64) -> FestoonResult<()> {
        let dt = dt_seconds.max(0.0);
        self.elapsed += dt;

        for dot in &mut self.dots {
            let sway = match self.config.preset {
                // Snowflakes sway sideways as they fall.
                ParticlePreset::Snow => (self.elapsed * 1.4 + dot.sway).sin() * 9.0,
                _ => 0.0,
            };
            dot.x += (dot.vx + sway) * dt;
            dot.y += dot.vy * dt;

            // Toroidal wrap keeps the field dense without respawns.
            if dot.x < -dot.radius {
                dot.x += self.width + dot.radius * 2.0;
            } else if dot.x > self.width + dot.radius {
                dot.x -= self.width + dot.radius * 2.0;
            }
            if dot.y < -dot.radius {
                dot.y += self.height + dot.radius * 2.0;
            } else if dot.y > self.height + dot.radius {
                dot.y -= self.height + dot.radius * 2.0;
            }
        }

        self.draw();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = f64::from(width);
        self.height = f64::from(height);
        for dot in &mut self.dots {
            dot.x = dot.x.clamp(0.0, self.width);
            dot.y = dot.y.clamp(0.0, self.height);
        }
    }

    fn destroy(&mut self) {
        self.dots.clear();
        self.surface.borrow_mut().clear();
    }
}

fn spawn_dot(
    rng: &mut fastrand::Rng,
    config: &ParticleConfig,
    width: f64,
    height: f64,
    index: usize,
) -> Dot {
    let speed = config.drift_speed * (0.5 + rng.f64());
    let (vx, vy, radius) = match config.preset {
        ParticlePreset::Constellation => {
            let angle = rng.f64() * std::f64::consts::TAU;
            (angle.cos() * speed, angle.sin() * speed, 1.0 + rng.f64() * 1.5)
        }
        ParticlePreset::Nebula => {
            let angle = rng.f64() * std::f64::consts::TAU;
            (
                angle.cos() * speed * 0.4,
                angle.sin() * speed * 0.4,
                1.5 + rng.f64() * 2.5,
            )
        }
        ParticlePreset::Snow => ((rng.f64() - 0.5) * speed * 0.3, speed, 1.0 + rng.f64() * 2.0),
        ParticlePreset::Embers => ((rng.f64() - 0.5) * speed * 0.5, -speed, 1.0 + rng.f64() * 1.5),
    };

    Dot {
        x: rng.f64() * width,
        y: rng.f64() * height,
        vx,
        vy,
        radius,
        color: config.palette[index % config.palette.len()],
        sway: rng.f64() * std::f64::consts::TAU,
    }
}
