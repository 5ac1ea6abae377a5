use crate::backend::Backend;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{FestoonError, FestoonResult};
use crate::model::{AnimationSettings, scaled_count};
use crate::surface::SurfaceHandle;

#[cfg(feature = "gpu")]
mod gpu;

/// Points at intensity 100.
const BASE_POINT_COUNT: usize = 400;
/// Rotation rate in rad/s at `speed = 1`.
const BASE_ROTATION_RATE: f64 = 0.25;
/// Camera distance from the cloud origin, in cloud-space units.
const CAMERA_DISTANCE: f64 = 2.4;
const SPIRAL_ARMS: usize = 3;
const SPIRAL_TWIST: f64 = 2.5;

#[derive(Clone, Copy, Debug)]
struct CloudPoint {
    x: f64,
    y: f64,
    z: f64,
    color: Rgba8Premul,
}

enum Renderer {
    /// Perspective projection onto the pixel surface.
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu(gpu::GpuPointRenderer),
}

/// Static galaxy-biased point cloud, rotated continuously around the
/// vertical axis. Geometry is built once at init; resize touches only the
/// viewport.
pub struct PointCloudBackend {
    surface: SurfaceHandle,
    points: Vec<CloudPoint>,
    renderer: Renderer,
    angle: f64,
    rotation_rate: f64,
    width: f64,
    height: f64,
}

impl PointCloudBackend {
    pub fn init(surface: &SurfaceHandle, settings: &AnimationSettings) -> FestoonResult<Self> {
        let count = scaled_count(BASE_POINT_COUNT, settings.intensity);
        let palette = settings.option_palette().unwrap_or_else(default_palette);

        let mut rng = fastrand::Rng::new();
        let points: Vec<CloudPoint> = (0..count)
            .map(|i| spawn_point(&mut rng, &palette, i))
            .collect();

        let (width, height) = {
            let s = surface.borrow();
            (f64::from(s.width()), f64::from(s.height()))
        };

        let renderer = match settings.option_str("renderer") {
            Some("gpu") => gpu_renderer(&points, width as u32, height as u32)?,
            Some("cpu") | None => Renderer::Cpu,
            Some(other) => {
                return Err(FestoonError::render(format!(
                    "unknown point renderer {other:?}"
                )));
            }
        };

        Ok(Self {
            surface: surface.clone(),
            points,
            renderer,
            angle: 0.0,
            rotation_rate: BASE_ROTATION_RATE * settings.speed,
            width,
            height,
        })
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    fn draw_cpu(&self) {
        let mut surface = self.surface.borrow_mut();
        surface.clear();

        let (sin, cos) = self.angle.sin_cos();
        let cx = self.width * 0.5;
        let cy = self.height * 0.5;
        let extent = self.width.min(self.height) * 0.45;

        for p in &self.points {
            // Rotate around the vertical axis, then perspective-project.
            let xr = p.x * cos - p.z * sin;
            let zr = p.x * sin + p.z * cos;
            let depth = zr + CAMERA_DISTANCE;
            if depth <= 0.1 {
                continue;
            }
            let scale = CAMERA_DISTANCE / depth;
            let sx = cx + xr * scale * extent;
            let sy = cy + p.y * scale * extent;
            let radius = (1.8 * scale).clamp(0.6, 2.4);
            let opacity = (scale * scale).clamp(0.2, 1.0) as f32;
            surface.fill_circle(sx, sy, radius, p.color, opacity);
        }
    }
}

impl Backend for PointCloudBackend {
    fn update(&mut self, dt_seconds: f64) -> FestoonResult<()> {
        self.angle = (self.angle + self.rotation_rate * dt_seconds.max(0.0))
            .rem_euclid(std::f64::consts::TAU);

        match &mut self.renderer {
            Renderer::Cpu => {
                self.draw_cpu();
                Ok(())
            }
            #[cfg(feature = "gpu")]
            Renderer::Gpu(renderer) => {
                let mut surface = self.surface.borrow_mut();
                renderer.render(self.angle, &mut surface)
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Viewport/projection only; the cloud is never rebuilt.
        self.width = f64::from(width);
        self.height = f64::from(height);
        #[cfg(feature = "gpu")]
        if let Renderer::Gpu(renderer) = &mut self.renderer {
            renderer.resize(width, height);
        }
    }

    fn destroy(&mut self) {
        // Dropping the vectors reclaims host memory; the GPU renderer must
        // release device-side buffers explicitly.
        self.points = Vec::new();
        #[cfg(feature = "gpu")]
        if let Renderer::Gpu(renderer) = &mut self.renderer {
            renderer.release();
        }
        self.renderer = Renderer::Cpu;
        self.surface.borrow_mut().clear();
    }
}

#[cfg(feature = "gpu")]
fn gpu_renderer(points: &[CloudPoint], width: u32, height: u32) -> FestoonResult<Renderer> {
    Ok(Renderer::Gpu(gpu::GpuPointRenderer::new(
        points, width, height,
    )?))
}

#[cfg(not(feature = "gpu"))]
fn gpu_renderer(_points: &[CloudPoint], _width: u32, _height: u32) -> FestoonResult<Renderer> {
    Err(FestoonError::render(
        "gpu point renderer requested but the gpu feature is not built in",
    ))
}

fn spawn_point(rng: &mut fastrand::Rng, palette: &[Rgba8Premul], index: usize) -> CloudPoint {
    // Radial sqrt bias concentrates points toward the core; each point sits
    // near one of the spiral arms with a twist proportional to radius.
    let radius = rng.f64().sqrt();
    let arm = (index % SPIRAL_ARMS) as f64 / SPIRAL_ARMS as f64 * std::f64::consts::TAU;
    let theta = arm + radius * SPIRAL_TWIST + (rng.f64() - 0.5) * 0.5;
    let squash = (1.0 - radius * 0.6).max(0.15);

    CloudPoint {
        x: radius * theta.cos(),
        y: (rng.f64() - 0.5) * 0.25 * squash,
        z: radius * theta.sin(),
        color: palette[index % palette.len()],
    }
}

fn default_palette() -> Vec<Rgba8Premul> {
    [
        Rgba8Premul::from_straight_rgba(255, 255, 255, 255),
        Rgba8Premul::from_straight_rgba(179, 136, 255, 255),
        Rgba8Premul::from_straight_rgba(130, 177, 255, 255),
        Rgba8Premul::from_straight_rgba(255, 209, 128, 255),
    ]
    .to_vec()
}
