//! Festoon renders interchangeable animated backdrop effects into a pixel
//! surface and positions decorative elements along a rounded-rectangle
//! border path.
//!
//! The host hands the engine an [`AnimationSettings`] snapshot and a
//! [`SurfaceHandle`]; the [`BackendManager`] mounts exactly one backend per
//! surface and swaps it on settings changes. Independently, an
//! [`AnimationClock`] maps [`DecorativeElement`] settings to per-frame pixel
//! placements via the perimeter geometry.

#![forbid(unsafe_code)]

pub mod backend;
pub mod clock;
pub mod foundation;
pub mod geometry;
pub mod loader;
pub mod model;
pub mod surface;

pub use backend::manager::{BackendManager, Phase};
pub use backend::{Backend, BackendFactory, DefaultFactory, EngineHandle};
pub use clock::{AnimationClock, ElementPlacement};
pub use foundation::core::{Point, Rgba8Premul, Vec2, parse_hex_color};
pub use foundation::error::{FestoonError, FestoonResult};
pub use geometry::{position_on_border, position_on_perimeter};
pub use loader::{BUILTIN_MODULE_URL, BuiltinLoader, HttpLoader, ModuleLoader, ParticleModule};
pub use model::{
    AnimationKind, AnimationSettings, BackendKind, BorderGeometry, DecorativeElement, ElementKind,
    ParticlePreset,
};
pub use surface::{PixelSurface, SurfaceHandle, surface_handle};
