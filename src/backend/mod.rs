pub mod fireworks;
pub mod manager;
pub mod particles;
pub mod pointcloud;

use crate::foundation::error::FestoonResult;
use crate::loader::ModuleLoader;
use crate::model::{AnimationSettings, BackendKind};
use crate::surface::SurfaceHandle;

/// A pluggable backdrop rendering strategy. Backends draw into the surface
/// they were initialized with on every `update` and must leave no side
/// effects behind after `destroy`.
pub trait Backend {
    fn update(&mut self, dt_seconds: f64) -> FestoonResult<()>;

    /// Resize notification. Backends adapt their bounds/projection without
    /// rebuilding their state.
    fn resize(&mut self, width: u32, height: u32);

    /// Releases everything the backend owns, including non-memory resources.
    /// Must be safe to call on an already-degraded backend.
    fn destroy(&mut self);
}

/// Opaque runtime handle for a provisioned backend. The only capability it
/// exposes outward is `destroy`; `update`/`resize` are driven by the manager.
///
/// `destroy` is idempotent: the backend is dropped on the first call and
/// later calls are no-ops. Dropping the handle destroys the backend too, so
/// a handle can never leak its resources.
pub struct EngineHandle {
    label: &'static str,
    inner: Option<Box<dyn Backend>>,
}

impl EngineHandle {
    pub fn new(label: &'static str, backend: Box<dyn Backend>) -> Self {
        Self {
            label,
            inner: Some(backend),
        }
    }

    /// Handle representing a disabled or failed backend. Keeps the container
    /// empty and makes every operation a no-op.
    pub fn noop() -> Self {
        Self {
            label: "noop",
            inner: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// False once destroyed or when this is the no-op handle.
    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    pub fn update(&mut self, dt_seconds: f64) {
        if let Some(backend) = self.inner.as_mut()
            && let Err(err) = backend.update(dt_seconds)
        {
            tracing::warn!(backend = self.label, %err, "backend update failed");
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(backend) = self.inner.as_mut() {
            backend.resize(width, height);
        }
    }

    pub fn destroy(&mut self) {
        if let Some(mut backend) = self.inner.take() {
            backend.destroy();
            tracing::debug!(backend = self.label, "backend destroyed");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("label", &self.label)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Creates backends from settings. The default implementation dispatches on
/// the settings kind; tests and plugin hosts can substitute their own.
pub trait BackendFactory {
    fn create(
        &self,
        surface: &SurfaceHandle,
        settings: &AnimationSettings,
    ) -> FestoonResult<EngineHandle>;
}

/// Factory keyed by the [`BackendKind`] tag. `BackendKind::None` never
/// reaches the factory; the manager installs the no-op handle first.
pub struct DefaultFactory<L: ModuleLoader> {
    loader: L,
}

impl<L: ModuleLoader> DefaultFactory<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

impl<L: ModuleLoader> BackendFactory for DefaultFactory<L> {
    fn create(
        &self,
        surface: &SurfaceHandle,
        settings: &AnimationSettings,
    ) -> FestoonResult<EngineHandle> {
        match settings.kind {
            BackendKind::ParticlePreset => {
                let backend =
                    particles::ParticlePresetBackend::init(surface, settings, &self.loader)?;
                Ok(EngineHandle::new("particle-preset", Box::new(backend)))
            }
            BackendKind::Fireworks => {
                let backend = fireworks::FireworksBackend::init(surface, settings);
                Ok(EngineHandle::new("fireworks", Box::new(backend)))
            }
            BackendKind::PointCloud => {
                let backend = pointcloud::PointCloudBackend::init(surface, settings)?;
                Ok(EngineHandle::new("point-cloud", Box::new(backend)))
            }
            BackendKind::None => Ok(EngineHandle::noop()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        destroyed: Rc<RefCell<u32>>,
    }

    impl Backend for Probe {
        fn update(&mut self, _dt: f64) -> FestoonResult<()> {
            Ok(())
        }
        fn resize(&mut self, _w: u32, _h: u32) {}
        fn destroy(&mut self) {
            *self.destroyed.borrow_mut() += 1;
        }
    }

    #[test]
    fn destroy_is_idempotent() {
        let destroyed = Rc::new(RefCell::new(0));
        let mut handle = EngineHandle::new(
            "probe",
            Box::new(Probe {
                destroyed: destroyed.clone(),
            }),
        );
        assert!(handle.is_live());
        handle.destroy();
        handle.destroy();
        handle.destroy();
        assert_eq!(*destroyed.borrow(), 1);
        assert!(!handle.is_live());
    }

    #[test]
    fn dropping_a_live_handle_destroys_the_backend() {
        let destroyed = Rc::new(RefCell::new(0));
        {
            let _handle = EngineHandle::new(
                "probe",
                Box::new(Probe {
                    destroyed: destroyed.clone(),
                }),
            );
        }
        assert_eq!(*destroyed.borrow(), 1);
    }

    #[test]
    fn noop_handle_does_nothing() {
        let mut handle = EngineHandle::noop();
        assert!(!handle.is_live());
        handle.update(0.016);
        handle.resize(10, 10);
        handle.destroy();
    }
}
