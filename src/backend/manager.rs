use std::cell::{Cell, RefCell};

use crate::backend::{BackendFactory, DefaultFactory, EngineHandle};
use crate::foundation::error::FestoonResult;
use crate::loader::ModuleLoader;
use crate::model::{AnimationSettings, BackendKind};
use crate::surface::SurfaceHandle;

/// Provisioning lifecycle for the one surface a manager owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Provisioning,
    Running,
    Destroying,
}

struct State {
    phase: Phase,
    handle: Option<EngineHandle>,
    last_settings: Option<AnimationSettings>,
}

/// Selects, provisions and tears down exactly one backend per surface.
///
/// Interior mutability keeps the manager re-entrant: a slow module loader can
/// observe a newer `provision` call racing past it, in which case the stale
/// result is destroyed instead of installed (generation guard). State moves
/// `Idle -> Provisioning -> Running -> Destroying -> Idle`; a new backend
/// never touches the surface before the previous handle's destroy has run.
pub struct BackendManager {
    surface: SurfaceHandle,
    factory: Box<dyn BackendFactory>,
    state: RefCell<State>,
    generation: Cell<u64>,
}

impl BackendManager {
    pub fn new<L: ModuleLoader + 'static>(surface: SurfaceHandle, loader: L) -> Self {
        Self::with_factory(surface, Box::new(DefaultFactory::new(loader)))
    }

    pub fn with_factory(surface: SurfaceHandle, factory: Box<dyn BackendFactory>) -> Self {
        Self {
            surface,
            factory,
            state: RefCell::new(State {
                phase: Phase::Idle,
                handle: None,
                last_settings: None,
            }),
            generation: Cell::new(0),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// True when a handle is installed and still live (not the no-op handle).
    pub fn has_live_backend(&self) -> bool {
        self.state
            .borrow()
            .handle
            .as_ref()
            .is_some_and(EngineHandle::is_live)
    }

    pub fn backend_label(&self) -> Option<&'static str> {
        self.state.borrow().handle.as_ref().map(EngineHandle::label)
    }

    /// Re-provisions only when the settings snapshot actually changed
    /// (shallow comparison). Unchanged settings are a no-op.
    pub fn apply(&self, settings: &AnimationSettings) -> FestoonResult<()> {
        {
            let state = self.state.borrow();
            if state.phase == Phase::Running && state.last_settings.as_ref() == Some(settings) {
                return Ok(());
            }
        }
        self.provision(settings)
    }

    /// Tears down the active backend, then mounts the one matching the
    /// settings. Always settles with exactly one installed handle; every
    /// failure path degrades to the no-op handle instead of propagating.
    #[tracing::instrument(skip(self, settings), fields(kind = ?settings.kind))]
    pub fn provision(&self, settings: &AnimationSettings) -> FestoonResult<()> {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        self.teardown();
        self.state.borrow_mut().last_settings = Some(settings.clone());

        if !settings.enabled || settings.kind == BackendKind::None {
            let mut state = self.state.borrow_mut();
            state.handle = Some(EngineHandle::noop());
            state.phase = Phase::Running;
            return Ok(());
        }

        let snapshot = settings.sanitized();
        self.state.borrow_mut().phase = Phase::Provisioning;

        // The factory may suspend on a module fetch, and a re-entrant
        // provision call can supersede this one meanwhile. No state borrow is
        // held across this call.
        let created = self.factory.create(&self.surface, &snapshot);

        if self.generation.get() != generation {
            if let Ok(mut stale) = created {
                tracing::debug!(?snapshot.kind, "provision superseded, destroying stale backend");
                stale.destroy();
            }
            return Ok(());
        }

        let handle = match created {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, "backend init failed, degrading to no-op");
                self.surface.borrow_mut().clear();
                EngineHandle::noop()
            }
        };

        let mut state = self.state.borrow_mut();
        state.handle = Some(handle);
        state.phase = Phase::Running;
        Ok(())
    }

    /// Advances the active backend by one frame.
    pub fn tick(&self, dt_seconds: f64) {
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state.handle.as_mut() {
            handle.update(dt_seconds);
        }
    }

    /// Resizes the surface and notifies the active backend.
    pub fn resize(&self, width: u32, height: u32) {
        self.surface.borrow_mut().resize(width, height);
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state.handle.as_mut() {
            handle.resize(width, height);
        }
    }

    /// Destroys the active backend and leaves the surface empty.
    pub fn shutdown(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.teardown();
        self.state.borrow_mut().last_settings = None;
        self.surface.borrow_mut().clear();
    }

    fn teardown(&self) {
        let old = {
            let mut state = self.state.borrow_mut();
            state.phase = Phase::Destroying;
            state.handle.take()
        };
        // Destroy outside the borrow: backend teardown may touch the surface.
        if let Some(mut handle) = old {
            handle.destroy();
        }
        self.state.borrow_mut().phase = Phase::Idle;
    }
}

impl Drop for BackendManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
