//! End-to-end lifecycle scenarios against the real factory and backends.

use festoon::{
    AnimationSettings, BackendKind, BackendManager, BuiltinLoader, Phase, surface_handle,
};

fn settings(kind: BackendKind) -> AnimationSettings {
    AnimationSettings {
        enabled: true,
        kind,
        speed: 2.0,
        intensity: 100.0,
        ..AnimationSettings::default()
    }
}

#[test]
fn full_swap_cycle_keeps_one_backend_per_surface() {
    let surface = surface_handle(160, 90);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);

    manager.provision(&settings(BackendKind::ParticlePreset)).unwrap();
    assert_eq!(manager.phase(), Phase::Running);
    assert!(manager.has_live_backend());
    assert_eq!(manager.backend_label(), Some("particle-preset"));

    manager.tick(0.016);
    assert!(!surface.borrow().is_blank());

    manager.provision(&settings(BackendKind::Fireworks)).unwrap();
    assert_eq!(manager.backend_label(), Some("fireworks"));
    assert!(manager.has_live_backend());

    manager.provision(&settings(BackendKind::PointCloud)).unwrap();
    assert_eq!(manager.backend_label(), Some("point-cloud"));
    manager.tick(0.016);
    assert!(!surface.borrow().is_blank());

    manager.shutdown();
    assert_eq!(manager.phase(), Phase::Idle);
    assert!(surface.borrow().is_blank());
}

#[test]
fn disabling_the_backdrop_leaves_the_surface_empty() {
    let surface = surface_handle(120, 80);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);

    manager.provision(&settings(BackendKind::Fireworks)).unwrap();
    for _ in 0..120 {
        manager.tick(1.0 / 60.0);
    }

    let disabled = AnimationSettings {
        enabled: false,
        ..settings(BackendKind::Fireworks)
    };
    manager.provision(&disabled).unwrap();
    assert_eq!(manager.phase(), Phase::Running);
    assert!(!manager.has_live_backend());
    assert!(surface.borrow().is_blank());

    // Ticking the no-op handle is harmless.
    manager.tick(0.016);
    assert!(surface.borrow().is_blank());
}

#[test]
fn kind_none_behaves_like_disabled() {
    let surface = surface_handle(64, 64);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);
    manager.provision(&settings(BackendKind::None)).unwrap();
    assert_eq!(manager.backend_label(), Some("noop"));
    assert!(!manager.has_live_backend());
}

#[test]
fn unreachable_module_degrades_to_noop_silently() {
    let surface = surface_handle(64, 64);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);

    let mut bad = settings(BackendKind::ParticlePreset);
    bad.options.insert(
        "module_url".into(),
        serde_json::json!("test://lifecycle-unreachable-module"),
    );

    // No error surfaces to the caller; the engine just renders nothing.
    manager.provision(&bad).unwrap();
    assert_eq!(manager.phase(), Phase::Running);
    assert!(!manager.has_live_backend());
    manager.tick(0.016);
    assert!(surface.borrow().is_blank());

    // Recovery with good settings works on the same manager.
    manager.provision(&settings(BackendKind::ParticlePreset)).unwrap();
    assert!(manager.has_live_backend());
}

#[test]
fn resize_flows_through_to_the_running_backend() {
    let surface = surface_handle(100, 100);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);
    manager.provision(&settings(BackendKind::Fireworks)).unwrap();

    for _ in 0..60 {
        manager.tick(1.0 / 60.0);
    }
    manager.resize(320, 180);
    assert_eq!(surface.borrow().width(), 320);

    // Still renders after the resize without re-provisioning.
    for _ in 0..60 {
        manager.tick(1.0 / 60.0);
    }
    assert_eq!(manager.backend_label(), Some("fireworks"));
}

#[test]
fn out_of_range_settings_are_clamped_not_rejected() {
    let surface = surface_handle(64, 64);
    let manager = BackendManager::new(surface.clone(), BuiltinLoader);
    let wild = AnimationSettings {
        speed: 1000.0,
        intensity: -5.0,
        ..settings(BackendKind::Fireworks)
    };
    manager.provision(&wild).unwrap();
    assert!(manager.has_live_backend());
    manager.tick(0.016);
}
