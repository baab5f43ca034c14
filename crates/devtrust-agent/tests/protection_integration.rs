//! Integration tests for capture protection.
//!
//! These tests run the protection operations against the real UI looper
//! thread and an in-memory `HeadlessSurface`, then drive the same flow
//! through the host bridge.

use std::sync::Arc;

use devtrust_agent::application::evaluator::{EvaluatorSettings, TrustError, TrustEvaluator};
use devtrust_agent::application::protection::ApplyOutcome;
use devtrust_agent::infrastructure::bridge::{BridgeOperation, HostBridge};
use devtrust_agent::infrastructure::platform::MockPlatform;
use devtrust_agent::infrastructure::surface::{HeadlessSurface, SurfaceRegistry};
use devtrust_agent::infrastructure::ui_thread::{UiThreadExecutor, UI_THREAD_NAME};
use devtrust_core::{IndicatorSet, ProtectionState};

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Fixture {
    evaluator: Arc<TrustEvaluator>,
    registry: Arc<SurfaceRegistry>,
    surface: Arc<HeadlessSurface>,
}

/// An evaluator on a clean device with a headless surface attached.
fn fixture() -> Fixture {
    let executor = UiThreadExecutor::spawn().expect("UI looper must start");
    let registry = Arc::new(SurfaceRegistry::new());
    let surface = Arc::new(HeadlessSurface::new());
    registry.attach(surface.clone());

    let evaluator = TrustEvaluator::new(
        Arc::new(MockPlatform::pixel()),
        registry.clone(),
        Arc::new(executor),
        IndicatorSet::builtin(),
        EvaluatorSettings::default(),
    );
    Fixture {
        evaluator: Arc::new(evaluator),
        registry,
        surface,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_enable_twice_mutates_the_surface_once() {
    // Arrange
    let f = fixture();

    // Act
    let first = f.evaluator.enable_protection().await;
    let second = f.evaluator.enable_protection().await;

    // Assert
    assert_eq!(first, Ok(ApplyOutcome::Applied));
    assert_eq!(second, Ok(ApplyOutcome::AlreadyInState));
    assert_eq!(f.surface.mutation_count(), 1);
    assert!(f.surface.is_secure());
    assert_eq!(f.evaluator.protection_state(), ProtectionState::Protected);
}

#[tokio::test]
async fn test_flag_mutation_runs_on_the_ui_thread() {
    let f = fixture();

    f.evaluator
        .enable_protection()
        .await
        .expect("enable must succeed with a surface attached");

    assert_eq!(
        f.surface.last_mutation_thread().as_deref(),
        Some(UI_THREAD_NAME)
    );
}

#[tokio::test]
async fn test_disable_without_surface_keeps_state() {
    // Arrange: protection is on, then the surface goes away.
    let f = fixture();
    f.evaluator
        .enable_protection()
        .await
        .expect("enable must succeed with a surface attached");
    f.registry.detach();

    // Act
    let result = f.evaluator.disable_protection().await;

    // Assert
    assert_eq!(result, Err(TrustError::NoActiveSurface));
    assert_eq!(f.evaluator.protection_state(), ProtectionState::Protected);
    assert!(f.surface.is_secure(), "detached surface must not be touched");
}

#[tokio::test]
async fn test_rejected_mutation_leaves_state_unprotected() {
    let f = fixture();
    f.surface.set_rejecting(true);

    let result = f.evaluator.enable_protection().await;

    assert!(matches!(result, Err(TrustError::Protection(_))));
    assert_eq!(f.evaluator.protection_state(), ProtectionState::Unprotected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_leave_flag_and_state_consistent() {
    // Arrange
    let f = fixture();

    // Act: race enables against disables.
    let mut handles = Vec::new();
    for i in 0..16 {
        let evaluator = f.evaluator.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                evaluator.enable_protection().await
            } else {
                evaluator.disable_protection().await
            }
        }));
    }
    for h in handles {
        h.await
            .expect("task must not panic")
            .expect("every request has a surface");
    }

    // Assert: the recorded state is exactly what the surface shows, and no
    // request produced more than one mutation.
    assert_eq!(
        f.evaluator.protection_state().is_protected(),
        f.surface.is_secure()
    );
    assert!(f.surface.mutation_count() <= 16);
}

#[tokio::test]
async fn test_initialize_through_bridge_protects_and_reports() {
    // Arrange
    let f = fixture();
    let bridge = HostBridge::new(f.evaluator.clone());

    // Act
    let response = bridge.call(BridgeOperation::Initialize).await;
    let summary = bridge
        .call(BridgeOperation::Summary)
        .await
        .data
        .expect("summary always carries data");

    // Assert
    assert!(response.success);
    let data = response.data.expect("initialize carries a record");
    assert_eq!(data.get_bool("initialized"), Some(true));
    assert_eq!(data.get_bool("screenshotProtectionEnabled"), Some(true));
    assert_eq!(data.get_str("model"), Some("Pixel 8"));
    assert!(f.surface.is_secure());
    assert!(summary.get_int("initializedAt").is_some());
    assert_eq!(summary.get_bool("screenshotProtectionEnabled"), Some(true));
}

#[tokio::test]
async fn test_bridge_disable_after_detach_reports_no_activity() {
    let f = fixture();
    let bridge = HostBridge::new(f.evaluator.clone());
    f.registry.detach();

    let response = bridge.call_by_name("disableProtection").await.unwrap();

    assert!(!response.success);
    assert_eq!(response.error_code(), Some("NO_ACTIVITY"));
}
