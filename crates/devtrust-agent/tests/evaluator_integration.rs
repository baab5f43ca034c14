//! Integration tests for the detection operations.
//!
//! These tests drive `TrustEvaluator` end-to-end through its public API with
//! the in-memory `MockPlatform` standing in for the device.

use std::sync::Arc;
use std::time::{Duration, Instant};

use devtrust_agent::application::evaluator::{EvaluatorSettings, TrustEvaluator};
use devtrust_agent::application::platform::{SETTING_ADB_ENABLED, SETTING_DEVELOPMENT_ENABLED};
use devtrust_agent::infrastructure::platform::MockPlatform;
use devtrust_agent::infrastructure::surface::SurfaceRegistry;
use devtrust_agent::infrastructure::ui_thread::UiThreadExecutor;
use devtrust_core::{BuildProperty, IndicatorSet, TrustDecision};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn evaluator_with(platform: Arc<MockPlatform>, settings: EvaluatorSettings) -> TrustEvaluator {
    let executor = UiThreadExecutor::spawn().expect("UI looper must start");
    TrustEvaluator::new(
        platform,
        Arc::new(SurfaceRegistry::new()),
        Arc::new(executor),
        IndicatorSet::builtin(),
        settings,
    )
}

fn evaluator(platform: Arc<MockPlatform>) -> TrustEvaluator {
    evaluator_with(platform, EvaluatorSettings::default())
}

fn short_shell_timeout() -> EvaluatorSettings {
    EvaluatorSettings {
        shell_probe_timeout: Duration::from_millis(50),
        ..EvaluatorSettings::default()
    }
}

// ── Root detection ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_every_root_binary_path_is_named_in_the_reason() {
    for path in IndicatorSet::builtin().root_binary_paths {
        // Arrange
        let platform = Arc::new(MockPlatform::pixel());
        platform.add_file(&path);
        let e = evaluator(platform);

        // Act
        let verdict = e.check_root().await;

        // Assert
        assert!(verdict.detected, "{path} must trigger root detection");
        assert!(
            verdict.reason.contains(&path),
            "reason '{}' must name {path}",
            verdict.reason
        );
    }
}

#[tokio::test]
async fn test_clean_device_reports_not_rooted_with_build_tags() {
    let e = evaluator(Arc::new(MockPlatform::pixel()));

    let verdict = e.check_root().await;

    assert!(!verdict.detected);
    assert_eq!(verdict.reason, "device not rooted");
    assert_eq!(
        verdict.evidence.get("buildTags").map(String::as_str),
        Some("release-keys")
    );
}

#[tokio::test]
async fn test_hung_shell_lookup_resolves_within_bound() {
    // Arrange: nothing local triggers and the shell never answers.
    let platform = Arc::new(MockPlatform::pixel());
    platform.hang_commands();
    let e = evaluator_with(platform.clone(), short_shell_timeout());

    // Act
    let started = Instant::now();
    let verdict = tokio::time::timeout(Duration::from_secs(5), e.check_root())
        .await
        .expect("check_root must resolve despite a hung subprocess");

    // Assert
    assert!(!verdict.detected, "a timed-out probe counts as not triggered");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(platform.command_calls(), 1);
}

#[tokio::test]
async fn test_hung_shell_does_not_mask_local_evidence() {
    // Arrange
    let platform = Arc::new(MockPlatform::pixel());
    platform.hang_commands();
    platform.add_package("eu.chainfire.supersu");
    let e = evaluator_with(platform.clone(), short_shell_timeout());

    // Act
    let verdict = e.check_root().await;

    // Assert: the local probe decides and the shell is never started.
    assert!(verdict.detected);
    assert!(verdict.reason.contains("eu.chainfire.supersu"));
    assert_eq!(platform.command_calls(), 0);
}

#[tokio::test]
async fn test_slow_package_lookups_leave_the_runtime_responsive() {
    // Arrange: every `pm path` lookup blocks for 300 ms.
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_package_latency(Duration::from_millis(300));
    let e = evaluator(platform);

    // Act
    let started = Instant::now();
    let outcome = tokio::time::timeout(Duration::from_millis(200), e.check_root()).await;
    let elapsed = started.elapsed();

    // Assert: the caller's own deadline fires on time.
    assert!(outcome.is_err(), "blocking lookups must not hold the runtime thread");
    assert!(elapsed < Duration::from_millis(1000), "timeout fired after {elapsed:?}");
}

#[tokio::test]
async fn test_slow_package_lookups_still_find_root_apps() {
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_package_latency(Duration::from_millis(5));
    platform.add_package("com.koushikdutta.superuser");
    let e = evaluator(platform);

    let verdict = e.check_root().await;

    assert!(verdict.detected);
    assert!(verdict.reason.contains("com.koushikdutta.superuser"));
}

#[test]
fn test_privileged_shell_detected_from_sync_context() {
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_command_output("which", true, "/system/xbin/su\n");
    let e = evaluator(platform);

    let verdict = tokio_test::block_on(e.check_root());

    assert!(verdict.detected);
    assert!(verdict.reason.contains("su"));
}

// ── Emulator detection ────────────────────────────────────────────────────────

#[test]
fn test_test_keys_fingerprint_is_not_an_emulator_signal() {
    // Arrange: a retail device built with test keys.
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_property(
        BuildProperty::Fingerprint,
        "google/shiba/shiba:14/AP1A.240305.019/11445710:userdebug/test-keys",
    );
    platform.set_property(BuildProperty::Tags, "test-keys");
    let e = evaluator(platform);

    // Act
    let emulator = e.check_emulator();
    let root = tokio_test::block_on(e.check_root());

    // Assert: only the root check cares about test keys.
    assert!(!emulator.detected);
    assert_eq!(emulator.reason, "genuine device");
    assert!(root.detected);
    assert!(root.reason.contains("test-keys"));
}

#[test]
fn test_studio_emulator_is_detected_with_evidence() {
    let e = evaluator(Arc::new(MockPlatform::studio_emulator()));

    let verdict = e.check_emulator();

    assert!(verdict.detected);
    assert_eq!(
        verdict.evidence.get("model").map(String::as_str),
        Some("sdk_gphone64_x86_64")
    );
    assert!(verdict.evidence.contains_key("fingerprint"));
    assert!(verdict.evidence.contains_key("manufacturer"));
}

// ── Developer options ─────────────────────────────────────────────────────────

#[test]
fn test_developer_options_reasons_join_in_order() {
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_setting(SETTING_ADB_ENABLED, 1);
    platform.set_setting(SETTING_DEVELOPMENT_ENABLED, 1);
    let e = evaluator(platform);

    let verdict = e.check_developer_options();

    assert!(verdict.detected);
    assert_eq!(verdict.reason, "USB debugging enabled, developer options enabled");
}

#[test]
fn test_single_developer_option_reason_has_no_separator() {
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_setting(SETTING_DEVELOPMENT_ENABLED, 1);
    let e = evaluator(platform);

    let verdict = e.check_developer_options();

    assert_eq!(verdict.reason, "developer options enabled");
    assert_eq!(
        verdict.evidence.get("usbDebuggingEnabled").map(String::as_str),
        Some("false")
    );
}

// ── Assessment ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_developer_options_alone_only_warns() {
    // High severity warns at the enterprise level.
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_setting(SETTING_ADB_ENABLED, 1);
    let e = evaluator(platform);

    let assessment = e.assess().await;

    assert_eq!(assessment.violations.len(), 1);
    assert_eq!(assessment.decision, TrustDecision::Warn);
}

#[tokio::test]
async fn test_assess_with_slow_package_lookups_honours_caller_deadline() {
    // Arrange
    let platform = Arc::new(MockPlatform::pixel());
    platform.set_package_latency(Duration::from_millis(300));
    let e = evaluator(platform);

    // Act
    let started = Instant::now();
    let outcome = tokio::time::timeout(Duration::from_millis(200), e.assess()).await;

    // Assert
    assert!(outcome.is_err());
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_rooted_emulator_blocks_and_updates_summary() {
    let platform = Arc::new(MockPlatform::studio_emulator());
    platform.add_file("/system/xbin/su");
    let e = evaluator(platform);

    let assessment = e.assess().await;
    let summary = e.summary();

    assert_eq!(assessment.decision, TrustDecision::Block);
    assert_eq!(assessment.violations.len(), 2);
    assert_eq!(summary.violation_count, 1, "one failing assessment");
    assert!(summary.last_check_ms.is_some());
    assert!(summary.initialized_at_ms.is_none());
}
