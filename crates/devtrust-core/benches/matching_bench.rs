//! Criterion benchmarks for the emulator matchers.
//!
//! The build-identity and hardware-name matchers run on every emulator check,
//! which hosts may call on each screen that shows sensitive content.
//!
//! Run with:
//! ```bash
//! cargo bench --package devtrust-core --bench matching_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use devtrust_core::domain::matching::{match_build_identity, match_hardware_name};
use devtrust_core::{BuildIdentity, IndicatorSet};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn real_device() -> BuildIdentity {
    BuildIdentity {
        fingerprint: "samsung/dm3qxxx/dm3q:14/UP1A.231005.007/S918BXXS3BWK5:user/release-keys"
            .to_string(),
        model: "SM-S918B".to_string(),
        manufacturer: "samsung".to_string(),
        brand: "samsung".to_string(),
        device: "dm3q".to_string(),
        product: "dm3qxxx".to_string(),
    }
}

fn emulator() -> BuildIdentity {
    BuildIdentity {
        fingerprint: concat!(
            "google/sdk_gphone64_x86_64/emu64x:14/",
            "UE1A.230829.036/10762838:userdebug/dev-keys"
        )
        .to_string(),
        model: "sdk_gphone64_x86_64".to_string(),
        manufacturer: "Google".to_string(),
        brand: "google".to_string(),
        device: "emu64x".to_string(),
        product: "sdk_gphone64_x86_64".to_string(),
    }
}

// ── Benchmarks: build identity ────────────────────────────────────────────────

/// Real devices walk every rule without a hit: the worst case.
fn bench_build_identity(c: &mut Criterion) {
    let set = IndicatorSet::builtin();
    let real = real_device();
    let emu = emulator();
    let mut group = c.benchmark_group("match_build_identity");

    group.bench_function("real_device_no_match", |b| {
        b.iter(|| match_build_identity(black_box(&real), black_box(&set)))
    });

    group.bench_function("emulator", |b| {
        b.iter(|| match_build_identity(black_box(&emu), black_box(&set)))
    });

    group.finish();
}

// ── Benchmarks: hardware name ─────────────────────────────────────────────────

/// Scaling of the hardware matcher with the indicator list length.
fn bench_hardware_name_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_hardware_name_scaling");

    for &extra in &[0usize, 16, 64] {
        let mut set = IndicatorSet::builtin();
        set.emulator_hardware
            .extend((0..extra).map(|i| format!("vendor_emu_{i}")));

        group.bench_with_input(
            BenchmarkId::new("indicators", set.emulator_hardware.len()),
            &set,
            |b, set| {
                b.iter(|| {
                    match_hardware_name(
                        black_box("dm3q"),
                        black_box("dm3qxxx"),
                        black_box(&set.emulator_hardware),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_build_identity, bench_hardware_name_scaling);
criterion_main!(benches);
