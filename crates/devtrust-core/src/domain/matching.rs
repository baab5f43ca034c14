//! Case-insensitive matchers for build identity and hardware names.
//!
//! These run on every emulator check, so they are kept allocation-light: each
//! field is lower-cased once per call and every marker is compared against the
//! lowered copy.  Empty markers are ignored because an empty needle would
//! match every haystack.

use super::build::BuildIdentity;
use super::indicators::IndicatorSet;

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn first_marker_in<'a>(field: &str, markers: &'a [String]) -> Option<&'a str> {
    if field.is_empty() {
        return None;
    }
    let lowered = field.to_ascii_lowercase();
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .find(|m| lowered.contains(&m.to_ascii_lowercase()))
        .map(String::as_str)
}

/// Checks the build identity against the emulator markers.
///
/// Rules are evaluated in a fixed order (fingerprint, model, manufacturer,
/// generic brand+device, product id) and the first matching rule's
/// description is returned.
pub fn match_build_identity(identity: &BuildIdentity, set: &IndicatorSet) -> Option<String> {
    if let Some(m) = first_marker_in(&identity.fingerprint, &set.fingerprint_markers) {
        return Some(format!("build fingerprint contains emulator marker '{m}'"));
    }
    if let Some(m) = first_marker_in(&identity.model, &set.model_markers) {
        return Some(format!("model contains emulator marker '{m}'"));
    }
    if let Some(m) = first_marker_in(&identity.manufacturer, &set.manufacturer_markers) {
        return Some(format!("manufacturer contains emulator marker '{m}'"));
    }
    if starts_with_ignore_case(&identity.brand, &set.generic_prefix)
        && starts_with_ignore_case(&identity.device, &set.generic_prefix)
    {
        return Some(format!(
            "brand and device both carry the '{}' prefix",
            set.generic_prefix
        ));
    }
    if !identity.product.is_empty() {
        if let Some(p) = set
            .emulator_products
            .iter()
            .find(|p| !p.is_empty() && p.eq_ignore_ascii_case(&identity.product))
        {
            return Some(format!("product is emulator image '{p}'"));
        }
    }
    None
}

/// Returns the first hardware indicator contained in `device` or `product`.
///
/// Indicators are tried in list order; for each indicator the device name is
/// checked before the product name.
pub fn match_hardware_name<'a>(
    device: &str,
    product: &str,
    indicators: &'a [String],
) -> Option<&'a str> {
    let device = device.to_ascii_lowercase();
    let product = product.to_ascii_lowercase();
    indicators
        .iter()
        .filter(|i| !i.is_empty())
        .find(|i| {
            let needle = i.to_ascii_lowercase();
            device.contains(&needle) || product.contains(&needle)
        })
        .map(String::as_str)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
