//! Property-based tests for vpu-updater.
//!
//! # Properties Tested
//!
//! - Cache path determinism: the same URI always maps to the same file,
//!   named after the URI's final segment
//! - Label isolation: surrounding entries never leak into the selected one
//! - Verification mapping: only exit 0 with empty stdout is a pass

#![cfg(test)]

use proptest::prelude::*;

use crate::cache::{filename_from_uri, CacheResolver};
use crate::locator::find_release_entry;
use crate::platform::PlatformLabel;
use crate::verify::{interpret, ToolOutput, VerificationOutcome};

// =============================================================================
// Generators
// =============================================================================

/// Generate a plain file name such as `app_3.1-2_amd64.deb`.
fn arb_file_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}(\\.[a-z0-9]{1,4}){0,2}"
}

/// Generate a URI path prefix of zero to three directories.
fn arb_dirs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9]{1,8}", 0..3)
}

/// Generate an index into the supported platform labels.
fn arb_platform() -> impl Strategy<Value = PlatformLabel> {
    (0..PlatformLabel::ALL.len()).prop_map(|i| PlatformLabel::ALL[i])
}

fn option_markup(label: PlatformLabel, index: usize, signed: bool) -> String {
    let installer = format!("https://dl.example/{}/pkg-{}.bin", index, index);
    if signed {
        format!(
            "<option value=\"{0}\" data-signature-uri=\"{0}.sig\">{1}</option>",
            installer, label
        )
    } else {
        format!("<option value=\"{}\">{}</option>", installer, label)
    }
}

// =============================================================================
// Cache path determinism
// =============================================================================

proptest! {
    #[test]
    fn prop_cache_path_is_deterministic(
        dirs in arb_dirs(),
        name in arb_file_name(),
        query in proptest::option::of("[a-z]{1,5}=[0-9]{1,5}"),
    ) {
        let mut uri = format!("https://vendor.example/{}", dirs.join("/"));
        if !dirs.is_empty() {
            uri.push('/');
        }
        uri.push_str(&name);
        if let Some(query) = query {
            uri.push('?');
            uri.push_str(&query);
        }

        let cache = tempfile::tempdir().unwrap();
        let resolver = CacheResolver::new(cache.path(), cache.path());
        let first = resolver.resolve(&uri).unwrap();
        let second = resolver.resolve(&uri).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.path, cache.path().join(&name));
        prop_assert_eq!(filename_from_uri(&uri), Some(name));
    }
}

// =============================================================================
// Label isolation
// =============================================================================

proptest! {
    #[test]
    fn prop_selected_label_extracts_only_its_entry(
        chosen in arb_platform(),
        signed in prop::collection::vec(any::<bool>(), 6),
        rotation in 0usize..6,
    ) {
        let mut labels = PlatformLabel::ALL.to_vec();
        labels.rotate_left(rotation);

        let html: String = labels
            .iter()
            .enumerate()
            .map(|(i, label)| option_markup(*label, i, signed[i]))
            .collect();
        let html = format!("<select>{}</select>", html);

        let index = labels.iter().position(|l| *l == chosen).unwrap();
        let expected = format!("https://dl.example/{}/pkg-{}.bin", index, index);
        let entry = find_release_entry(&html, chosen.as_str(), "https://vendor.example/latest");

        prop_assert_eq!(entry.installer_uri.as_deref(), Some(expected.as_str()));
        if signed[index] {
            prop_assert_eq!(entry.signature_uri, Some(format!("{}.sig", expected)));
        } else {
            prop_assert_eq!(entry.signature_uri, None);
        }
    }
}

// =============================================================================
// Verification mapping
// =============================================================================

proptest! {
    #[test]
    fn prop_only_clean_success_verifies(
        code in proptest::option::of(-2i32..4),
        stdout in prop::collection::vec(any::<u8>(), 0..16),
        stderr in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let output = ToolOutput { exit_code: code, stdout: stdout.clone(), stderr };
        let outcome = interpret(&output);
        let expect_verified = code == Some(0) && stdout.is_empty();
        prop_assert_eq!(outcome == VerificationOutcome::Verified, expect_verified);
    }
}
