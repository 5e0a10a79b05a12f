//! Timing characterization of the comparison and login paths
//!
//! These compare medians with generous bounds; they catch an early-exit
//! comparator or a login path that skips the hasher, not nanosecond leaks.

use std::sync::Arc;
use userbase_core::auth::{constant_time_digest_compare, Authenticator};
use userbase_core::config::{EncryptionConfig, SigningSecret, TokenConfig};
use userbase_core::test_utils::{random_bytes, PerfTestHarness, TEST_SECRET};
use userbase_core::*;

fn ratio(a: std::time::Duration, b: std::time::Duration) -> f64 {
    a.as_nanos().max(1) as f64 / b.as_nanos().max(1) as f64
}

fn flip_at(digest: &PasswordDigest, position: usize) -> PasswordDigest {
    let mut bytes = digest.as_str().to_string().into_bytes();
    bytes[position] = if bytes[position] == b'0' { b'1' } else { b'0' };
    PasswordDigest::from_hex(String::from_utf8(bytes).unwrap())
}

#[test]
fn test_digest_compare_time_independent_of_mismatch_position() {
    let stored = PasswordDigest::from_hex(hex::encode(random_bytes(64)));
    let end = stored.as_str().len() - 1;
    let positions = [0, end / 4, end / 2, 3 * end / 4, end];

    let harness = PerfTestHarness::new().with_warmup(1_000).with_iterations(20_000);
    let medians: Vec<_> = positions
        .iter()
        .map(|&position| {
            let candidate = flip_at(&stored, position);
            harness
                .run(|| {
                    std::hint::black_box(constant_time_digest_compare(&candidate, &stored));
                })
                .p50()
        })
        .collect();

    let fastest = *medians.iter().min().unwrap();
    let slowest = *medians.iter().max().unwrap();
    let r = ratio(slowest, fastest);
    assert!(
        r <= 4.0,
        "median ratio {:.2} across mismatch positions {:?}: {:?}",
        r,
        positions,
        medians
    );
}

#[test]
fn test_unknown_user_costs_a_hash() {
    let config = AuthConfig::new(
        EncryptionConfig {
            iterations: 2_000,
            ..Default::default()
        },
        TokenConfig::with_secret(SigningSecret::new(TEST_SECRET)),
    )
    .unwrap();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let store = Arc::new(MemoryUserStore::new());
    let auth = Authenticator::new(store.clone(), &config);
    rt.block_on(async {
        store
            .insert(UserDraft {
                username: "alice@example.com".to_string(),
                password: auth.hasher().hash("secret123").unwrap(),
                first_name: "Alice".to_string(),
                last_name: "Liddell".to_string(),
            })
            .await
            .unwrap();
    });

    let harness = PerfTestHarness::new().with_warmup(5).with_iterations(50);
    let wrong = Credentials::new("alice@example.com", "wrong-password");
    let unknown = Credentials::new("nobody@example.com", "wrong-password");

    let mut wrong_password = harness.run(|| {
        assert!(rt.block_on(auth.check_credentials(&wrong)).is_err());
    });
    let mut unknown_user = harness.run(|| {
        assert!(rt.block_on(auth.check_credentials(&unknown)).is_err());
    });

    let r = ratio(unknown_user.p50(), wrong_password.p50());
    assert!(
        r > 0.5,
        "unknown user took {:.2}x the wrong-password time",
        r
    );
}
