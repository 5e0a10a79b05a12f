//! Property-based tests for the userbase credential core

use proptest::prelude::*;
use userbase_core::auth::*;
use userbase_core::config::{DigestAlgorithm, SigningSecret, TokenAlgorithm, TokenConfig};
use userbase_core::validation::validate_new_user;
use userbase_core::*;

fn token_config(secret: &[u8]) -> TokenConfig {
    TokenConfig::with_secret(SigningSecret::new(secret.to_vec()))
}

proptest! {
    #[test]
    fn props_digest_is_deterministic(
        password in ".{0,64}",
        salt in "[a-z]{1,16}",
        key_length in 1usize..128,
    ) {
        let a = derive_digest(&password, &salt, 1, key_length, DigestAlgorithm::Sha256).unwrap();
        let b = derive_digest(&password, &salt, 1, key_length, DigestAlgorithm::Sha256).unwrap();

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.as_str().len(), key_length * 2);
        prop_assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn props_different_salts_give_different_digests(
        password in "[a-z]{5,20}",
        salt_a in "[a-m]{4,8}",
        salt_b in "[n-z]{4,8}",
    ) {
        let a = derive_digest(&password, &salt_a, 1, 32, DigestAlgorithm::Sha512).unwrap();
        let b = derive_digest(&password, &salt_b, 1, 32, DigestAlgorithm::Sha512).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn props_compare_matches_equality(
        a in prop::collection::vec(any::<u8>(), 0..64),
        b in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        prop_assert!(constant_time_compare(&a, &a));
        prop_assert_eq!(constant_time_compare(&a, &b), a == b);
    }

    #[test]
    fn props_basic_header_round_trip(
        username in "[a-z0-9.@_-]{1,32}",
        password in "[ -~]{1,48}",
    ) {
        let header = basic_header_value(&username, &password);
        let credentials = extract_basic_credentials(Some(&header)).unwrap();

        prop_assert_eq!(credentials.username, username);
        prop_assert_eq!(credentials.plain_password, password);
    }

    #[test]
    fn props_token_round_trip(
        id in 1u64..1_000_000,
        username in "[a-z]{1,12}@[a-z]{1,8}\\.io",
        first_name in "[A-Z][a-z]{1,10}",
        secret in prop::collection::vec(any::<u8>(), 12..64),
    ) {
        let config = token_config(&secret);
        let subject = UserClaims {
            id,
            username,
            first_name,
            last_name: "Liddell".to_string(),
        };

        let token = TokenIssuer::new(&config).issue(&subject).unwrap();
        let claims = TokenVerifier::new(&config).verify(token.token()).unwrap();

        prop_assert_eq!(claims.subject, subject);
        prop_assert_eq!(claims.expires_at, token.expires_at());
        prop_assert_eq!(token.expires_at() - token.issued_at(), 4 * 60 * 60);
    }

    #[test]
    fn props_token_from_other_secret_is_rejected(
        secret_a in prop::collection::vec(any::<u8>(), 12..48),
        secret_b in prop::collection::vec(any::<u8>(), 12..48),
    ) {
        prop_assume!(secret_a != secret_b);

        let subject = UserClaims {
            id: 1,
            username: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        };
        let token = TokenIssuer::new(&token_config(&secret_a)).issue(&subject).unwrap();
        let err = TokenVerifier::new(&token_config(&secret_b)).verify(token.token()).unwrap_err();

        prop_assert_eq!(err.auth_failure(), Some(AuthFailure::BadSignature));
    }

    #[test]
    fn props_well_formed_registrations_validate(
        local in "[a-z0-9]{1,12}",
        domain in "[a-z]{1,12}",
        tld in "[a-z]{2,4}",
        password in "[a-zA-Z0-9]{5,64}",
        first_name in "[A-Z][a-z]{1,12}",
        last_name in "[A-Z][a-z]{1,12}",
    ) {
        let request = NewUser {
            username: Some(format!("{}@{}.{}", local, domain, tld)),
            password: Some(password),
            first_name: Some(first_name),
            last_name: Some(last_name),
        };
        prop_assert!(validate_new_user(&request).is_ok());
    }

    #[test]
    fn props_short_passwords_are_rejected(password in "[a-z]{0,4}") {
        let request = NewUser {
            username: Some("alice@example.com".to_string()),
            password: Some(password),
            first_name: Some("Alice".to_string()),
            last_name: Some("Liddell".to_string()),
        };
        let err = validate_new_user(&request).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_signing_algorithm_outside_allow_list_fails_verification() {
    let mut signer = token_config(b"shared-signing-secret");
    signer.algorithm = TokenAlgorithm::HS384;
    signer.allowed_algorithms = vec![TokenAlgorithm::HS384];

    let subject = UserClaims {
        id: 1,
        username: "alice@example.com".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
    };
    let token = TokenIssuer::new(&signer).issue(&subject).unwrap();

    let err = TokenVerifier::new(&token_config(b"shared-signing-secret")).verify(token.token()).unwrap_err();
    assert_eq!(err.auth_failure(), Some(AuthFailure::AlgorithmNotAllowed));
}
