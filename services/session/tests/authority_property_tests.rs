//! Property-based tests for pair issuance and rotation.

mod common;

use common::{cheap_config, harness};
use proptest::prelude::*;
use session_service::{SessionError, SessionManager};
use uuid::Uuid;

fn arb_identity() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_address() -> impl Strategy<Value = String> {
    (any::<u8>(), any::<u8>(), any::<u8>(), 1u8..255).prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

/// Replace the character at `index` (mod len) with a different base64 character.
fn alter_one(secret: &str, index: usize) -> String {
    let mut chars: Vec<char> = secret.chars().collect();
    let i = index % chars.len();
    chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Issuing then refreshing always yields a different token id and secret,
    /// and the access token carries the identity and address it was issued for.
    #[test]
    fn prop_rotation_yields_fresh_pair(identity in arb_identity(), address in arb_address()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = harness(&cheap_config());
            let pair = h.authority.create_pair(identity, &address).await.unwrap();
            let access = h.authority.verify_access_token(&pair.access_token, &address).unwrap();
            prop_assert_eq!(access.identity, identity);
            prop_assert_eq!(&access.bound_address, &address);

            let rotated = h.authority.refresh(&access, &pair.refresh_token, &address).await.unwrap();
            let next = h.authority.verify_access_token(&rotated.access_token, &address).unwrap();
            prop_assert_ne!(next.token_id, access.token_id);
            prop_assert_ne!(rotated.refresh_token, pair.refresh_token);

            Ok(())
        })?;
    }

    /// Any single-character alteration of the secret is rejected as invalid
    /// and leaves the genuine secret usable.
    #[test]
    fn prop_altered_secret_is_invalid(identity in arb_identity(), index in any::<usize>()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = harness(&cheap_config());
            let pair = h.authority.create_pair(identity, "10.1.1.1").await.unwrap();
            let access = h.authority.verify_access_token(&pair.access_token, "10.1.1.1").unwrap();

            let altered = alter_one(&pair.refresh_token, index);
            let result = h.authority.refresh(&access, &altered, "10.1.1.1").await;
            prop_assert!(matches!(result, Err(SessionError::Invalid(_))));
            prop_assert!(h.authority.refresh(&access, &pair.refresh_token, "10.1.1.1").await.is_ok());

            Ok(())
        })?;
    }

    /// A secret succeeds at most once however many times it is replayed.
    #[test]
    fn prop_secret_is_single_use(replays in 1usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = harness(&cheap_config());
            let pair = h.authority.create_pair(Uuid::new_v4(), "10.1.1.1").await.unwrap();
            let access = h.authority.verify_access_token(&pair.access_token, "10.1.1.1").unwrap();

            prop_assert!(h.authority.refresh(&access, &pair.refresh_token, "10.1.1.1").await.is_ok());
            for _ in 0..replays {
                let result = h.authority.refresh(&access, &pair.refresh_token, "10.1.1.1").await;
                prop_assert!(matches!(result, Err(SessionError::AlreadyUsed)));
            }

            Ok(())
        })?;
    }
}
