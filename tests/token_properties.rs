//! Property tests for the token engine

use std::sync::Arc;

use enroll_auth::auth::{decode, encode, ManualClock, Payload, TokenEngine, TokenError};
use proptest::prelude::*;
use serde_json::Value;

const NOW: i64 = 1_700_000_000;

fn engine() -> TokenEngine {
    TokenEngine::new(Arc::new(ManualClock::new(NOW)))
}

fn payload(subject: &str, count: i64) -> Payload {
    let mut payload = Payload::new();
    payload.insert("sub".to_string(), Value::from(subject));
    payload.insert("count".to_string(), Value::from(count));
    payload
}

proptest! {
    #[test]
    fn codec_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let encoded = encode(&bytes);
        prop_assert!(!encoded.contains('='));
        prop_assert!(!encoded.contains('+'));
        prop_assert!(!encoded.contains('/'));
        prop_assert_eq!(decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn issued_tokens_verify_with_same_secret(
        subject in "[a-zA-Z0-9@.]{1,32}",
        count in any::<i64>(),
        secret in "[ -~]{1,64}",
    ) {
        let engine = engine();
        let claims = payload(&subject, count);

        let token = engine.issue(&claims, &secret, Some("1h")).unwrap();
        let verified = engine.verify(&token, &secret).unwrap();

        prop_assert_eq!(verified.get("sub"), claims.get("sub"));
        prop_assert_eq!(verified.get("count"), claims.get("count"));
        prop_assert_eq!(verified.get("iat"), Some(&Value::from(NOW)));
        prop_assert_eq!(verified.get("exp"), Some(&Value::from(NOW + 3600)));
    }

    #[test]
    fn other_secret_never_verifies(
        secret in "[a-z]{8,16}",
        other in "[A-Z]{8,16}",
    ) {
        let engine = engine();
        let token = engine.issue(&payload("student", 1), &secret, None).unwrap();

        prop_assert_eq!(engine.verify(&token, &other), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn single_character_tamper_never_verifies(index in any::<prop::sample::Index>()) {
        let engine = engine();
        let token = engine.issue(&payload("student", 7), "secret", Some("15m")).unwrap();

        let position = index.index(token.len());
        let original = token.as_bytes()[position];
        let replacement = if original == b'A' { b'B' } else { b'A' };
        let mut tampered = token.clone().into_bytes();
        tampered[position] = replacement;
        let tampered = String::from_utf8(tampered).unwrap();

        let result = engine.verify(&tampered, "secret");
        prop_assert!(
            matches!(
                result,
                Err(TokenError::InvalidSignature)
                    | Err(TokenError::MalformedPayload)
                    | Err(TokenError::MalformedToken)
            ),
            "unexpected result {:?}",
            result
        );
    }
}
