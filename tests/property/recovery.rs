//! Property-based tests for structured-output recovery and retry backoff

use coursegen::recovery::{recover_json, RecoveryStrategy};
use coursegen::retry::RetryPolicy;
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::time::Duration;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z {}\\[\\],:]{0,16}".prop_map(Value::from),
    ]
}

fn object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", leaf(), 1..6)
        .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>()))
}

fn int_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i32>().prop_map(Value::from), 1..6)
        .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>()))
}

proptest! {
    #[test]
    fn clean_json_is_recovered_directly(value in object()) {
        let text = serde_json::to_string_pretty(&value).unwrap();
        let recovered = recover_json(&text).unwrap();
        prop_assert_eq!(recovered.strategy, RecoveryStrategy::Direct);
        prop_assert_eq!(recovered.value, value);
    }

    #[test]
    fn fenced_json_inside_prose_is_isolated(value in object(), lead in "[A-Za-z][A-Za-z ,.!]{0,30}") {
        let text = format!("{}\n```json\n{}\n```\nLet me know if you need more.", lead, value);
        let recovered = recover_json(&text).unwrap();
        prop_assert_eq!(recovered.strategy, RecoveryStrategy::Isolated);
        prop_assert_eq!(recovered.value, value);
    }

    #[test]
    fn unfenced_json_inside_prose_is_isolated(value in object(), lead in "[A-Za-z][A-Za-z ,.!]{0,30}") {
        let text = format!("{} {} Hope that helps.", lead, value);
        let recovered = recover_json(&text).unwrap();
        prop_assert_eq!(recovered.strategy, RecoveryStrategy::Isolated);
        prop_assert_eq!(recovered.value, value);
    }

    #[test]
    fn trailing_comma_is_repaired(value in int_object()) {
        let compact = serde_json::to_string(&value).unwrap();
        let broken = format!("{},}}", &compact[..compact.len() - 1]);
        let recovered = recover_json(&broken).unwrap();
        prop_assert_eq!(recovered.strategy, RecoveryStrategy::Repaired);
        prop_assert_eq!(recovered.value, value);
    }

    #[test]
    fn recovery_never_yields_a_scalar(text in any::<String>()) {
        if let Ok(recovered) = recover_json(&text) {
            prop_assert!(recovered.value.is_object() || recovered.value.is_array());
        }
    }

    #[test]
    fn recovery_is_deterministic(text in "[ -~\n]{0,80}") {
        let first = recover_json(&text).ok();
        let second = recover_json(&text).ok();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn backoff_grows_until_capped(initial_ms in 1u64..2_000, attempts in 1u32..12) {
        let policy = RetryPolicy {
            max_attempts: 12,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_secs(30),
        };
        let current = policy.delay_after(attempts);
        let next = policy.delay_after(attempts + 1);
        prop_assert!(next >= current);
        prop_assert!(next <= policy.max_delay);
        prop_assert_eq!(policy.delay_after(1), Duration::from_millis(initial_ms));
    }
}
