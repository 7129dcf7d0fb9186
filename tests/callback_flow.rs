mod support;

use std::sync::Arc;

use linked_role_gate::{CallbackError, EntitlementFlag, EntitlementFlags};
use support::{processor, Call, FakePlatform};

#[tokio::test]
async fn scenario_a_premium_user_gets_premium_flag() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082"));
    let outcome = processor(platform.clone())
        .process("code-a", "abc", Some("abc"))
        .await
        .expect("premium user accepted");

    assert_eq!(outcome.user_id, "563697359423406082");
    assert_eq!(
        outcome.flags,
        EntitlementFlags::single(EntitlementFlag::LumiPremium)
    );
    assert_eq!(
        platform.calls(),
        vec![Call::ExchangeCode, Call::FetchIdentity, Call::PushMetadata]
    );
    assert_eq!(
        serde_json::to_value(&platform.records()["563697359423406082"]).expect("json"),
        serde_json::json!({ "lumipremium": true })
    );
}

#[tokio::test]
async fn scenario_b_premium_takes_priority_over_owner() {
    let platform = Arc::new(FakePlatform::for_user("811314363830501427"));
    let outcome = processor(platform.clone())
        .process("code-b", "abc", Some("abc"))
        .await
        .expect("premium+owner user accepted");

    assert_eq!(outcome.flags.get(EntitlementFlag::LumiPremium), Some(true));
    assert_eq!(outcome.flags.get(EntitlementFlag::ServerOwner), None);
    assert_eq!(
        serde_json::to_value(&platform.records()["811314363830501427"]).expect("json"),
        serde_json::json!({ "lumipremium": true })
    );
}

#[tokio::test]
async fn scenario_c_unknown_user_is_rejected_without_push() {
    let platform = Arc::new(FakePlatform::for_user("999999999999999999"));
    let err = processor(platform.clone())
        .process("code-c", "abc", Some("abc"))
        .await
        .expect_err("unknown user rejected");

    match err {
        CallbackError::Unauthorized { user_id } => assert_eq!(user_id, "999999999999999999"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(platform.calls_of(Call::PushMetadata), 0);
    assert!(platform.records().is_empty());
}

#[tokio::test]
async fn scenario_d_state_mismatch_stops_before_token_exchange() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082"));
    let err = processor(platform.clone())
        .process("code-d", "abc", Some("xyz"))
        .await
        .expect_err("mismatch rejected");

    assert!(matches!(err, CallbackError::StateMismatch));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn scenario_e_token_exchange_failure_skips_identity_fetch() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082").failing_exchange());
    let err = processor(platform.clone())
        .process("code-e", "abc", Some("abc"))
        .await
        .expect_err("exchange failure surfaces");

    assert!(matches!(err, CallbackError::TokenExchangeFailed(_)));
    assert!(err.is_platform_failure());
    assert!(err.to_string().contains("status=400"));
    assert_eq!(platform.calls(), vec![Call::ExchangeCode]);
}

#[tokio::test]
async fn state_is_checked_before_any_network_call_for_every_user() {
    for user_id in [
        "563697359423406082",
        "811314363830501427",
        "1167048853451706439",
        "999999999999999999",
    ] {
        for (returned, persisted) in [("abc", Some("xyz")), ("abc", None), ("", Some("abc"))] {
            let platform = Arc::new(FakePlatform::for_user(user_id));
            let err = processor(platform.clone())
                .process("valid-code", returned, persisted)
                .await
                .expect_err("state rejected");
            assert!(matches!(err, CallbackError::StateMismatch));
            assert!(platform.calls().is_empty(), "no calls for {user_id}");
        }
    }
}

#[tokio::test]
async fn padded_state_does_not_match() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082"));
    let err = processor(platform.clone())
        .process("c", " abc ", Some("abc"))
        .await
        .expect_err("padded state rejected");
    assert!(matches!(err, CallbackError::StateMismatch));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn missing_code_is_rejected_after_state_check() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082"));
    let err = processor(platform.clone())
        .process("  ", "abc", Some("abc"))
        .await
        .expect_err("missing code");
    assert!(matches!(err, CallbackError::MissingCode));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn identity_failure_skips_authorization_and_push() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082").failing_identity());
    let err = processor(platform.clone())
        .process("code", "abc", Some("abc"))
        .await
        .expect_err("identity failure");
    assert!(matches!(err, CallbackError::IdentityFetchFailed(_)));
    assert_eq!(platform.calls_of(Call::PushMetadata), 0);
}

#[tokio::test]
async fn push_failure_is_reported_as_metadata_push_failed() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082").failing_push());
    let err = processor(platform.clone())
        .process("code", "abc", Some("abc"))
        .await
        .expect_err("push failure");
    assert!(matches!(err, CallbackError::MetadataPushFailed(_)));
    assert_eq!(err.code(), "LR_METADATA_PUSH_FAILED");
}

#[tokio::test]
async fn repeated_push_leaves_a_single_identical_record() {
    let platform = Arc::new(FakePlatform::for_user("563697359423406082"));
    let processor = processor(platform.clone());

    processor
        .process("code-1", "s1", Some("s1"))
        .await
        .expect("first");
    let first = platform.records();
    processor
        .process("code-2", "s2", Some("s2"))
        .await
        .expect("second");

    assert_eq!(platform.calls_of(Call::PushMetadata), 2);
    assert_eq!(platform.records().len(), 1);
    assert_eq!(platform.records(), first);
}

#[tokio::test]
async fn bughunter_only_user_is_denied() {
    // Known gap: the bug-hunter list exists but never admits a user in the callback path.
    let platform = Arc::new(FakePlatform::for_user("1167048853451706439"));
    let err = processor(platform.clone())
        .process("code", "abc", Some("abc"))
        .await
        .expect_err("bughunter denied");
    assert!(matches!(err, CallbackError::Unauthorized { .. }));
    assert_eq!(platform.calls_of(Call::PushMetadata), 0);
}
