//! End-to-end flow over the HTTP router: bind, record loans, prove,
//! verify and read the resulting profile. Groth16 only, in-memory ledger.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use zk_credit_api::{
    create_router, routes::ADMIN_TOKEN_HEADER, AppState, Config, Groth16Backend, MemoryStore,
    ZKProver,
};

const ADMIN_TOKEN: &str = "integration-admin";
const BORROWER: &str = "0x1111111111111111111111111111111111111111";
const OTHER: &str = "0x2222222222222222222222222222222222222222";

fn app() -> Router {
    let vars: HashMap<&str, &str> = [("ADMIN_TOKEN", ADMIN_TOKEN)].into_iter().collect();
    let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    let prover = ZKProver::new(Arc::new(Groth16Backend::new()));
    create_router(AppState::new(config, Arc::new(MemoryStore::new()), prover))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, admin: bool) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if admin {
        builder = builder.header(ADMIN_TOKEN_HEADER, ADMIN_TOKEN);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn identity(byte: u8) -> String {
    format!("0x{}", hex::encode([byte; 32]))
}

#[tokio::test]
async fn test_repayment_proof_raises_score() {
    let app = app();

    // Nothing is bound yet
    let (status, body) = call(&app, "GET", &format!("/identity/{}/verified", BORROWER), None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);

    for (subject, byte) in [(BORROWER, 1u8), (OTHER, 2u8)] {
        let (status, body) = call(
            &app,
            "POST",
            "/identity/bind",
            Some(json!({ "subject": subject, "identity_hash": identity(byte) })),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["score"], 0);
    }

    for event in ["opened", "opened", "repaid", "repaid"] {
        let (status, _) = call(
            &app,
            "POST",
            &format!("/profile/{}/loans", BORROWER),
            Some(json!({ "event": event })),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, proof) = call(
        &app,
        "POST",
        "/proof/repayment",
        Some(json!({
            "subject": BORROWER,
            "threshold": 80,
            "total_loans": 2,
            "repaid_loans": 2
        })),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", proof);
    assert_eq!(proof["predicate"], "repayment");
    assert_eq!(proof["proof"]["system"], "groth16");

    let submission = |subject: &str| {
        json!({
            "subject": subject,
            "predicate": proof["predicate"],
            "proof": proof["proof"],
            "public_signals": proof["public_signals"],
        })
    };

    // Mutations require the admin header
    let (status, _) = call(&app, "POST", "/score/verify", Some(submission(BORROWER)), false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Proof was made for a different subject
    let (status, body) = call(&app, "POST", "/score/verify", Some(submission(OTHER)), true).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let (status, body) = call(&app, "POST", "/score/verify", Some(submission(BORROWER)), true).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["previous_score"], 0);
    assert_eq!(body["score"], 50);
    assert_eq!(body["tier"], 0);

    let (_, before) = call(&app, "GET", &format!("/profile/{}", BORROWER), None, false).await;

    let (status, _) = call(&app, "POST", "/score/verify", Some(submission(BORROWER)), true).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, "GET", &format!("/profile/{}", BORROWER), None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, before);
    assert_eq!(body["score"], 50);
    assert_eq!(body["total_loans"], 2);
    assert_eq!(body["repaid_loans"], 2);
    assert!(body.get("identity_hash").is_none());

    let (status, body) = call(&app, "GET", &format!("/identity/{}/verified", BORROWER), None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
}

#[tokio::test]
async fn test_collateral_and_policy() {
    let app = app();

    let (status, body) = call(&app, "GET", "/collateral/1/10", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collateral_ratio_bps"], 13500);
    assert_eq!(body["collateral"], "13.5");
    assert_eq!(body["collateral_ceil"], "14");

    let (status, _) = call(&app, "GET", "/collateral/7/10", None, false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/score/policy", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repayment_delta"], 50);
    assert_eq!(body["tier_breakpoints"], json!([250, 500, 750]));
}

#[tokio::test]
async fn test_unbound_subject_and_bad_input() {
    let app = app();

    let (status, _) = call(&app, "GET", &format!("/profile/{}", BORROWER), None, false).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/profile/not-an-address", None, false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/proof/wallet_age",
        Some(json!({ "subject": BORROWER, "threshold": 90 })),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/health", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledger"]["backend"], "memory");
}
