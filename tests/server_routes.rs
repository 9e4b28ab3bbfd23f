//! HTTP-contract tests for the router, without binding a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use geny::server::router;

fn test_config(api_key_env: &str) -> geny::Config {
    let mut config = geny::Config::minimal_for_testing();
    if let Some(chat) = config.llm.chat.as_mut() {
        chat.api_key_env = Some(api_key_env.to_string());
    }
    config
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = router(test_config("GENY_ROUTE_TEST_UNUSED"));

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

/// Missing credentials are a transport-level fault: the one case where the
/// chat endpoint does not answer 200.
#[tokio::test]
async fn chat_without_credentials_is_500_with_error_body() {
    let var = "GENY_ROUTE_TEST_MISSING_KEY";
    // SAFETY: test-scoped env mutation with a unique variable name
    unsafe {
        std::env::remove_var(var);
    }

    let app = router(test_config(var));

    let response = app
        .oneshot(
            Request::post("/geny-chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message": "faturamento"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains(var));
}

#[tokio::test]
async fn malformed_chat_body_is_a_client_error() {
    let app = router(test_config("GENY_ROUTE_TEST_UNUSED"));

    let response = app
        .oneshot(
            Request::post("/geny-chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = router(test_config("GENY_ROUTE_TEST_UNUSED"));

    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
