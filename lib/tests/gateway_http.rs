//! End-to-end tests of the reqwest transport against a wiremock server.

use std::time::Duration;

use gateway::{FixedJitter, Gateway, GatewayConfig, GatewayError, RequestOptions, ResponseBody, RetryPolicy, Route};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer, retries: u32) -> Gateway {
    let config = GatewayConfig::new()
        .with_base_url(server.uri())
        .with_token("test-token")
        .with_timeout(Duration::from_secs(2))
        .with_retry(
            RetryPolicy::new(retries, Duration::from_millis(5)).with_jitter(FixedJitter(Duration::ZERO)),
        );
    Gateway::new(config).unwrap()
}

#[tokio::test]
async fn test_post_sends_json_with_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/integrations/news/fetch"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"source_name": "Receita Federal"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created_count": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0);
    let body = gateway
        .post(Route::FetchRealNews, &json!({"source_name": "Receita Federal"}))
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Json(json!({"created_count": 0})));
}

#[tokio::test]
async fn test_no_content_yields_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/news/clear"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0);
    let body = gateway.post(Route::ClearAllNews, &json!({})).await.unwrap();

    assert_eq!(body, ResponseBody::Empty);
}

#[tokio::test]
async fn test_plain_text_body_is_returned_raw() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/integrations/teams/send-test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0);
    let body = gateway.post(Route::SendToTeams, &json!({})).await.unwrap();

    assert_eq!(body, ResponseBody::Text("queued".to_string()));
}

#[tokio::test]
async fn test_service_unavailable_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sources/reset"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sources/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sources": []})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 2);
    let body = gateway.post(Route::ResetSources, &json!({})).await.unwrap();

    assert_eq!(body, ResponseBody::Json(json!({"sources": []})));
}

#[tokio::test]
async fn test_not_found_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/integrations/email/send-test"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such list"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 3);
    let err = gateway.post(Route::SendToEmail, &json!({})).await.unwrap_err();

    match err {
        GatewayError::Http { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such list");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/integrations/news/verify-dates"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0);
    let err = gateway
        .request(
            Route::VerifyNewsDates,
            RequestOptions::default().with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}
