use std::time::Duration;

use companion_core::{
    ApiGateway, CompanionError, GatewayEnvelope, HttpTemplateService, OpenAIGateway,
    ProxyGateway, TemplateService,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_BODY: &str = r#"{"model":"gpt-3.5-turbo","messages":[],"max_tokens":200,"temperature":1.0,"top_p":1.0,"stream":false}"#;

#[tokio::test]
async fn proxy_wraps_body_and_returns_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/apexrest/openai"))
        .and(header("authorization", "Bearer session-token"))
        .and(body_json(json!({ "body": REQUEST_BODY })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": true,
            "response": "{\"choices\":[]}"
        })))
        .mount(&mock_server)
        .await;

    let gateway = ProxyGateway::new(
        &format!("{}/services/apexrest/openai", mock_server.uri()),
        Some("session-token"),
        TIMEOUT,
    )
    .unwrap();

    let envelope = gateway.send(REQUEST_BODY).await.unwrap();
    assert_eq!(envelope, GatewayEnvelope::success("{\"choices\":[]}"));
}

#[tokio::test]
async fn proxy_error_status_decodes_platform_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "Callout timed out",
            "exceptionType": "System.CalloutException",
            "stackTrace": "Class.OpenAiApiService.sendRequest: line 30"
        })))
        .mount(&mock_server)
        .await;

    let gateway = ProxyGateway::new(&mock_server.uri(), None, TIMEOUT).unwrap();
    let err = gateway.send(REQUEST_BODY).await.unwrap_err();

    assert_eq!(
        err.user_detail(),
        "Callout timed out\nSystem.CalloutException\nClass.OpenAiApiService.sendRequest: line 30"
    );
}

#[tokio::test]
async fn proxy_error_status_without_detail_keeps_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let gateway = ProxyGateway::new(&mock_server.uri(), None, TIMEOUT).unwrap();
    let detail = gateway.send(REQUEST_BODY).await.unwrap_err().user_detail();

    assert!(detail.contains("502"));
    assert!(detail.contains("bad gateway"));
}

#[tokio::test]
async fn proxy_garbage_envelope_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let gateway = ProxyGateway::new(&mock_server.uri(), None, TIMEOUT).unwrap();
    let err = gateway.send(REQUEST_BODY).await.unwrap_err();
    assert!(matches!(err, CompanionError::Malformed { what: "gateway envelope", .. }));
}

#[tokio::test]
async fn unreachable_proxy_is_a_transport_error() {
    let gateway = ProxyGateway::new("http://127.0.0.1:1/gateway", None, TIMEOUT).unwrap();
    let err = gateway.send(REQUEST_BODY).await.unwrap_err();
    assert!(matches!(err, CompanionError::Transport { service: "api gateway", .. }));
}

#[test]
fn gateways_report_their_kind() {
    let proxy = ProxyGateway::new("http://127.0.0.1:1/gateway", None, TIMEOUT).unwrap();
    let openai = OpenAIGateway::new("http://127.0.0.1:1", "sk-test", TIMEOUT).unwrap();
    assert_eq!(proxy.name(), "proxy");
    assert_eq!(openai.name(), "openai");
}

#[tokio::test]
async fn openai_success_becomes_success_envelope() {
    let mock_server = MockServer::start().await;
    let completion = json!({
        "choices": [{ "message": { "content": "Hi" }, "finish_reason": "stop" }]
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion.clone()))
        .mount(&mock_server)
        .await;

    let gateway = OpenAIGateway::new(&mock_server.uri(), "sk-test", TIMEOUT).unwrap();
    let envelope = gateway.send(REQUEST_BODY).await.unwrap();

    assert!(envelope.is_success);
    let response: serde_json::Value =
        serde_json::from_str(envelope.response.as_deref().unwrap()).unwrap();
    assert_eq!(response, completion);
}

#[tokio::test]
async fn openai_error_body_becomes_failure_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "rate limited", "type": "requests" }
        })))
        .mount(&mock_server)
        .await;

    let gateway = OpenAIGateway::new(&mock_server.uri(), "sk-test", TIMEOUT).unwrap();
    let envelope = gateway.send(REQUEST_BODY).await.unwrap();

    assert_eq!(envelope, GatewayEnvelope::failure("rate limited"));
}

#[tokio::test]
async fn template_service_lists_and_expands() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/questions"))
        .and(query_param("contextId", "a0X000001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!(["Explain this promotion", "List deployment risks"])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/questions/process"))
        .and(body_json(json!({
            "contextId": "a0X000001",
            "question": "Explain this promotion"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            "Explain promotion P-0042 with 3 user stories."
        )))
        .mount(&mock_server)
        .await;

    let service = HttpTemplateService::new(&mock_server.uri(), TIMEOUT).unwrap();

    let labels = service.list_templates("a0X000001").await.unwrap();
    assert_eq!(labels, vec!["Explain this promotion", "List deployment risks"]);

    let text = service
        .expand_template("a0X000001", "Explain this promotion")
        .await
        .unwrap();
    assert_eq!(text, "Explain promotion P-0042 with 3 user stories.");
}

#[tokio::test]
async fn template_service_failure_keeps_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/questions"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Insufficient access",
            "exceptionType": "System.NoAccessException"
        })))
        .mount(&mock_server)
        .await;

    let service = HttpTemplateService::new(&mock_server.uri(), TIMEOUT).unwrap();
    let err = service.list_templates("a0X000001").await.unwrap_err();

    assert_eq!(err.user_detail(), "Insufficient access\nSystem.NoAccessException");
}
