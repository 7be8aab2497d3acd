//! Transport Integration Tests
//!
//! HTTP-level tests for the direct, relay, and fallback transports against
//! a local mock server.

use std::sync::Arc;
use std::time::Duration;

use aurora_gateway::{
    ApiGateway, FallbackTransport, GatewayConfig, HttpTransport, Method, RawResponse,
    RelayTransport, Transport, TransportRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base_url: String) -> GatewayConfig {
    GatewayConfig {
        base_url,
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn request(path: &str, method: Method) -> TransportRequest {
    TransportRequest {
        path: path.to_string(),
        method,
        body: None,
        bearer: None,
        timeout: None,
    }
}

mod direct_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_with_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uptime": 42})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(server.uri())).unwrap();
        let mut req = request("/api/system/info", Method::Get);
        req.bearer = Some("tok-1".to_string());

        match transport.send(&req).await {
            RawResponse::Upstream { status, body } => {
                assert_eq!(status, Some(200));
                assert_eq!(body, json!({"uptime": 42}));
            }
            other => panic!("expected upstream response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_body_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/alerts/rules"))
            .and(body_json(json!({"level": "high"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created": true})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(server.uri())).unwrap();
        let mut req = request("/api/alerts/rules", Method::Post);
        req.body = Some(json!({"level": "high"}));

        match transport.send(&req).await {
            RawResponse::Upstream { body, .. } => assert_eq!(body, json!({"created": true})),
            other => panic!("expected upstream response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clients/list"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(server.uri())).unwrap();
        match transport.send(&request("/api/clients/list", Method::Get)).await {
            RawResponse::Upstream { status, .. } => assert_eq!(status, Some(502)),
            other => panic!("expected upstream response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_network_error() {
        // Nothing listens on port 9
        let transport =
            HttpTransport::new(&config_for("http://127.0.0.1:9".to_string())).unwrap();
        match transport.send(&request("/api/system/info", Method::Get)).await {
            RawResponse::TransportError { message, timed_out } => {
                assert!(!timed_out);
                assert!(message.contains("network"), "message: {}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_per_call_timeout_marks_timed_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats/summary"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(server.uri())).unwrap();
        let mut req = request("/api/stats/summary", Method::Get);
        req.timeout = Some(Duration::from_millis(50));

        match transport.send(&req).await {
            RawResponse::TransportError { timed_out, .. } => assert!(timed_out),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}

mod relay_tests {
    use super::*;

    #[tokio::test]
    async fn test_envelope_posted_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/relay"))
            .and(body_json(json!({
                "path": "/api/clients/list",
                "method": "GET",
                "sessionToken": "tok-2",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .mount(&server)
            .await;

        let config = config_for(server.uri());
        let transport =
            RelayTransport::new(format!("{}/relay", server.uri()), &config).unwrap();
        let mut req = request("/api/clients/list", Method::Get);
        req.bearer = Some("tok-2".to_string());

        match transport.send(&req).await {
            RawResponse::Upstream { status, body } => {
                assert_eq!(status, Some(200));
                assert_eq!(body, json!([{"id": 1}]));
            }
            other => panic!("expected upstream response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_relay_error_envelope_degrades_through_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/relay"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": "internal server error"})),
            )
            .mount(&server)
            .await;

        let config = config_for(server.uri());
        let transport =
            Arc::new(RelayTransport::new(format!("{}/relay", server.uri()), &config).unwrap());
        let gateway = ApiGateway::new(config, transport);
        gateway.set_session("tok");

        let value = gateway.get("/api/clients/list").await.unwrap();
        assert_eq!(value, json!([]));
    }
}

mod fallback_tests {
    use super::*;

    #[tokio::test]
    async fn test_falls_back_to_secondary_on_connect_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"via": "relay"})))
            .mount(&server)
            .await;

        let dead = HttpTransport::new(&config_for("http://127.0.0.1:9".to_string())).unwrap();
        let alive = HttpTransport::new(&config_for(server.uri())).unwrap();
        let transport = FallbackTransport::new(Arc::new(dead), Arc::new(alive));

        match transport.send(&request("/api/system/info", Method::Get)).await {
            RawResponse::Upstream { body, .. } => assert_eq!(body, json!({"via": "relay"})),
            other => panic!("expected upstream response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"via": "direct"})))
            .mount(&primary_server)
            .await;

        let secondary_server = MockServer::start().await;
        // No mocks on the secondary: reaching it would produce a 404

        let primary = HttpTransport::new(&config_for(primary_server.uri())).unwrap();
        let secondary = HttpTransport::new(&config_for(secondary_server.uri())).unwrap();
        let transport = FallbackTransport::new(Arc::new(primary), Arc::new(secondary));

        match transport.send(&request("/api/system/info", Method::Get)).await {
            RawResponse::Upstream { body, .. } => assert_eq!(body, json!({"via": "direct"})),
            other => panic!("expected upstream response, got {:?}", other),
        }
    }
}
