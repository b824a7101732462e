//! Login against a mocked token endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use oauth_client::{LoginCallbackHandler, LoginError, OAUTHBEARER_MECHANISM};
use oauth_test_utils::{TestKeypair, TestTokenBuilder, TEST_ISSUER};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/realms/kafka/protocol/openid-connect/token";

fn login_options(server: &MockServer) -> HashMap<String, String> {
    HashMap::from([
        ("tokenEndpoint".to_string(), format!("{}{TOKEN_PATH}", server.uri())),
        ("clientId".to_string(), "kafka-producer".to_string()),
        ("clientSecret".to_string(), "producer-secret".to_string()),
    ])
}

#[tokio::test]
async fn test_login_produces_parsed_token() {
    let server = MockServer::start().await;
    let raw = TestKeypair::new(11, "idp-key").sign_token(
        &TestTokenBuilder::new()
            .for_user("service-account-kafka-producer")
            .with_scope_list(&["profile", "email"])
            .build(),
    );
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": raw,
            "expires_in": 300,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let handler =
        LoginCallbackHandler::configure(OAUTHBEARER_MECHANISM, &login_options(&server)).unwrap();
    let token = handler.token().await.unwrap().unwrap();

    assert_eq!(token.subject(), "service-account-kafka-producer");
    assert_eq!(token.issuer(), TEST_ISSUER);
    assert_eq!(token.key_id(), Some("idp-key"));
    assert!(token.scopes().contains("profile"));
    assert_eq!(token.raw(), raw);
}

#[tokio::test]
async fn test_login_fails_when_endpoint_rejects_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let handler =
        LoginCallbackHandler::configure(OAUTHBEARER_MECHANISM, &login_options(&server)).unwrap();

    assert!(matches!(
        handler.token().await.unwrap_err(),
        LoginError::AuthenticationRejected(_)
    ));
}
