use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use publish_gateway::{auth::Claims, routes, AppState, GatewayConfig};
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SECRET: &str = "test-secret-123";
const VIDEO: &[u8] = b"not really an mp4";

struct TestGateway {
    base_url: String,
    upload_dir: TempDir,
    sdk: MockServer,
    client: Client,
}

impl TestGateway {
    fn token(&self, sdk: Option<&str>) -> String {
        let claims = Claims {
            sub: "42".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Some(Utc::now().timestamp()),
            iss: None,
            sdk: sdk.map(str::to_string),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn user_token(&self) -> String {
        self.token(Some(&self.sdk.uri()))
    }

    fn user_dir(&self) -> std::path::PathBuf {
        self.upload_dir.path().join("42")
    }

    async fn upload(&self, token: Option<&str>, form: Form) -> Value {
        let mut request = self
            .client
            .post(format!("{}/api/v1/proxy", self.base_url))
            .multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let res = request.send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }
}

// Helper to spawn a gateway on a random port in front of a mock SDK
async fn spawn_gateway() -> TestGateway {
    let upload_dir = tempfile::tempdir().unwrap();
    let sdk = MockServer::start().await;

    let config = GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_path: upload_dir.path().to_path_buf(),
        jwt_secret: Some(SECRET.to_string()),
        auth_enabled: true,
        ..Default::default()
    };

    let state = Arc::new(AppState::new(config).unwrap());
    let app = routes::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestGateway {
        base_url: format!("http://{}", addr),
        upload_dir,
        sdk,
        client: Client::new(),
    }
}

fn upload_form(payload: &str) -> Form {
    Form::new()
        .part(
            "file",
            Part::bytes(VIDEO.to_vec())
                .file_name("video.mp4")
                .mime_str("video/mp4")
                .unwrap(),
        )
        .text("json_payload", payload.to_string())
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_upload_injects_file_path_and_cleans_up() {
    let gw = spawn_gateway().await;

    // The SDK reports what it found at file_path while the call is in flight.
    Mock::given(method("POST"))
        .respond_with(|req: &Request| {
            let body: Value = req.body_json().unwrap();
            let file_path = body["params"]["file_path"].as_str().unwrap_or_default();
            let contents = std::fs::read(file_path).unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {
                    "file_path": file_path,
                    "matches": contents == VIDEO,
                },
                "id": body["id"],
            }))
        })
        .expect(1)
        .mount(&gw.sdk)
        .await;

    let payload = json!({
        "jsonrpc": "2.0",
        "method": "publish",
        "params": {"name": "my-video", "bid": "1.0", "file_path": "/etc/passwd"},
        "id": 7,
    });
    let body = gw
        .upload(Some(&gw.user_token()), upload_form(&payload.to_string()))
        .await;

    assert!(body.get("error").is_none(), "unexpected error: {}", body);
    assert_eq!(body["id"], 7);
    assert_eq!(body["result"]["matches"], true);

    let file_path = Path::new(body["result"]["file_path"].as_str().unwrap());
    assert_eq!(file_path.parent().unwrap(), gw.user_dir());
    assert!(file_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_video.mp4"));

    // Scratch file is gone once the response is out.
    assert!(!file_path.exists());
    assert!(dir_is_empty(&gw.user_dir()));

    let received = gw.sdk.received_requests().await.unwrap();
    let forwarded: Value = received[0].body_json().unwrap();
    assert_eq!(forwarded["method"], "publish");
    assert_eq!(forwarded["params"]["name"], "my-video");
}

#[tokio::test]
async fn test_upload_without_sdk_address() {
    let gw = spawn_gateway().await;

    let payload = r#"{"jsonrpc":"2.0","method":"publish","params":{},"id":1}"#;
    let body = gw.upload(Some(&gw.token(None)), upload_form(payload)).await;

    assert_eq!(body["error"]["code"], -32080);
    assert_eq!(
        body["error"]["message"],
        "user does not have sdk address assigned"
    );
    assert!(!gw.user_dir().exists());
    assert!(gw.sdk.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_with_malformed_payload() {
    let gw = spawn_gateway().await;

    let body = gw
        .upload(Some(&gw.user_token()), upload_form("{not json"))
        .await;

    assert_eq!(body["error"]["code"], -32700);
    assert!(dir_is_empty(&gw.user_dir()));
    assert!(gw.sdk.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_requires_authentication() {
    let gw = spawn_gateway().await;

    let payload = r#"{"jsonrpc":"2.0","method":"publish","params":{},"id":1}"#;
    let body = gw.upload(None, upload_form(payload)).await;
    assert_eq!(body["error"]["code"], -32084);

    let body = gw.upload(Some("garbage"), upload_form(payload)).await;
    assert_eq!(body["error"]["code"], -32085);

    assert!(!gw.user_dir().exists());
}

#[tokio::test]
async fn test_multipart_without_payload_is_rejected() {
    let gw = spawn_gateway().await;

    let form = Form::new().part(
        "file",
        Part::bytes(VIDEO.to_vec()).file_name("video.mp4"),
    );
    let body = gw.upload(Some(&gw.user_token()), form).await;

    assert_eq!(body["error"]["code"], -32600);
    assert!(!gw.user_dir().exists());
}

#[tokio::test]
async fn test_upload_sdk_failure() {
    let gw = spawn_gateway().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&gw.sdk)
        .await;

    let payload = r#"{"jsonrpc":"2.0","method":"publish","params":{},"id":1}"#;
    let body = gw.upload(Some(&gw.user_token()), upload_form(payload)).await;

    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["id"], 1);
    assert!(dir_is_empty(&gw.user_dir()));
}

#[tokio::test]
async fn test_authentication_runs_before_body_is_read() {
    let gw = spawn_gateway().await;

    let send = |token: Option<String>| {
        let mut request = gw
            .client
            .post(format!("{}/api/v1/proxy", gw.base_url))
            .header("content-type", "multipart/form-data; boundary=never-sent")
            .body("this is not a multipart body");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send()
    };

    // Rejected on credentials alone, the broken body is never parsed.
    let body: Value = send(None).await.unwrap().json().await.unwrap();
    assert_eq!(body["error"]["code"], -32084);

    let body: Value = send(Some(gw.token(None))).await.unwrap().json().await.unwrap();
    assert_eq!(body["error"]["code"], -32080);

    // Once authorized, the body is read and found invalid.
    let body: Value = send(Some(gw.user_token())).await.unwrap().json().await.unwrap();
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_plain_json_rpc_is_forwarded_and_cached() {
    let gw = spawn_gateway().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "resolve"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {"lbry://what": {"claim_id": "abc"}},
            "id": 0,
        })))
        .expect(1)
        .mount(&gw.sdk)
        .await;

    for id in [1, 2] {
        let res = gw
            .client
            .post(format!("{}/api/proxy", gw.base_url))
            .bearer_auth(gw.user_token())
            .json(&json!({
                "jsonrpc": "2.0",
                "method": "resolve",
                "params": {"urls": "lbry://what"},
                "id": id,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["result"]["lbry://what"]["claim_id"], "abc");
    }
}

#[tokio::test]
async fn test_plain_json_rpc_malformed_body() {
    let gw = spawn_gateway().await;

    let res = gw
        .client
        .post(format!("{}/api/v1/proxy", gw.base_url))
        .bearer_auth(gw.user_token())
        .header("content-type", "application/json")
        .body("[1, 2")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn test_health_check() {
    let gw = spawn_gateway().await;

    let res = gw
        .client
        .get(format!("{}/health", gw.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "OK");
}
