//! End-to-end tests against a running gateway.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};

use common::*;
use editor_gateway::config::{AuthMode, GatewayConfig, PasswordSource, TlsConfig};
use editor_gateway::http::server::AppState;
use editor_gateway::plugin::RouteExtension;
use editor_gateway::security::auth::hash;
use editor_gateway::HttpServer;

#[tokio::test]
async fn unauthenticated_root_redirects_to_login() {
    let gateway = default_gateway().await;

    let response = client().get(gateway.url("/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "./login?to=%2F");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn nested_mount_redirect_keeps_query() {
    let gateway = default_gateway().await;

    let response = client()
        .get(gateway.url("/vscode/?folder=%2Fhome"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        "./../login?folder=%2Fhome&to=%2Fvscode"
    );
}

#[tokio::test]
async fn healthz_reports_recent_heartbeat() {
    let gateway = default_gateway().await;
    let before = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let response = client()
        .get(gateway.url("/healthz"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "alive");
    assert!(body["lastHeartbeat"].as_u64().unwrap() >= before);
}

#[tokio::test]
async fn heartbeat_is_written_to_data_dir() {
    let gateway = default_gateway().await;
    client().get(gateway.url("/healthz")).send().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let content = std::fs::read_to_string(gateway.root.path().join("data").join("heartbeat")).unwrap();
    assert!(content.trim().parse::<u64>().unwrap() > 0);
}

#[tokio::test]
async fn unknown_route_renders_error_page() {
    let gateway = default_gateway().await;

    let response = client().get(gateway.url("/nonexistent")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.text().await.unwrap();
    assert!(body.contains("<title>404</title>"));
    assert!(body.contains("<h1>404</h1>"));
    assert!(body.contains("<p>Not Found</p>"));
    assert!(body.contains("href=\"./\""));
}

#[tokio::test]
async fn update_check_requires_authentication() {
    let gateway = default_gateway().await;

    let response = client().get(gateway.url("/update/check")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn update_reports_unknown_when_checks_disabled() {
    let gateway = default_gateway().await;

    let response = client()
        .get(gateway.url("/update"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["latest"], "unknown");
    assert_eq!(body["current"], VERSION);
    assert_eq!(body["isLatest"], true);
    assert!(body["checked"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn login_page_renders_without_error() {
    let gateway = default_gateway().await;

    let response = client().get(gateway.url("/login?to=%2Fvscode")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Check the config file for the password."));
    assert!(body.contains("action=\"./login?to=/vscode\""));
    assert!(!body.contains("class=\"error\""));
    assert!(!body.contains("{{"));
}

#[tokio::test]
async fn login_rejects_then_accepts_password() {
    let gateway = default_gateway().await;
    let client = client();

    let response = client
        .post(gateway.url("/login?to=%2Fvscode"))
        .form(&[("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("set-cookie").is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("<div class=\"error\">Incorrect password</div>"));

    let response = client
        .post(gateway.url("/login?to=%2Fvscode"))
        .json(&serde_json::json!({ "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "./vscode");
    assert_eq!(
        response.headers()["set-cookie"],
        format!("key={}; Path=/; SameSite=Lax", hash(PASSWORD)).as_str()
    );
}

#[tokio::test]
async fn login_is_rate_limited() {
    let gateway = default_gateway().await;
    let client = client();

    for _ in 0..2 {
        let response = client
            .post(gateway.url("/login"))
            .form(&[("password", "wrong")])
            .send()
            .await
            .unwrap();
        let body = response.text().await.unwrap();
        assert!(body.contains("Incorrect password"));
    }

    let response = client
        .post(gateway.url("/login"))
        .form(&[("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Login rate limited!"));
}

#[tokio::test]
async fn login_requires_a_password() {
    let gateway = default_gateway().await;

    let response = client()
        .post(gateway.url("/login"))
        .form(&[("password", "")])
        .send()
        .await
        .unwrap();

    let body = response.text().await.unwrap();
    assert!(body.contains("Missing password"));
}

#[tokio::test]
async fn authenticated_login_visit_redirects_to_target() {
    let gateway = default_gateway().await;

    let response = client()
        .get(gateway.url("/login?to=%2Fvscode&folder=%2Fsrc"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "./vscode?folder=%2Fsrc");
}

#[tokio::test]
async fn editor_page_embeds_workbench_options() {
    let gateway = default_gateway().await;

    let response = client()
        .get(gateway.url("/"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.starts_with(" <link rel=\"prod\"> "));
    assert!(body.contains("\"gatewayVersion\":\"1.0.0\""));
    assert!(body.contains("\"nameShort\":\"Editor\""));
    assert!(body.contains(&format!("\"authority\":\"{}\"", gateway.addr)));
    assert!(body.contains("window.nls = '{\"locale\":\"en\"}';"));
    assert!(body.contains("\"disableTelemetry\":false"));
    assert!(!body.contains("{{"));
}

#[tokio::test]
async fn editor_failure_renders_500() {
    let root = assets();
    let config = test_config(root.path());
    let gateway = spawn_with(root, config, Arc::new(BrokenEditor), Vec::new()).await;

    let response = client()
        .get(gateway.url("/vscode"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.contains("<h1>500</h1>"));
    assert!(body.contains("VS Code failed to load."));
}

#[tokio::test]
async fn robots_txt_is_served() {
    let gateway = default_gateway().await;

    let response = client().get(gateway.url("/robots.txt")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), ROBOTS);
}

#[tokio::test]
async fn static_files_are_confined_to_roots() {
    let gateway = default_gateway().await;
    let root = gateway.root.path().canonicalize().unwrap();
    let robots = root.join("src").join("browser").join("robots.txt");

    let response = client()
        .get(gateway.url(&format!("/static/abc123{}", robots.display())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "public, max-age=31536000");

    let response = client()
        .get(gateway.url("/static/abc123/etc/passwd"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resources_require_authentication_and_path() {
    let gateway = default_gateway().await;
    let file = gateway.root.path().join("note.txt");
    std::fs::write(&file, "hello").unwrap();
    let url = gateway.url(&format!("/resource?path={}", file.display()));

    let response = client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client()
        .get(&url)
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "hello");

    let response = client()
        .get(gateway.url("/vscode/vscode-remote-resource"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn proxy_forwards_authenticated_requests() {
    let gateway = default_gateway().await;
    let upstream = start_echo_upstream().await;
    let url = gateway.url(&format!("/proxy/{}/api/items?page=2", upstream.port()));

    let response = client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client()
        .get(&url)
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "/api/items?page=2");
}

#[tokio::test]
async fn proxy_to_closed_port_is_bad_gateway() {
    let gateway = default_gateway().await;
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let response = client()
        .get(gateway.url(&format!("/proxy/{closed}/")))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn no_auth_mode_skips_login() {
    let root = assets();
    let mut config = test_config(root.path());
    config.auth.mode = AuthMode::None;
    config.auth.password = None;
    let gateway = spawn_gateway(root, config).await;

    let response = client().get(gateway.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client().get(gateway.url("/login")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plain_requests_redirect_to_https_when_tls_is_configured() {
    let root = assets();
    let mut config: GatewayConfig = test_config(root.path());
    config.listener.tls = Some(TlsConfig {
        cert_path: root.path().join("cert.pem"),
        key_path: root.path().join("key.pem"),
    });
    let server = HttpServer::with_backend(config, Arc::new(FakeEditor), Vec::new());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = client()
        .get(format!("http://{addr}/login?x=1"))
        .header("x-forwarded-prefix", "/ide")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        format!("https://{addr}/ide/login?x=1").as_str()
    );
}

struct HelloExtension;

impl RouteExtension for HelloExtension {
    fn name(&self) -> &str {
        "hello"
    }

    fn register(&self, router: Router<AppState>, _config: &GatewayConfig) -> Router<AppState> {
        router.route("/hello", get(|| async { "hi" }))
    }
}

#[tokio::test]
async fn route_extensions_are_mounted() {
    let root = assets();
    let config = test_config(root.path());
    let gateway = spawn_with(
        root,
        config,
        Arc::new(FakeEditor),
        vec![Arc::new(HelloExtension) as Arc<dyn RouteExtension>],
    )
    .await;

    let response = client().get(gateway.url("/hello")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "hi");
}

#[tokio::test]
async fn websocket_requires_authentication() {
    let gateway = default_gateway().await;

    let result = tokio_tungstenite::connect_async(format!("ws://{}/", gateway.addr)).await;

    match result {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED)
        }
        Err(e) => panic!("expected 401 handshake failure, got {e}"),
        Ok(_) => panic!("unauthenticated websocket was accepted"),
    }
}

#[tokio::test]
async fn websocket_sessions_reach_the_editor() {
    let gateway = default_gateway().await;
    let mut request = format!("ws://{}/vscode/?reconnection=false", gateway.addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("cookie", session_cookie().parse().unwrap());

    let (mut socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    socket.send(Message::Text("ping".to_string().into())).await.unwrap();

    let reply = socket.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "ping");

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn mounts_answer_with_trailing_slash() {
    let gateway = default_gateway().await;

    for path in ["/healthz/", "/update/"] {
        let response = client()
            .get(gateway.url(path))
            .header("cookie", session_cookie())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let _: Value = response.json().await.unwrap();
    }

    let response = client().get(gateway.url("/login/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("action=\"./../login?to="));
}

#[tokio::test]
async fn wrong_method_renders_error_page() {
    let gateway = default_gateway().await;

    let response = client()
        .post(gateway.url("/healthz"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = response.text().await.unwrap();
    assert!(body.contains("<h1>405</h1>"));
    assert!(body.contains("<p>Method Not Allowed</p>"));
}

#[tokio::test]
async fn malformed_proxy_port_renders_error_page() {
    let gateway = default_gateway().await;

    let response = client()
        .get(gateway.url("/proxy/notaport/x"))
        .header("cookie", session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("<title>400</title>"));
    assert!(body.contains("<h1>400</h1>"));
}

#[tokio::test]
async fn missing_error_page_falls_back_to_plain_text() {
    let gateway = default_gateway().await;
    std::fs::remove_file(
        gateway
            .root
            .path()
            .join("src")
            .join("browser")
            .join("pages")
            .join("error.html"),
    )
    .unwrap();

    let response = client().get(gateway.url("/nonexistent")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "404 Not Found");
}

#[tokio::test]
async fn login_page_points_to_generated_password_file() {
    let root = assets();
    let mut config = test_config(root.path());
    config.auth.password_source = PasswordSource::Generated;
    let expected = config.generated_password_path();
    let gateway = spawn_gateway(root, config).await;

    let response = client().get(gateway.url("/login")).send().await.unwrap();

    let body = response.text().await.unwrap();
    assert!(body.contains(&format!("Check {} for the generated password.", expected.display())));
    assert!(!body.contains(PASSWORD));
}
