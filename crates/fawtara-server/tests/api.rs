use std::sync::Arc;

use fawtara::types::Session;
use fawtara::{MemoryStore, PortalClient, SessionStore};
use fawtara_server::AppState;
use fawtara_server::routes::SERVER_FAILURE_MSG;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OUTAGE_BANNER: &str =
    "عذراً يوجد ضغط على الخدمة من طرف مزود الخدمة، الرجاء المحاولة لاحقاً";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html; charset=UTF-8")
}

fn landing_page() -> String {
    r#"
    <form>
        <input type="hidden" id="token" value="tok-123" />
        <input type="hidden" id="captchaId" value="cap-42" />
    </form>
    "#
    .to_string()
}

fn bill_page(amount: i64) -> String {
    format!(
        r#"
        <input data-amount="{}" data-fee="500" />
        <div class="panel-body">
            <div></div><div></div><div></div><div></div><div></div>
            <div><span>label</span><span>الاسم: سامر , الفترة: الأولى عام 2024</span></div>
        </div>
        "#,
        amount
    )
}

async fn mount_login_flow(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(html(landing_page()).insert_header("Set-Cookie", "PHPSESSID=entry; path=/"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ws/checkLogin.php"))
        .respond_with(
            html("<html><body>welcome</body></html>".to_string())
                .insert_header("Set-Cookie", "PHPSESSID=live; path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sep.php"))
        .respond_with(html(
            r#"<option class="selected-gsm" value="0931234567">line</option>"#.to_string(),
        ))
        .mount(server)
        .await;
}

/// Serves the router on an ephemeral port and returns its base URL.
async fn serve(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fawtara_server::router(state))
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

async fn serve_with_session(portal_url: &str) -> (String, String) {
    let store = Arc::new(MemoryStore::new());
    store.put(
        "test-user".to_string(),
        Session {
            cookies: "PHPSESSID=live".to_string(),
            device_no: "0931234567".to_string(),
        },
    );
    let state = AppState::with_store(PortalClient::with_base_url(portal_url).unwrap(), store);
    (serve(state).await, "test-user".to_string())
}

fn bills_body() -> Value {
    json!({
        "billingAndSubscriptionNumbers": [
            { "billingNo": "111", "subscriptionNo": "222" }
        ],
        "city": "DAM"
    })
}

#[tokio::test]
async fn missing_user_id_is_unauthorized() {
    let portal = MockServer::start().await;
    let (base, _) = serve_with_session(&portal.uri()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/bills", base))
        .json(&bills_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_user_id_is_unauthorized() {
    let portal = MockServer::start().await;
    let (base, _) = serve_with_session(&portal.uri()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/bills", base))
        .header("userId", "not-a-session")
        .json(&bills_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn missing_bills_body_is_bad_request() {
    let portal = MockServer::start().await;
    let (base, user_id) = serve_with_session(&portal.uri()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/bills", base))
        .header("userId", &user_id)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Empty request body");
}

#[tokio::test]
async fn missing_login_body_is_bad_request() {
    let portal = MockServer::start().await;
    let state = AppState::new(PortalClient::with_base_url(&portal.uri()).unwrap());
    let base = serve(state).await;

    let res = reqwest::Client::new()
        .post(&base)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn login_returns_unique_user_ids() {
    let portal = MockServer::start().await;
    mount_login_flow(&portal).await;

    let state = AppState::new(PortalClient::with_base_url(&portal.uri()).unwrap());
    let base = serve(state).await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let res = client
            .post(&base)
            .json(&json!({ "username": "samer", "password": "secret" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let body: Value = res.json().await.unwrap();
        let id = body["userId"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        ids.push(id);
    }

    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn rejected_login_maps_to_bad_request_with_message() {
    let portal = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(html(landing_page()).insert_header("Set-Cookie", "PHPSESSID=entry; path=/"))
        .mount(&portal)
        .await;

    Mock::given(method("POST"))
        .and(path("/ws/checkLogin.php"))
        .respond_with(html(
            r#"<div class="alert alert-danger">بيانات الدخول خاطئة</div>"#.to_string(),
        ))
        .mount(&portal)
        .await;

    let state = AppState::new(PortalClient::with_base_url(&portal.uri()).unwrap());
    let base = serve(state).await;

    let res = reqwest::Client::new()
        .post(&base)
        .json(&json!({ "username": "samer", "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "بيانات الدخول خاطئة");
}

#[tokio::test]
async fn portal_failure_maps_to_generic_message() {
    let portal = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&portal)
        .await;

    let state = AppState::new(PortalClient::with_base_url(&portal.uri()).unwrap());
    let base = serve(state).await;

    let res = reqwest::Client::new()
        .post(&base)
        .json(&json!({ "username": "samer", "password": "secret" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], SERVER_FAILURE_MSG);
}

#[tokio::test]
async fn bills_round_trip() {
    let portal = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ws/sep.php"))
        .respond_with(html(bill_page(12500)))
        .mount(&portal)
        .await;

    let (base, user_id) = serve_with_session(&portal.uri()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/bills", base))
        .header("userId", &user_id)
        .json(&bills_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let records: Value = res.json().await.unwrap();
    let records = records.as_array().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["billingNo"], "111");
    assert_eq!(records[0]["subscriptionNo"], "222");
    assert_eq!(records[0]["amount"], 12500);
    assert_eq!(records[0]["fee"], 500);
    assert_eq!(records[0]["year"], "2024");
}

#[tokio::test]
async fn outage_returns_error_and_no_records() {
    let portal = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ws/sep.php"))
        .respond_with(html(format!(r#"<div class="alert">{}</div>"#, OUTAGE_BANNER)))
        .mount(&portal)
        .await;

    let (base, user_id) = serve_with_session(&portal.uri()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/bills", base))
        .header("userId", &user_id)
        .json(&bills_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], OUTAGE_BANNER);
    assert!(body.get("bills").is_none());
}
