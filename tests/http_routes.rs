use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use warden::api;
use warden::application_impl::*;
use warden::infra_memory::*;
use warden::server::Server;
use warp::Filter;
use warp::http::StatusCode;

const SECRET: &str = "d2FyZGVuLXRlc3Qtc2lnbmluZy1rZXktMzItYnl0ZXM=";

fn api_v1() -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
{
    let codec = JwtHs256Codec::try_new(JwtConfig {
        issuer: "warden.test".to_string(),
        audience: "warden-test".to_string(),
        access_ttl: Duration::from_secs(60),
        refresh_ttl: Duration::from_secs(3600),
        secret: SECRET.to_string(),
    })
    .unwrap();
    let service = RealAuthService::new(
        Arc::new(InMemoryUserRepo::new()),
        Arc::new(InMemorySessionCache::new(Duration::from_secs(3600))),
        Arc::new(Argon2PasswordHasher::with_cost(8, 1, 1).unwrap()),
        Arc::new(codec),
    );
    let server = Arc::new(Server::with_auth_service(Arc::new(service)));

    warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server))
        .recover(api::v1::recover_error)
}

async fn post<F>(filter: &F, path: &str, body: Value) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = warp::test::request()
        .method("POST")
        .path(path)
        .json(&body)
        .reply(filter)
        .await;
    (response.status(), serde_json::from_slice(response.body()).unwrap())
}

async fn get<F>(filter: &F, path: &str, bearer: Option<&str>) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let mut request = warp::test::request().method("GET").path(path);
    if let Some(token) = bearer {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let response = request.reply(filter).await;
    (response.status(), serde_json::from_slice(response.body()).unwrap())
}

fn alice_signup() -> Value {
    json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "pwd",
        "chat_id": 7
    })
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

#[tokio::test]
async fn signup_returns_tokens_in_an_envelope() {
    let filter = api_v1();
    let (status, body) = post(&filter, "/api/v1/signup", alice_signup()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["error"].is_null());
    assert!(body["data"]["user_id"].is_string());
    assert!(body["data"]["auth_tokens"]["access_token"].is_string());
    assert!(body["data"]["auth_tokens"]["refresh_token"].is_string());
}

#[tokio::test]
async fn duplicate_signup_is_conflict() {
    let filter = api_v1();
    post(&filter, "/api/v1/signup", alice_signup()).await;
    let (status, body) = post(&filter, "/api/v1/signup", alice_signup()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(error_code(&body), "UserExists");
}

#[tokio::test]
async fn malformed_input_is_bad_request() {
    let filter = api_v1();

    let (status, body) = post(&filter, "/api/v1/login", json!({ "email": "a@b.co" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "InvalidInput");

    let (status, _) = post(
        &filter,
        "/api/v1/login",
        json!({ "email": "a@b.co", "password": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &filter,
        "/api/v1/signup",
        json!({ "username": "bob", "email": "bob-at-example", "password": "pwd" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&filter, "/api/v1/refresh", json!({ "refresh_token": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_errors_map_to_statuses() {
    let filter = api_v1();
    post(&filter, "/api/v1/signup", alice_signup()).await;

    let (status, body) = post(
        &filter,
        "/api/v1/login",
        json!({ "email": "alice@example.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "InvalidCredentials");

    let (status, body) = post(
        &filter,
        "/api/v1/login",
        json!({ "email": "nobody@example.com", "password": "pwd" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "UserNotFound");
}

#[tokio::test]
async fn refresh_rotates_and_replay_is_unauthorized() {
    let filter = api_v1();
    let (_, body) = post(&filter, "/api/v1/signup", alice_signup()).await;
    let original = body["data"]["auth_tokens"]["refresh_token"].clone();

    let (status, body) = post(
        &filter,
        "/api/v1/refresh",
        json!({ "refresh_token": original }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["refresh_token"], original);

    let (status, body) = post(
        &filter,
        "/api/v1/refresh",
        json!({ "refresh_token": original }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "InvalidToken");
}

#[tokio::test]
async fn bearer_routes_require_a_valid_access_token() {
    let filter = api_v1();
    let (_, body) = post(&filter, "/api/v1/signup", alice_signup()).await;
    let access = body["data"]["auth_tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = get(&filter, "/api/v1/user_info", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["chat_id"], 7);
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = get(&filter, "/api/v1/user_info", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "InvalidToken");

    let (status, _) = get(&filter, "/api/v1/user_info", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_twice_succeeds() {
    let filter = api_v1();
    let (_, body) = post(&filter, "/api/v1/signup", alice_signup()).await;
    let access = body["data"]["auth_tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    for _ in 0..2 {
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/logout")
            .header("authorization", format!("Bearer {access}"))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let filter = api_v1();

    let (status, body) = get(&filter, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "OK");

    let (status, body) = get(&filter, "/api/v1/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "RouteNotFound");
}
