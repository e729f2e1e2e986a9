use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        Method, Request, StatusCode,
    },
    Router,
};
use carelink_api::{
    build_router, AppState, CountryFigures, CovidStats, Figures, SessionSettings, StatsError,
    StatsService, StatsSource,
};
use carelink_auth::{Authenticator, MemoryMailer};
use carelink_chat::ChatHub;
use carelink_config::AppConfig;
use carelink_database::{CreatePatientRequest, Gender, Role};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;

type TestResult<T = ()> = anyhow::Result<T>;

#[derive(Default)]
struct FixedStats {
    failing: AtomicBool,
}

#[async_trait]
impl StatsSource for FixedStats {
    async fn fetch(&self) -> Result<CovidStats, StatsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StatsError::Status(503));
        }
        Ok(CovidStats {
            global: Figures {
                cases: 1_000,
                deaths: 10,
                ..Figures::default()
            },
            country: CountryFigures {
                country: "Pakistan".into(),
                figures: Figures {
                    cases: 100,
                    ..Figures::default()
                },
            },
            fetched_at: Utc::now(),
        })
    }
}

struct TestContext {
    _temp_dir: TempDir,
    state: AppState,
    mailer: Arc<MemoryMailer>,
    stats_source: Arc<FixedStats>,
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_url = format!("sqlite://{}", temp_dir.path().join("api.sqlite").display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        carelink_database::MIGRATOR.run(&pool).await?;

        let config = AppConfig::default();
        let mailer = Arc::new(MemoryMailer::new());
        let authenticator = Authenticator::new(
            pool.clone(),
            &config.auth,
            mailer.clone(),
            "http://carelink.test",
        );
        let stats_source = Arc::new(FixedStats::default());
        let stats = StatsService::new(stats_source.clone(), Duration::from_secs(60));
        let hub = Arc::new(ChatHub::new(config.chat.bot_name.clone()));

        let state = AppState::new(
            pool,
            authenticator,
            hub,
            stats,
            SessionSettings::from_config(&config),
        );

        Ok(Self {
            _temp_dir: temp_dir,
            state,
            mailer,
            stats_source,
        })
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    fn pool(&self) -> &SqlitePool {
        self.state.db_pool()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<Reply> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> TestResult<Reply> {
        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Reply {
            status,
            set_cookie,
            body,
        })
    }

    async fn register_patient(&self, email: &str, role: &str) -> TestResult<String> {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "name": "Amina Khan",
                    "email": email,
                    "password": "secret123",
                    "role": role,
                    "age": "31",
                    "gender": "Female",
                })),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        Ok(token_of(&reply))
    }

    async fn register_doctor(&self, email: &str) -> TestResult<String> {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/doctors/register",
                None,
                Some(json!({
                    "name": "Dr. Sana",
                    "email": email,
                    "password": "secret123",
                    "age": "44",
                    "gender": "Female",
                    "qualification": "FCPS",
                })),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        Ok(token_of(&reply))
    }

    async fn admin_token(&self) -> TestResult<String> {
        let request = CreatePatientRequest {
            name: "Site Admin".into(),
            email: "admin@carelink.test".into(),
            password: "secret123".into(),
            role: None,
            age: "50".into(),
            blood_group: None,
            is_previously_diagnosed: false,
            address: None,
            gender: Some(Gender::Male),
            phone_number: None,
        };
        self.state
            .authenticator()
            .create_patient(&request, Role::Admin)
            .await?;

        let reply = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "admin@carelink.test", "password": "secret123"})),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK);
        Ok(token_of(&reply))
    }

    async fn create_point(&self, token: &str, name: &str, lat: f64, lng: f64) -> TestResult<String> {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/points",
                Some(token),
                Some(json!({
                    "name": name,
                    "description": "Plasma collection centre",
                    "address": "Mall Road",
                    "latitude": lat,
                    "longitude": lng,
                })),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        Ok(id_of(&reply))
    }

    async fn me_id(&self, token: &str) -> TestResult<String> {
        let reply = self
            .send(Method::GET, "/api/v1/auth/me", Some(token), None)
            .await?;
        assert_eq!(reply.status, StatusCode::OK);
        Ok(id_of(&reply))
    }
}

fn token_of(reply: &Reply) -> String {
    reply.body["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}

fn id_of(reply: &Reply) -> String {
    reply.body["data"]["id"]
        .as_str()
        .expect("id in response")
        .to_string()
}

fn assert_error(reply: &Reply, status: StatusCode) {
    assert_eq!(reply.status, status, "{}", reply.body);
    assert_eq!(reply.body["success"], json!(false));
    assert!(reply.body["error"].is_string());
}

#[tokio::test]
async fn health_reports_ok() -> TestResult {
    let ctx = TestContext::new().await?;
    let reply = ctx.send(Method::GET, "/health", None, None).await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["connections"], 0);
    Ok(())
}

#[tokio::test]
async fn register_sets_cookie_and_token_authenticates() -> TestResult {
    let ctx = TestContext::new().await?;
    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": "Amina Khan",
                "email": "amina@example.com",
                "password": "secret123",
                "age": "31",
                "gender": "Female",
            })),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    let token = token_of(&reply);
    let cookie = reply.set_cookie.expect("token cookie");
    assert!(cookie.starts_with(&format!("token={token}")));
    assert!(cookie.contains("HttpOnly"));

    let me = ctx
        .send(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "amina@example.com");
    assert_eq!(me.body["data"]["role"], "patient");
    assert!(me.body["data"].get("passwordHash").is_none());

    let via_cookie = Request::builder()
        .uri("/api/v1/auth/me")
        .header(COOKIE, format!("token={token}"))
        .body(Body::empty())?;
    let me = ctx.dispatch(via_cookie).await?;
    assert_eq!(me.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_bad_request() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.register_patient("twice@example.com", "patient").await?;

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": "Someone Else",
                "email": "TWICE@example.com",
                "password": "secret123",
                "age": "20",
                "gender": "Male",
            })),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> TestResult {
    let ctx = TestContext::new().await?;

    let reply = ctx.send(Method::GET, "/api/v1/auth/me", None, None).await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Not authorized to access this route");

    let reply = ctx
        .send(Method::GET, "/api/v1/auth/me", Some("not-a-jwt"), None)
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_distinguishes_missing_and_wrong_credentials() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.register_patient("login@example.com", "patient").await?;

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "login@example.com"})),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Please provide an email and password");

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "login@example.com", "password": "wrong-one"})),
        )
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> TestResult {
    let ctx = TestContext::new().await?;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))?;

    let reply = ctx.dispatch(request).await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_routes_check_role() -> TestResult {
    let ctx = TestContext::new().await?;
    let patient = ctx.register_patient("plain@example.com", "patient").await?;
    let admin = ctx.admin_token().await?;

    let reply = ctx
        .send(Method::GET, "/api/v1/auth/patients", Some(&patient), None)
        .await?;
    assert_error(&reply, StatusCode::FORBIDDEN);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/patients",
            Some(&admin),
            Some(json!({
                "name": "Second Admin",
                "email": "admin2@example.com",
                "password": "secret123",
                "role": "admin",
                "age": "45",
                "gender": "Male",
            })),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["role"], "admin");
    let created = id_of(&reply);

    let reply = ctx
        .send(Method::GET, "/api/v1/auth/patients?sort=email", Some(&admin), None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total"], 3);
    assert_eq!(reply.body["data"][0]["email"], "admin2@example.com");

    let reply = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/auth/patients/{created}"),
            Some(&admin),
            Some(json!({"name": "Renamed Admin"})),
        )
        .await?;
    assert_eq!(reply.body["data"]["name"], "Renamed Admin");

    let reply = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/auth/patients/{created}"),
            Some(&admin),
            None,
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"], json!({}));

    let reply = ctx
        .send(
            Method::GET,
            &format!("/api/v1/auth/patients/{created}"),
            Some(&admin),
            None,
        )
        .await?;
    assert_error(&reply, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn self_registration_cannot_choose_admin() -> TestResult {
    let ctx = TestContext::new().await?;
    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@example.com",
                "password": "secret123",
                "role": "admin",
                "age": "22",
                "gender": "Male",
            })),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn point_writes_are_owner_only() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("owner@example.com", "donationPoint").await?;
    let stranger = ctx.register_patient("stranger@example.com", "patient").await?;
    let admin = ctx.admin_token().await?;
    let doctor = ctx.register_doctor("doc@example.com").await?;

    let point = ctx.create_point(&owner, "Central Bank", 31.5497, 74.3436).await?;

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/points",
            Some(&doctor),
            Some(json!({"name": "Doc Point", "description": "x", "address": "y", "latitude": 1.0, "longitude": 1.0})),
        )
        .await?;
    assert_error(&reply, StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/points/{point}");
    let reply = ctx
        .send(Method::PUT, &uri, Some(&stranger), Some(json!({"name": "Hijacked"})))
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let reply = ctx
        .send(Method::PUT, &uri, Some(&owner), Some(json!({"name": "Central Blood Bank"})))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["name"], "Central Blood Bank");

    let reply = ctx
        .send(Method::PUT, &uri, Some(&admin), Some(json!({"phone": "042-111"})))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["phone"], "042-111");

    let reply = ctx.send(Method::DELETE, &uri, Some(&stranger), None).await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);
    let reply = ctx.send(Method::DELETE, &uri, Some(&owner), None).await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = ctx.send(Method::GET, &uri, None, None).await?;
    assert_error(&reply, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn point_listing_pages_and_sorts() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("lister@example.com", "donationPoint").await?;
    for name in ["Charlie", "Alpha", "Bravo"] {
        ctx.create_point(&owner, name, 31.5, 74.3).await?;
    }

    let reply = ctx
        .send(Method::GET, "/api/v1/points?sort=name&limit=2", None, None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 2);
    assert_eq!(reply.body["total"], 3);
    assert_eq!(reply.body["data"][0]["name"], "Alpha");
    assert_eq!(reply.body["pagination"]["next"]["page"], 2);
    assert!(reply.body["pagination"].get("prev").is_none());

    let reply = ctx
        .send(Method::GET, "/api/v1/points?sort=-name&page=2&limit=2", None, None)
        .await?;
    assert_eq!(reply.body["data"][0]["name"], "Alpha");
    assert_eq!(reply.body["pagination"]["prev"]["page"], 1);

    let reply = ctx
        .send(Method::GET, "/api/v1/points?sort=password", None, None)
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn radius_search_filters_by_distance() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("radius@example.com", "donationPoint").await?;
    ctx.create_point(&owner, "Lahore Centre", 31.5204, 74.3587).await?;
    ctx.create_point(&owner, "Karachi Centre", 24.8607, 67.0011).await?;

    let reply = ctx
        .send(Method::GET, "/api/v1/points/radius/31.55/74.34/25", None, None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 1);
    assert_eq!(reply.body["data"][0]["name"], "Lahore Centre");

    let reply = ctx
        .send(Method::GET, "/api/v1/points/radius/31.55/74.34/1000", None, None)
        .await?;
    assert_eq!(reply.body["count"], 2);
    assert_eq!(reply.body["data"][0]["name"], "Lahore Centre");
    Ok(())
}

#[tokio::test]
async fn malformed_radius_path_uses_the_error_body() -> TestResult {
    let ctx = TestContext::new().await?;

    let reply = ctx
        .send(Method::GET, "/api/v1/points/radius/abc/74.34/25", None, None)
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_list_queries_use_the_error_body() -> TestResult {
    let ctx = TestContext::new().await?;

    for uri in [
        "/api/v1/points?page=abc",
        "/api/v1/points?limit=-1",
        "/api/v1/reviews?page=1.5",
        "/api/v1/plasmas?limit=many",
        "/api/v1/doctors?page=-3",
    ] {
        let reply = ctx.send(Method::GET, uri, None, None).await?;
        assert_error(&reply, StatusCode::BAD_REQUEST);
    }
    Ok(())
}

#[tokio::test]
async fn largest_page_number_returns_an_empty_page() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("far@example.com", "donationPoint").await?;
    ctx.create_point(&owner, "Only Point", 31.5, 74.3).await?;

    let reply = ctx
        .send(Method::GET, "/api/v1/points?page=4294967295", None, None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["count"], 0);
    assert!(reply.body["pagination"].get("next").is_none());
    assert_eq!(reply.body["pagination"]["prev"]["page"], 4294967294u32);
    Ok(())
}

#[tokio::test]
async fn reviews_drive_the_average_rating() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("op@example.com", "donationPoint").await?;
    let first = ctx.register_patient("first@example.com", "patient").await?;
    let second = ctx.register_patient("second@example.com", "patient").await?;
    let point = ctx.create_point(&owner, "Rated Point", 31.5, 74.3).await?;
    let reviews_uri = format!("/api/v1/points/{point}/reviews");

    let reply = ctx
        .send(
            Method::POST,
            &reviews_uri,
            Some(&owner),
            Some(json!({"title": "Mine", "text": "Great", "rating": 10})),
        )
        .await?;
    assert_error(&reply, StatusCode::FORBIDDEN);

    let reply = ctx
        .send(
            Method::POST,
            &reviews_uri,
            Some(&first),
            Some(json!({"title": "Good", "text": "Quick service", "rating": 8})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let review = id_of(&reply);

    ctx.send(
        Method::POST,
        &reviews_uri,
        Some(&second),
        Some(json!({"title": "Okay", "text": "Long queue", "rating": 4})),
    )
    .await?;

    let reply = ctx
        .send(Method::GET, &format!("/api/v1/points/{point}"), None, None)
        .await?;
    assert_eq!(reply.body["data"]["averageRating"], 6.0);

    let reply = ctx
        .send(
            Method::POST,
            &reviews_uri,
            Some(&first),
            Some(json!({"title": "Again", "text": "Second try", "rating": 9})),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);

    let reply = ctx
        .send(
            Method::POST,
            &reviews_uri,
            Some(&second),
            Some(json!({"title": "Bad", "text": "Out of range", "rating": 11})),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);

    let reply = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/reviews/{review}"),
            Some(&second),
            Some(json!({"rating": 1})),
        )
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let reply = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/reviews/{review}"),
            Some(&first),
            None,
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = ctx.send(Method::GET, &reviews_uri, None, None).await?;
    assert_eq!(reply.body["count"], 1);
    let reply = ctx
        .send(Method::GET, &format!("/api/v1/points/{point}"), None, None)
        .await?;
    assert_eq!(reply.body["data"]["averageRating"], 4.0);
    Ok(())
}

#[tokio::test]
async fn plasma_is_listed_by_the_point_owner() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register_patient("plasma-op@example.com", "donationPoint").await?;
    let stranger = ctx.register_patient("plasma-x@example.com", "patient").await?;
    let point = ctx.create_point(&owner, "Plasma Point", 31.5, 74.3).await?;
    let uri = format!("/api/v1/points/{point}/plasmas");
    let offer = json!({
        "title": "Convalescent plasma",
        "description": "Recovered donor, tested negative",
        "bloodGroup": "O+",
        "quantityMl": 400,
    });

    let reply = ctx
        .send(Method::POST, &uri, Some(&stranger), Some(offer.clone()))
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let reply = ctx
        .send(Method::POST, &uri, Some(&owner), Some(offer))
        .await?;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["bloodGroup"], "O+");
    assert_eq!(reply.body["data"]["point"], point.as_str());
    let plasma = id_of(&reply);

    let reply = ctx.send(Method::GET, &uri, None, None).await?;
    assert_eq!(reply.body["count"], 1);

    let reply = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/plasmas/{plasma}"),
            Some(&owner),
            Some(json!({"available": false})),
        )
        .await?;
    assert_eq!(reply.body["data"]["available"], false);

    let reply = ctx.send(Method::GET, "/api/v1/plasmas", None, None).await?;
    assert_eq!(reply.body["total"], 1);

    ctx.send(
        Method::DELETE,
        &format!("/api/v1/points/{point}"),
        Some(&owner),
        None,
    )
    .await?;
    let reply = ctx
        .send(Method::GET, &format!("/api/v1/plasmas/{plasma}"), None, None)
        .await?;
    assert_error(&reply, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn conversations_are_private_to_their_members() -> TestResult {
    let ctx = TestContext::new().await?;
    let patient = ctx.register_patient("chatty@example.com", "patient").await?;
    let doctor = ctx.register_doctor("doctor@example.com").await?;
    let outsider = ctx.register_patient("nosy@example.com", "patient").await?;
    let patient_id = ctx.me_id(&patient).await?;
    let doctor_id = ctx.me_id(&doctor).await?;

    let open = json!({"senderId": patient_id, "receiverId": doctor_id});
    let reply = ctx
        .send(Method::POST, "/api/v1/conversations", Some(&patient), Some(open.clone()))
        .await?;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let conversation = id_of(&reply);

    let reply = ctx
        .send(Method::POST, "/api/v1/conversations", Some(&doctor), Some(open.clone()))
        .await?;
    assert_eq!(id_of(&reply), conversation);

    let reply = ctx
        .send(Method::POST, "/api/v1/conversations", Some(&outsider), Some(open))
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let ghost = json!({"senderId": patient_id, "receiverId": "no-such-user"});
    let reply = ctx
        .send(Method::POST, "/api/v1/conversations", Some(&patient), Some(ghost))
        .await?;
    assert_error(&reply, StatusCode::NOT_FOUND);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/messages",
            Some(&patient),
            Some(json!({"conversationId": conversation, "text": "I have a fever"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["sender"], patient_id.as_str());

    let reply = ctx
        .send(
            Method::GET,
            &format!("/api/v1/messages/{conversation}"),
            Some(&doctor),
            None,
        )
        .await?;
    assert_eq!(reply.body["count"], 1);
    assert_eq!(reply.body["data"][0]["text"], "I have a fever");

    let reply = ctx
        .send(
            Method::GET,
            &format!("/api/v1/messages/{conversation}"),
            Some(&outsider),
            None,
        )
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let reply = ctx
        .send(
            Method::GET,
            &format!("/api/v1/conversations/{doctor_id}"),
            Some(&doctor),
            None,
        )
        .await?;
    assert_eq!(reply.body["count"], 1);

    let reply = ctx
        .send(Method::GET, "/api/v1/messages/unknown-conversation", Some(&doctor), None)
        .await?;
    assert_error(&reply, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn doctor_routes_and_inbox() -> TestResult {
    let ctx = TestContext::new().await?;
    let doctor = ctx.register_doctor("inbox-doc@example.com").await?;
    let patient = ctx.register_patient("inbox-patient@example.com", "patient").await?;

    let reply = ctx
        .send(Method::GET, "/api/v1/doctors/me", Some(&doctor), None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["qualification"], "FCPS");
    let doctor_id = id_of(&reply);

    let reply = ctx
        .send(Method::GET, "/api/v1/doctors/me", Some(&patient), None)
        .await?;
    assert_error(&reply, StatusCode::FORBIDDEN);

    let reply = ctx
        .send(Method::GET, &format!("/api/v1/doctors/{doctor_id}"), None, None)
        .await?;
    assert_eq!(reply.body["data"]["name"], "Dr. Sana");

    let reply = ctx.send(Method::GET, "/api/v1/doctors", None, None).await?;
    assert_eq!(reply.body["total"], 1);

    let reply = ctx.send(Method::GET, "/api/v1/chat/inbox", None, None).await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);

    let reply = ctx
        .send(Method::GET, "/api/v1/chat/inbox", Some(&patient), None)
        .await?;
    assert_eq!(reply.body["count"], 1);
    assert_eq!(reply.body["data"][0]["id"], doctor_id.as_str());
    assert_eq!(reply.body["data"][0]["online"], false);

    let reply = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/updatedetails",
            Some(&doctor),
            Some(json!({"name": "Dr. Renamed"})),
        )
        .await?;
    assert_error(&reply, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn details_and_password_updates() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.register_patient("details@example.com", "patient").await?;

    let reply = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/updatedetails",
            Some(&token),
            Some(json!({"name": "Amina K.", "email": "amina.k@example.com"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["email"], "amina.k@example.com");
    assert_eq!(reply.body["data"]["age"], "31");

    let reply = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/updatepassword",
            Some(&token),
            Some(json!({"currentPassword": "wrong-pass", "newPassword": "better456"})),
        )
        .await?;
    assert_error(&reply, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Password is incorrect");

    let reply = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/updatepassword",
            Some(&token),
            Some(json!({"currentPassword": "secret123", "newPassword": "better456"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "amina.k@example.com", "password": "better456"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forgot_and_reset_password_flow() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.register_patient("forgetful@example.com", "patient").await?;

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({"email": "nobody@example.com"})),
        )
        .await?;
    assert_error(&reply, StatusCode::NOT_FOUND);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({"email": "forgetful@example.com"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"], "Email sent");

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    let marker = "/api/v1/auth/resetpassword/";
    let start = sent[0].body.find(marker).expect("reset url in mail") + marker.len();
    let token: String = sent[0].body[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    assert_eq!(token.len(), 40);

    let reply = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/resetpassword/deadbeef",
            None,
            Some(json!({"password": "fresh789"})),
        )
        .await?;
    assert_error(&reply, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Invalid token");

    let reply = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/auth/resetpassword/{token}"),
            None,
            Some(json!({"password": "fresh789"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "forgetful@example.com", "password": "fresh789"})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn failed_reset_mail_is_a_server_error() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.register_patient("unlucky@example.com", "patient").await?;
    ctx.mailer.set_failing(true);

    let reply = ctx
        .send(
            Method::POST,
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({"email": "unlucky@example.com"})),
        )
        .await?;
    assert_error(&reply, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["error"], "Email could not be sent");

    let token: Option<String> =
        sqlx::query_scalar("SELECT reset_password_token FROM patients WHERE email = ?")
            .bind("unlucky@example.com")
            .fetch_one(ctx.pool())
            .await?;
    assert!(token.is_none());
    Ok(())
}

#[tokio::test]
async fn logout_expires_the_cookie() -> TestResult {
    let ctx = TestContext::new().await?;
    let reply = ctx.send(Method::GET, "/api/v1/auth/logout", None, None).await?;

    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.set_cookie.expect("removal cookie");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn stats_come_from_the_cache_and_map_upstream_failures() -> TestResult {
    let ctx = TestContext::new().await?;

    ctx.stats_source.failing.store(true, Ordering::SeqCst);
    let reply = ctx.send(Method::GET, "/api/v1/stats", None, None).await?;
    assert_error(&reply, StatusCode::BAD_GATEWAY);

    ctx.stats_source.failing.store(false, Ordering::SeqCst);
    let reply = ctx.send(Method::GET, "/api/v1/stats", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["global"]["cases"], 1000);
    assert_eq!(reply.body["data"]["country"]["country"], "Pakistan");
    assert_eq!(reply.body["data"]["country"]["cases"], 100);
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_not_found() -> TestResult {
    let ctx = TestContext::new().await?;
    for uri in [
        "/api/v1/points/missing",
        "/api/v1/plasmas/missing",
        "/api/v1/reviews/missing",
        "/api/v1/doctors/missing",
        "/api/v1/points/missing/plasmas",
    ] {
        let reply = ctx.send(Method::GET, uri, None, None).await?;
        assert_error(&reply, StatusCode::NOT_FOUND);
    }
    Ok(())
}
