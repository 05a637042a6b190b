use axum::{
    extract::{DefaultBodyLimit, OriginalUri, Request, State as AxumState},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use governor::middleware::NoOpMiddleware;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::Server;

mod http;

/// Prefix every route is served under.
pub const API_PREFIX: &str = "/api/v1";

pub struct Api {
    server: Arc<Server>,
}

#[derive(Clone)]
struct OriginConfig {
    allowed_origins: Arc<HashSet<String>>,
    allow_any_origin: bool,
    allow_no_origin: bool,
}

type IpGovernorConfig =
    tower_governor::governor::GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

fn default_governor_config() -> Option<IpGovernorConfig> {
    GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .finish()
}

impl Api {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub fn router(&self) -> Router {
        let config = &self.server.config;
        let allowed_origins = config
            .allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<HashSet<_>>();
        let allow_any_origin = allowed_origins.contains("*");
        if allowed_origins.is_empty() {
            tracing::warn!("no allowed HTTP origins configured; browser requests will be rejected");
        }
        let cors_origins = allowed_origins
            .iter()
            .filter(|origin| *origin != "*")
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("invalid allowed origin: {}", origin);
                    None
                }
            })
            .collect::<Vec<_>>();
        let origin_config = OriginConfig {
            allowed_origins: Arc::new(allowed_origins),
            allow_any_origin,
            allow_no_origin: config.allow_no_origin,
        };

        let cors = if allow_any_origin {
            CorsLayer::new().allow_origin(AllowOrigin::any())
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(cors_origins))
        }
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-request-id"),
            header::HeaderName::from_static("x-admin-token"),
            header::HeaderName::from_static("x-metrics-token"),
        ])
        .expose_headers([header::HeaderName::from_static("x-request-id")]);

        let governor_conf = match (
            config.http_rate_limit_per_second,
            config.http_rate_limit_burst,
        ) {
            (Some(rate_per_second), Some(burst_size)) if rate_per_second > 0 && burst_size > 0 => {
                let nanos_per_request = (1_000_000_000u64 / rate_per_second).max(1);
                GovernorConfigBuilder::default()
                    .period(Duration::from_nanos(nanos_per_request))
                    .burst_size(burst_size)
                    .key_extractor(SmartIpKeyExtractor)
                    .finish()
                    .or_else(|| {
                        tracing::warn!("invalid rate-limit config; falling back to defaults");
                        default_governor_config()
                    })
                    .map(Arc::new)
            }
            _ => None,
        };

        let public = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/lottery/types", get(http::list_lottery_types))
            .route("/lottery/bet-types", get(http::bet_types))
            .route("/lottery/rounds/open", get(http::open_rounds))
            .route("/lottery/bets", post(http::place_bet));

        let metrics = Router::new()
            .route("/metrics/settlement", get(http::settlement_metrics))
            .route("/metrics/prometheus", get(http::prometheus_metrics))
            .route_layer(middleware::from_fn_with_state(
                self.server.clone(),
                require_metrics_token,
            ));

        let admin = Router::new()
            .route(
                "/lottery/admin/types",
                get(http::list_lottery_types).post(http::create_lottery_type),
            )
            .route(
                "/lottery/admin/types/:id",
                get(http::get_lottery_type).put(http::update_lottery_type),
            )
            .route(
                "/lottery/admin/rounds",
                get(http::list_rounds).post(http::create_round),
            )
            .route("/lottery/admin/rounds/:id", get(http::get_round))
            .route("/lottery/admin/rounds/:id/close", post(http::close_round))
            .route("/lottery/admin/rounds/:id/bets", get(http::round_bets))
            .route("/lottery/admin/rounds/:id/summary", get(http::round_summary))
            .route(
                "/lottery/admin/rounds/:id/result",
                post(http::submit_result).put(http::submit_result),
            )
            .route("/admin/users", get(http::list_users).post(http::create_user))
            .route("/admin/users/:id", get(http::get_user))
            .route("/admin/bets", get(http::list_bets))
            .route(
                "/admin/transactions",
                get(http::list_transactions).post(http::create_transaction),
            )
            .route(
                "/admin/transactions/:id/approve",
                put(http::approve_transaction),
            )
            .route("/admin/transactions/:id/reject", put(http::reject_transaction))
            .route("/admin/reports", get(http::report))
            .route_layer(middleware::from_fn_with_state(
                self.server.clone(),
                require_admin_token,
            ));

        let router = public.merge(metrics).merge(admin);
        let router = match governor_conf {
            Some(config) => router.layer(GovernorLayer { config }),
            None => router,
        };
        let router = router.layer(cors);
        let router = router.layer(middleware::from_fn(move |req, next| {
            let origin_config = origin_config.clone();
            async move { enforce_origin(origin_config, req, next).await }
        }));
        let router = match config.http_body_limit_bytes {
            Some(limit) if limit > 0 => router.layer(DefaultBodyLimit::max(limit)),
            _ => router,
        };
        let router = router.layer(middleware::from_fn_with_state(
            self.server.clone(),
            request_id_middleware,
        ));
        let router = router.layer(TraceLayer::new_for_http());

        Router::new()
            .nest(API_PREFIX, router)
            .with_state(self.server.clone())
    }
}

/// Accepts `Authorization: Bearer <token>` or the given fallback header.
fn token_matches(headers: &HeaderMap, fallback: &str, expected: &str) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let header_token = headers
        .get(fallback)
        .and_then(|value| value.to_str().ok());
    bearer == Some(expected) || header_token == Some(expected)
}

async fn require_token(
    server: &Server,
    expected: Option<&str>,
    fallback: &str,
    req: Request,
    next: Next,
) -> Response {
    if let Some(expected) = expected.filter(|token| !token.is_empty()) {
        if !token_matches(req.headers(), fallback, expected) {
            server.http_metrics().inc_reject_unauthorized();
            return http::ApiError::Unauthorized.into_response();
        }
    }
    next.run(req).await
}

async fn require_admin_token(
    AxumState(server): AxumState<Arc<Server>>,
    req: Request,
    next: Next,
) -> Response {
    let expected = server.config.admin_token.clone();
    require_token(&server, expected.as_deref(), "x-admin-token", req, next).await
}

async fn require_metrics_token(
    AxumState(server): AxumState<Arc<Server>>,
    req: Request,
    next: Next,
) -> Response {
    let expected = server.config.metrics_token.clone();
    require_token(&server, expected.as_deref(), "x-metrics-token", req, next).await
}

async fn enforce_origin(config: OriginConfig, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if let Some(origin) = origin {
        if !config.allow_any_origin && !config.allowed_origins.contains(origin) {
            return http::ApiError::rejected(StatusCode::FORBIDDEN, "Origin not allowed")
                .into_response();
        }
    } else if !config.allow_no_origin {
        return http::ApiError::rejected(StatusCode::FORBIDDEN, "Origin required").into_response();
    }
    next.run(req).await
}

async fn request_id_middleware(
    AxumState(server): AxumState<Arc<Server>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(header::HeaderName::from_static("x-request-id"))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    match response.status() {
        StatusCode::FORBIDDEN => server.http_metrics().inc_reject_origin(),
        StatusCode::PAYLOAD_TOO_LARGE => server.http_metrics().inc_reject_body_limit(),
        StatusCode::TOO_MANY_REQUESTS => server.http_metrics().inc_reject_rate_limit(),
        status if status.is_success() && method != Method::GET && path.contains("admin/") => {
            server.http_metrics().record_admin_write(elapsed)
        }
        _ => {}
    }
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(
            header::HeaderName::from_static("x-request-id"),
            header_value,
        );
    }
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "http.request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use axum::body::Body;
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
        ServerConfig {
            round_tick: None,
            http_rate_limit_per_second: None,
            ..ServerConfig::default()
        }
    }

    fn app(config: ServerConfig) -> Router {
        Api::new(Arc::new(Server::new(config))).router()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri(format!("{API_PREFIX}{uri}"));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    /// Creates a lottery type, an open round and a user holding 1000.
    async fn seed(app: &Router) -> (String, String) {
        let (status, lottery_type) = send(
            app,
            Method::POST,
            "/lottery/admin/types",
            Some(json!({"name": "หวยรัฐบาลไทย", "code": "TH_GOV"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let now = Utc::now();
        let (status, round) = send(
            app,
            Method::POST,
            "/lottery/admin/rounds",
            Some(json!({
                "lotteryTypeId": lottery_type["id"],
                "roundNumber": "2026-11-01",
                "openTime": (now - ChronoDuration::hours(1)).to_rfc3339(),
                "closeTime": (now + ChronoDuration::hours(1)).to_rfc3339(),
            })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(round["status"], "open");

        let (status, user) = send(
            app,
            Method::POST,
            "/admin/users",
            Some(json!({"username": "somchai", "initialBalance": "1000"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        (
            round["id"].as_str().unwrap().to_string(),
            user["id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_healthz_echoes_request_id() {
        let app = app(test_config());
        let request = axum::http::Request::builder()
            .uri(format!("{API_PREFIX}/healthz"))
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_bet_and_settle_flow() {
        let app = app(test_config());
        let (round_id, user_id) = seed(&app).await;

        let (status, bet) = send(
            &app,
            Method::POST,
            "/lottery/bets",
            Some(json!({
                "userId": user_id,
                "lotteryRoundId": round_id,
                "betType": "two_digit",
                "numbers": ["25"],
                "amount": "100",
            })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bet["status"], "pending");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/lottery/admin/rounds/{round_id}/result"),
            Some(json!({"result": {"firstPrize": "123425", "lastTwoDigits": "25"}})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calculationResult"]["won"], 1);
        assert_eq!(body["calculationResult"]["lost"], 0);
        assert_eq!(decimal(&body["calculationResult"]["totalPayout"]), dec!(9000));

        let (_, user) = send(&app, Method::GET, &format!("/admin/users/{user_id}"), None, &[]).await;
        assert_eq!(decimal(&user["wallet"]["balance"]), dec!(9900));

        let (_, round) = send(
            &app,
            Method::GET,
            &format!("/lottery/admin/rounds/{round_id}"),
            None,
            &[],
        )
        .await;
        assert_eq!(round["status"], "completed");

        // Correcting the result moves the credit instead of adding to it.
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/lottery/admin/rounds/{round_id}/result"),
            Some(json!({"result": {"lastTwoDigits": "26"}})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calculationResult"]["won"], 0);
        assert_eq!(body["calculationResult"]["lost"], 1);
        let (_, user) = send(&app, Method::GET, &format!("/admin/users/{user_id}"), None, &[]).await;
        assert_eq!(decimal(&user["wallet"]["balance"]), dec!(900));

        let (_, summary) = send(
            &app,
            Method::GET,
            &format!("/lottery/admin/rounds/{round_id}/summary"),
            None,
            &[],
        )
        .await;
        assert_eq!(summary["lost"], 1);
        assert_eq!(summary["totalBets"], 1);

        let (_, report) = send(&app, Method::GET, "/admin/reports", None, &[]).await;
        assert_eq!(report["totalBets"], 1);
        assert_eq!(decimal(&report["profit"]), dec!(100));
    }

    #[tokio::test]
    async fn test_result_errors_map_to_status_codes() {
        let app = app(test_config());
        let (round_id, _) = seed(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/lottery/admin/rounds/{round_id}/result"),
            Some(json!({"result": {"lastTwoDigits": "2x"}})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/lottery/admin/rounds/{round_id}/result"),
            Some(json!({"result": {}})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/lottery/admin/rounds/{}/result", Uuid::new_v4()),
            Some(json!({"result": {"lastTwoDigits": "25"}})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, body) = send(
            &app,
            Method::GET,
            "/lottery/admin/rounds/not-a-uuid",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_round_listing_filters() {
        let app = app(test_config());
        let (round_id, _) = seed(&app).await;

        let (status, page) = send(
            &app,
            Method::GET,
            "/lottery/admin/rounds?status=open,closed&page=1&limit=5",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meta"]["total"], 1);
        assert_eq!(page["data"][0]["id"], round_id.as_str());

        let (status, page) = send(
            &app,
            Method::GET,
            "/lottery/admin/rounds?status=completed",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meta"]["total"], 0);

        let (status, _) = send(
            &app,
            Method::GET,
            "/lottery/admin/rounds?status=bogus",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, open) = send(&app, Method::GET, "/lottery/rounds/open", None, &[]).await;
        assert_eq!(open.as_array().unwrap().len(), 1);

        let (_, bet_types) = send(&app, Method::GET, "/lottery/bet-types", None, &[]).await;
        assert_eq!(bet_types.as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_insufficient_balance_is_unprocessable() {
        let app = app(test_config());
        let (round_id, user_id) = seed(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/lottery/bets",
            Some(json!({
                "userId": user_id,
                "lotteryRoundId": round_id,
                "betType": "running",
                "numbers": ["5"],
                "amount": "1000.01",
            })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "insufficient_balance");
    }

    #[tokio::test]
    async fn test_transaction_review_endpoints() {
        let app = app(test_config());
        let (_, user_id) = seed(&app).await;
        let (status, transaction) = send(
            &app,
            Method::POST,
            "/admin/transactions",
            Some(json!({"userId": user_id, "type": "deposit", "amount": "250"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = transaction["id"].as_str().unwrap().to_string();

        let (_, pending) = send(&app, Method::GET, "/admin/transactions", None, &[]).await;
        assert_eq!(pending["meta"]["total"], 1);

        let (status, approved) = send(
            &app,
            Method::PUT,
            &format!("/admin/transactions/{id}/approve"),
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/admin/transactions/{id}/reject"),
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (_, user) = send(&app, Method::GET, &format!("/admin/users/{user_id}"), None, &[]).await;
        assert_eq!(decimal(&user["wallet"]["balance"]), dec!(1250));
    }

    #[tokio::test]
    async fn test_admin_token_required_when_configured() {
        let app = app(ServerConfig {
            admin_token: Some("secret".to_string()),
            ..test_config()
        });

        let (status, body) = send(&app, Method::GET, "/admin/reports", None, &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = send(
            &app,
            Method::GET,
            "/admin/reports",
            None,
            &[("authorization", "Bearer secret")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::GET,
            "/lottery/admin/rounds",
            None,
            &[("x-admin-token", "secret")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/lottery/types", None, &[]).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_origin_allow_list() {
        let app = app(ServerConfig {
            allowed_origins: vec!["https://console.example".to_string()],
            allow_no_origin: false,
            ..test_config()
        });

        let (status, _) = send(
            &app,
            Method::GET,
            "/healthz",
            None,
            &[("origin", "https://console.example")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            Method::GET,
            "/healthz",
            None,
            &[("origin", "https://evil.example")],
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["message"], "Origin not allowed");

        let (status, body) = send(&app, Method::GET, "/healthz", None, &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["message"], "Origin required");
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let server = Arc::new(Server::new(ServerConfig {
            metrics_token: Some("m".to_string()),
            ..test_config()
        }));
        let app = Api::new(server.clone()).router();

        let (status, _) = send(&app, Method::GET, "/metrics/settlement", None, &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            Method::GET,
            "/metrics/settlement",
            None,
            &[("x-metrics-token", "m")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settlement"]["roundsSettled"], 0);
        assert_eq!(body["http"]["rejectUnauthorized"], 1);

        let request = axum::http::Request::builder()
            .uri(format!("{API_PREFIX}/metrics/prometheus"))
            .header("authorization", "Bearer m")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("lotto_settlement_rounds_total 0"));
    }

    #[tokio::test]
    async fn test_body_limit_rejects_large_payloads() {
        let app = app(ServerConfig {
            http_body_limit_bytes: Some(64),
            ..test_config()
        });
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/users",
            Some(json!({"username": "x".repeat(200)})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");
    }
}
