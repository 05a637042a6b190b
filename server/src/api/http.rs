use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State as AxumState},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use lotto_execution::admin::{self, AdminError, BetFilter};
use lotto_execution::{registry, report as reports, SettlementError};
use lotto_types::api::{
    CreateLotteryTypeRequest, CreateRoundRequest, CreateTransactionRequest, CreateUserRequest,
    ErrorResponse, PageQuery, PlaceBetRequest, SubmitResultRequest, SubmitResultResponse,
    UpdateLotteryTypeRequest,
};
use lotto_types::lottery::{
    BetStatus, LotteryTypeStatus, RoundStatus, TransactionStatus, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::render_prometheus;
use crate::Server;

#[derive(Debug, Error)]
pub(super) enum ApiError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    /// Malformed path, query or body, or a request refused by middleware.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("missing or invalid credentials")]
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Settlement(err) => match err {
                SettlementError::Validation(_) => StatusCode::BAD_REQUEST,
                SettlementError::NotFound(_) => StatusCode::NOT_FOUND,
                SettlementError::Conflict { .. } => StatusCode::CONFLICT,
                SettlementError::Integrity(_) | SettlementError::Transaction(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Admin(err) => match err {
                AdminError::Validation(_) => StatusCode::BAD_REQUEST,
                AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
                AdminError::Conflict(_) => StatusCode::CONFLICT,
                AdminError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AdminError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Rejected { status, .. } => *status,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Settlement(err) => err.code(),
            ApiError::Admin(err) => err.code(),
            ApiError::Rejected { status, .. } => match *status {
                StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
                StatusCode::FORBIDDEN => "forbidden",
                _ => "validation_error",
            },
            ApiError::Unauthorized => "unauthorized",
        }
    }

    pub(super) fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

/// JSON body whose rejections render as [`ErrorResponse`].
pub(super) struct Body<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        Ok(Body(value))
    }
}

/// Query string whose rejections render as [`ErrorResponse`].
pub(super) struct Params<T>(T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        Ok(Params(value))
    }
}

/// `:id` path segment parsed as a UUID.
pub(super) struct Id(Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        Ok(Id(id))
    }
}

fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

fn ok<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

pub(super) async fn settlement_metrics(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.metrics_snapshot()).into_response()
}

pub(super) async fn prometheus_metrics(AxumState(server): AxumState<Arc<Server>>) -> Response {
    let body = render_prometheus(&server.metrics_snapshot());
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response()
}

// Lottery types and the bet type registry.

#[derive(Deserialize)]
pub(super) struct LotteryTypesQuery {
    status: Option<LotteryTypeStatus>,
}

pub(super) async fn list_lottery_types(
    AxumState(server): AxumState<Arc<Server>>,
    Params(query): Params<LotteryTypesQuery>,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::list_lottery_types(&*store, query.status).await?))
}

pub(super) async fn bet_types() -> Response {
    Json(registry::descriptors()).into_response()
}

pub(super) async fn create_lottery_type(
    AxumState(server): AxumState<Arc<Server>>,
    Body(request): Body<CreateLotteryTypeRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(created(
        admin::create_lottery_type(&mut *store, request, Utc::now()).await?,
    ))
}

pub(super) async fn get_lottery_type(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::get_lottery_type(&*store, id).await?))
}

pub(super) async fn update_lottery_type(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
    Body(request): Body<UpdateLotteryTypeRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(ok(
        admin::update_lottery_type(&mut *store, id, request, Utc::now()).await?,
    ))
}

// Rounds.

#[derive(Deserialize)]
pub(super) struct RoundsQuery {
    page: Option<usize>,
    limit: Option<usize>,
    /// Comma-separated statuses, e.g. `open,closed`.
    status: Option<String>,
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<RoundStatus>, ApiError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<RoundStatus>()
                .map_err(|err| ApiError::rejected(StatusCode::BAD_REQUEST, err))
        })
        .collect()
}

pub(super) async fn open_rounds(AxumState(server): AxumState<Arc<Server>>) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::open_rounds(&*store, Utc::now()).await?))
}

pub(super) async fn list_rounds(
    AxumState(server): AxumState<Arc<Server>>,
    Params(query): Params<RoundsQuery>,
) -> ApiResult {
    let statuses = parse_statuses(query.status.as_deref())?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let store = server.store().read().await;
    Ok(ok(admin::list_rounds(&*store, &statuses, page).await?))
}

pub(super) async fn create_round(
    AxumState(server): AxumState<Arc<Server>>,
    Body(request): Body<CreateRoundRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(created(admin::create_round(&mut *store, request).await?))
}

pub(super) async fn get_round(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::get_round(&*store, id).await?))
}

pub(super) async fn close_round(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(ok(admin::close_round(&mut *store, id).await?))
}

pub(super) async fn round_bets(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
    Params(page): Params<PageQuery>,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::list_round_bets(&*store, id, page).await?))
}

pub(super) async fn round_summary(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(reports::round_summary(&*store, id).await?))
}

pub(super) async fn submit_result(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
    Body(request): Body<SubmitResultRequest>,
) -> ApiResult {
    let summary = server.settle_round(id, request.result).await?;
    Ok(ok(SubmitResultResponse {
        calculation_result: summary,
    }))
}

// Bets.

pub(super) async fn place_bet(
    AxumState(server): AxumState<Arc<Server>>,
    Body(request): Body<PlaceBetRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(created(admin::place_bet(&mut *store, request, Utc::now()).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BetsQuery {
    status: Option<BetStatus>,
    user_id: Option<UserId>,
    page: Option<usize>,
    limit: Option<usize>,
}

pub(super) async fn list_bets(
    AxumState(server): AxumState<Arc<Server>>,
    Params(query): Params<BetsQuery>,
) -> ApiResult {
    let filter = BetFilter {
        status: query.status,
        user_id: query.user_id,
        round_id: None,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let store = server.store().read().await;
    Ok(ok(admin::list_bets(&*store, filter, page).await?))
}

// Users.

pub(super) async fn list_users(
    AxumState(server): AxumState<Arc<Server>>,
    Params(page): Params<PageQuery>,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::list_users(&*store, page).await?))
}

pub(super) async fn create_user(
    AxumState(server): AxumState<Arc<Server>>,
    Body(request): Body<CreateUserRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(created(admin::create_user(&mut *store, request, Utc::now()).await?))
}

pub(super) async fn get_user(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(admin::get_user(&*store, id).await?))
}

// Deposit/withdraw review.

#[derive(Deserialize)]
pub(super) struct TransactionsQuery {
    status: Option<TransactionStatus>,
    page: Option<usize>,
    limit: Option<usize>,
}

pub(super) async fn list_transactions(
    AxumState(server): AxumState<Arc<Server>>,
    Params(query): Params<TransactionsQuery>,
) -> ApiResult {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let store = server.store().read().await;
    Ok(ok(admin::list_transactions(&*store, query.status, page).await?))
}

pub(super) async fn create_transaction(
    AxumState(server): AxumState<Arc<Server>>,
    Body(request): Body<CreateTransactionRequest>,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(created(
        admin::request_transaction(&mut *store, request, Utc::now()).await?,
    ))
}

pub(super) async fn approve_transaction(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(ok(admin::approve_transaction(&mut *store, id).await?))
}

pub(super) async fn reject_transaction(
    AxumState(server): AxumState<Arc<Server>>,
    Id(id): Id,
) -> ApiResult {
    let mut store = server.store().write().await;
    Ok(ok(admin::reject_transaction(&mut *store, id).await?))
}

pub(super) async fn report(AxumState(server): AxumState<Arc<Server>>) -> ApiResult {
    let store = server.store().read().await;
    Ok(ok(reports::report(&*store).await?))
}
