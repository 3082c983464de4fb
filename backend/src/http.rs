//! HTTP surface for the hosted broker.
//!
//! A mutating request acts as the account in `x-caller` only when
//! `x-signature` proves it (see [`crate::auth`]). Requests without `x-caller`
//! act as the null address, which holds no role and no funds.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use vrf_broker::{Address, Amount, BrokerError, ErrorKind, InternalRequestId, KeyHash};
use vrf_broker::Context;

use crate::auth::{RequestAuth, CALLER_HEADER, SIGNATURE_HEADER};
use crate::metrics::Metrics;
use crate::node::{Node, SharedNode};

/// Shared application state accessible from HTTP handlers.
pub struct AppState {
    pub node: SharedNode,
    pub metrics: Arc<Metrics>,
    pub auth: RequestAuth,
}

#[derive(Debug, Deserialize)]
pub struct AmountBody {
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct BeneficiaryBody {
    pub beneficiary: Address,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawBody {
    pub amount: Amount,
    pub to: Address,
}

#[derive(Debug, Deserialize)]
pub struct RotateKeyBody {
    pub key_hash: KeyHash,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .route("/metrics", web::get().to(metrics))
        .route("/events", web::get().to(events))
        .route("/requests", web::post().to(request_random_number))
        .route("/requests/last", web::get().to(last_request))
        .route("/requests/{id}", web::get().to(request_by_id))
        .route("/subscription", web::get().to(subscription))
        .route("/subscription/open", web::post().to(open_subscription))
        .route("/subscription/close", web::post().to(close_subscription))
        .route("/subscription/top-up", web::post().to(top_up))
        .route("/subscription/withdraw", web::post().to(withdraw))
        .route("/admin/rotate-key", web::post().to(rotate_key))
        .route("/admin/reissue", web::post().to(reissue))
        .route("/admin/fund-and-request", web::post().to(fund_and_request));
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

/// The authenticated caller, or the null address when none is claimed.
fn caller(auth: &RequestAuth, req: &HttpRequest, body: &[u8]) -> Result<Address, HttpResponse> {
    let Some(value) = req.headers().get(CALLER_HEADER) else {
        return Ok(Address::ZERO);
    };
    let caller: Address = value
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad_request("invalid x-caller header"))?;

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok());
    match signature {
        Some(sig) if auth.verify(&caller, req.method().as_str(), req.path(), body, &sig) => {
            Ok(caller)
        }
        _ => {
            warn!(caller = %caller, path = req.path(), "Rejecting unauthenticated caller");
            Err(HttpResponse::Forbidden().json(serde_json::json!({
                "error": "missing or invalid x-signature",
                "kind": "Authorization",
            })))
        }
    }
}

fn json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid request body: {e}")))
}

fn broker_error(err: &BrokerError) -> HttpResponse {
    let status = match err.kind() {
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Resource => StatusCode::CONFLICT,
    };
    HttpResponse::build(status).json(serde_json::json!({
        "error": err.to_string(),
        "kind": format!("{:?}", err.kind()),
    }))
}

/// Run one mutating broker call as the authenticated caller, then commit the
/// node. A failed commit rolls the operation back.
async fn mutate<T>(
    data: &AppState,
    req: &HttpRequest,
    body: &[u8],
    op: impl FnOnce(&mut Node, Address) -> Result<T, BrokerError>,
    respond: impl FnOnce(T) -> serde_json::Value,
) -> HttpResponse {
    let caller = match caller(&data.auth, req, body) {
        Ok(caller) => caller,
        Err(resp) => return resp,
    };
    let mut node = data.node.lock().await;
    let before = node.snapshot();
    match op(&mut node, caller) {
        Ok(value) => match node.commit(before) {
            Ok(()) => HttpResponse::Ok().json(respond(value)),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to persist node state, rolled back");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "failed to persist state; operation rolled back",
                }))
            }
        },
        Err(err) => broker_error(&err),
    }
}

fn issued(data: &AppState, (request_id, lock_point): (InternalRequestId, u64)) -> serde_json::Value {
    data.metrics.record_request();
    serde_json::json!({ "request_id": request_id, "lock_point": lock_point })
}

/// Liveness probe. Returns 200 while the process is running.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Reports height and outstanding requests.
async fn status(data: web::Data<AppState>) -> HttpResponse {
    let node = data.node.lock().await;
    HttpResponse::Ok().json(serde_json::json!({
        "status": "running",
        "height": node.chain.height(),
        "last_request_id": node.broker.last_request_id(),
        "in_flight": node.broker.in_flight_handle(),
        "pending_requests": node.broker.pending_requests(),
        "oracle_jobs": node.chain.jobs().len(),
    }))
}

async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.metrics.to_json())
}

async fn events(data: web::Data<AppState>) -> HttpResponse {
    let node = data.node.lock().await;
    let events: Vec<_> = node.recent_events().collect();
    HttpResponse::Ok().json(events)
}

async fn request_random_number(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.request_random_number(Context::new(caller, chain))
        },
        |issuance| issued(&data, issuance),
    )
    .await
}

async fn last_request(data: web::Data<AppState>) -> HttpResponse {
    let node = data.node.lock().await;
    HttpResponse::Ok().json(serde_json::json!({ "request_id": node.broker.last_request_id() }))
}

async fn request_by_id(path: web::Path<u64>, data: web::Data<AppState>) -> HttpResponse {
    let request_id = InternalRequestId(path.into_inner());
    let node = data.node.lock().await;
    match node.broker.fulfillment(request_id) {
        Some(record) => HttpResponse::Ok().json(serde_json::json!({
            "request_id": request_id,
            "status": record.status(),
            "complete": node.broker.is_request_complete(request_id),
            "random_number": node.broker.random_number(request_id).to_string(),
            "lock_point": record.lock_point,
            "fulfilled_at": record.fulfilled_at,
            "requester": record.requester,
            "oracle_handle": record.oracle_handle,
        })),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("unknown request {request_id}"),
        })),
    }
}

async fn subscription(data: web::Data<AppState>) -> HttpResponse {
    let node = data.node.lock().await;
    let subscription_id = node.broker.subscription_id();
    let balance = subscription_id
        .and_then(|id| node.chain.subscription(id))
        .map(|held| held.balance);
    let custody = node.broker.address();
    HttpResponse::Ok().json(serde_json::json!({
        "subscription_id": subscription_id,
        "subscription_balance": balance,
        "funding_asset": node.broker.funding_asset_address(),
        "custody_balance": node.chain.balance(&custody),
    }))
}

async fn open_subscription(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.open_subscription(Context::new(caller, chain))
        },
        |subscription_id| serde_json::json!({ "subscription_id": subscription_id }),
    )
    .await
}

async fn close_subscription(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    let params: BeneficiaryBody = match json_body(&body) {
        Ok(params) => params,
        Err(resp) => return resp,
    };
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.close_subscription(Context::new(caller, chain), params.beneficiary)
        },
        |()| serde_json::json!({ "closed": true }),
    )
    .await
}

async fn top_up(req: HttpRequest, data: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let params: AmountBody = match json_body(&body) {
        Ok(params) => params,
        Err(resp) => return resp,
    };
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.top_up_subscription(Context::new(caller, chain), params.amount)
        },
        |()| serde_json::json!({ "topped_up": params.amount }),
    )
    .await
}

async fn withdraw(req: HttpRequest, data: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let params: WithdrawBody = match json_body(&body) {
        Ok(params) => params,
        Err(resp) => return resp,
    };
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.withdraw(Context::new(caller, chain), params.amount, params.to)
        },
        |()| serde_json::json!({ "withdrawn": params.amount, "to": params.to }),
    )
    .await
}

async fn rotate_key(req: HttpRequest, data: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let params: RotateKeyBody = match json_body(&body) {
        Ok(params) => params,
        Err(resp) => return resp,
    };
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.rotate_key_hash(Context::new(caller, chain), params.key_hash)
        },
        |()| serde_json::json!({ "key_hash": params.key_hash }),
    )
    .await
}

async fn reissue(req: HttpRequest, data: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.reissue_request(Context::new(caller, chain))
        },
        |issuance| issued(&data, issuance),
    )
    .await
}

async fn fund_and_request(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    let params: AmountBody = match json_body(&body) {
        Ok(params) => params,
        Err(resp) => return resp,
    };
    mutate(
        &data,
        &req,
        &body,
        |node, caller| {
            let Node { broker, chain, .. } = node;
            broker.fund_and_request(Context::new(caller, chain), params.amount)
        },
        |issuance| issued(&data, issuance),
    )
    .await
}
