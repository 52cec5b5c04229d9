//! Axum router and all HTTP handlers for hdk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so the scenario tests in `tests/` can drive the bare
//! router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use hdk_domain::query::parse_order_date;
use hdk_domain::{
    Item, ItemId, NewOrder, Order, OrderFilter, OrderId, OrderStatus, Page, ValidationError,
};
use hdk_kitchen::KitchenError;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    api_types::{FilterQuery, HealthResponse, NextToPrepareQuery, OrderResponse, StatusQuery},
    error::ApiError,
    state::{AppState, BusMsg},
};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/filtered", get(list_filtered))
        .route("/orders/next-to-prepare", get(next_to_prepare))
        .route("/orders/status/:status", get(list_by_status))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/status", post(set_status))
        .route("/items/:id", get(get_item))
        .with_state(state)
}

/// Undecodable bodies and query strings are validation failures, not 422s.
fn malformed_body(rejection: JsonRejection) -> ApiError {
    ValidationError::Malformed(rejection.body_text()).into()
}

fn malformed_query(rejection: QueryRejection) -> ApiError {
    ValidationError::Malformed(rejection.body_text()).into()
}

fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

/// 204 for an empty listing, 200 with the orders otherwise.
fn listing_or_no_content(orders: Vec<Order>) -> Response {
    if orders.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::OK, Json(to_responses(orders))).into_response()
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            store: st.orders.backend().to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// /orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(new) = body.map_err(malformed_body)?;
    let order = st.orders.create_order(new).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))).into_response())
}

pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    Ok(Json(to_responses(st.orders.list_orders().await?)))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderResponse>> {
    let id = OrderId(id);
    let order = st
        .orders
        .get_order(id)
        .await?
        .ok_or(KitchenError::NotFound(id))?;
    Ok(Json(order.into()))
}

pub(crate) async fn delete_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    st.orders.delete_order(OrderId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_by_status(
    State(st): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> ApiResult<Response> {
    let status = OrderStatus::parse(&status)?;
    Ok(listing_or_no_content(
        st.orders.list_orders_by_status(status).await?,
    ))
}

pub(crate) async fn list_filtered(
    State(st): State<Arc<AppState>>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let Query(q) = query.map_err(malformed_query)?;
    let filter = OrderFilter {
        date: q.order_date.as_deref().map(parse_order_date).transpose()?,
        status: q.status.as_deref().map(OrderStatus::parse).transpose()?,
        ordered_by: q.ordered_by.filter(|s| !s.trim().is_empty()),
    };
    // a page is applied only when asked for
    let page = (q.start_index.is_some() || q.page_length.is_some()).then(|| Page {
        start_index: q.start_index.unwrap_or(0),
        page_length: q.page_length.unwrap_or(Page::DEFAULT_LENGTH),
    });

    Ok(Json(to_responses(
        st.orders.list_orders_filtered(&filter, page).await?,
    )))
}

pub(crate) async fn next_to_prepare(
    State(st): State<Arc<AppState>>,
    Query(q): Query<NextToPrepareQuery>,
) -> ApiResult<Response> {
    let preparer = q.user.unwrap_or_default();
    Ok(match st.orders.claim_next_order(&preparer).await? {
        Some(order) => (StatusCode::OK, Json(OrderResponse::from(order))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub(crate) async fn set_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<OrderResponse>> {
    let Query(q) = query.map_err(malformed_query)?;
    let status = OrderStatus::parse(q.status.as_deref().unwrap_or_default())?;
    let order = st.orders.set_order_status(OrderId(id), status).await?;
    Ok(Json(order.into()))
}

// ---------------------------------------------------------------------------
// GET /items/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Item>> {
    let item = st
        .orders
        .get_item(ItemId(id))
        .await?
        .ok_or(KitchenError::ItemNotFound(ItemId(id)))?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// GET /v1/stream (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged
        }
    })
}
