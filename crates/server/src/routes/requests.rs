//! Purchase-request endpoints.
//!
//! - `POST /send-request`                         submit a request (201)
//! - `POST /update-request-status/{request_id}`   seller decision
//! - `GET  /get-approved-requests`                approved, most recently decided first
//! - `GET  /get-incoming-requests`                pending, newest first
//! - `GET  /search-requests?q=&status=`           title/requester search
//! - `GET  /get-seller-requests/{seller_id}`      requests addressed to a seller
//! - `GET  /get-buyer-requests/{buyer_id}?status=` requests a buyer has sent

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use campusmart_core::domain::item::ItemId;
use campusmart_core::domain::request::RequestId;
use campusmart_core::domain::user::UserId;
use campusmart_core::lifecycle::views::{
    BuyerRequest, IncomingRequest, RequestAck, RequestCollection, RequestSummary, SellerRequest,
};

use super::AppState;
use crate::error::{missing_fields, new_correlation_id, ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct SendRequestBody {
    pub item_id: Option<i64>,
    pub buyer_id: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateBody {
    pub status: Option<String>,
    pub seller_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    pub status: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/send-request", post(send_request))
        .route("/update-request-status/{request_id}", post(update_request_status))
        .route("/get-approved-requests", get(approved_requests))
        .route("/get-incoming-requests", get(incoming_requests))
        .route("/search-requests", get(search_requests))
        .route("/get-seller-requests/{seller_id}", get(seller_requests))
        .route("/get-buyer-requests/{buyer_id}", get(buyer_requests))
}

pub async fn send_request(
    State(state): State<AppState>,
    payload: Result<Json<SendRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestAck>), ApiError> {
    let Json(body) = payload?;
    let correlation_id = new_correlation_id();

    let (item_id, buyer_id) = match (body.item_id, body.buyer_id) {
        (Some(item_id), Some(buyer_id)) => (ItemId(item_id), UserId(buyer_id)),
        (item_id, buyer_id) => {
            let missing: Vec<&str> =
                [("item_id", item_id.is_none()), ("buyer_id", buyer_id.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
            return Err(ApiError::bad_request(missing_fields(&missing), &correlation_id));
        }
    };

    let submitted = state
        .engine
        .submit_request(item_id, buyer_id, body.message)
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;

    info!(
        event_name = "request.submitted",
        correlation_id = %correlation_id,
        request_id = %submitted.request_id,
        item_id = %item_id,
        buyer_id = %buyer_id,
        "purchase request submitted"
    );

    Ok((StatusCode::CREATED, Json(RequestAck::from(submitted))))
}

pub async fn update_request_status(
    State(state): State<AppState>,
    request_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StatusUpdateBody>, JsonRejection>,
) -> Result<Json<RequestAck>, ApiError> {
    let Path(request_id) = request_id?;
    let Json(body) = payload?;
    let correlation_id = new_correlation_id();

    let decided = state
        .engine
        .decide_request(
            RequestId(request_id),
            body.seller_id.map(UserId),
            body.status.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;

    info!(
        event_name = "request.decided",
        correlation_id = %correlation_id,
        request_id = %decided.request_id,
        status = %decided.status,
        "purchase request decided"
    );

    Ok(Json(RequestAck::from(decided)))
}

pub async fn approved_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    let correlation_id = new_correlation_id();
    let rows = state
        .engine
        .list_approved()
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;
    Ok(Json(rows.into_iter().map(RequestSummary::from).collect()))
}

pub async fn incoming_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<IncomingRequest>>, ApiError> {
    let correlation_id = new_correlation_id();
    let rows = state
        .engine
        .list_pending()
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;
    Ok(Json(rows.into_iter().map(IncomingRequest::from).collect()))
}

pub async fn search_requests(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    let Query(params) = params?;
    let correlation_id = new_correlation_id();
    let rows = state
        .engine
        .search(params.q.as_deref(), params.status.as_deref())
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;
    Ok(Json(rows.into_iter().map(RequestSummary::from).collect()))
}

pub async fn seller_requests(
    State(state): State<AppState>,
    seller_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<RequestCollection<SellerRequest>>, ApiError> {
    let Path(seller_id) = seller_id?;
    let correlation_id = new_correlation_id();
    let rows = state
        .engine
        .list_for_seller(UserId(seller_id))
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;
    Ok(Json(rows.into_iter().collect()))
}

pub async fn buyer_requests(
    State(state): State<AppState>,
    buyer_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<RequestCollection<BuyerRequest>>, ApiError> {
    let Path(buyer_id) = buyer_id?;
    let Query(params) = params?;
    let correlation_id = new_correlation_id();
    let rows = state
        .engine
        .list_for_buyer(UserId(buyer_id), params.status.as_deref())
        .await
        .map_err(|error| ApiError::application(error, &correlation_id))?;
    Ok(Json(rows.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        Json,
    };

    use campusmart_core::domain::request::{RequestId, RequestStatus};
    use campusmart_core::errors::InterfaceError;

    use super::*;
    use crate::routes::tests::seeded_state;

    #[tokio::test]
    async fn send_request_reports_every_missing_field() {
        let state = seeded_state().await;

        let error = send_request(State(state), Ok(Json(SendRequestBody::default())))
            .await
            .expect_err("missing fields");

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.0.user_message(), "Missing required fields: ['item_id', 'buyer_id']");
    }

    #[tokio::test]
    async fn send_request_creates_pending_request() {
        let state = seeded_state().await;

        let (status, Json(ack)) = send_request(
            State(state),
            Ok(Json(SendRequestBody {
                item_id: Some(3),
                buyer_id: Some(2),
                message: Some("Is the bulb included?".to_string()),
            })),
        )
        .await
        .expect("submit");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(ack.status, RequestStatus::Pending);
        assert_eq!(ack.message, "Request sent successfully");
    }

    #[tokio::test]
    async fn duplicate_open_request_is_bad_request() {
        let state = seeded_state().await;

        // seeded request 1 is bob's pending request for item 1
        let error = send_request(
            State(state),
            Ok(Json(SendRequestBody { item_id: Some(1), buyer_id: Some(2), message: None })),
        )
        .await
        .expect_err("duplicate");

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.0.user_message(), "You already have a pending request for this item");
    }

    #[tokio::test]
    async fn other_seller_cannot_decide() {
        let state = seeded_state().await;

        let error = update_request_status(
            State(state),
            Ok(Path(1)),
            Ok(Json(StatusUpdateBody { status: Some("approved".to_string()), seller_id: Some(3) })),
        )
        .await
        .expect_err("forbidden");

        assert!(matches!(error.0, InterfaceError::Forbidden { .. }));
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_seller_is_invalid_decision() {
        let state = seeded_state().await;

        let error = update_request_status(
            State(state),
            Ok(Path(1)),
            Ok(Json(StatusUpdateBody { status: Some("approved".to_string()), seller_id: None })),
        )
        .await
        .expect_err("invalid");

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.0.user_message(), "Invalid/Missing fields.");
    }

    #[tokio::test]
    async fn seller_decision_is_normalised_to_lowercase() {
        let state = seeded_state().await;

        let Json(ack) = update_request_status(
            State(state),
            Ok(Path(1)),
            Ok(Json(StatusUpdateBody { status: Some("Rejected".to_string()), seller_id: Some(1) })),
        )
        .await
        .expect("decide");

        assert_eq!(ack.request_id, RequestId(1));
        assert_eq!(ack.status, RequestStatus::Rejected);
        assert_eq!(ack.message, "Request status updated successfully");
    }

    #[tokio::test]
    async fn search_status_filter_is_an_exact_match() {
        let state = seeded_state().await;
        let search = |status: &str| {
            search_requests(
                State(state.clone()),
                Ok(Query(SearchParams { q: None, status: Some(status.to_string()) })),
            )
        };

        let Json(unknown) = search("sold").await.expect("unknown status");
        let Json(shouted) = search("APPROVED").await.expect("upper-case status");
        let Json(approved) = search("approved").await.expect("approved");

        assert!(unknown.is_empty());
        assert!(shouted.is_empty());
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn buyer_requests_are_filtered_by_status() {
        let state = seeded_state().await;

        let Json(rejected) = buyer_requests(
            State(state.clone()),
            Ok(Path(2)),
            Ok(Query(StatusParams { status: Some("rejected".to_string()) })),
        )
        .await
        .expect("list");
        let Json(all) =
            buyer_requests(State(state), Ok(Path(2)), Ok(Query(StatusParams::default())))
                .await
                .expect("list");

        assert_eq!(rejected.total_count, 1);
        assert_eq!(rejected.requests[0].item_title, "Calculus Textbook");
        assert_eq!(rejected.requests[0].seller, "carol");
        assert_eq!(all.total_count, 2);
    }

    #[tokio::test]
    async fn seller_requests_name_the_requester() {
        let state = seeded_state().await;

        let Json(collection) = seller_requests(State(state), Ok(Path(1))).await.expect("list");

        assert_eq!(collection.total_count, 2);
        let mut requesters: Vec<&str> =
            collection.requests.iter().map(|row| row.requester.as_str()).collect();
        requesters.sort_unstable();
        assert_eq!(requesters, ["bob_buyer", "carol"]);
    }
}
