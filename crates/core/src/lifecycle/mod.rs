//! Purchase-request lifecycle.
//!
//! Creation is guarded against self-purchase and duplicate open requests; a
//! decision is accepted only from the seller recorded on the request. Reads
//! are plain filtered projections over [`RequestGateway::list_requests`].

pub mod clock;
pub mod gateway;
pub mod views;

use std::sync::Arc;

use crate::domain::item::ItemId;
use crate::domain::request::{Decision, RequestId, RequestStatus};
use crate::domain::user::UserId;
use crate::errors::{ApplicationError, DomainError};

use self::clock::{Clock, SystemClock};
use self::gateway::{
    GatewayError, NewPurchaseRequest, RequestGateway, RequestListing, RequestOrder, RequestQuery,
};

pub const ITEM_OR_BUYER_NOT_FOUND: &str = "Item or buyer not found";
pub const SELF_PURCHASE: &str = "You cannot request your own item";
pub const DUPLICATE_REQUEST: &str = "You already have a pending request for this item";
pub const INVALID_DECISION: &str = "Invalid/Missing fields.";
pub const REQUEST_NOT_FOUND: &str = "Request not found";
pub const NOT_REQUEST_SELLER: &str = "You are not authorized to update this request";
pub const CONFLICTING_OPEN_REQUEST: &str = "Another open request exists for this item and buyer";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmittedRequest {
    pub request_id: RequestId,
    pub status: RequestStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecidedRequest {
    pub request_id: RequestId,
    pub status: RequestStatus,
}

#[derive(Clone)]
pub struct RequestLifecycleEngine {
    gateway: Arc<dyn RequestGateway>,
    clock: Arc<dyn Clock>,
}

impl RequestLifecycleEngine {
    pub fn new(gateway: Arc<dyn RequestGateway>) -> Self {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn RequestGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    pub async fn submit_request(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
        message: Option<String>,
    ) -> Result<SubmittedRequest, ApplicationError> {
        let seller_id = self
            .gateway
            .resolve_seller(item_id, buyer_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(ITEM_OR_BUYER_NOT_FOUND.to_owned()))?;

        if seller_id == buyer_id {
            return Err(DomainError::Conflict(SELF_PURCHASE.to_owned()).into());
        }
        if self.gateway.has_open_request(item_id, buyer_id).await? {
            return Err(DomainError::Conflict(DUPLICATE_REQUEST.to_owned()).into());
        }

        // A concurrent submission that slipped past the check above is refused by the store
        // and surfaces as the same duplicate conflict.
        let request_id = self
            .gateway
            .insert_request(NewPurchaseRequest {
                item_id,
                buyer_id,
                seller_id,
                message: message.unwrap_or_default(),
                created_at: self.clock.now(),
            })
            .await?;

        Ok(SubmittedRequest { request_id, status: RequestStatus::Pending })
    }

    /// Applies the seller's decision. Already-decided requests may be decided again.
    pub async fn decide_request(
        &self,
        request_id: RequestId,
        seller_id: Option<UserId>,
        decision: &str,
    ) -> Result<DecidedRequest, ApplicationError> {
        let (Some(decision), Some(seller_id)) = (Decision::parse(decision), seller_id) else {
            return Err(DomainError::InvalidInput(INVALID_DECISION.to_owned()).into());
        };

        let request = self
            .gateway
            .find_request(request_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(REQUEST_NOT_FOUND.to_owned()))?;

        if request.seller_id != seller_id {
            return Err(DomainError::Forbidden(NOT_REQUEST_SELLER.to_owned()).into());
        }

        let status = decision.status();
        let updated = match self.gateway.update_status(request_id, status, self.clock.now()).await {
            Ok(updated) => updated,
            Err(GatewayError::DuplicateOpenRequest) => {
                return Err(DomainError::Conflict(CONFLICTING_OPEN_REQUEST.to_owned()).into());
            }
            Err(error) => return Err(error.into()),
        };
        if !updated {
            return Err(DomainError::NotFound(REQUEST_NOT_FOUND.to_owned()).into());
        }

        Ok(DecidedRequest { request_id, status })
    }

    pub async fn list_approved(&self) -> Result<Vec<RequestListing>, ApplicationError> {
        self.list(
            RequestQuery::default()
                .with_status(Some(RequestStatus::Approved))
                .ordered_by(RequestOrder::NewestUpdated),
        )
        .await
    }

    pub async fn list_pending(&self) -> Result<Vec<RequestListing>, ApplicationError> {
        self.list(RequestQuery::default().with_status(Some(RequestStatus::Pending))).await
    }

    pub async fn search(
        &self,
        text: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<RequestListing>, ApplicationError> {
        let query = RequestQuery::default().matching(text);
        match parse_status_filter(status) {
            StatusFilter::Any => self.list(query).await,
            StatusFilter::Only(status) => self.list(query.with_status(Some(status))).await,
            StatusFilter::NoMatch => Ok(Vec::new()),
        }
    }

    pub async fn list_for_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<RequestListing>, ApplicationError> {
        self.list(RequestQuery::default().for_seller(seller_id)).await
    }

    pub async fn list_for_buyer(
        &self,
        buyer_id: UserId,
        status: Option<&str>,
    ) -> Result<Vec<RequestListing>, ApplicationError> {
        let query = RequestQuery::default().for_buyer(buyer_id);
        match parse_status_filter(status) {
            StatusFilter::Any => self.list(query).await,
            StatusFilter::Only(status) => self.list(query.with_status(Some(status))).await,
            StatusFilter::NoMatch => Ok(Vec::new()),
        }
    }

    async fn list(&self, query: RequestQuery) -> Result<Vec<RequestListing>, ApplicationError> {
        Ok(self.gateway.list_requests(&query).await?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Only(RequestStatus),
    /// No stored status is spelled this way, so nothing can match.
    NoMatch,
}

/// Status filters compare verbatim with stored values; an empty filter means any status.
pub fn parse_status_filter(raw: Option<&str>) -> StatusFilter {
    match raw.filter(|value| !value.is_empty()) {
        None => StatusFilter::Any,
        Some(value) => {
            RequestStatus::from_stored(value).map_or(StatusFilter::NoMatch, StatusFilter::Only)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::clock::SteppingClock;
    use super::gateway::{
        GatewayError, NewPurchaseRequest, RequestGateway, RequestListing, RequestQuery,
    };
    use super::{parse_status_filter, RequestLifecycleEngine, StatusFilter};
    use crate::domain::item::ItemId;
    use crate::domain::request::{PurchaseRequest, RequestId, RequestStatus};
    use crate::domain::user::UserId;
    use crate::errors::{ApplicationError, DomainError};

    #[derive(Default)]
    struct ScriptedGateway {
        sellers: HashMap<(ItemId, UserId), UserId>,
        open_pairs: Vec<(ItemId, UserId)>,
        requests: Mutex<HashMap<RequestId, PurchaseRequest>>,
        insert_error: Option<GatewayError>,
        update_error: Option<GatewayError>,
        last_query: Mutex<Option<RequestQuery>>,
    }

    #[async_trait]
    impl RequestGateway for ScriptedGateway {
        async fn resolve_seller(
            &self,
            item_id: ItemId,
            buyer_id: UserId,
        ) -> Result<Option<UserId>, GatewayError> {
            Ok(self.sellers.get(&(item_id, buyer_id)).copied())
        }

        async fn has_open_request(
            &self,
            item_id: ItemId,
            buyer_id: UserId,
        ) -> Result<bool, GatewayError> {
            Ok(self.open_pairs.contains(&(item_id, buyer_id)))
        }

        async fn insert_request(
            &self,
            request: NewPurchaseRequest,
        ) -> Result<RequestId, GatewayError> {
            if let Some(error) = &self.insert_error {
                return Err(error.clone());
            }
            let mut requests = self.requests.lock().expect("lock");
            let id = RequestId(requests.len() as i64 + 1);
            requests.insert(
                id,
                PurchaseRequest {
                    id,
                    item_id: request.item_id,
                    buyer_id: request.buyer_id,
                    seller_id: request.seller_id,
                    status: RequestStatus::Pending,
                    message: request.message,
                    created_at: request.created_at,
                    updated_at: request.created_at,
                },
            );
            Ok(id)
        }

        async fn find_request(
            &self,
            id: RequestId,
        ) -> Result<Option<PurchaseRequest>, GatewayError> {
            Ok(self.requests.lock().expect("lock").get(&id).cloned())
        }

        async fn update_status(
            &self,
            id: RequestId,
            status: RequestStatus,
            updated_at: DateTime<Utc>,
        ) -> Result<bool, GatewayError> {
            if let Some(error) = &self.update_error {
                return Err(error.clone());
            }
            let mut requests = self.requests.lock().expect("lock");
            Ok(match requests.get_mut(&id) {
                Some(request) => {
                    request.status = status;
                    request.updated_at = updated_at;
                    true
                }
                None => false,
            })
        }

        async fn list_requests(
            &self,
            query: &RequestQuery,
        ) -> Result<Vec<RequestListing>, GatewayError> {
            *self.last_query.lock().expect("lock") = Some(query.clone());
            Ok(Vec::new())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).single().expect("valid timestamp")
    }

    fn marketplace() -> ScriptedGateway {
        let mut gateway = ScriptedGateway::default();
        gateway.sellers.insert((ItemId(1), UserId(20)), UserId(10));
        gateway.sellers.insert((ItemId(1), UserId(10)), UserId(10));
        gateway
    }

    fn engine(gateway: ScriptedGateway) -> (RequestLifecycleEngine, Arc<ScriptedGateway>) {
        let gateway = Arc::new(gateway);
        let clock = Arc::new(SteppingClock::new(start(), Duration::seconds(1)));
        (RequestLifecycleEngine::with_clock(gateway.clone(), clock), gateway)
    }

    fn domain(error: ApplicationError) -> DomainError {
        match error {
            ApplicationError::Domain(error) => error,
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_request_with_empty_default_message() {
        let (engine, gateway) = engine(marketplace());

        let submitted =
            engine.submit_request(ItemId(1), UserId(20), None).await.expect("submit");

        assert_eq!(submitted.status, RequestStatus::Pending);
        let stored = gateway
            .requests
            .lock()
            .expect("lock")
            .get(&submitted.request_id)
            .cloned()
            .expect("stored request");
        assert_eq!(stored.seller_id, UserId(10));
        assert_eq!(stored.message, "");
        assert_eq!(stored.created_at, start());
    }

    #[tokio::test]
    async fn missing_item_or_buyer_is_one_not_found() {
        let (engine, _) = engine(marketplace());

        let unknown_item = engine.submit_request(ItemId(9), UserId(20), None).await;
        let unknown_buyer = engine.submit_request(ItemId(1), UserId(99), None).await;

        let expected = DomainError::NotFound("Item or buyer not found".to_owned());
        assert_eq!(domain(unknown_item.expect_err("item")), expected);
        assert_eq!(domain(unknown_buyer.expect_err("buyer")), expected);
    }

    #[tokio::test]
    async fn seller_cannot_request_own_item_whatever_the_message() {
        let (engine, gateway) = engine(marketplace());

        for message in [None, Some(String::new()), Some("please".to_owned())] {
            let error = engine.submit_request(ItemId(1), UserId(10), message).await;
            assert_eq!(
                domain(error.expect_err("self purchase")),
                DomainError::Conflict("You cannot request your own item".to_owned())
            );
        }
        assert!(gateway.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn open_request_blocks_a_second_submission() {
        let mut gateway = marketplace();
        gateway.open_pairs.push((ItemId(1), UserId(20)));
        let (engine, _) = engine(gateway);

        let error = engine.submit_request(ItemId(1), UserId(20), None).await;

        assert_eq!(
            domain(error.expect_err("duplicate")),
            DomainError::Conflict("You already have a pending request for this item".to_owned())
        );
    }

    #[tokio::test]
    async fn store_level_duplicate_is_reported_as_conflict() {
        let mut gateway = marketplace();
        gateway.insert_error = Some(GatewayError::DuplicateOpenRequest);
        let (engine, _) = engine(gateway);

        let error = engine.submit_request(ItemId(1), UserId(20), None).await;

        assert!(matches!(domain(error.expect_err("race")), DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn decision_requires_known_value_and_seller() {
        let (engine, _) = engine(marketplace());
        let submitted = engine.submit_request(ItemId(1), UserId(20), None).await.expect("submit");

        for (seller, decision) in
            [(Some(UserId(10)), "pending"), (Some(UserId(10)), ""), (None, "approved")]
        {
            let error = engine.decide_request(submitted.request_id, seller, decision).await;
            assert_eq!(
                domain(error.expect_err("invalid")),
                DomainError::InvalidInput("Invalid/Missing fields.".to_owned())
            );
        }
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (engine, _) = engine(marketplace());

        let error = engine.decide_request(RequestId(404), Some(UserId(10)), "approved").await;

        assert_eq!(
            domain(error.expect_err("missing")),
            DomainError::NotFound("Request not found".to_owned())
        );
    }

    #[tokio::test]
    async fn only_recorded_seller_may_decide() {
        let (engine, gateway) = engine(marketplace());
        let submitted = engine.submit_request(ItemId(1), UserId(20), None).await.expect("submit");

        for decision in ["approved", "rejected", "APPROVED"] {
            for intruder in [UserId(20), UserId(99)] {
                let error =
                    engine.decide_request(submitted.request_id, Some(intruder), decision).await;
                assert!(matches!(domain(error.expect_err("forbidden")), DomainError::Forbidden(_)));
            }
        }
        let stored = gateway.requests.lock().expect("lock")[&submitted.request_id].clone();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn decision_is_case_insensitive_and_refreshes_updated_at() {
        let (engine, gateway) = engine(marketplace());
        let submitted = engine.submit_request(ItemId(1), UserId(20), None).await.expect("submit");

        let decided = engine
            .decide_request(submitted.request_id, Some(UserId(10)), " APPROVED ")
            .await
            .expect("decide");

        assert_eq!(decided.status, RequestStatus::Approved);
        let stored = gateway.requests.lock().expect("lock")[&submitted.request_id].clone();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert!(stored.updated_at > stored.created_at);
    }

    #[tokio::test]
    async fn decided_request_can_be_decided_again() {
        let (engine, _) = engine(marketplace());
        let submitted = engine.submit_request(ItemId(1), UserId(20), None).await.expect("submit");

        engine
            .decide_request(submitted.request_id, Some(UserId(10)), "approved")
            .await
            .expect("approve");
        let redecided = engine
            .decide_request(submitted.request_id, Some(UserId(10)), "rejected")
            .await
            .expect("reject");

        assert_eq!(redecided.status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn reopening_into_an_existing_open_pair_is_a_conflict() {
        let mut scripted = marketplace();
        scripted.update_error = Some(GatewayError::DuplicateOpenRequest);
        scripted.requests.lock().expect("lock").insert(
            RequestId(3),
            PurchaseRequest {
                id: RequestId(3),
                item_id: ItemId(1),
                buyer_id: UserId(20),
                seller_id: UserId(10),
                status: RequestStatus::Rejected,
                message: String::new(),
                created_at: start(),
                updated_at: start(),
            },
        );
        let (engine, _) = engine(scripted);

        let error = engine.decide_request(RequestId(3), Some(UserId(10)), "approved").await;

        assert_eq!(
            domain(error.expect_err("conflict")),
            DomainError::Conflict("Another open request exists for this item and buyer".to_owned())
        );
    }

    #[tokio::test]
    async fn backend_failures_become_persistence_errors() {
        let mut gateway = marketplace();
        gateway.insert_error = Some(GatewayError::Backend("database is locked".to_owned()));
        let (engine, _) = engine(gateway);

        let error = engine.submit_request(ItemId(1), UserId(20), None).await;

        assert_eq!(
            error.expect_err("backend"),
            ApplicationError::Persistence("database is locked".to_owned())
        );
    }

    #[tokio::test]
    async fn read_operations_build_expected_queries() {
        let (engine, gateway) = engine(marketplace());

        engine.list_approved().await.expect("approved");
        let approved = gateway.last_query.lock().expect("lock").clone().expect("query");
        assert_eq!(approved.status, Some(RequestStatus::Approved));
        assert_eq!(approved.order, super::RequestOrder::NewestUpdated);

        engine.list_pending().await.expect("pending");
        let pending = gateway.last_query.lock().expect("lock").clone().expect("query");
        assert_eq!(pending.status, Some(RequestStatus::Pending));
        assert_eq!(pending.order, super::RequestOrder::NewestCreated);

        engine.search(Some(" Laptop "), Some("rejected")).await.expect("search");
        let search = gateway.last_query.lock().expect("lock").clone().expect("query");
        assert_eq!(search.text.as_deref(), Some("laptop"));
        assert_eq!(search.status, Some(RequestStatus::Rejected));

        engine.list_for_buyer(UserId(20), Some("")).await.expect("buyer");
        let buyer = gateway.last_query.lock().expect("lock").clone().expect("query");
        assert_eq!(buyer.buyer_id, Some(UserId(20)));
        assert_eq!(buyer.status, None);

        engine.list_for_seller(UserId(10)).await.expect("seller");
        let seller = gateway.last_query.lock().expect("lock").clone().expect("query");
        assert_eq!(seller.seller_id, Some(UserId(10)));
    }

    #[test]
    fn status_filter_matches_stored_spelling_only() {
        assert_eq!(parse_status_filter(None), StatusFilter::Any);
        assert_eq!(parse_status_filter(Some("")), StatusFilter::Any);
        assert_eq!(
            parse_status_filter(Some("approved")),
            StatusFilter::Only(RequestStatus::Approved)
        );
        assert_eq!(parse_status_filter(Some("APPROVED")), StatusFilter::NoMatch);
        assert_eq!(parse_status_filter(Some(" pending")), StatusFilter::NoMatch);
        assert_eq!(parse_status_filter(Some("shipped")), StatusFilter::NoMatch);
    }

    #[tokio::test]
    async fn unmatched_status_filter_skips_the_gateway() {
        let gateway = Arc::new(marketplace());
        let engine = RequestLifecycleEngine::new(gateway.clone());

        let found = engine.search(Some("lamp"), Some("sold")).await.expect("search");
        let bought = engine.list_for_buyer(UserId(20), Some("Pending")).await.expect("buyer");

        assert!(found.is_empty());
        assert!(bought.is_empty());
        assert!(gateway.last_query.lock().expect("lock").is_none());
    }
}
