use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use campusmart_core::domain::item::ItemId;
use campusmart_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use campusmart_core::domain::user::UserId;
use campusmart_core::lifecycle::gateway::{
    GatewayError, NewPurchaseRequest, RequestGateway, RequestListing, RequestQuery,
};

#[derive(Default)]
struct State {
    usernames: HashMap<UserId, String>,
    /// item id -> (title, seller)
    items: HashMap<ItemId, (String, UserId)>,
    requests: HashMap<RequestId, PurchaseRequest>,
    next_request_id: i64,
}

impl State {
    fn open_request_exists(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
        except: Option<RequestId>,
    ) -> bool {
        self.requests.values().any(|request| {
            Some(request.id) != except
                && request.item_id == item_id
                && request.buyer_id == buyer_id
                && request.status.is_open()
        })
    }

    fn listing(&self, request: &PurchaseRequest) -> Option<RequestListing> {
        let (item_title, _) = self.items.get(&request.item_id)?;
        Some(RequestListing {
            id: request.id,
            item_id: request.item_id,
            item_title: item_title.clone(),
            buyer_id: request.buyer_id,
            buyer_username: self.usernames.get(&request.buyer_id)?.clone(),
            seller_id: request.seller_id,
            seller_username: self.usernames.get(&request.seller_id)?.clone(),
            status: request.status,
            message: request.message.clone(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        })
    }
}

/// Request gateway over process memory with the same uniqueness rule as the SQL schema.
#[derive(Default)]
pub struct InMemoryMarketplace {
    state: RwLock<State>,
}

impl InMemoryMarketplace {
    pub async fn insert_user(&self, id: UserId, username: impl Into<String>) {
        self.state.write().await.usernames.insert(id, username.into());
    }

    pub async fn insert_item(&self, id: ItemId, title: impl Into<String>, seller_id: UserId) {
        self.state.write().await.items.insert(id, (title.into(), seller_id));
    }

    pub async fn request(&self, id: RequestId) -> Option<PurchaseRequest> {
        self.state.read().await.requests.get(&id).cloned()
    }
}

#[async_trait]
impl RequestGateway for InMemoryMarketplace {
    async fn resolve_seller(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<Option<UserId>, GatewayError> {
        let state = self.state.read().await;
        if !state.usernames.contains_key(&buyer_id) {
            return Ok(None);
        }
        Ok(state.items.get(&item_id).map(|(_, seller_id)| *seller_id))
    }

    async fn has_open_request(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<bool, GatewayError> {
        Ok(self.state.read().await.open_request_exists(item_id, buyer_id, None))
    }

    async fn insert_request(&self, request: NewPurchaseRequest) -> Result<RequestId, GatewayError> {
        let mut state = self.state.write().await;
        if state.open_request_exists(request.item_id, request.buyer_id, None) {
            return Err(GatewayError::DuplicateOpenRequest);
        }

        state.next_request_id += 1;
        let id = RequestId(state.next_request_id);
        state.requests.insert(
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

    async fn find_request(&self, id: RequestId) -> Result<Option<PurchaseRequest>, GatewayError> {
        Ok(self.request(id).await)
    }

    async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        let mut state = self.state.write().await;
        let Some((item_id, buyer_id)) =
            state.requests.get(&id).map(|request| (request.item_id, request.buyer_id))
        else {
            return Ok(false);
        };
        if status.is_open() && state.open_request_exists(item_id, buyer_id, Some(id)) {
            return Err(GatewayError::DuplicateOpenRequest);
        }

        if let Some(request) = state.requests.get_mut(&id) {
            request.status = status;
            request.updated_at = updated_at;
        }
        Ok(true)
    }

    async fn list_requests(
        &self,
        query: &RequestQuery,
    ) -> Result<Vec<RequestListing>, GatewayError> {
        let state = self.state.read().await;
        let mut listings: Vec<RequestListing> = state
            .requests
            .values()
            .filter_map(|request| state.listing(request))
            .filter(|listing| query.matches(listing))
            .collect();
        query.order.sort(&mut listings);
        Ok(listings)
    }
}
