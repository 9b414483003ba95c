//! Storage port consumed by the request lifecycle engine.
//!
//! Each write path maps onto exactly one INSERT or one UPDATE in the backing
//! store; reads go through [`RequestQuery`], which carries every filter the
//! listing endpoints need.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::item::ItemId;
use crate::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use crate::domain::user::UserId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The store refused a second open request for the same item and buyer.
    #[error("an open request already exists for this item and buyer")]
    DuplicateOpenRequest,
    #[error("storage failure: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPurchaseRequest {
    pub item_id: ItemId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestOrder {
    #[default]
    NewestCreated,
    NewestUpdated,
}

impl RequestOrder {
    /// Newest first; equal timestamps fall back to the higher id.
    pub fn sort(self, listings: &mut [RequestListing]) {
        match self {
            Self::NewestCreated => listings.sort_by_key(|l| Reverse((l.created_at, l.id))),
            Self::NewestUpdated => listings.sort_by_key(|l| Reverse((l.updated_at, l.id))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    /// ASCII-lowercased needle matched against item title or buyer username. Only ASCII letters
    /// are folded, the same as SQLite's `LOWER`.
    pub text: Option<String>,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub order: RequestOrder,
}

impl RequestQuery {
    pub fn with_status(mut self, status: Option<RequestStatus>) -> Self {
        self.status = status;
        self
    }

    /// Blank input leaves the query unfiltered.
    pub fn matching(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_ascii_lowercase);
        self
    }

    pub fn for_buyer(mut self, buyer_id: UserId) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn for_seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn ordered_by(mut self, order: RequestOrder) -> Self {
        self.order = order;
        self
    }

    pub fn matches(&self, listing: &RequestListing) -> bool {
        if self.status.is_some_and(|status| status != listing.status) {
            return false;
        }
        if self.buyer_id.is_some_and(|buyer| buyer != listing.buyer_id) {
            return false;
        }
        if self.seller_id.is_some_and(|seller| seller != listing.seller_id) {
            return false;
        }
        match &self.text {
            Some(needle) => {
                listing.item_title.to_ascii_lowercase().contains(needle.as_str())
                    || listing.buyer_username.to_ascii_lowercase().contains(needle.as_str())
            }
            None => true,
        }
    }
}

/// A request joined with the item title and both parties' usernames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestListing {
    pub id: RequestId,
    pub item_id: ItemId,
    pub item_title: String,
    pub buyer_id: UserId,
    pub buyer_username: String,
    pub seller_id: UserId,
    pub seller_username: String,
    pub status: RequestStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait RequestGateway: Send + Sync {
    /// Seller of `item_id`, provided both the item and the buyer exist.
    async fn resolve_seller(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<Option<UserId>, GatewayError>;

    async fn has_open_request(&self, item_id: ItemId, buyer_id: UserId)
        -> Result<bool, GatewayError>;

    async fn insert_request(&self, request: NewPurchaseRequest) -> Result<RequestId, GatewayError>;

    async fn find_request(&self, id: RequestId) -> Result<Option<PurchaseRequest>, GatewayError>;

    /// Returns `false` when no row carries `id`.
    async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, GatewayError>;

    async fn list_requests(&self, query: &RequestQuery)
        -> Result<Vec<RequestListing>, GatewayError>;
}
