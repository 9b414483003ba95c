//! Response shapes for the request endpoints, independent of the HTTP layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::item::ItemId;
use crate::domain::request::{RequestId, RequestStatus};
use crate::lifecycle::gateway::RequestListing;
use crate::lifecycle::{DecidedRequest, SubmittedRequest};

pub const REQUEST_SENT: &str = "Request sent successfully";
pub const STATUS_UPDATED: &str = "Request status updated successfully";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestAck {
    pub message: &'static str,
    pub request_id: RequestId,
    pub status: RequestStatus,
}

impl From<SubmittedRequest> for RequestAck {
    fn from(value: SubmittedRequest) -> Self {
        Self { message: REQUEST_SENT, request_id: value.request_id, status: value.status }
    }
}

impl From<DecidedRequest> for RequestAck {
    fn from(value: DecidedRequest) -> Self {
        Self { message: STATUS_UPDATED, request_id: value.request_id, status: value.status }
    }
}

/// Row of the approved and search listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub id: RequestId,
    pub item: String,
    pub requester: String,
    pub status: RequestStatus,
    pub message: String,
}

impl From<RequestListing> for RequestSummary {
    fn from(value: RequestListing) -> Self {
        Self {
            id: value.id,
            item: value.item_title,
            requester: value.buyer_username,
            status: value.status,
            message: value.message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IncomingRequest {
    pub id: RequestId,
    pub item_id: ItemId,
    pub item: String,
    pub requester: String,
    pub status: RequestStatus,
    pub message: String,
}

impl From<RequestListing> for IncomingRequest {
    fn from(value: RequestListing) -> Self {
        Self {
            id: value.id,
            item_id: value.item_id,
            item: value.item_title,
            requester: value.buyer_username,
            status: value.status,
            message: value.message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SellerRequest {
    pub id: RequestId,
    pub item_id: ItemId,
    pub item_title: String,
    pub requester: String,
    pub status: RequestStatus,
    pub message: String,
    pub created_at: String,
}

impl From<RequestListing> for SellerRequest {
    fn from(value: RequestListing) -> Self {
        Self {
            id: value.id,
            item_id: value.item_id,
            item_title: value.item_title,
            requester: value.buyer_username,
            status: value.status,
            message: value.message,
            created_at: display_timestamp(&value.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuyerRequest {
    pub id: RequestId,
    pub item_id: ItemId,
    pub item_title: String,
    pub seller: String,
    pub status: RequestStatus,
    pub message: String,
    pub created_at: String,
}

impl From<RequestListing> for BuyerRequest {
    fn from(value: RequestListing) -> Self {
        Self {
            id: value.id,
            item_id: value.item_id,
            item_title: value.item_title,
            seller: value.seller_username,
            status: value.status,
            message: value.message,
            created_at: display_timestamp(&value.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestCollection<T> {
    pub requests: Vec<T>,
    pub total_count: usize,
}

impl<T: From<RequestListing>> FromIterator<RequestListing> for RequestCollection<T> {
    fn from_iter<I: IntoIterator<Item = RequestListing>>(iter: I) -> Self {
        let requests: Vec<T> = iter.into_iter().map(T::from).collect();
        Self { total_count: requests.len(), requests }
    }
}

/// Wire format for timestamps: `2025-11-03 20:51:16`, UTC, whole seconds.
pub fn display_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}
