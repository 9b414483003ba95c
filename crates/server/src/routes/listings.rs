//! Catalog endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use campusmart_core::domain::item::{parse_price, ItemId, Listing, NewItem};
use campusmart_core::domain::user::UserId;
use campusmart_core::errors::{ApplicationError, DomainError};
use campusmart_core::lifecycle::views::display_timestamp;

use super::AppState;
use crate::error::{missing_fields, new_correlation_id, ApiError};

const REQUIRED_FIELDS: [&str; 7] =
    ["title", "description", "price", "category", "condition", "seller_id", "location"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListingView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    pub condition: String,
    pub seller_id: UserId,
    pub seller_name: String,
    pub location: String,
    pub status: String,
    pub date_posted: String,
    pub images: Vec<String>,
}

impl From<Listing> for ListingView {
    fn from(value: Listing) -> Self {
        let item = value.item;
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            price: item.price,
            category: item.category,
            condition: item.condition,
            seller_id: item.seller_id,
            seller_name: value.seller_name,
            location: item.location,
            status: item.status,
            date_posted: display_timestamp(&item.date_posted),
            images: item.images,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllListings {
    pub listings: Vec<ListingView>,
    pub total_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SellerListings {
    pub user_listings: Vec<ListingView>,
    pub total_count: usize,
    pub user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatedListing {
    pub message: &'static str,
    pub listing: ListingView,
}

#[derive(Debug, Default, Deserialize)]
pub struct SellerParams {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemParams {
    pub item_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-all-listings", get(all_listings))
        .route("/post-listing", post(post_listing))
        .route("/get-my-listings", get(my_listings))
        .route("/get-item-listing", get(item_listing))
}

pub async fn all_listings(State(state): State<AppState>) -> Result<Json<AllListings>, ApiError> {
    let correlation_id = new_correlation_id();
    let listings: Vec<ListingView> = state
        .items
        .list_available()
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .into_iter()
        .map(ListingView::from)
        .collect();

    Ok(Json(AllListings { total_count: listings.len(), listings }))
}

pub async fn post_listing(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedListing>), ApiError> {
    let Json(payload) = payload?;
    let correlation_id = new_correlation_id();

    let fields = match payload {
        Value::Object(fields) if !fields.is_empty() => fields,
        _ => return Err(ApiError::bad_request("No data provided", &correlation_id)),
    };
    let missing: Vec<&str> =
        REQUIRED_FIELDS.into_iter().filter(|field| !fields.contains_key(*field)).collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(missing_fields(&missing), &correlation_id));
    }

    let item = new_item(&fields).map_err(|error| ApiError::application(error, &correlation_id))?;

    let seller = state
        .users
        .find_by_id(item.seller_id)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?;
    if seller.is_none() {
        return Err(ApiError::not_found(
            format!("Seller {} not found", item.seller_id),
            &correlation_id,
        ));
    }

    let item_id = state
        .items
        .create(item)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?;
    let listing = state
        .items
        .find_listing(item_id)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .ok_or_else(|| {
            ApiError::application(
                ApplicationError::Persistence(format!("listing {item_id} vanished after insert")),
                &correlation_id,
            )
        })?;

    info!(
        event_name = "catalog.listing_created",
        correlation_id = %correlation_id,
        item_id = %item_id,
        seller_id = %listing.item.seller_id,
        "listing created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedListing { message: "Listing created successfully", listing: listing.into() }),
    ))
}

fn new_item(fields: &Map<String, Value>) -> Result<NewItem, ApplicationError> {
    let text = |name: &str| -> Result<String, ApplicationError> {
        match fields.get(name) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(Value::Number(value)) => Ok(value.to_string()),
            _ => Err(invalid(format!("Invalid request data: '{name}' must be a string"))),
        }
    };

    let seller_id = match fields.get("seller_id") {
        Some(Value::Number(value)) => value.as_i64(),
        Some(Value::String(value)) => value.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid("Invalid request data: 'seller_id' must be an integer".to_owned()))?;

    let images = match fields.get("images") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value::<Vec<String>>(value.clone()).map_err(|_| {
            invalid("Invalid request data: 'images' must be a list of strings".to_owned())
        })?,
    };

    let item = NewItem {
        title: text("title")?,
        description: text("description")?,
        price: parse_price(fields.get("price").unwrap_or(&Value::Null))?,
        category: text("category")?,
        condition: text("condition")?,
        seller_id: UserId(seller_id),
        location: text("location")?,
        images,
        date_posted: Utc::now(),
    };
    item.validate()?;
    Ok(item)
}

fn invalid(message: String) -> ApplicationError {
    DomainError::InvalidInput(message).into()
}

/// `Some(Ok(id))` for a numeric parameter, `None` when it is absent or blank.
fn id_param(raw: Option<&str>) -> Option<Result<i64, String>> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    Some(raw.parse::<i64>().map_err(|_| raw.to_owned()))
}

pub async fn my_listings(
    State(state): State<AppState>,
    params: Result<Query<SellerParams>, QueryRejection>,
) -> Result<Json<SellerListings>, ApiError> {
    let Query(params) = params?;
    let correlation_id = new_correlation_id();

    let user_id = match id_param(params.user_id.as_deref()) {
        None => {
            return Err(ApiError::bad_request("user_id parameter is required", &correlation_id));
        }
        Some(Err(raw)) => {
            return Err(ApiError::bad_request(
                format!("user_id must be an integer, got `{raw}`"),
                &correlation_id,
            ));
        }
        Some(Ok(id)) => UserId(id),
    };

    let user_listings: Vec<ListingView> = state
        .items
        .list_by_seller(user_id)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .into_iter()
        .map(ListingView::from)
        .collect();

    Ok(Json(SellerListings { total_count: user_listings.len(), user_listings, user_id }))
}

pub async fn item_listing(
    State(state): State<AppState>,
    params: Result<Query<ItemParams>, QueryRejection>,
) -> Result<Json<ListingView>, ApiError> {
    let Query(params) = params?;
    let correlation_id = new_correlation_id();

    let item_id = match id_param(params.item_id.as_deref()) {
        None => {
            return Err(ApiError::bad_request("item_id parameter is required", &correlation_id));
        }
        // a non-numeric id can never match a row
        Some(Err(_)) => return Err(ApiError::not_found("Item not found", &correlation_id)),
        Some(Ok(id)) => ItemId(id),
    };

    let listing = state
        .items
        .find_listing(item_id)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .ok_or_else(|| ApiError::not_found("Item not found", &correlation_id))?;

    Ok(Json(listing.into()))
}
