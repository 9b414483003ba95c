use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use campusmart_core::domain::item::ItemId;
use campusmart_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use campusmart_core::domain::user::UserId;
use campusmart_core::lifecycle::gateway::{
    GatewayError, NewPurchaseRequest, RequestGateway, RequestListing, RequestOrder, RequestQuery,
};

use super::{column, decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

const LISTING_SELECT: &str = "SELECT r.id, r.item_id, i.title AS item_title,
        r.buyer_id, b.username AS buyer_username,
        r.seller_id, s.username AS seller_username,
        r.status, r.message, r.created_at, r.updated_at
 FROM requests r
 JOIN items i ON i.id = r.item_id
 JOIN users b ON b.id = r.buyer_id
 JOIN users s ON s.id = r.seller_id
 WHERE 1 = 1";

pub struct SqlRequestGateway {
    pool: DbPool,
}

impl SqlRequestGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> Result<RequestStatus, RepositoryError> {
    raw.parse::<RequestStatus>().map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_request(row: &SqliteRow) -> Result<PurchaseRequest, RepositoryError> {
    let status: String = column(row, "status")?;
    let message: Option<String> = column(row, "message")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(PurchaseRequest {
        id: RequestId(column(row, "id")?),
        item_id: ItemId(column(row, "item_id")?),
        buyer_id: UserId(column(row, "buyer_id")?),
        seller_id: UserId(column(row, "seller_id")?),
        status: parse_status(&status)?,
        message: message.unwrap_or_default(),
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

fn row_to_listing(row: &SqliteRow) -> Result<RequestListing, RepositoryError> {
    let status: String = column(row, "status")?;
    let message: Option<String> = column(row, "message")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(RequestListing {
        id: RequestId(column(row, "id")?),
        item_id: ItemId(column(row, "item_id")?),
        item_title: column(row, "item_title")?,
        buyer_id: UserId(column(row, "buyer_id")?),
        buyer_username: column(row, "buyer_username")?,
        seller_id: UserId(column(row, "seller_id")?),
        seller_username: column(row, "seller_username")?,
        status: parse_status(&status)?,
        message: message.unwrap_or_default(),
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

/// `%needle%` with LIKE wildcards in the needle taken literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn build_listing_query(query: &RequestQuery) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::<Sqlite>::new(LISTING_SELECT);

    if let Some(status) = query.status {
        builder.push(" AND r.status = ").push_bind(status.as_str());
    }
    if let Some(buyer_id) = query.buyer_id {
        builder.push(" AND r.buyer_id = ").push_bind(buyer_id.0);
    }
    if let Some(seller_id) = query.seller_id {
        builder.push(" AND r.seller_id = ").push_bind(seller_id.0);
    }
    if let Some(text) = &query.text {
        let pattern = like_pattern(text);
        builder
            .push(" AND (LOWER(i.title) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(b.username) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    builder.push(match query.order {
        RequestOrder::NewestCreated => " ORDER BY r.created_at DESC, r.id DESC",
        RequestOrder::NewestUpdated => " ORDER BY r.updated_at DESC, r.id DESC",
    });
    builder
}

impl SqlRequestGateway {
    async fn resolve_seller_row(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<Option<UserId>, RepositoryError> {
        let seller: Option<i64> = sqlx::query_scalar(
            "SELECT i.seller_id
             FROM items i
             JOIN users buyer ON buyer.id = ?2
             WHERE i.id = ?1",
        )
        .bind(item_id.0)
        .bind(buyer_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(seller.map(UserId))
    }

    async fn fetch_listings(
        &self,
        query: &RequestQuery,
    ) -> Result<Vec<RequestListing>, RepositoryError> {
        let mut builder = build_listing_query(query);
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_listing).collect()
    }
}

#[async_trait]
impl RequestGateway for SqlRequestGateway {
    async fn resolve_seller(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<Option<UserId>, GatewayError> {
        Ok(self.resolve_seller_row(item_id, buyer_id).await?)
    }

    async fn has_open_request(
        &self,
        item_id: ItemId,
        buyer_id: UserId,
    ) -> Result<bool, GatewayError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM requests
                 WHERE item_id = ?1 AND buyer_id = ?2 AND status != 'rejected'
             )",
        )
        .bind(item_id.0)
        .bind(buyer_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(exists == 1)
    }

    async fn insert_request(&self, request: NewPurchaseRequest) -> Result<RequestId, GatewayError> {
        let created_at = encode_timestamp(&request.created_at);
        let result = sqlx::query(
            "INSERT INTO requests
                 (item_id, buyer_id, seller_id, status, message, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.item_id.0)
        .bind(request.buyer_id.0)
        .bind(request.seller_id.0)
        .bind(RequestStatus::Pending.as_str())
        .bind(&request.message)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(RequestId(result.last_insert_rowid()))
    }

    async fn find_request(&self, id: RequestId) -> Result<Option<PurchaseRequest>, GatewayError> {
        let row = sqlx::query(
            "SELECT id, item_id, buyer_id, seller_id, status, message, created_at, updated_at
             FROM requests WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query("UPDATE requests SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(encode_timestamp(&updated_at))
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_requests(
        &self,
        query: &RequestQuery,
    ) -> Result<Vec<RequestListing>, GatewayError> {
        Ok(self.fetch_listings(query).await?)
    }
}
