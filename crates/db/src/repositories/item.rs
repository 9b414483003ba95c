use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;

use campusmart_core::domain::item::{Item, ItemId, Listing, NewItem, STATUS_AVAILABLE};
use campusmart_core::domain::user::UserId;

use super::{column, decode_timestamp, encode_timestamp, ItemRepository, RepositoryError};
use crate::DbPool;

const LISTING_SELECT: &str = "SELECT i.id, i.title, i.description, i.price, i.category,
        i.condition, i.seller_id, u.username AS seller_name, i.status, i.location,
        i.images_json, i.date_posted
 FROM items i
 JOIN users u ON u.id = i.seller_id";

pub struct SqlItemRepository {
    pool: DbPool,
}

impl SqlItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_listing(row: &SqliteRow) -> Result<Listing, RepositoryError> {
    let price: String = column(row, "price")?;
    let images_json: Option<String> = column(row, "images_json")?;
    let date_posted: String = column(row, "date_posted")?;

    let price = Decimal::from_str(&price)
        .map_err(|e| RepositoryError::Decode(format!("price `{price}`: {e}")))?;
    let images = match images_json.as_deref().map(str::trim) {
        None | Some("") => Vec::new(),
        Some(raw) => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| RepositoryError::Decode(format!("images_json: {e}")))?,
    };

    Ok(Listing {
        item: Item {
            id: ItemId(column(row, "id")?),
            title: column(row, "title")?,
            description: column(row, "description")?,
            price,
            category: column(row, "category")?,
            condition: column(row, "condition")?,
            seller_id: UserId(column(row, "seller_id")?),
            status: column(row, "status")?,
            location: column(row, "location")?,
            images,
            date_posted: decode_timestamp(&date_posted)?,
        },
        seller_name: column(row, "seller_name")?,
    })
}

#[async_trait]
impl ItemRepository for SqlItemRepository {
    async fn create(&self, item: NewItem) -> Result<ItemId, RepositoryError> {
        let images_json = serde_json::to_string(&item.images)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO items (title, description, price, category, condition, seller_id,
                                status, location, images_json, date_posted)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.price.to_string())
        .bind(&item.category)
        .bind(&item.condition)
        .bind(item.seller_id.0)
        .bind(STATUS_AVAILABLE)
        .bind(&item.location)
        .bind(images_json)
        .bind(encode_timestamp(&item.date_posted))
        .execute(&self.pool)
        .await?;

        Ok(ItemId(result.last_insert_rowid()))
    }

    async fn find_listing(&self, id: ItemId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query(&format!("{LISTING_SELECT} WHERE i.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_listing).transpose()
    }

    async fn list_available(&self) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{LISTING_SELECT} WHERE i.status = ? ORDER BY i.date_posted DESC, i.id DESC"
        ))
        .bind(STATUS_AVAILABLE)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_listing).collect()
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{LISTING_SELECT} WHERE i.seller_id = ? ORDER BY i.date_posted DESC, i.id DESC"
        ))
        .bind(seller_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_listing).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use campusmart_core::domain::item::NewItem;
    use campusmart_core::domain::user::{NewUser, UserId};

    use super::SqlItemRepository;
    use crate::repositories::{ItemRepository, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, UserId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let seller = SqlUserRepository::new(pool.clone())
            .create(NewUser::register(
                "sam",
                "sam@campus.edu",
                &SecretString::from("pw".to_string()),
            ))
            .await
            .expect("seller");
        (pool, seller)
    }

    fn new_item(seller_id: UserId, title: &str, minutes: i64) -> NewItem {
        let base = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).single().expect("valid timestamp");
        NewItem {
            title: title.to_string(),
            description: "Gently used".to_string(),
            price: Decimal::new(80000, 2),
            category: "Electronics".to_string(),
            condition: "Good".to_string(),
            seller_id,
            location: "Campus Library".to_string(),
            images: vec!["front.jpg".to_string(), "back.jpg".to_string()],
            date_posted: base + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn created_item_round_trips_price_and_images() {
        let (pool, seller) = setup().await;
        let repo = SqlItemRepository::new(pool);

        let id = repo.create(new_item(seller, "MacBook Pro", 0)).await.expect("create");
        let listing = repo.find_listing(id).await.expect("query").expect("listing");

        assert_eq!(listing.seller_name, "sam");
        assert_eq!(listing.item.price, Decimal::new(80000, 2));
        assert_eq!(listing.item.images, vec!["front.jpg", "back.jpg"]);
        assert_eq!(listing.item.status, "available");
    }

    #[tokio::test]
    async fn available_listings_are_newest_first_and_skip_other_statuses() {
        let (pool, seller) = setup().await;
        let repo = SqlItemRepository::new(pool.clone());
        let older = repo.create(new_item(seller, "Desk", 0)).await.expect("create");
        let newer = repo.create(new_item(seller, "Chair", 5)).await.expect("create");
        let sold = repo.create(new_item(seller, "Lamp", 10)).await.expect("create");
        sqlx::query("UPDATE items SET status = 'sold' WHERE id = ?")
            .bind(sold.0)
            .execute(&pool)
            .await
            .expect("mark sold");

        let available = repo.list_available().await.expect("list");
        let mine = repo.list_by_seller(seller).await.expect("list");

        assert_eq!(available.iter().map(|l| l.item.id).collect::<Vec<_>>(), vec![newer, older]);
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].item.id, sold);
    }

    #[tokio::test]
    async fn unknown_item_is_none() {
        let (pool, _) = setup().await;
        let repo = SqlItemRepository::new(pool);

        assert!(repo
            .find_listing(campusmart_core::domain::item::ItemId(42))
            .await
            .expect("query")
            .is_none());
    }
}
