use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_USERS: &[SeedUser] = &[
    SeedUser { id: 1, username: "sam_seller" },
    SeedUser { id: 2, username: "bob_buyer" },
    SeedUser { id: 3, username: "carol" },
];

const SEED_ITEMS: &[SeedItem] = &[
    SeedItem { id: 1, title: "MacBook Pro 13-inch", seller_id: 1 },
    SeedItem { id: 2, title: "Calculus Textbook", seller_id: 3 },
    SeedItem { id: 3, title: "Desk Lamp", seller_id: 1 },
];

const SEED_REQUESTS: &[SeedRequest] = &[
    SeedRequest { id: 1, item_id: 1, buyer_id: 2, seller_id: 1, status: "pending" },
    SeedRequest { id: 2, item_id: 1, buyer_id: 3, seller_id: 1, status: "approved" },
    SeedRequest { id: 3, item_id: 2, buyer_id: 2, seller_id: 3, status: "rejected" },
];

/// Small marketplace with one request in each lifecycle state.
///
/// Loading is idempotent: rows are keyed by fixed ids and inserted with
/// `INSERT OR IGNORE`, so re-running never duplicates or overwrites them.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            users: SEED_USERS.len(),
            items: SEED_ITEMS.len(),
            requests: SEED_REQUESTS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in SEED_USERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND username = ?2)",
            )
            .bind(user.id)
            .bind(user.username)
            .fetch_one(pool)
            .await?;
            checks.push((format!("user-{}", user.username), exists == 1));
        }

        for item in SEED_ITEMS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1 AND title = ?2 AND seller_id = ?3)",
            )
            .bind(item.id)
            .bind(item.title)
            .bind(item.seller_id)
            .fetch_one(pool)
            .await?;
            checks.push((format!("item-{}", item.id), exists == 1));
        }

        for request in SEED_REQUESTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM requests
                     WHERE id = ?1 AND item_id = ?2 AND buyer_id = ?3
                       AND seller_id = ?4 AND status = ?5
                 )",
            )
            .bind(request.id)
            .bind(request.item_id)
            .bind(request.buyer_id)
            .bind(request.seller_id)
            .bind(request.status)
            .fetch_one(pool)
            .await?;
            checks.push((format!("request-{}-{}", request.id, request.status), exists == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedUser {
    id: i64,
    username: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedItem {
    id: i64,
    title: &'static str,
    seller_id: i64,
}

#[derive(Debug, Clone, Copy)]
struct SeedRequest {
    id: i64,
    item_id: i64,
    buyer_id: i64,
    seller_id: i64,
    status: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub users: usize,
    pub items: usize,
    pub requests: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, present)| !present)
            .map(|(label, _)| label.as_str())
            .collect()
    }
}
