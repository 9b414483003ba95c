use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::user::UserId;
use crate::errors::DomainError;

pub const STATUS_AVAILABLE: &str = "available";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub condition: String,
    pub seller_id: UserId,
    pub status: String,
    pub location: String,
    pub images: Vec<String>,
    pub date_posted: DateTime<Utc>,
}

/// An item joined with its seller's username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub item: Item,
    pub seller_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub condition: String,
    pub seller_id: UserId,
    pub location: String,
    pub images: Vec<String>,
    pub date_posted: DateTime<Utc>,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("Listing title must not be empty".to_owned()));
        }
        if self.price.is_sign_negative() {
            return Err(DomainError::InvalidInput("Listing price must not be negative".to_owned()));
        }
        Ok(())
    }
}

/// Accepts a JSON number or a numeric string, the two shapes clients send.
pub fn parse_price(raw: &Value) -> Result<Decimal, DomainError> {
    let text = match raw {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_owned(),
        other => {
            return Err(DomainError::InvalidInput(format!("Invalid price value: {other}")));
        }
    };

    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| DomainError::InvalidInput(format!("Invalid price value: {text}")))?;
    Ok(price.normalize())
}
