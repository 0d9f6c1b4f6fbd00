use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    /// Time-ordered, so later inserts compare greater.
    pub fn generate() -> QuoteId {
        QuoteId(Uuid::now_v7())
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub said_by: UserId,
    pub heard_by: Vec<UserId>,
    #[serde(with = "time::serde::timestamp")]
    pub creation_date: OffsetDateTime,
    #[serde(rename = "heardByString")]
    pub heard_by_display: String,
}

impl Quote {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.said_by == user || self.heard_by.contains(user)
    }
}

/// A validated quote that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    pub text: String,
    pub said_by: UserId,
    pub heard_by: Vec<UserId>,
    pub creation_date: OffsetDateTime,
    pub heard_by_display: String,
}

impl NewQuote {
    pub fn with_id(self, id: QuoteId) -> Quote {
        Quote {
            id,
            text: self.text,
            said_by: self.said_by,
            heard_by: self.heard_by,
            creation_date: self.creation_date,
            heard_by_display: self.heard_by_display,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub phone_number: String,
    pub name: String,
}

/// What the authoring screen submits.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDraft {
    pub text: String,
    pub said_by: Participant,
    pub heard_by: Vec<Participant>,
    #[serde(with = "time::serde::timestamp")]
    pub creation_date: OffsetDateTime,
}
