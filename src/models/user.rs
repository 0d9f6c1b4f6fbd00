use std::fmt;

use serde::{Deserialize, Serialize};

use crate::feed::FeedError;

/// Phone-number-derived identifier. Doubles as the auth key and the
/// directory key, so every id in the system goes through [`UserId::parse`].
///
/// Numbering is North American only: `+1` and a bare leading `1` on an
/// 11-digit number are both dropped, so `+15551234567`, `15551234567` and
/// `5551234567` are the same user. Any other `+` country code is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub const MIN_DIGITS: usize = 7;
    pub const MAX_DIGITS: usize = 15;

    pub fn parse(raw: &str) -> Result<UserId, FeedError> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("+1").unwrap_or(trimmed);

        let mut digits = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '(' | ')' | '-' | '.' => {}
                _ => return Err(FeedError::InvalidInput(format!("malformed user id {raw:?}"))),
            }
        }

        if digits.len() == 11 && digits.starts_with('1') {
            digits.remove(0);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(FeedError::InvalidInput(format!("malformed user id {raw:?}")));
        }

        Ok(UserId(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = FeedError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        UserId::parse(&raw)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "profileImageUrl")]
    pub profile_image_url: String,
    pub phone_number: String,
}

impl User {
    /// Minimal profile: a name and no photo. Used at sign-up and when a quote
    /// names someone the directory has never seen.
    pub fn named(id: UserId, name: impl Into<String>) -> User {
        User {
            phone_number: id.to_string(),
            id,
            name: name.into(),
            profile_image_url: String::new(),
        }
    }
}
