mod quote;
mod user;

pub use quote::{NewQuote, Participant, Quote, QuoteDraft, QuoteId};
pub use user::{User, UserId};
