mod new;

use std::collections::HashSet;

use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::{
    feed::{FeedError, FeedResult},
    models::{NewQuote, Participant, Quote, QuoteDraft, User, UserId},
    store::{QuoteStore, StoreResult, UserDirectory},
};

pub(crate) use new::new_quote;

pub const MAX_QUOTE_CHARS: usize = 120;

/// The listener label stored with each quote, lower-cased so it can be
/// searched without joining back to the directory.
pub fn heard_by_string<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.into_iter().collect();
    format!("Heard by: {}", names.join(", ")).to_lowercase()
}

/// Validates and stores a quote, creating directory entries for any
/// participant that has never signed up.
pub async fn create_quote(
    quotes: &dyn QuoteStore,
    users: &dyn UserDirectory,
    draft: QuoteDraft,
) -> FeedResult<Quote> {
    let QuoteDraft { text, said_by, heard_by, creation_date } = draft;

    if text.trim().is_empty() {
        return Err(FeedError::InvalidInput("quote text is empty".to_owned()));
    }
    let chars = text.chars().count();
    if chars > MAX_QUOTE_CHARS {
        return Err(FeedError::InvalidInput(format!(
            "quote is {chars} characters, limit is {MAX_QUOTE_CHARS}"
        )));
    }

    let speaker = UserId::parse(&said_by.phone_number)?;

    let mut seen = HashSet::new();
    let mut listeners = Vec::with_capacity(heard_by.len());
    for participant in &heard_by {
        let id = UserId::parse(&participant.phone_number)?;
        if seen.insert(id.clone()) {
            listeners.push((id, participant));
        }
    }
    if listeners.is_empty() {
        return Err(FeedError::InvalidInput("a quote needs at least one listener".to_owned()));
    }

    let mut participants = vec![(speaker.clone(), &said_by)];
    participants.extend(
        listeners
            .iter()
            .filter(|(id, _)| id != &speaker)
            .map(|(id, participant)| (id.clone(), *participant)),
    );
    try_join_all(
        participants
            .iter()
            .map(|(id, participant)| materialize(users, id, participant)),
    )
    .await?;

    let quote = NewQuote {
        text,
        said_by: speaker,
        heard_by_display: heard_by_string(listeners.iter().map(|(_, p)| p.name.trim())),
        heard_by: listeners.into_iter().map(|(id, _)| id).collect(),
        creation_date,
    };
    let id = quotes.insert(&quote).await?;

    info!(%id, said_by = %quote.said_by, listeners = quote.heard_by.len(), "created quote");
    Ok(quote.with_id(id))
}

async fn materialize(users: &dyn UserDirectory, id: &UserId, participant: &Participant) -> StoreResult<()> {
    if users.resolve(id).await?.is_some() {
        return Ok(());
    }

    debug!(%id, "adding contact to directory");
    users.upsert(&User::named(id.clone(), participant.name.trim())).await
}
