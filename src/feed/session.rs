use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::watch;
use tracing::debug;

use crate::models::{Quote, UserId};

use super::{FeedError, FeedQueryEngine, FeedResult};

/// Last-writer-wins gate for search-as-you-type.
///
/// Each viewer has a generation counter. Issuing a ticket bumps it, which
/// cancels any search still running under an older ticket for that viewer.
#[derive(Clone, Default)]
pub struct SearchSessions {
    generations: Arc<Mutex<HashMap<UserId, watch::Sender<u64>>>>,
}

impl SearchSessions {
    /// Claims the newest slot for `viewer`. Ordering between searches is the
    /// order of `issue` calls, not of when their results arrive.
    pub fn issue(&self, viewer: &UserId) -> SearchTicket {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // nobody holds a ticket for these, so there is nothing left to cancel
        generations.retain(|_, tx| tx.receiver_count() > 0);

        let tx = generations
            .entry(viewer.clone())
            .or_insert_with(|| watch::channel(0).0);

        tx.send_modify(|generation| *generation += 1);
        let generation = *tx.borrow();

        SearchTicket {
            viewer: viewer.clone(),
            generation,
            rx: tx.subscribe(),
        }
    }
}

pub struct SearchTicket {
    viewer: UserId,
    generation: u64,
    rx: watch::Receiver<u64>,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn resolve(self, engine: &FeedQueryEngine, query: &str) -> FeedResult<Vec<Quote>> {
        let SearchTicket { viewer, generation, rx } = self;
        let latest = rx.clone();

        let superseded = async move {
            let mut rx = rx;
            while rx.changed().await.is_ok() {
                if *rx.borrow_and_update() != generation {
                    return;
                }
            }
            std::future::pending::<()>().await
        };

        let quotes = engine
            .resolve_search_feed_until(&viewer, query, superseded)
            .await?;

        // a newer ticket may have landed between the join and here
        if *latest.borrow() != generation {
            debug!(%viewer, generation, "dropping superseded search result");
            return Err(FeedError::Cancelled);
        }

        Ok(quotes)
    }
}
