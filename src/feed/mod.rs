//! Feed resolution.
//!
//! Every feed is built from at most two store queries per subject: one by
//! speaker, one by listener. When the viewer is looking at someone else the
//! results are narrowed to quotes the viewer took part in, so a stranger's
//! quotes never leak into a profile tab.

mod merge;
mod session;

use std::{future::Future, sync::Arc};

use futures_util::future::{try_join, try_join_all};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    models::{Quote, UserId},
    store::{QuoteStore, StoreError, UserDirectory},
};

pub use session::{SearchSessions, SearchTicket};

/// Shorter search text resolves to an empty feed.
pub const MIN_SEARCH_CHARS: usize = 2;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("quote store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request superseded")]
    Cancelled,
}

pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Combined,
    SaidOnly,
    HeardOnly,
}

#[derive(Clone)]
pub struct FeedQueryEngine {
    quotes: Arc<dyn QuoteStore>,
    users: Arc<dyn UserDirectory>,
}

impl FeedQueryEngine {
    pub fn new(quotes: Arc<dyn QuoteStore>, users: Arc<dyn UserDirectory>) -> FeedQueryEngine {
        FeedQueryEngine { quotes, users }
    }

    #[instrument(skip_all, fields(%viewer, %subject, ?mode))]
    pub async fn resolve_feed(
        &self,
        viewer: &UserId,
        subject: &UserId,
        mode: FeedMode,
    ) -> FeedResult<Vec<Quote>> {
        if self.users.resolve(subject).await?.is_none() {
            return Err(FeedError::NotFound(subject.clone()));
        }

        let quotes = match mode {
            FeedMode::SaidOnly => merge::merge_feed([self.said(viewer, subject).await?]),
            FeedMode::HeardOnly => merge::merge_feed([self.heard(viewer, subject).await?]),
            FeedMode::Combined => self.combined(viewer, subject).await?,
        };

        debug_assert!(quotes.iter().all(|quote| quote.involves(viewer)));
        debug!(count = quotes.len(), "resolved feed");
        Ok(quotes)
    }

    pub async fn resolve_search_feed(&self, viewer: &UserId, query: &str) -> FeedResult<Vec<Quote>> {
        self.resolve_search_feed_until(viewer, query, std::future::pending())
            .await
    }

    /// Like [`resolve_search_feed`](Self::resolve_search_feed), but gives up
    /// with [`FeedError::Cancelled`] as soon as `cancel` completes. In-flight
    /// sub-queries are dropped with it.
    #[instrument(skip_all, fields(%viewer, query = %query))]
    pub async fn resolve_search_feed_until<C>(
        &self,
        viewer: &UserId,
        query: &str,
        cancel: C,
    ) -> FeedResult<Vec<Quote>>
    where
        C: Future<Output = ()>,
    {
        if query.chars().count() < MIN_SEARCH_CHARS {
            return Ok(Vec::new());
        }

        tokio::select! {
            biased;
            () = cancel => {
                debug!("search cancelled");
                Err(FeedError::Cancelled)
            }
            quotes = self.search(viewer, query) => quotes,
        }
    }

    async fn search(&self, viewer: &UserId, query: &str) -> FeedResult<Vec<Quote>> {
        let matches = self.users.search_by_name_prefix(query).await?;
        debug!(matches = matches.len(), "name prefix matches");

        let feeds = try_join_all(matches.iter().map(|user| self.combined(viewer, &user.id))).await?;
        let quotes = merge::merge_feed(feeds);

        debug!(count = quotes.len(), "resolved search feed");
        Ok(quotes)
    }

    async fn combined(&self, viewer: &UserId, subject: &UserId) -> FeedResult<Vec<Quote>> {
        let (said, heard) = try_join(self.said(viewer, subject), self.heard(viewer, subject)).await?;
        Ok(merge::merge_feed([said, heard]))
    }

    async fn said(&self, viewer: &UserId, subject: &UserId) -> FeedResult<Vec<Quote>> {
        let mut quotes = self.quotes.find_by_speaker(subject).await?;
        if viewer != subject {
            quotes.retain(|quote| quote.heard_by.contains(viewer));
        }
        Ok(quotes)
    }

    async fn heard(&self, viewer: &UserId, subject: &UserId) -> FeedResult<Vec<Quote>> {
        let mut quotes = self.quotes.find_by_listener(subject).await?;
        if viewer != subject {
            quotes.retain(|quote| &quote.said_by == viewer);
        }
        Ok(quotes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use time::macros::datetime;
    use tokio::sync::Barrier;

    use super::*;
    use crate::{
        models::{NewQuote, QuoteId, User},
        store::{SqliteStore, StoreResult},
    };

    pub(crate) fn id(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    /// Quote store that fails listener queries.
    struct DeafStore(SqliteStore);

    #[async_trait]
    impl QuoteStore for DeafStore {
        async fn find_by_speaker(&self, speaker: &UserId) -> StoreResult<Vec<Quote>> {
            self.0.find_by_speaker(speaker).await
        }

        async fn find_by_listener(&self, _: &UserId) -> StoreResult<Vec<Quote>> {
            Err(StoreError::Unreachable("listener index offline".to_owned()))
        }

        async fn insert(&self, quote: &NewQuote) -> StoreResult<QuoteId> {
            self.0.insert(quote).await
        }
    }

    /// Counts every query that reaches the store.
    struct CountingStore {
        inner: SqliteStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteStore for CountingStore {
        async fn find_by_speaker(&self, speaker: &UserId) -> StoreResult<Vec<Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_speaker(speaker).await
        }

        async fn find_by_listener(&self, listener: &UserId) -> StoreResult<Vec<Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_listener(listener).await
        }

        async fn insert(&self, quote: &NewQuote) -> StoreResult<QuoteId> {
            self.inner.insert(quote).await
        }
    }

    #[async_trait]
    impl UserDirectory for CountingStore {
        async fn resolve(&self, id: &UserId) -> StoreResult<Option<User>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(id).await
        }

        async fn search_by_name_prefix(&self, prefix: &str) -> StoreResult<Vec<User>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search_by_name_prefix(prefix).await
        }

        async fn upsert(&self, user: &User) -> StoreResult<()> {
            self.inner.upsert(user).await
        }
    }

    /// Quote store whose two lookups only return once both are in flight.
    struct RendezvousStore {
        inner: SqliteStore,
        barrier: Barrier,
    }

    #[async_trait]
    impl QuoteStore for RendezvousStore {
        async fn find_by_speaker(&self, speaker: &UserId) -> StoreResult<Vec<Quote>> {
            self.barrier.wait().await;
            self.inner.find_by_speaker(speaker).await
        }

        async fn find_by_listener(&self, listener: &UserId) -> StoreResult<Vec<Quote>> {
            self.barrier.wait().await;
            self.inner.find_by_listener(listener).await
        }

        async fn insert(&self, quote: &NewQuote) -> StoreResult<QuoteId> {
            self.inner.insert(quote).await
        }
    }

    /// Directory that resolves ids but can't run name searches.
    struct NoSearchDirectory(SqliteStore);

    #[async_trait]
    impl UserDirectory for NoSearchDirectory {
        async fn resolve(&self, id: &UserId) -> StoreResult<Option<User>> {
            self.0.resolve(id).await
        }

        async fn search_by_name_prefix(&self, _: &str) -> StoreResult<Vec<User>> {
            Err(StoreError::Unreachable("name index offline".to_owned()))
        }

        async fn upsert(&self, user: &User) -> StoreResult<()> {
            self.0.upsert(user).await
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        for (raw, name) in [("5550000001", "Al"), ("5550000002", "Bo"), ("5550000003", "Cy")] {
            store.upsert(&User::named(id(raw), name)).await.unwrap();
        }
        store
    }

    async fn insert(store: &SqliteStore, said_by: &str, heard_by: &[&str]) -> QuoteId {
        store
            .insert(&NewQuote {
                text: "overheard".to_owned(),
                said_by: id(said_by),
                heard_by: heard_by.iter().map(|raw| id(raw)).collect(),
                creation_date: datetime!(2021-04-22 9:00 UTC),
                heard_by_display: String::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found() {
        let store = Arc::new(seeded().await);
        let engine = FeedQueryEngine::new(store.clone(), store);

        let err = engine
            .resolve_feed(&id("5550000001"), &id("5559999999"), FeedMode::SaidOnly)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::NotFound(missing) if missing == id("5559999999")));
    }

    #[tokio::test]
    async fn failed_listener_half_fails_combined_feed() {
        let store = seeded().await;
        insert(&store, "5550000001", &["5550000002"]).await;
        let engine = FeedQueryEngine::new(Arc::new(DeafStore(store.clone())), Arc::new(store));

        let said = engine
            .resolve_feed(&id("5550000001"), &id("5550000001"), FeedMode::SaidOnly)
            .await
            .unwrap();
        assert_eq!(said.len(), 1);

        let err = engine
            .resolve_feed(&id("5550000001"), &id("5550000001"), FeedMode::Combined)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::StoreUnavailable(StoreError::Unreachable(_))));
    }

    #[tokio::test]
    async fn combined_feed_queries_both_halves_at_once() {
        let store = seeded().await;
        let said = insert(&store, "5550000001", &["5550000002"]).await;
        let engine = FeedQueryEngine::new(
            Arc::new(RendezvousStore {
                inner: store.clone(),
                barrier: Barrier::new(2),
            }),
            Arc::new(store),
        );

        // run one after the other, the first lookup would wait forever
        let quotes = tokio::time::timeout(
            Duration::from_secs(5),
            engine.resolve_feed(&id("5550000001"), &id("5550000001"), FeedMode::Combined),
        )
        .await
        .expect("halves ran sequentially")
        .unwrap();
        assert_eq!(quotes.iter().map(|q| q.id).collect::<Vec<_>>(), [said]);
    }

    #[tokio::test]
    async fn failed_name_search_is_an_error_not_empty() {
        let store = seeded().await;
        insert(&store, "5550000002", &["5550000001"]).await;
        let engine = FeedQueryEngine::new(Arc::new(store.clone()), Arc::new(NoSearchDirectory(store)));

        let err = engine.resolve_search_feed(&id("5550000001"), "Bo").await.unwrap_err();
        assert!(matches!(err, FeedError::StoreUnavailable(StoreError::Unreachable(_))));
    }

    #[tokio::test]
    async fn failed_per_match_fetch_fails_the_search() {
        let store = seeded().await;
        insert(&store, "5550000002", &["5550000001"]).await;
        let engine = FeedQueryEngine::new(Arc::new(DeafStore(store.clone())), Arc::new(store));

        let err = engine.resolve_search_feed(&id("5550000001"), "Bo").await.unwrap_err();
        assert!(matches!(err, FeedError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn search_span_records_the_query() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer({
                let captured = captured.clone();
                move || captured.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(seeded().await);
        let engine = FeedQueryEngine::new(store.clone(), store);
        engine.resolve_search_feed(&id("5550000001"), "Bo").await.unwrap();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("query=Bo"), "{logs}");
    }

    #[tokio::test]
    async fn heard_tab_of_someone_else_needs_viewer_as_speaker() {
        let store = seeded().await;
        let mine = insert(&store, "5550000001", &["5550000002"]).await;
        insert(&store, "5550000003", &["5550000002"]).await;
        let store = Arc::new(store);
        let engine = FeedQueryEngine::new(store.clone(), store);

        let heard = engine
            .resolve_feed(&id("5550000001"), &id("5550000002"), FeedMode::HeardOnly)
            .await
            .unwrap();
        assert_eq!(heard.iter().map(|q| q.id).collect::<Vec<_>>(), [mine]);

        let own = engine
            .resolve_feed(&id("5550000002"), &id("5550000002"), FeedMode::HeardOnly)
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
    }

    #[tokio::test]
    async fn short_search_skips_the_store() {
        let counting = Arc::new(CountingStore {
            inner: seeded().await,
            calls: AtomicUsize::new(0),
        });
        let engine = FeedQueryEngine::new(counting.clone(), counting.clone());

        assert!(engine.resolve_search_feed(&id("5550000001"), "a").await.unwrap().is_empty());
        assert!(engine.resolve_search_feed(&id("5550000001"), "").await.unwrap().is_empty());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);

        engine.resolve_search_feed(&id("5550000001"), "Bo").await.unwrap();
        assert!(counting.calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn search_is_scoped_to_co_participants() {
        let store = seeded().await;
        let shared = insert(&store, "5550000002", &["5550000001"]).await;
        insert(&store, "5550000002", &["5550000003"]).await;
        let store = Arc::new(store);
        let engine = FeedQueryEngine::new(store.clone(), store);

        let found = engine.resolve_search_feed(&id("5550000001"), "Bo").await.unwrap();
        assert_eq!(found.iter().map(|q| q.id).collect::<Vec<_>>(), [shared]);
    }

    #[tokio::test]
    async fn completed_cancel_wins() {
        let store = Arc::new(seeded().await);
        let engine = FeedQueryEngine::new(store.clone(), store);

        let err = engine
            .resolve_search_feed_until(&id("5550000001"), "Bo", std::future::ready(()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Cancelled));
    }
}
