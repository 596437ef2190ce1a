//! Bounded fan-out enrichment.
//!
//! [`Enricher`] takes a list of summary records, fetches the full detail for
//! each one with at most `concurrency` requests in flight, and optionally
//! fills in secondary references (customer, products) through memoized
//! [`Secondary`] lookups. Memo caches are created per `enrich` call and
//! dropped with it. Results come back in input order. The first failure
//! cancels every outstanding fetch and is the only error returned.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use shopline_shared::{OrderSummary, Result, ShoplineError};

/// Worker count used when a caller passes 0.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A shareable keyed fetch: `(cancel, id) -> future of T`.
pub type Fetch<T> =
    Arc<dyn Fn(CancellationToken, String) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Box an async closure into a [`Fetch`].
pub fn fetcher<T, F, Fut>(f: F) -> Fetch<T>
where
    F: Fn(CancellationToken, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |cancel, id| f(cancel, id).boxed())
}

/// Records that can be enriched by their identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl Keyed for OrderSummary {
    fn key(&self) -> &str {
        &self.id
    }
}


// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Id-keyed cache shared by the workers of one enrichment run.
///
/// The lock is only held for lookups and inserts, never across a fetch, so
/// two workers missing the same key may both fetch it. The first value stored
/// wins and later duplicates are discarded.
pub struct MemoCache<V> {
    entries: Mutex<HashMap<String, V>>,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Store `value` unless the key is already present; returns the cached value.
    pub async fn insert_first(&self, key: String, value: V) -> V {
        self.entries.lock().await.entry(key).or_insert(value).clone()
    }
}

/// A secondary reference kind (e.g. customer) with its cache and fetcher.
///
/// Built fresh by [`Expansion::begin`] for every run, so the cache never
/// outlives one `enrich` call.
pub struct Secondary<V> {
    kind: &'static str,
    cache: MemoCache<V>,
    fetch: Fetch<V>,
}

impl<V: Clone + Send + 'static> Secondary<V> {
    pub fn new(kind: &'static str, fetch: Fetch<V>) -> Self {
        Self {
            kind,
            cache: MemoCache::new(),
            fetch,
        }
    }

    /// Cached value for `id`, fetching it on a miss.
    pub async fn resolve(&self, cancel: &CancellationToken, id: &str) -> Result<V> {
        if let Some(hit) = self.cache.get(id).await {
            trace!(kind = self.kind, id, "secondary cache hit");
            return Ok(hit);
        }
        let fetched = (self.fetch)(cancel.clone(), id.to_string()).await?;
        Ok(self.cache.insert_first(id.to_string(), fetched).await)
    }
}

/// One enrichment step applied to fetched detail records.
///
/// The expansion itself is stateless; [`Expansion::begin`] hands out the
/// per-run step that owns the memo caches.
pub trait Expansion<D>: Send + Sync {
    /// Short name used in error messages (`"customer"`, `"products"`).
    fn kind(&self) -> &'static str;

    /// Fresh state for one `enrich` call.
    fn begin(&self) -> Box<dyn ExpansionRun<D>>;
}

/// The per-run half of an [`Expansion`].
#[async_trait]
pub trait ExpansionRun<D>: Send + Sync {
    async fn expand(&self, cancel: &CancellationToken, detail: &mut D) -> Result<()>;
}

/// An expansion bound to one run.
struct RunStep<D> {
    kind: &'static str,
    run: Box<dyn ExpansionRun<D>>,
}

// ---------------------------------------------------------------------------
// Failure tracking
// ---------------------------------------------------------------------------

/// Keeps the first error of a run and cancels the shared token when it lands.
pub struct FirstErrorWins {
    first: Mutex<Option<ShoplineError>>,
    cancel: CancellationToken,
}

impl FirstErrorWins {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            first: Mutex::new(None),
            cancel,
        }
    }

    /// Returns `true` if `err` became the recorded error.
    pub async fn record(&self, err: ShoplineError) -> bool {
        let mut first = self.first.lock().await;
        if first.is_some() {
            trace!(error = %err, "dropping error after first failure");
            return false;
        }
        *first = Some(err);
        self.cancel.cancel();
        true
    }

    pub async fn is_tripped(&self) -> bool {
        self.first.lock().await.is_some()
    }

    pub async fn take(&self) -> Option<ShoplineError> {
        self.first.lock().await.take()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for enrichment runs.
pub trait EnrichProgress: Send + Sync {
    /// Called once per finished item, in completion order.
    fn item_enriched(&self, current: usize, total: usize);
}

/// No-op progress reporter.
pub struct SilentProgress;

impl EnrichProgress for SilentProgress {
    fn item_enriched(&self, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Fan-out detail fetcher for one resource kind.
pub struct Enricher<D> {
    resource: &'static str,
    concurrency: usize,
    fetch_detail: Fetch<D>,
    expansions: Vec<Arc<dyn Expansion<D>>>,
}

impl<D: Send + 'static> Enricher<D> {
    /// `resource` names the records in error messages (`"order"`).
    pub fn new(resource: &'static str, fetch_detail: Fetch<D>) -> Self {
        Self {
            resource,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_detail,
            expansions: Vec::new(),
        }
    }

    /// Set the worker count; 0 falls back to [`DEFAULT_CONCURRENCY`].
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            concurrency
        };
        self
    }

    pub fn with_expansion(mut self, expansion: Arc<dyn Expansion<D>>) -> Self {
        self.expansions.push(expansion);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch the detail for every item, in input order.
    ///
    /// Cancelling `cancel` stops the run; the outcome is then
    /// [`ShoplineError::Cancelled`] unless an item had already failed.
    #[instrument(skip_all, fields(resource = self.resource, items = items.len(), concurrency = self.concurrency))]
    pub async fn enrich<P: Keyed>(
        &self,
        items: &[P],
        cancel: &CancellationToken,
        progress: &dyn EnrichProgress,
    ) -> Result<Vec<D>> {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let run = cancel.child_token();
        let errors = Arc::new(FirstErrorWins::new(run.clone()));
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let steps: Arc<[RunStep<D>]> = self
            .expansions
            .iter()
            .map(|e| RunStep {
                kind: e.kind(),
                run: e.begin(),
            })
            .collect();

        let mut slots: Vec<Option<D>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut workers = JoinSet::new();

        for (index, item) in items.iter().enumerate() {
            let worker = Worker {
                index,
                id: item.key().to_string(),
                resource: self.resource,
                cancel: run.clone(),
                errors: Arc::clone(&errors),
                permits: Arc::clone(&permits),
                fetch_detail: Arc::clone(&self.fetch_detail),
                steps: Arc::clone(&steps),
            };
            workers.spawn(worker.run());
        }

        let mut done = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some((index, detail))) => {
                    slots[index] = Some(detail);
                    done += 1;
                    progress.item_enriched(done, total);
                }
                Ok(None) => {}
                Err(e) => {
                    errors
                        .record(ShoplineError::Task(format!("enrichment worker failed: {e}")))
                        .await;
                }
            }
        }

        if let Some(err) = errors.take().await {
            warn!(error = %err, completed = done, "enrichment aborted");
            return Err(err);
        }

        debug!(completed = done, "enrichment finished");
        slots
            .into_iter()
            .collect::<Option<Vec<D>>>()
            .ok_or_else(|| ShoplineError::Task("enrichment left unfilled result slots".into()))
    }
}

/// One item's share of an enrichment run.
struct Worker<D> {
    index: usize,
    id: String,
    resource: &'static str,
    cancel: CancellationToken,
    errors: Arc<FirstErrorWins>,
    permits: Arc<Semaphore>,
    fetch_detail: Fetch<D>,
    steps: Arc<[RunStep<D>]>,
}

impl<D: Send + 'static> Worker<D> {
    async fn run(self) -> Option<(usize, D)> {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            // Either a sibling failed (already recorded) or the caller cancelled.
            self.errors.record(ShoplineError::Cancelled).await;
            return None;
        };

        if self.errors.is_tripped().await {
            return None;
        }

        let mut detail = match (self.fetch_detail)(self.cancel.clone(), self.id.clone()).await {
            Ok(detail) => detail,
            Err(e) => {
                self.errors
                    .record(ShoplineError::context(
                        format!("failed to expand {} details for {}", self.resource, self.id),
                        e,
                    ))
                    .await;
                return None;
            }
        };

        for step in self.steps.iter() {
            if let Err(e) = step.run.expand(&self.cancel, &mut detail).await {
                self.errors
                    .record(ShoplineError::context(
                        format!(
                            "failed to expand {} for {} {}",
                            step.kind,
                            self.resource,
                            self.id
                        ),
                        e,
                    ))
                    .await;
                return None;
            }
        }

        trace!(index = self.index, id = %self.id, "item enriched");
        Some((self.index, detail))
    }
}
