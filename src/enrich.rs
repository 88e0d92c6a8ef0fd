//! Catalog retrieval and per-candidate credits enrichment.
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::{RecommendError, RecommendResult};
use crate::models::Candidate;
use crate::query::QuerySpec;
use crate::taxonomy::MIN_RATING;
use crate::tmdb::{MovieCredits, TmdbApi};

/// Runs `f` over `items` with at most `limit` tasks in flight and returns the
/// outputs in input order. A task that panics drops its slot.
pub(crate) async fn fan_out<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let sem = Arc::new(Semaphore::new(limit.max(1)));
    let len = items.len();
    let mut set = JoinSet::new();
    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let fut = f(item);
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            (idx, fut.await)
        });
    }

    let mut slots: Vec<Option<R>> = (0..len).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, out)) => slots[idx] = Some(out),
            Err(e) => error!("Per-candidate task failed: {}", e),
        }
    }
    slots.into_iter().flatten().collect()
}

/// Issues the discovery call, re-applies the rating floor and attaches credits.
///
/// A failed discovery call is reported as [`RecommendError::Provider`]; credits
/// failures only blank the affected candidate.
pub async fn fetch_candidates(
    tmdb: Arc<dyn TmdbApi>,
    query: &QuerySpec,
    concurrency: usize,
) -> RecommendResult<Vec<Candidate>> {
    let page = tmdb.discover_movies(query).await.map_err(|e| {
        warn!("Discovery call failed: {:#}", e);
        RecommendError::Provider(format!("{e:#}"))
    })?;

    let total = page.len();
    let rated: Vec<Candidate> = page
        .into_iter()
        .filter(|c| c.vote_average >= MIN_RATING)
        .collect();
    debug!(total, kept = rated.len(), "Discovery page received");

    Ok(enrich_credits(tmdb, rated, concurrency).await)
}

pub async fn enrich_credits(
    tmdb: Arc<dyn TmdbApi>,
    candidates: Vec<Candidate>,
    concurrency: usize,
) -> Vec<Candidate> {
    fan_out(candidates, concurrency, move |mut candidate: Candidate| {
        let tmdb = tmdb.clone();
        async move {
            let credits = match tmdb.fetch_credits(candidate.id).await {
                Ok(credits) => credits,
                Err(e) => {
                    warn!(movie_id = candidate.id, "Credits lookup failed: {:#}", e);
                    MovieCredits::default()
                }
            };
            candidate.director = credits.director;
            candidate.cast = credits.cast;
            candidate
        }
    })
    .await
}
