use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::enrich::fetch_candidates;
use crate::error::{RecommendError, RecommendResult};
use crate::interpret::PreferenceInterpreter;
use crate::models::{Candidate, FilterSet};
use crate::platform::filter_by_platform;
use crate::query::build_query;
use crate::seen::{SeenSet, SeenStore};
use crate::taxonomy::{Taxonomy, TAXONOMY};
use crate::tmdb::TmdbApi;

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub filters: FilterSet,
    /// Unseen titles first, then seen ones, each group in provider order.
    pub ranked: Vec<Candidate>,
    /// The seen set as persisted by this request.
    pub seen: SeenSet,
    /// Recoverable failure that emptied or shortened `ranked`.
    pub issue: Option<RecommendError>,
}

/// Wires interpretation, discovery, enrichment, platform filtering and the
/// seen store into one call.
#[derive(Clone)]
pub struct Recommender {
    interpreter: PreferenceInterpreter,
    tmdb: Arc<dyn TmdbApi>,
    seen: Arc<dyn SeenStore>,
    taxonomy: &'static Taxonomy,
    concurrency: usize,
}

impl Recommender {
    pub fn new(
        interpreter: PreferenceInterpreter,
        tmdb: Arc<dyn TmdbApi>,
        seen: Arc<dyn SeenStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            interpreter,
            tmdb,
            seen,
            taxonomy: &*TAXONOMY,
            concurrency: concurrency.max(1),
        }
    }

    pub fn taxonomy(&self) -> &'static Taxonomy {
        self.taxonomy
    }

    pub async fn current_seen(&self) -> RecommendResult<SeenSet> {
        self.seen.load().await
    }

    pub async fn recommend(
        &self,
        text: &str,
        platform: Option<String>,
        seen_submission: SeenSet,
    ) -> RecommendResult<Recommendation> {
        let filters = self
            .interpreter
            .interpret(text, self.taxonomy)
            .await?
            .with_platform(platform);
        self.recommend_with_filters(filters, seen_submission).await
    }

    /// Same pipeline as [`Recommender::recommend`] for callers that already
    /// picked their filters.
    pub async fn recommend_with_filters(
        &self,
        filters: FilterSet,
        seen_submission: SeenSet,
    ) -> RecommendResult<Recommendation> {
        let (candidates, issue) = match build_query(&filters, self.taxonomy) {
            Ok(query) => match fetch_candidates(self.tmdb.clone(), &query, self.concurrency).await
            {
                Ok(candidates) => (candidates, None),
                Err(e) => (Vec::new(), Some(e)),
            },
            Err(e) => {
                warn!("{}", e);
                (Vec::new(), Some(e))
            }
        };

        let candidates = filter_by_platform(
            self.tmdb.clone(),
            candidates,
            filters.platform.as_deref(),
            self.taxonomy,
            self.concurrency,
        )
        .await;

        // The submission replaces the stored set whole, so an unreadable file
        // is overwritten rather than blocking the request.
        match self.seen.load().await {
            Ok(previous) => debug!(previous = previous.len(), "Loaded previous seen set"),
            Err(e) => warn!("Previous seen set unreadable, replacing it: {}", e),
        }
        self.seen.save(&seen_submission).await?;
        info!(current = seen_submission.len(), "Replaced seen set");

        let ranked = rank_seen_last(candidates, &seen_submission);
        info!(results = ranked.len(), "Recommendation ready");
        Ok(Recommendation {
            filters,
            ranked,
            seen: seen_submission,
            issue,
        })
    }
}

/// Stable partition: unseen candidates keep their order, seen ones follow.
pub fn rank_seen_last(mut candidates: Vec<Candidate>, seen: &SeenSet) -> Vec<Candidate> {
    candidates.sort_by_key(|c| seen.contains(&c.id));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ScoredLabel, ZeroShotClassifier};
    use crate::enrich::tests::{candidate, FakeTmdb};
    use crate::seen::{JsonFileSeenStore, MemorySeenStore};
    use crate::taxonomy::{Duration, Era};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ZeroShotClassifier for Echo {
        async fn classify(&self, _text: &str, labels: &[String]) -> RecommendResult<Vec<ScoredLabel>> {
            Ok(labels
                .iter()
                .map(|l| ScoredLabel {
                    label: l.clone(),
                    score: 0.5,
                })
                .collect())
        }
    }

    fn ids(list: &[Candidate]) -> Vec<i32> {
        list.iter().map(|c| c.id).collect()
    }

    fn recommender(tmdb: Arc<FakeTmdb>, store: Arc<MemorySeenStore>) -> Recommender {
        Recommender::new(PreferenceInterpreter::new(Arc::new(Echo)), tmdb, store, 4)
    }

    #[test]
    fn seen_titles_sink_without_reordering_groups() {
        let list = vec![candidate(1, 7.0), candidate(2, 7.0), candidate(3, 7.0), candidate(4, 7.0)];
        let seen: SeenSet = [2, 4].into_iter().collect();
        assert_eq!(ids(&rank_seen_last(list, &seen)), vec![1, 3, 2, 4]);
    }

    #[tokio::test]
    async fn replaces_seen_set_and_ranks_against_it() {
        let tmdb = Arc::new(FakeTmdb {
            page: Some((1..=4).map(|id| candidate(id, 7.0)).collect()),
            ..Default::default()
        });
        let store = Arc::new(MemorySeenStore::with_ids([1, 2, 3]));
        let rec = recommender(tmdb, store.clone());
        let filters = FilterSet::from_labels("drama", "Llarga", "en", "despres");

        let out = rec
            .recommend_with_filters(filters.clone(), [1].into_iter().collect())
            .await
            .unwrap();
        assert_eq!(ids(&out.ranked), vec![2, 3, 4, 1]);
        assert_eq!(store.snapshot(), Some([1].into_iter().collect()));

        let out = rec
            .recommend_with_filters(filters, SeenSet::new())
            .await
            .unwrap();
        assert_eq!(ids(&out.ranked), vec![1, 2, 3, 4]);
        assert_eq!(store.snapshot(), Some(SeenSet::new()));
        assert!(out.issue.is_none());
    }

    #[tokio::test]
    async fn unknown_genre_yields_empty_results_and_still_saves() {
        let tmdb = Arc::new(FakeTmdb {
            page: Some(vec![candidate(1, 7.0)]),
            ..Default::default()
        });
        let store = Arc::new(MemorySeenStore::default());
        let rec = recommender(tmdb, store.clone());
        let out = rec
            .recommend_with_filters(
                FilterSet::from_labels("sitcom", "Curta", "ca", "abans"),
                [9].into_iter().collect(),
            )
            .await
            .unwrap();
        assert!(out.ranked.is_empty());
        assert_eq!(out.issue, Some(RecommendError::UnknownGenre("sitcom".to_string())));
        assert_eq!(store.snapshot(), Some([9].into_iter().collect()));
    }

    #[tokio::test]
    async fn discovery_failure_degrades_to_no_results() {
        let rec = recommender(Arc::new(FakeTmdb::default()), Arc::new(MemorySeenStore::default()));
        let out = rec
            .recommend("un drama", None, SeenSet::new())
            .await
            .unwrap();
        assert!(out.ranked.is_empty());
        assert!(matches!(out.issue, Some(RecommendError::Provider(_))));
    }

    #[tokio::test]
    async fn text_request_uses_top_label_per_dimension() {
        let tmdb = Arc::new(FakeTmdb {
            page: Some(vec![candidate(5, 7.0)]),
            ..Default::default()
        });
        let rec = recommender(tmdb, Arc::new(MemorySeenStore::default()));
        let out = rec
            .recommend("qualsevol cosa", Some(String::new()), SeenSet::new())
            .await
            .unwrap();
        // Echo keeps candidate order, so the first label of each vocabulary wins.
        assert_eq!(out.filters.genre, "acció");
        assert_eq!(out.filters.duration, Some(Duration::Short));
        assert_eq!(out.filters.language, "ca");
        assert_eq!(out.filters.era, Some(Era::Before));
        assert_eq!(out.filters.platform, None);
        assert_eq!(ids(&out.ranked), vec![5]);
    }

    #[tokio::test]
    async fn corrupt_seen_file_is_replaced_by_submission() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vistes.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let store = Arc::new(JsonFileSeenStore::new(&path));
        let tmdb = Arc::new(FakeTmdb {
            page: Some((1..=3).map(|id| candidate(id, 7.0)).collect()),
            ..Default::default()
        });
        let rec = Recommender::new(PreferenceInterpreter::new(Arc::new(Echo)), tmdb, store.clone(), 2);

        let out = rec
            .recommend_with_filters(
                FilterSet::from_labels("drama", "Curta", "ca", "abans"),
                [1].into_iter().collect(),
            )
            .await
            .unwrap();
        assert_eq!(ids(&out.ranked), vec![2, 3, 1]);
        assert_eq!(store.load().await.unwrap(), [1].into_iter().collect::<SeenSet>());
    }

    #[tokio::test]
    async fn platform_filter_gates_results() {
        let tmdb = Arc::new(FakeTmdb {
            page: Some((1..=3).map(|id| candidate(id, 7.0)).collect()),
            providers: vec![(
                2,
                vec![crate::tmdb::WatchProvider {
                    provider_id: 8,
                    provider_name: "Netflix".to_string(),
                }],
            )],
            ..Default::default()
        });
        let rec = recommender(tmdb, Arc::new(MemorySeenStore::default()));
        let filters = FilterSet::from_labels("drama", "Curta", "ca", "abans")
            .with_platform(Some("Netflix".to_string()));
        let out = rec
            .recommend_with_filters(filters, SeenSet::new())
            .await
            .unwrap();
        assert_eq!(ids(&out.ranked), vec![2]);
    }
}
