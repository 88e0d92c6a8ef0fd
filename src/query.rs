//! Translates a filter set into a TMDB discovery query. No I/O.
use serde::Serialize;

use crate::error::{RecommendError, RecommendResult};
use crate::models::FilterSet;
use crate::taxonomy::{
    Duration, Era, Taxonomy, MIN_RATING, MIN_VOTE_COUNT, RELEASE_AFTER_CUTOFF, RELEASE_CUTOFF,
    RUNTIME_PIVOT_MINUTES,
};

pub const SORT_BY: &str = "popularity.desc";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RuntimeBound {
    AtMost(u32),
    AtLeast(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReleaseBound {
    /// Inclusive upper bound, `YYYY-MM-DD`.
    OnOrBefore(&'static str),
    /// Inclusive lower bound, `YYYY-MM-DD`.
    OnOrAfter(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub genre_id: u32,
    pub language: String,
    pub runtime: Option<RuntimeBound>,
    pub release: Option<ReleaseBound>,
    pub min_rating: f32,
    pub min_votes: u32,
    pub sort_by: &'static str,
    pub page: u32,
}

pub fn build_query(filters: &FilterSet, taxonomy: &Taxonomy) -> RecommendResult<QuerySpec> {
    let genre_id = taxonomy
        .genre_id(&filters.genre)
        .ok_or_else(|| RecommendError::UnknownGenre(filters.genre.clone()))?;

    let runtime = filters.duration.map(|d| match d {
        Duration::Short => RuntimeBound::AtMost(RUNTIME_PIVOT_MINUTES),
        Duration::Long => RuntimeBound::AtLeast(RUNTIME_PIVOT_MINUTES),
    });

    let release = filters.era.map(|e| match e {
        Era::Before => ReleaseBound::OnOrBefore(RELEASE_CUTOFF),
        Era::After => ReleaseBound::OnOrAfter(RELEASE_AFTER_CUTOFF),
    });

    Ok(QuerySpec {
        genre_id,
        language: filters.language.clone(),
        runtime,
        release,
        min_rating: MIN_RATING,
        min_votes: MIN_VOTE_COUNT,
        sort_by: SORT_BY,
        page: 1,
    })
}

impl QuerySpec {
    /// Query-string pairs understood by `/discover/movie`.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("with_genres", self.genre_id.to_string()),
            ("language", self.language.clone()),
            ("sort_by", self.sort_by.to_string()),
            ("vote_average.gte", self.min_rating.to_string()),
            ("vote_count.gte", self.min_votes.to_string()),
            ("page", self.page.to_string()),
        ];
        match &self.runtime {
            Some(RuntimeBound::AtMost(m)) => params.push(("with_runtime.lte", m.to_string())),
            Some(RuntimeBound::AtLeast(m)) => params.push(("with_runtime.gte", m.to_string())),
            None => {}
        }
        match &self.release {
            Some(ReleaseBound::OnOrBefore(d)) => {
                params.push(("primary_release_date.lte", d.to_string()))
            }
            Some(ReleaseBound::OnOrAfter(d)) => {
                params.push(("primary_release_date.gte", d.to_string()))
            }
            None => {}
        }
        params
    }

    pub fn query_string(&self) -> String {
        self.params()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
