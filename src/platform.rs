use std::sync::Arc;
use tracing::{debug, warn};

use crate::enrich::fan_out;
use crate::models::Candidate;
use crate::taxonomy::{normalize, Taxonomy};
use crate::tmdb::{TmdbApi, WatchProvider};

/// Region whose subscription catalogue is checked.
pub const WATCH_REGION: &str = "ES";

/// Keeps only candidates streamable on `platform` by subscription in
/// [`WATCH_REGION`]. Lookup failures count as "not available".
pub async fn filter_by_platform(
    tmdb: Arc<dyn TmdbApi>,
    candidates: Vec<Candidate>,
    platform: Option<&str>,
    taxonomy: &Taxonomy,
    concurrency: usize,
) -> Vec<Candidate> {
    let Some(label) = platform else {
        return candidates;
    };
    let provider_id = taxonomy.platform(label).map(|p| p.provider_id);
    if provider_id.is_none() {
        warn!("Platform '{}' is not in the taxonomy, matching by name only", label);
    }
    let label = label.to_string();
    let before = candidates.len();

    let kept: Vec<Candidate> = fan_out(candidates, concurrency, move |candidate: Candidate| {
        let tmdb = tmdb.clone();
        let label = label.clone();
        async move {
            match tmdb
                .fetch_flatrate_providers(candidate.id, WATCH_REGION)
                .await
            {
                Ok(providers) if offers(&providers, &label, provider_id) => Some(candidate),
                Ok(_) => None,
                Err(e) => {
                    warn!(movie_id = candidate.id, "Watch-provider lookup failed: {:#}", e);
                    None
                }
            }
        }
    })
    .await
    .into_iter()
    .flatten()
    .collect();

    debug!(before, after = kept.len(), "Platform filter applied");
    kept
}

fn offers(providers: &[WatchProvider], label: &str, provider_id: Option<u32>) -> bool {
    let wanted = normalize(label);
    providers
        .iter()
        .any(|p| Some(p.provider_id) == provider_id || normalize(&p.provider_name) == wanted)
}
