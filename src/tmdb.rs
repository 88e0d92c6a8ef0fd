use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::Candidate;
use crate::query::QuerySpec;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const CREDITS_LANGUAGE: &str = "ca-ES";
pub const CAST_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// First page of `/discover/movie` for the given query.
    async fn discover_movies(&self, query: &QuerySpec) -> Result<Vec<Candidate>>;
    async fn fetch_credits(&self, id: i32) -> Result<MovieCredits>;
    /// Subscription ("flatrate") providers for `id` in `region`.
    async fn fetch_flatrate_providers(&self, id: i32, region: &str) -> Result<Vec<WatchProvider>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieCredits {
    pub director: Option<String>,
    pub cast: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchProvider {
    pub provider_id: u32,
    pub provider_name: String,
}

impl TmdbClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GETs `{base_url}{path}?{query}` with the API key appended as its own
    /// parameter. Errors name the path only, never the full URL.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &str) -> Result<T> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let res = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| anyhow!("{} request failed: {}", path, e.without_url()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| anyhow!("{} reading body failed: {}", path, e.without_url()))?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {} {}", path, status, text));
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("{} JSON parse failed", path))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn discover_movies(&self, query: &QuerySpec) -> Result<Vec<Candidate>> {
        let page: DiscoverPage = self
            .get_json("/discover/movie", &query.query_string())
            .await?;
        Ok(page.results)
    }

    async fn fetch_credits(&self, id: i32) -> Result<MovieCredits> {
        let credits: Credits = self
            .get_json(
                &format!("/movie/{id}/credits"),
                &format!("language={CREDITS_LANGUAGE}"),
            )
            .await?;
        Ok(summarize_credits(credits))
    }

    async fn fetch_flatrate_providers(&self, id: i32, region: &str) -> Result<Vec<WatchProvider>> {
        let data: WatchProvidersResponse = self
            .get_json(&format!("/movie/{id}/watch/providers"), "")
            .await?;
        Ok(flatrate_for_region(data, region))
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
    crew: Option<Vec<CrewMember>>,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WatchProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    flatrate: Option<Vec<WatchProvider>>,
}

fn summarize_credits(credits: Credits) -> MovieCredits {
    MovieCredits {
        director: select_director(credits.crew.as_deref().unwrap_or_default()),
        cast: top_names(&credits.cast, CAST_LIMIT),
    }
}

/// First crew member credited as "Director", in provider order.
fn select_director(crew: &[CrewMember]) -> Option<String> {
    crew.iter()
        .find(|c| matches!(c.job.as_deref(), Some("Director")))
        .map(|c| c.name.clone())
}

fn top_names(list: &[CastMember], max: usize) -> Vec<String> {
    list.iter().take(max).map(|c| c.name.clone()).collect()
}

fn flatrate_for_region(mut data: WatchProvidersResponse, region: &str) -> Vec<WatchProvider> {
    data.results
        .remove(region)
        .and_then(|r| r.flatrate)
        .unwrap_or_default()
}

/// Accepts only plain non-negative integers (surrounding whitespace allowed).
pub fn parse_tmdb_id(input: &str) -> Option<i32> {
    let input = input.trim();
    if input.chars().all(|c| c.is_ascii_digit()) {
        return input.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::fetch_candidates;
    use crate::error::RecommendError;
    use crate::models::FilterSet;
    use crate::query::build_query;
    use crate::taxonomy::TAXONOMY;
    use axum::extract::RawQuery;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const KEY: &str = "SECRETKEY123";

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str, timeout: Duration) -> TmdbClient {
        TmdbClient::new(KEY.to_string(), base, timeout).expect("client builds")
    }

    fn drama_query() -> QuerySpec {
        build_query(&FilterSet::from_labels("drama", "Curta", "ca", "abans"), &TAXONOMY).unwrap()
    }

    async fn discover_checking_key(RawQuery(q): RawQuery) -> (StatusCode, Json<Value>) {
        let q = q.unwrap_or_default();
        if q.contains("api_key=SECRETKEY123") && q.contains("with_genres=18") {
            let page = json!({
                "page": 1,
                "results": [{ "id": 1398, "title": "Stalker", "vote_average": 8.1 }]
            });
            (StatusCode::OK, Json(page))
        } else {
            let body = json!({ "status_message": "Invalid API key" });
            (StatusCode::UNAUTHORIZED, Json(body))
        }
    }

    #[tokio::test]
    async fn discover_sends_key_as_parameter() {
        let base = serve(Router::new().route("/discover/movie", get(discover_checking_key))).await;
        let page = client(&base, Duration::from_secs(5))
            .discover_movies(&drama_query())
            .await
            .expect("discover succeeds");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Stalker");
    }

    #[tokio::test]
    async fn non_success_status_names_path_only() {
        let app = Router::new().route(
            "/discover/movie",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let base = serve(app).await;
        let err = client(&base, Duration::from_secs(5))
            .discover_movies(&drama_query())
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("/discover/movie -> 500"), "{msg}");
        assert!(msg.contains("upstream exploded"));
        assert!(!msg.contains(KEY));
    }

    #[tokio::test]
    async fn unreachable_host_errors_omit_key() {
        let tmdb = client("http://127.0.0.1:1", Duration::from_secs(2));
        let errors = [
            tmdb.discover_movies(&drama_query()).await.unwrap_err(),
            tmdb.fetch_credits(603).await.unwrap_err(),
            tmdb.fetch_flatrate_providers(603, "ES").await.unwrap_err(),
        ];
        for err in errors {
            let msg = format!("{err:#}");
            assert!(msg.contains("request failed"), "{msg}");
            assert!(!msg.contains(KEY), "{msg}");
        }

        let tmdb: Arc<dyn TmdbApi> = Arc::new(tmdb);
        let err = fetch_candidates(tmdb, &drama_query(), 2).await.unwrap_err();
        assert!(!err.to_string().contains(KEY));
    }

    #[tokio::test]
    async fn timeout_is_a_provider_error() {
        let app = Router::new().route(
            "/discover/movie",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "results": [] }))
            }),
        );
        let base = serve(app).await;
        let tmdb: Arc<dyn TmdbApi> = Arc::new(client(&base, Duration::from_millis(200)));
        match fetch_candidates(tmdb, &drama_query(), 2).await {
            Err(RecommendError::Provider(msg)) => {
                assert!(msg.contains("/discover/movie"), "{msg}");
                assert!(!msg.contains(KEY));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn first_director_wins() {
        let credits: Credits = serde_json::from_value(json!({
            "cast": [],
            "crew": [
                { "job": "Producer", "name": "P" },
                { "job": "Director", "name": "Joel Coen" },
                { "job": "Director", "name": "Ethan Coen" }
            ]
        }))
        .expect("credits deserialize");
        let summary = summarize_credits(credits);
        assert_eq!(summary.director.as_deref(), Some("Joel Coen"));
    }

    #[test]
    fn keeps_first_five_cast_in_provider_order() {
        let cast: Vec<_> = (1..=8).map(|i| json!({ "name": format!("Actor {i}") })).collect();
        let credits: Credits =
            serde_json::from_value(json!({ "cast": cast })).expect("credits deserialize");
        let summary = summarize_credits(credits);
        assert_eq!(
            summary.cast,
            vec!["Actor 1", "Actor 2", "Actor 3", "Actor 4", "Actor 5"]
        );
        assert_eq!(summary.director, None);
    }

    #[test]
    fn extracts_flatrate_for_region_only() {
        let data: WatchProvidersResponse = serde_json::from_value(json!({
            "id": 1,
            "results": {
                "ES": {
                    "link": "https://example.org",
                    "flatrate": [{ "provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.jpg" }],
                    "rent": [{ "provider_id": 2, "provider_name": "Apple TV" }]
                },
                "US": { "flatrate": [{ "provider_id": 337, "provider_name": "Disney Plus" }] }
            }
        }))
        .expect("providers deserialize");
        let es = flatrate_for_region(data, "ES");
        assert_eq!(
            es,
            vec![WatchProvider {
                provider_id: 8,
                provider_name: "Netflix".to_string()
            }]
        );
    }

    #[test]
    fn missing_region_means_no_providers() {
        let data: WatchProvidersResponse =
            serde_json::from_value(json!({ "results": {} })).expect("providers deserialize");
        assert!(flatrate_for_region(data, "ES").is_empty());
    }

    #[test]
    fn parses_tmdb_id_only_for_digits() {
        assert_eq!(parse_tmdb_id("603"), Some(603));
        assert_eq!(parse_tmdb_id(" 603 "), Some(603));
        assert_eq!(parse_tmdb_id("-3"), None);
        assert_eq!(parse_tmdb_id("tt0133093"), None);
        assert_eq!(parse_tmdb_id(""), None);
    }
}
