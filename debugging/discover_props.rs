//! Run one discovery query from explicit filters and print the enriched candidates.
//! Usage:
//!   cargo run --bin discover_props -- <genre> <Curta|Llarga> <lang> <abans|despres> [platform]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use recomana::config::Config;
use recomana::enrich::fetch_candidates;
use recomana::models::FilterSet;
use recomana::platform::filter_by_platform;
use recomana::query::build_query;
use recomana::taxonomy::TAXONOMY;
use recomana::tmdb::{TmdbApi, TmdbClient};
use serde_json::json;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 4 {
        anyhow::bail!(
            "usage: discover_props <genre> <Curta|Llarga> <lang> <abans|despres> [platform]"
        );
    }
    let language = TAXONOMY.language_code(&args[2]).unwrap_or(args[2].trim());
    let filters = FilterSet::from_labels(&args[0], &args[1], language, &args[3])
        .with_platform(args.get(4).cloned());

    let config = Config::from_env()?;
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(
        config.tmdb_api_key.clone(),
        &config.tmdb_base_url,
        config.http_timeout,
    )?);

    let query = build_query(&filters, &TAXONOMY).context("building discovery query")?;
    println!("query: {}", query.query_string());

    let candidates = fetch_candidates(tmdb.clone(), &query, config.fetch_concurrency)
        .await
        .context("discovery failed")?;
    let candidates = filter_by_platform(
        tmdb,
        candidates,
        filters.platform.as_deref(),
        &TAXONOMY,
        config.fetch_concurrency,
    )
    .await;

    let out = json!({
        "filters": filters,
        "count": candidates.len(),
        "results": candidates,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
