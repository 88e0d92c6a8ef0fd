use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::tmdb::TMDB_BASE;

pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/MoritzLaurer/mDeBERTa-v3-base-mnli-xnli";
const DEFAULT_SEEN_PATH: &str = "vistes.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONCURRENCY: usize = 8;
const MAX_CONCURRENCY: usize = 32;

pub const REQUIRED_VARS: [&str; 1] = ["TMDB_API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub classifier_url: String,
    pub hf_api_token: Option<String>,
    pub seen_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Applied to every outbound provider and classifier call.
    pub http_timeout: Duration,
    pub fetch_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = get("TMDB_API_KEY")
            .ok_or_else(|| anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 127.0.0.1:5000")?;
        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let fetch_concurrency = match get("FETCH_CONCURRENCY") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .context("FETCH_CONCURRENCY must be a positive integer")?,
            None => DEFAULT_CONCURRENCY,
        }
        .clamp(1, MAX_CONCURRENCY);

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE.to_string()),
            classifier_url: get("CLASSIFIER_URL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string()),
            hf_api_token: get("HF_API_TOKEN"),
            seen_path: PathBuf::from(
                get("SEEN_PATH").unwrap_or_else(|| DEFAULT_SEEN_PATH.to_string()),
            ),
            bind_addr,
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
            fetch_concurrency,
        })
    }
}
