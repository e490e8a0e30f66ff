//! Offline caching policy for the web client's service worker.
//!
//! The worker keeps two caches: a static cache for the app shell and a dynamic
//! cache for content API responses. Which cache (if any) a request goes through is
//! decided by `select_strategy`. The same decision drives the `Cache-Control` hints
//! this service attaches to its own responses.

use axum::{
    Json,
    extract::Request,
    http::{HeaderValue, StatusCode, Uri, header},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::DEV_USER_HEADER;

pub const STATIC_CACHE: &str = "static-v1.0.0";
pub const DYNAMIC_CACHE: &str = "dynamic-v1.0.0";

/// The app shell, precached at install time.
pub const STATIC_ASSETS: [&str; 5] = [
    "/",
    "/index.html",
    "/manifest.json",
    "/favicon.ico",
    "/assets/index.js",
];

pub const OFFLINE_MESSAGE: &str = "content not available offline";

/// ApiPattern
///
/// A content API location whose responses are worth keeping for offline use.
#[derive(Debug, Clone, Copy)]
pub struct ApiPattern {
    /// Required scheme, if any.
    pub scheme: Option<&'static str>,
    /// Required host suffix, if any.
    pub host_suffix: Option<&'static str>,
    pub path_prefix: &'static str,
}

impl ApiPattern {
    pub fn matches(&self, uri: &Uri) -> bool {
        if let Some(scheme) = self.scheme {
            if uri.scheme_str() != Some(scheme) {
                return false;
            }
        }
        if let Some(suffix) = self.host_suffix {
            match uri.host() {
                Some(host) if host.len() > suffix.len() && host.ends_with(suffix) => {}
                _ => return false,
            }
        }
        // Whole path segments only: `/content` must not match `/contents`.
        match uri.path().strip_prefix(self.path_prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn describe(&self) -> String {
        match (self.scheme, self.host_suffix) {
            (Some(scheme), Some(suffix)) => format!("{}://*{}{}", scheme, suffix, self.path_prefix),
            _ => self.path_prefix.to_string(),
        }
    }
}

pub const API_PATTERNS: [ApiPattern; 2] = [
    // The hosted database's REST endpoint for the content table.
    ApiPattern {
        scheme: Some("https"),
        host_suffix: Some(".supabase.co"),
        path_prefix: "/rest/v1/content",
    },
    // This service's own catalog routes.
    ApiPattern {
        scheme: None,
        host_suffix: None,
        path_prefix: "/content",
    },
];

/// Destination
///
/// What the browser intends to do with the response, as sent in `Sec-Fetch-Dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Other,
}

impl Destination {
    pub fn from_fetch_dest(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("document") => Destination::Document,
            Some("script") => Destination::Script,
            Some("style") => Destination::Style,
            Some("image") => Destination::Image,
            _ => Destination::Other,
        }
    }
}

/// CacheStrategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Serve from the static cache, fetch and store on a miss.
    CacheFirst,
    /// Fetch, store successful responses in the dynamic cache, fall back to it.
    NetworkFirstApi,
    /// Fetch, fall back to whatever is cached, then to the app shell.
    NetworkFirst,
}

impl CacheStrategy {
    pub fn cache_name(&self) -> Option<&'static str> {
        match self {
            CacheStrategy::CacheFirst => Some(STATIC_CACHE),
            CacheStrategy::NetworkFirstApi => Some(DYNAMIC_CACHE),
            CacheStrategy::NetworkFirst => None,
        }
    }

    /// Whether a network response with `status` goes into the cache.
    pub fn should_store(&self, status: StatusCode) -> bool {
        match self {
            CacheStrategy::CacheFirst => true,
            CacheStrategy::NetworkFirstApi => status == StatusCode::OK,
            CacheStrategy::NetworkFirst => false,
        }
    }

    /// Where to go when both network and cache miss. API requests get the
    /// synthesized `OfflineFallback` instead.
    pub fn fallback_path(&self, destination: Destination) -> Option<&'static str> {
        match self {
            CacheStrategy::CacheFirst if destination == Destination::Document => Some("/"),
            CacheStrategy::CacheFirst | CacheStrategy::NetworkFirstApi => None,
            CacheStrategy::NetworkFirst => Some("/"),
        }
    }

    /// `Cache-Control` for this service's own response. Only app-shell paths fetched
    /// without credentials are publicly cacheable; everything else may differ per
    /// viewer and must not be stored by shared caches.
    pub fn cache_control(&self, uri: &Uri, credentialed: bool, status: StatusCode) -> HeaderValue {
        match self {
            CacheStrategy::CacheFirst if !credentialed && STATIC_ASSETS.contains(&uri.path()) => {
                HeaderValue::from_static("public, max-age=86400")
            }
            CacheStrategy::NetworkFirst if !credentialed => HeaderValue::from_static("no-cache"),
            _ if status == StatusCode::OK => HeaderValue::from_static("private, no-cache"),
            _ => HeaderValue::from_static("no-store"),
        }
    }
}

/// Picks the caching strategy for a request. Static assets win over API patterns.
pub fn select_strategy(uri: &Uri, destination: Destination) -> CacheStrategy {
    if STATIC_ASSETS.contains(&uri.path())
        || matches!(destination, Destination::Script | Destination::Style)
    {
        return CacheStrategy::CacheFirst;
    }

    if API_PATTERNS.iter().any(|pattern| pattern.matches(uri)) {
        return CacheStrategy::NetworkFirstApi;
    }

    CacheStrategy::NetworkFirst
}

/// Caches left over from earlier releases, to be deleted on activation.
pub fn stale_caches<'a, I>(names: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| *name != STATIC_CACHE && *name != DYNAMIC_CACHE)
        .collect()
}

/// OfflineFallback
///
/// Body of the 503 the worker synthesizes for content requests it cannot serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OfflineFallback {
    pub error: String,
    pub offline: bool,
}

pub fn offline_fallback() -> (StatusCode, Json<OfflineFallback>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(OfflineFallback {
            error: OFFLINE_MESSAGE.to_string(),
            offline: true,
        }),
    )
}

/// StrategyRule
///
/// How the worker treats requests routed to one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StrategyRule {
    pub strategy: CacheStrategy,
    pub cache: Option<String>,
    /// Successful responses are stored.
    pub stores_ok: bool,
    /// Error responses are stored too.
    pub stores_errors: bool,
    /// Page served to navigations when network and cache both miss.
    pub document_fallback: Option<String>,
}

impl From<CacheStrategy> for StrategyRule {
    fn from(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            cache: strategy.cache_name().map(str::to_string),
            stores_ok: strategy.should_store(StatusCode::OK),
            stores_errors: strategy.should_store(StatusCode::NOT_FOUND),
            document_fallback: strategy.fallback_path(Destination::Document).map(str::to_string),
        }
    }
}

/// CachePolicy
///
/// The whole policy, served to the worker so it does not hard-code cache names.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CachePolicy {
    pub static_cache: String,
    pub dynamic_cache: String,
    pub static_assets: Vec<String>,
    pub api_patterns: Vec<String>,
    pub strategies: Vec<StrategyRule>,
    pub offline_fallback: OfflineFallback,
    /// Caches the worker reported that should be deleted on activation.
    #[serde(default)]
    pub stale_caches: Vec<String>,
}

impl CachePolicy {
    pub fn current() -> Self {
        let (_, Json(offline_fallback)) = offline_fallback();
        Self {
            static_cache: STATIC_CACHE.to_string(),
            dynamic_cache: DYNAMIC_CACHE.to_string(),
            static_assets: STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
            api_patterns: API_PATTERNS.iter().map(ApiPattern::describe).collect(),
            strategies: [
                CacheStrategy::CacheFirst,
                CacheStrategy::NetworkFirstApi,
                CacheStrategy::NetworkFirst,
            ]
            .into_iter()
            .map(StrategyRule::from)
            .collect(),
            offline_fallback,
            stale_caches: Vec::new(),
        }
    }

    /// The current policy plus which of the worker's `existing` caches are stale.
    pub fn for_existing<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            stale_caches: stale_caches(existing).into_iter().map(str::to_string).collect(),
            ..Self::current()
        }
    }
}

/// cache_control
///
/// Response middleware stamping `Cache-Control` and `Vary`. Requests carrying
/// credentials never get a publicly cacheable answer. Handlers that set their own
/// `Cache-Control` win.
pub async fn cache_control(request: Request, next: Next) -> Response {
    let destination = Destination::from_fetch_dest(
        request
            .headers()
            .get("sec-fetch-dest")
            .and_then(|value| value.to_str().ok()),
    );
    let uri = request.uri().clone();
    let strategy = select_strategy(&uri, destination);
    let credentialed = request.headers().contains_key(header::AUTHORIZATION)
        || request.headers().contains_key(DEV_USER_HEADER);

    let mut response = next.run(request).await;
    let status = response.status();
    let headers = response.headers_mut();
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert_with(|| strategy.cache_control(&uri, credentialed, status));
    headers.append(header::VARY, HeaderValue::from_static("authorization, x-user-id"));
    response
}
