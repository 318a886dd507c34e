mod cache;
mod fetcher;
mod oidc;


pub use cache::{
    KeyRetrievalCache, KeySource, DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES,
    DEFAULT_MIN_REFRESH_INTERVAL,
};
pub(crate) use cache::FetchSource;
pub use fetcher::{HttpKeySetFetcher, RemoteKeySetFetcher, TENANT_HEADER};
pub use oidc::{OidcConfiguration, OidcConfigurationCache};
