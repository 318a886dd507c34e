mod audience;
mod issuer;
mod signature;
mod timestamp;

pub use audience::{JwtAudienceValidator, XsuaaJwtAudienceValidator};
pub use issuer::XsuaaJwtIssuerValidator;
pub use signature::JwtSignatureValidator;
pub use timestamp::{JwtTimestampValidator, DEFAULT_CLOCK_SKEW};

/// `host` equals `domain` or is one of its subdomains, ignoring case.
pub(super) fn host_matches_domain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(&domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
