//! Classification of raw attribute URLs and completion against the target origin.

use url::{ParseError, Position, Url};

use super::error::RewriteError;
use super::{RewriteContext, QUERY_KEY};

/// Schemes naming page-local resources that are never routed through the proxy.
const EXEMPT_PREFIXES: [&str; 2] = ["blob:", "data:"];

/// How a raw URL is treated by the rewrite engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Empty, `blob:` or `data:`; returned untouched.
    Exempt,
    /// Already points at the proxy with a `proxyTargetURI` parameter.
    Proxied,
    /// Scheme without an authority (`mailto:`, `javascript:`, `about:`); returned untouched.
    Opaque,
    /// Path-relative, root-relative or a bare filename; completed with the target origin.
    Relative,
    /// `//host/...`; keeps its host, gains the `http` scheme.
    SchemeRelative,
    /// Carries its own scheme and host; proxied as is.
    Absolute,
}

impl UrlKind {
    /// True when the engine leaves the raw value in place.
    pub fn is_passthrough(self) -> bool {
        matches!(self, UrlKind::Exempt | UrlKind::Proxied | UrlKind::Opaque)
    }
}

/// Parsed form of a raw URL before origin completion.
#[derive(Debug)]
pub(crate) enum Parsed {
    Exempt,
    Opaque,
    Absolute(Url),
    /// Scheme-relative reference, resolved against a placeholder `http:` base so
    /// its host can be inspected.
    SchemeRelative(Url),
    Relative,
}

pub(crate) fn parse(raw: &str) -> Result<Parsed, RewriteError> {
    if raw.is_empty() || EXEMPT_PREFIXES.iter().any(|p| raw.starts_with(p)) {
        return Ok(Parsed::Exempt);
    }

    match Url::parse(raw) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(Parsed::Absolute(url)),
        Ok(_) => Ok(Parsed::Opaque),
        Err(ParseError::RelativeUrlWithoutBase) if raw.trim_start().starts_with("//") => {
            let placeholder = Url::parse("http://placeholder.invalid/").map_err(|source| {
                RewriteError::Parse {
                    raw: raw.to_string(),
                    source,
                }
            })?;
            placeholder
                .join(raw)
                .map(Parsed::SchemeRelative)
                .map_err(|source| RewriteError::Parse {
                    raw: raw.to_string(),
                    source,
                })
        }
        Err(ParseError::RelativeUrlWithoutBase) => Ok(Parsed::Relative),
        Err(source) => Err(RewriteError::Parse {
            raw: raw.to_string(),
            source,
        }),
    }
}

/// `host[:port]` as serialized by the URL (default ports omitted).
pub(crate) fn authority(url: &Url) -> &str {
    &url[Position::BeforeHost..Position::AfterPort]
}

fn is_proxied(url: &Url, ctx: &RewriteContext) -> bool {
    authority(url).eq_ignore_ascii_case(ctx.proxy_origin())
        && url.query_pairs().any(|(k, _)| k == QUERY_KEY)
}

/// Classifies `raw` without building anything.
pub fn classify(raw: &str, ctx: &RewriteContext) -> Result<UrlKind, RewriteError> {
    Ok(match parse(raw)? {
        Parsed::Exempt => UrlKind::Exempt,
        Parsed::Opaque => UrlKind::Opaque,
        Parsed::Absolute(url) if is_proxied(&url, ctx) => UrlKind::Proxied,
        Parsed::Absolute(_) => UrlKind::Absolute,
        Parsed::SchemeRelative(url) if is_proxied(&url, ctx) => UrlKind::Proxied,
        Parsed::SchemeRelative(_) => UrlKind::SchemeRelative,
        Parsed::Relative => UrlKind::Relative,
    })
}

/// Builds the `http://<origin>/` base that relative references resolve against.
///
/// Accepts `host`, `host:port`, and tolerates a leading `http://`/`https://` or
/// a trailing path, both of which are dropped.
pub fn target_base(target_origin: &str) -> Result<Url, RewriteError> {
    let trimmed = target_origin.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    let host = without_scheme.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(RewriteError::TargetOrigin(target_origin.to_string()));
    }

    Url::parse(&format!("http://{host}/"))
        .ok()
        .filter(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .ok_or_else(|| RewriteError::TargetOrigin(target_origin.to_string()))
}

/// Completes `raw` into the absolute URL the proxy must fetch.
///
/// Relative references take the target origin and the `http` scheme,
/// scheme-relative ones keep their own host, absolute ones are untouched.
pub(crate) fn complete(raw: &str, target_origin: &str) -> Result<Url, RewriteError> {
    match parse(raw)? {
        Parsed::Absolute(url) => Ok(url),
        Parsed::SchemeRelative(_) | Parsed::Relative => {
            target_base(target_origin)?
                .join(raw)
                .map_err(|source| RewriteError::Parse {
                    raw: raw.to_string(),
                    source,
                })
        }
        Parsed::Exempt | Parsed::Opaque => Err(RewriteError::Parse {
            raw: raw.to_string(),
            source: ParseError::RelativeUrlWithoutBase,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RewriteContext {
        RewriteContext::new("proxy.com:3000")
    }

    #[test]
    fn exempt_values() {
        assert_eq!(classify("", &ctx()).unwrap(), UrlKind::Exempt);
        assert_eq!(classify("blob:x", &ctx()).unwrap(), UrlKind::Exempt);
        assert_eq!(
            classify("data:text/plain;base64,AAAA", &ctx()).unwrap(),
            UrlKind::Exempt
        );
    }

    #[test]
    fn relative_forms() {
        assert_eq!(classify("index.js", &ctx()).unwrap(), UrlKind::Relative);
        assert_eq!(classify("/path/12345", &ctx()).unwrap(), UrlKind::Relative);
        assert_eq!(classify("?q=1", &ctx()).unwrap(), UrlKind::Relative);
        assert_eq!(
            classify("//en.wikipedia.org/", &ctx()).unwrap(),
            UrlKind::SchemeRelative
        );
    }

    #[test]
    fn proxied_needs_host_and_key() {
        assert_eq!(
            classify("http://proxy.com:3000/?proxyTargetURI=x", &ctx()).unwrap(),
            UrlKind::Proxied
        );
        assert_eq!(
            classify("//proxy.com:3000/?proxyTargetURI=x", &ctx()).unwrap(),
            UrlKind::Proxied
        );
        assert_eq!(
            classify("http://proxy.com:3000/?other=x", &ctx()).unwrap(),
            UrlKind::Absolute
        );
        assert_eq!(
            classify("http://proxy.com/?proxyTargetURI=x", &ctx()).unwrap(),
            UrlKind::Absolute
        );
    }

    #[test]
    fn opaque_schemes() {
        assert_eq!(classify("mailto:a@b.c", &ctx()).unwrap(), UrlKind::Opaque);
        assert_eq!(
            classify("javascript:void(0)", &ctx()).unwrap(),
            UrlKind::Opaque
        );
    }

    #[test]
    fn malformed_is_an_error() {
        assert!(classify("http://[::1", &ctx()).is_err());
    }

    #[test]
    fn target_base_variants() {
        assert_eq!(target_base("target.com").unwrap().as_str(), "http://target.com/");
        assert_eq!(
            target_base("target.com:8080").unwrap().as_str(),
            "http://target.com:8080/"
        );
        assert_eq!(
            target_base("https://target.com/some/path").unwrap().as_str(),
            "http://target.com/"
        );
        assert!(target_base("").is_err());
        assert!(target_base("   ").is_err());
    }

    #[test]
    fn complete_relative_and_scheme_relative() {
        assert_eq!(
            complete("path/index.js?q=s", "target.com").unwrap().as_str(),
            "http://target.com/path/index.js?q=s"
        );
        assert_eq!(
            complete("//en.wikipedia.org/", "wikipedia.org").unwrap().as_str(),
            "http://en.wikipedia.org/"
        );
        assert_eq!(
            complete("https://abc.com/x", "target.com").unwrap().as_str(),
            "https://abc.com/x"
        );
    }
}
