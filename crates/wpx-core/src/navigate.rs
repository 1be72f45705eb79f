//! Navigation interception on page entry.
//!
//! When the browser lands on `http://<proxy>/some/path?x=1&proxyTargetURI=...`
//! (a relative link the rewriter never saw, resolved by the browser against
//! the proxy), the path and query belong to the target site. They are merged
//! onto the proxied target and the page is sent to a freshly built proxied URL.

use url::Url;

use crate::rewrite::{encode_component, RewriteError, QUERY_KEY};

/// Computes the one-shot redirect for `location`, or `None` when the page is
/// already at a canonical proxied URL (path `/`, no other parameters) or is
/// not a proxied URL at all.
pub fn redirect_for(location: &str) -> Option<String> {
    let mut url = Url::parse(location).ok()?;
    let target = url
        .query_pairs()
        .find(|(k, _)| k == QUERY_KEY)
        .map(|(_, v)| v.into_owned())?;

    let remaining: Vec<&str> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some(QUERY_KEY))
        .collect();
    let remaining = remaining.join("&");

    if url.path() == "/" && remaining.is_empty() {
        return None;
    }

    let mut merged = match Url::parse(&target) {
        Ok(t) => t,
        Err(err) => {
            tracing::debug!(%err, proxy_target = %target, "proxy target is not an absolute url");
            return None;
        }
    };
    merged.set_path(url.path());
    merged.set_query((!remaining.is_empty()).then_some(remaining.as_str()));

    url.set_path("/");
    url.set_query(Some(&format!(
        "{}={}",
        QUERY_KEY,
        encode_component(merged.as_str())
    )));
    Some(url.into())
}

/// Search-bar style normalization of a user-typed target.
///
/// Inputs with scheme and host are kept (`ws://a.b.c`), bare hosts gain
/// `http://` (`a.b.c/x` → `http://a.b.c/x`).
pub fn normalize_target(input: &str) -> Result<Url, RewriteError> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        if url.host_str().is_some_and(|h| !h.is_empty()) {
            return Ok(url);
        }
    }

    let bare = input.trim_start_matches('/');
    Url::parse(&format!("http://{bare}"))
        .ok()
        .filter(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .ok_or_else(|| RewriteError::TargetOrigin(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_location_needs_no_redirect() {
        assert_eq!(
            redirect_for("http://proxy.com:3000/?proxyTargetURI=http%3A%2F%2Ftarget.com%2F"),
            None
        );
    }

    #[test]
    fn unproxied_location_needs_no_redirect() {
        assert_eq!(redirect_for("http://proxy.com:3000/page?x=1"), None);
        assert_eq!(redirect_for("not a url"), None);
    }

    #[test]
    fn path_is_merged_onto_target() {
        assert_eq!(
            redirect_for(
                "http://proxy.com:3000/docs/intro?proxyTargetURI=http%3A%2F%2Ftarget.com%2F"
            )
            .as_deref(),
            Some("http://proxy.com:3000/?proxyTargetURI=http%3A%2F%2Ftarget.com%2Fdocs%2Fintro")
        );
    }

    #[test]
    fn query_is_merged_and_target_key_dropped() {
        assert_eq!(
            redirect_for(
                "http://proxy.com:3000/?q=rust&proxyTargetURI=http%3A%2F%2Ftarget.com%2Fsearch%3Fold%3D1&page=2"
            )
            .as_deref(),
            Some("http://proxy.com:3000/?proxyTargetURI=http%3A%2F%2Ftarget.com%2F%3Fq%3Drust%26page%3D2")
        );
    }

    #[test]
    fn redirect_result_is_stable() {
        let first = redirect_for(
            "http://proxy.com:3000/a/b?proxyTargetURI=https%3A%2F%2Ftarget.com%2F",
        )
        .unwrap();
        assert_eq!(redirect_for(&first), None);
    }

    #[test]
    fn unparsable_target_is_ignored() {
        assert_eq!(
            redirect_for("http://proxy.com:3000/a?proxyTargetURI=relative%2Fonly"),
            None
        );
    }

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize_target("http://a.b.c").unwrap().as_str(), "http://a.b.c/");
        assert_eq!(
            normalize_target("https://a.b.c/p/r.ext?q=s&qq=ss").unwrap().as_str(),
            "https://a.b.c/p/r.ext?q=s&qq=ss"
        );
        assert_eq!(normalize_target("ws://a.b.c").unwrap().as_str(), "ws://a.b.c/");
        assert_eq!(normalize_target("a.b.c").unwrap().as_str(), "http://a.b.c/");
        assert_eq!(
            normalize_target("a.b.c/x/y").unwrap().as_str(),
            "http://a.b.c/x/y"
        );
        assert!(normalize_target("").is_err());
    }
}
