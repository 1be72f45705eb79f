//! URL rewrite engine.
//!
//! Turns any URL found in a page attribute into the proxied form
//! `http://<proxy>/?proxyTargetURI=<encoded absolute target>`. The engine is
//! pure: the proxy origin is passed in through [`RewriteContext`] instead of
//! being read from the environment, and malformed input is returned unchanged.

mod classify;
mod encode;
mod error;

pub use classify::{classify, target_base, UrlKind};
pub use encode::{encode_component, URI_COMPONENT};
pub use error::RewriteError;

use url::Url;

/// Query key that carries the real destination inside a proxied URL.
pub const QUERY_KEY: &str = "proxyTargetURI";

/// Host-side context the engine needs: the origin actually serving the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    proxy_origin: String,
}

impl RewriteContext {
    /// `proxy_origin` is `host[:port]`, e.g. `proxy.com:3000`.
    ///
    /// The origin is stored the way the `url` crate serializes it (lowercase
    /// host, default port dropped) so envelopes compare equal to their own
    /// parse when checked again. Values that do not form an origin are kept
    /// verbatim.
    pub fn new(proxy_origin: impl Into<String>) -> Self {
        let raw = proxy_origin.into();
        let proxy_origin = normalize_origin(&raw).unwrap_or(raw);
        Self { proxy_origin }
    }

    pub fn proxy_origin(&self) -> &str {
        &self.proxy_origin
    }

    /// Wraps an absolute target URL into the proxy envelope.
    pub fn envelope(&self, target: &Url) -> String {
        format!(
            "http://{}/?{}={}",
            self.proxy_origin,
            QUERY_KEY,
            encode_component(target.as_str())
        )
    }
}

fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(&format!("http://{}/", raw.trim())).ok()?;
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return None;
    }
    let origin = classify::authority(&url);
    (!origin.is_empty()).then(|| origin.to_string())
}

/// Outcome of a single rewrite, with the reasoning kept for diagnostics.
#[derive(Debug, Clone)]
pub struct Decision {
    pub kind: UrlKind,
    /// Absolute URL the proxy will fetch; `None` for pass-through kinds.
    pub target: Option<Url>,
    /// String that must end up in the attribute.
    pub output: String,
}

/// Runs the rewrite algorithm and reports how the value was classified.
///
/// Unlike [`rewrite`], parse failures are surfaced.
pub fn explain(
    raw: &str,
    target_origin: &str,
    ctx: &RewriteContext,
) -> Result<Decision, RewriteError> {
    let kind = classify(raw, ctx)?;
    if kind.is_passthrough() {
        return Ok(Decision {
            kind,
            target: None,
            output: raw.to_string(),
        });
    }

    let target = classify::complete(raw, target_origin)?;
    let output = ctx.envelope(&target);
    Ok(Decision {
        kind,
        target: Some(target),
        output,
    })
}

/// Rewrites `raw` so that it routes through the proxy.
///
/// Empty, `blob:`, `data:`, opaque-scheme and already proxied values come back
/// unchanged, as does anything that fails to parse.
///
/// # Examples
///
/// - `rewrite("/", "target.com", &RewriteContext::new("proxy.com:3000"))`
///   → `"http://proxy.com:3000/?proxyTargetURI=http%3A%2F%2Ftarget.com%2F"`
pub fn rewrite(raw: &str, target_origin: &str, ctx: &RewriteContext) -> String {
    match explain(raw, target_origin, ctx) {
        Ok(decision) => decision.output,
        Err(err) => {
            tracing::debug!(%err, "leaving url unproxied");
            raw.to_string()
        }
    }
}

/// A [`RewriteContext`] bound to one target origin, as used for a whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewriter {
    ctx: RewriteContext,
    target_origin: String,
}

impl Rewriter {
    pub fn new(ctx: RewriteContext, target_origin: impl Into<String>) -> Self {
        Self {
            ctx,
            target_origin: target_origin.into(),
        }
    }

    pub fn context(&self) -> &RewriteContext {
        &self.ctx
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn rewrite(&self, raw: &str) -> String {
        rewrite(raw, &self.target_origin, &self.ctx)
    }
}
