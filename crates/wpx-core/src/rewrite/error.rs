//! Typed failures of the rewrite engine. They never escape [`super::rewrite`],
//! which fails open, but [`super::explain`] reports them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    /// The raw attribute value could not be parsed as a URL reference.
    #[error("invalid url {raw:?}: {source}")]
    Parse {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    /// The target origin does not form a usable `http://<origin>/` base.
    #[error("invalid target origin {0:?}")]
    TargetOrigin(String),
}
