//! Attribute adapter: maps an attribute name to the way its value is split
//! around the rewrite engine, and writes the result back to the element.

mod transform;

pub use transform::{rewrite_srcset, rewrite_tuple, rewrite_url_list};

use crate::rewrite::Rewriter;

/// Anything that exposes string attributes: a live DOM element, a test double.
pub trait AttributeHost {
    fn get_attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&mut self, name: &str, value: &str);
}

/// How an attribute value is carved up before rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Whole value is one URL.
    Simple,
    /// Comma-separated `<url> <descriptor>` candidates (`srcset`).
    List,
    /// Comma-separated plain URLs (`archive`).
    MultiUrl,
    /// Semicolon-separated fields with the URL at index 1 (`content`).
    Tuple,
}

/// Attributes whose values are not a single URL. Every other name is [`Strategy::Simple`].
const SPECIAL: [(&str, Strategy); 3] = [
    ("srcset", Strategy::List),
    ("archive", Strategy::MultiUrl),
    ("content", Strategy::Tuple),
];

/// Looks up the strategy for an attribute name (ASCII case-insensitive).
pub fn strategy_for(name: &str) -> Strategy {
    SPECIAL
        .iter()
        .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
        .map(|(_, s)| *s)
        .unwrap_or(Strategy::Simple)
}

impl Strategy {
    /// Applies this strategy to a whole attribute value.
    pub fn apply(self, value: &str, rewriter: &Rewriter) -> String {
        let rewrite = |url: &str| rewriter.rewrite(url);
        match self {
            Strategy::Simple => rewriter.rewrite(value),
            Strategy::List => rewrite_srcset(value, rewrite),
            Strategy::MultiUrl => rewrite_url_list(value, rewrite),
            Strategy::Tuple => rewrite_tuple(value, rewrite),
        }
    }
}

/// Reads `name` from `element`, applies `transform`, and writes the result back
/// only if it differs. Missing and empty values are skipped.
///
/// Returns `true` when the attribute was written.
pub fn with_attribute<H, F>(element: &mut H, name: &str, transform: F) -> bool
where
    H: AttributeHost + ?Sized,
    F: FnOnce(&str) -> String,
{
    let Some(value) = element.get_attribute(name) else {
        return false;
    };
    if value.is_empty() {
        return false;
    }
    let modified = transform(&value);
    if modified == value {
        return false;
    }
    element.set_attribute(name, &modified);
    true
}

/// Rewrites one attribute of `element` using the strategy registered for `name`.
pub fn handle_attribute<H>(element: &mut H, name: &str, rewriter: &Rewriter) -> bool
where
    H: AttributeHost + ?Sized,
{
    let strategy = strategy_for(name);
    with_attribute(element, name, |value| strategy.apply(value, rewriter))
}
