//! Mutation records and observation filters.

use super::ElementId;

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// An attribute was set on `target`.
    Attributes {
        target: ElementId,
        name: String,
        old_value: Option<String>,
    },
    /// Children of `target` were inserted or removed.
    ChildList {
        target: ElementId,
        added: Vec<ElementId>,
        removed: Vec<ElementId>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> ElementId {
        match self {
            MutationRecord::Attributes { target, .. } | MutationRecord::ChildList { target, .. } => {
                *target
            }
        }
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            MutationRecord::Attributes { name, .. } => Some(name),
            MutationRecord::ChildList { .. } => None,
        }
    }
}

/// Which changes an observation reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Also report changes on descendants of the observed element.
    pub subtree: bool,
    pub attributes: bool,
    pub child_list: bool,
    /// Restrict attribute records to these names (ASCII case-insensitive).
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    pub(super) fn wants_attribute(&self, name: &str) -> bool {
        self.attributes
            && self
                .attribute_filter
                .as_ref()
                .map_or(true, |f| f.iter().any(|n| n.eq_ignore_ascii_case(name)))
    }
}
