//! Orchestration: the initial attribute scan, the flush handler that
//! re-dispatches changed elements to the adapter, and [`Page`], which wires a
//! document, a rewriter and a coalescer together on a virtual clock.

use std::time::Duration;

use crate::adapter::handle_attribute;
use crate::coalescer::{ChangeSource, Coalescer, CoalescerSettings, ManualTimers, State};
use crate::dom::{Document, ElementId, MutationRecord, ObserveOptions};
use crate::rewrite::Rewriter;

/// HTML attributes whose values are URL references.
pub const LINK_ATTRIBUTES: [&str; 17] = [
    "src",
    "href",
    "cite",
    "background",
    "codebase",
    "action",
    "longdesc",
    "profile",
    "usemap",
    "classid",
    "data",
    "formaction",
    "icon",
    "poster",
    "srcset",
    "archive",
    "content",
];

/// Upper bound on idle windows [`Page::settle`] will wait through.
const MAX_SETTLE_ROUNDS: usize = 64;

pub fn is_link_attribute(name: &str) -> bool {
    LINK_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Options used to watch a whole document for link changes and insertions.
pub fn link_observe_options() -> ObserveOptions {
    ObserveOptions {
        subtree: true,
        attributes: true,
        child_list: true,
        attribute_filter: Some(LINK_ATTRIBUTES.iter().map(|a| a.to_string()).collect()),
    }
}

impl ChangeSource for Document {
    type Record = MutationRecord;
    type Target = ElementId;
    type Options = ObserveOptions;

    fn observe(&mut self, target: ElementId, options: ObserveOptions) {
        if let Err(err) = Document::observe(self, target, options) {
            tracing::warn!(%err, "observe target rejected");
        }
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        Document::take_records(self)
    }
}

fn rewrite_element(doc: &mut Document, id: ElementId, rewriter: &Rewriter) -> usize {
    let Some(mut element) = doc.element_mut(id) else {
        return 0;
    };
    LINK_ATTRIBUTES
        .iter()
        .filter(|attr| handle_attribute(&mut element, attr, rewriter))
        .count()
}

/// Rewrites every link attribute on every connected element. Returns the
/// number of attributes written.
pub fn rewrite_document(doc: &mut Document, rewriter: &Rewriter) -> usize {
    let mut writes = 0;
    for attr in LINK_ATTRIBUTES {
        for id in doc.elements_with_attribute(attr) {
            if let Some(mut element) = doc.element_mut(id) {
                if handle_attribute(&mut element, attr, rewriter) {
                    writes += 1;
                }
            }
        }
    }
    tracing::debug!(writes, "initial link scan done");
    writes
}

/// Flush handler body: re-applies the adapter to each changed element.
///
/// Attribute records are dispatched for their attribute only; inserted
/// elements get all link attributes of their whole subtree rewritten. Records
/// for removed or detached elements, non-link attributes or empty values are
/// skipped.
pub fn handle_records(doc: &mut Document, rewriter: &Rewriter, records: &[MutationRecord]) -> usize {
    let mut writes = 0;
    for record in records {
        let target = record.target();
        if let Some(name) = record.attribute_name() {
            if !is_link_attribute(name) || !doc.is_connected(target) {
                continue;
            }
            let Some(mut element) = doc.element_mut(target) else {
                continue;
            };
            if handle_attribute(&mut element, name, rewriter) {
                writes += 1;
            }
        } else if let MutationRecord::ChildList { added, .. } = record {
            for id in added {
                for node in doc.descendants(*id) {
                    writes += rewrite_element(doc, node, rewriter);
                }
            }
        }
    }
    writes
}

/// Callback signature for observing each flushed batch before it is handled.
pub type FlushHook = Box<dyn FnMut(&[MutationRecord])>;

type Handler = Box<dyn FnMut(Vec<MutationRecord>, &mut Document)>;

/// A document under rewriting, driven by explicit calls instead of a browser
/// event loop: [`Page::pump`] delivers queued mutations and [`Page::advance`]
/// moves the virtual clock.
pub struct Page {
    coalescer: Coalescer<Document, ManualTimers, Handler>,
    rewriter: Rewriter,
    loaded: bool,
}

impl Page {
    pub fn new(document: Document, rewriter: Rewriter, settings: CoalescerSettings) -> Self {
        Self::build(document, rewriter, settings, None)
    }

    /// Like [`Page::new`], but `hook` sees every batch before it is handled.
    pub fn with_hook(
        document: Document,
        rewriter: Rewriter,
        settings: CoalescerSettings,
        hook: FlushHook,
    ) -> Self {
        Self::build(document, rewriter, settings, Some(hook))
    }

    fn build(
        document: Document,
        rewriter: Rewriter,
        settings: CoalescerSettings,
        mut hook: Option<FlushHook>,
    ) -> Self {
        let handler_rewriter = rewriter.clone();
        let handler: Handler = Box::new(move |batch: Vec<MutationRecord>, doc: &mut Document| {
            if let Some(hook) = hook.as_mut() {
                hook(&batch);
            }
            let writes = handle_records(doc, &handler_rewriter, &batch);
            tracing::debug!(records = batch.len(), writes, "mutation batch handled");
        });
        Self {
            coalescer: Coalescer::new(document, ManualTimers::new(), settings, handler),
            rewriter,
            loaded: false,
        }
    }

    /// Rewrites the document once, then starts observing it. Returns the
    /// number of attributes written by the initial scan. Calling it again only
    /// rescans.
    pub fn load(&mut self) -> usize {
        let writes = rewrite_document(self.coalescer.source_mut(), &self.rewriter);
        if !self.loaded {
            let root = self.coalescer.source().root();
            self.coalescer.observe(root, link_observe_options());
            self.loaded = true;
        }
        writes
    }

    pub fn document(&self) -> &Document {
        self.coalescer.source()
    }

    /// Mutable access for simulating page scripts. Changes are picked up by the next [`Page::pump`].
    pub fn document_mut(&mut self) -> &mut Document {
        self.coalescer.source_mut()
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// Delivers queued document mutations as one notification. Returns `true`
    /// if that filled the buffer and caused a flush.
    pub fn pump(&mut self) -> bool {
        self.coalescer.poll_source()
    }

    /// Moves the virtual clock, fires due timers and delivers any mutations
    /// the resulting flushes produced. Returns the number of flushes fired.
    pub fn advance(&mut self, by: Duration) -> usize {
        let mut flushed = 0;
        for id in self.coalescer.timers_mut().advance(by) {
            if self.coalescer.on_timer(id) {
                flushed += 1;
            }
        }
        self.pump();
        flushed
    }

    /// Pumps and waits out idle windows until no batch is open and nothing is
    /// queued. Returns `false` if the page kept mutating past the round limit.
    pub fn settle(&mut self) -> bool {
        let window = self.coalescer.settings().idle_timeout;
        for _ in 0..MAX_SETTLE_ROUNDS {
            self.pump();
            if self.state() == State::Idle && !self.document().has_pending_records() {
                return true;
            }
            self.advance(window);
        }
        false
    }

    pub fn state(&self) -> State {
        self.coalescer.state()
    }

    pub fn pending(&self) -> usize {
        self.coalescer.pending()
    }

    pub fn flush_count(&self) -> u64 {
        self.coalescer.flush_count()
    }

    /// Virtual time elapsed.
    pub fn now(&self) -> Duration {
        self.coalescer.timers().now()
    }
}
