//! `wpx simulate` – run a scripted page through the rewriter and print every
//! flushed batch.
//!
//! By default the page runs on a virtual clock, so the output is the same on
//! every run. `--realtime` drives the coalescer with tokio timers instead.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use wpx_core::coalescer::{drive, tokio_timers, Coalescer, CoalescerSettings};
use wpx_core::config::WpxConfig;
use wpx_core::dom::{Document, ElementId, MutationRecord};
use wpx_core::page::{self, is_link_attribute, Page};
use wpx_core::rewrite::Rewriter;

use crate::cli::OriginArgs;

/// Script used when no mutations are given: one more than the default buffer,
/// so the run shows a count flush followed by an idle flush.
const DEFAULT_SCRIPT: [&str; 11] = [
    "src=/img/1.png",
    "src=/img/2.png",
    "href=/about",
    "href=//cdn.example.net/app.css",
    "srcset=/s.png 1x, /l.png 2x",
    "src=/img/3.png",
    "action=/search",
    "content=5; url=/next",
    "archive=/a.jar,/b.jar",
    "poster=/v.jpg",
    "href=https://elsewhere.org/",
];

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub origins: OriginArgs,

    /// Flush after this many notifications (overrides config).
    #[arg(long, value_name = "N")]
    pub buffer_size: Option<usize>,

    /// Idle window before a partial batch is flushed, in ms (overrides config).
    #[arg(long, value_name = "MS")]
    pub idle_ms: Option<u64>,

    /// Use real tokio timers instead of the virtual clock.
    #[arg(long)]
    pub realtime: bool,

    /// Delay between scripted mutations in realtime mode.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub interval_ms: u64,

    /// Mutations as ATTR=VALUE; each inserts one element carrying that attribute.
    #[arg(value_name = "ATTR=VALUE")]
    pub mutations: Vec<String>,
}

impl SimulateArgs {
    fn settings(&self, cfg: &WpxConfig) -> CoalescerSettings {
        let mut settings = cfg.coalescer_settings();
        if let Some(n) = self.buffer_size {
            settings.buffer_size = n;
        }
        if let Some(ms) = self.idle_ms {
            settings.idle_timeout = Duration::from_millis(ms);
        }
        settings
    }

    fn script(&self) -> Result<Vec<(String, String)>> {
        if self.mutations.is_empty() {
            return DEFAULT_SCRIPT.iter().map(|m| parse_mutation(m)).collect();
        }
        self.mutations.iter().map(|m| parse_mutation(m)).collect()
    }
}

/// Parses `attr=value`. The value may itself contain `=`.
pub(crate) fn parse_mutation(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("mutation {raw:?} is not ATTR=VALUE"))?;
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        bail!("mutation {raw:?} has an empty attribute name");
    }
    if !is_link_attribute(&name) {
        tracing::warn!(attr = %name, "not a link attribute; it will be left alone");
    }
    Ok((name, value.to_string()))
}

/// Element a script would typically put the attribute on.
fn tag_for(attr: &str) -> &'static str {
    match attr {
        "href" => "a",
        "src" | "srcset" => "img",
        "action" => "form",
        "content" => "meta",
        "archive" | "classid" | "codebase" => "object",
        "poster" => "video",
        "cite" => "blockquote",
        _ => "div",
    }
}

pub async fn run_simulate(cfg: &WpxConfig, args: &SimulateArgs) -> Result<()> {
    let rewriter = args.origins.rewriter(cfg)?;
    let settings = args.settings(cfg);
    let script = args.script()?;
    println!(
        "buffer_size={} idle_timeout={}ms mutations={}",
        settings.buffer_size.max(1),
        settings.idle_timeout.as_millis(),
        script.len()
    );

    if args.realtime {
        simulate_realtime(rewriter, settings, &script, Duration::from_millis(args.interval_ms))
            .await
    } else {
        simulate_virtual(rewriter, settings, &script)
    }
}

fn simulate_virtual(
    rewriter: Rewriter,
    settings: CoalescerSettings,
    script: &[(String, String)],
) -> Result<()> {
    let mut batch_no = 0usize;
    let hook = Box::new(move |batch: &[MutationRecord]| {
        batch_no += 1;
        println!("flush #{batch_no}: {} record(s)", batch.len());
    });
    let mut page = Page::with_hook(Document::new(), rewriter, settings, hook);
    page.load();

    let root = page.document().root();
    let mut inserted = Vec::with_capacity(script.len());
    for (attr, value) in script {
        let id = page
            .document_mut()
            .append_new(root, tag_for(attr), &[(attr.as_str(), value.as_str())])?;
        inserted.push((id, attr.as_str()));
        if page.pump() {
            println!("  (buffer full at t={}ms)", page.now().as_millis());
        }
    }
    if page.pending() > 0 {
        println!("{} notification(s) waiting for the idle window", page.pending());
    }

    if !page.settle() {
        bail!("page did not settle; rewrites keep producing mutations");
    }
    println!("settled at t={}ms after {} flush(es)", page.now().as_millis(), page.flush_count());
    print_attributes(page.document(), &inserted);
    Ok(())
}

async fn simulate_realtime(
    rewriter: Rewriter,
    settings: CoalescerSettings,
    script: &[(String, String)],
    interval: Duration,
) -> Result<()> {
    // Elements exist before the run; the producer only reports them as changed.
    let mut doc = Document::new();
    let root = doc.root();
    let mut inserted = Vec::with_capacity(script.len());
    for (attr, value) in script {
        let id = doc.append_new(root, tag_for(attr), &[(attr.as_str(), value.as_str())])?;
        inserted.push((id, attr.clone()));
    }

    let (timers, timer_events) = tokio_timers();
    let mut batch_no = 0usize;
    let handler = move |batch: Vec<MutationRecord>, doc: &mut Document| {
        batch_no += 1;
        let writes = page::handle_records(doc, &rewriter, &batch);
        println!("flush #{batch_no}: {} record(s), {writes} write(s)", batch.len());
    };
    let coalescer = Coalescer::new(doc, timers, settings, handler);

    let (tx, rx) = mpsc::channel(16);
    let records: Vec<MutationRecord> = inserted
        .iter()
        .map(|(id, attr)| MutationRecord::Attributes {
            target: *id,
            name: attr.clone(),
            old_value: None,
        })
        .collect();
    let producer = tokio::spawn(async move {
        for record in records {
            if tx.send(vec![record]).await.is_err() {
                break;
            }
            tokio::time::sleep(interval).await;
        }
        // Let the last idle window run out before closing the channel.
        tokio::time::sleep(settings.idle_timeout + interval).await;
    });

    let coalescer = drive(coalescer, timer_events, rx).await;
    producer.await.context("mutation producer panicked")?;

    println!("done after {} flush(es)", coalescer.flush_count());
    let ids: Vec<(ElementId, &str)> = inserted.iter().map(|(id, a)| (*id, a.as_str())).collect();
    print_attributes(coalescer.source(), &ids);
    Ok(())
}

fn print_attributes(doc: &Document, elements: &[(ElementId, &str)]) {
    for (id, attr) in elements {
        let tag = doc.tag_name(*id).unwrap_or("?");
        let value = doc.get_attribute(*id, attr).unwrap_or("");
        println!("<{tag} {attr}=\"{value}\">");
    }
}
