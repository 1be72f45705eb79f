//! Integration test: a page is loaded, mutated by "scripts", and every link
//! attribute ends up proxied exactly once through coalesced flushes.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use url::Url;
use wpx_core::coalescer::{CoalescerSettings, State};
use wpx_core::dom::{Document, MutationRecord};
use wpx_core::page::Page;
use wpx_core::rewrite::{rewrite, RewriteContext, Rewriter, QUERY_KEY};

const PROXY: &str = "proxy.com:3000";
const TARGET: &str = "target.com";

fn rewriter() -> Rewriter {
    Rewriter::new(RewriteContext::new(PROXY), TARGET)
}

fn settings(buffer_size: usize) -> CoalescerSettings {
    CoalescerSettings {
        buffer_size,
        idle_timeout: Duration::from_millis(2000),
    }
}

fn target_of(proxied: &str) -> String {
    Url::parse(proxied)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == QUERY_KEY)
        .map(|(_, v)| v.into_owned())
        .expect("proxied url carries a target")
}

fn recording_page(buffer_size: usize) -> (Page, Rc<RefCell<Vec<Vec<MutationRecord>>>>) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&batches);
    let page = Page::with_hook(
        Document::new(),
        rewriter(),
        settings(buffer_size),
        Box::new(move |batch: &[MutationRecord]| sink.borrow_mut().push(batch.to_vec())),
    );
    (page, batches)
}

#[test]
fn initial_load_rewrites_every_link_shape() {
    let mut doc = Document::new();
    let root = doc.root();
    let head = doc.append_new(root, "head", &[]).unwrap();
    let meta = doc
        .append_new(head, "meta", &[("http-equiv", "refresh"), ("content", "5;/next")])
        .unwrap();
    let body = doc.append_new(root, "body", &[]).unwrap();
    let link = doc
        .append_new(body, "a", &[("href", "https://abc.com/x?q=s")])
        .unwrap();
    let img = doc
        .append_new(
            body,
            "img",
            &[("src", "data:image/png;base64,AAAA"), ("srcset", "a.jpg 1x, b.jpg 2x")],
        )
        .unwrap();
    let applet = doc
        .append_new(body, "applet", &[("archive", "a.jar, //cdn.org/b.jar")])
        .unwrap();
    let form = doc.append_new(body, "form", &[("action", "")]).unwrap();

    let mut page = Page::new(doc, rewriter(), settings(10));
    assert_eq!(page.load(), 4);
    let doc = page.document();

    assert_eq!(
        target_of(doc.get_attribute(link, "href").unwrap()),
        "https://abc.com/x?q=s"
    );
    assert_eq!(doc.get_attribute(img, "src"), Some("data:image/png;base64,AAAA"));
    let srcset = doc.get_attribute(img, "srcset").unwrap();
    let candidates: Vec<(&str, &str)> = srcset
        .split(',')
        .map(|c| c.split_once(' ').unwrap())
        .collect();
    assert_eq!(candidates.len(), 2);
    assert_eq!(target_of(candidates[0].0), "http://target.com/a.jpg");
    assert_eq!(candidates[0].1, "1x");
    assert_eq!(target_of(candidates[1].0), "http://target.com/b.jpg");
    assert_eq!(candidates[1].1, "2x");

    let archive = doc.get_attribute(applet, "archive").unwrap();
    let jars: Vec<String> = archive.split(',').map(target_of).collect();
    assert_eq!(jars, vec!["http://target.com/a.jar", "http://cdn.org/b.jar"]);

    let content = doc.get_attribute(meta, "content").unwrap();
    let (delay, url) = content.split_once(';').unwrap();
    assert_eq!(delay, "5");
    assert_eq!(target_of(url), "http://target.com/next");

    assert_eq!(doc.get_attribute(form, "action"), Some(""));
    assert_eq!(page.load(), 0, "second scan finds nothing to do");
}

#[test]
fn burst_of_buffer_size_flushes_once_synchronously() {
    let (mut page, batches) = recording_page(3);
    let root = page.document().root();
    let anchors: Vec<_> = (0..3)
        .map(|_| page.document_mut().append_new(root, "a", &[]).unwrap())
        .collect();
    page.load();

    for (i, a) in anchors.iter().enumerate() {
        page.document_mut()
            .set_attribute(*a, "href", &format!("/p/{i}"))
            .unwrap();
        let flushed = page.pump();
        assert_eq!(flushed, i == 2);
    }

    assert_eq!(page.now(), Duration::ZERO);
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    let targets: Vec<_> = batches[0].iter().map(MutationRecord::target).collect();
    assert_eq!(targets, anchors);
    for (i, a) in anchors.iter().enumerate() {
        assert_eq!(
            target_of(page.document().get_attribute(*a, "href").unwrap()),
            format!("http://target.com/p/{i}")
        );
    }
}

#[test]
fn partial_batch_flushes_after_idle_window() {
    let (mut page, batches) = recording_page(10);
    page.load();
    let root = page.document().root();
    let a = page.document_mut().append_new(root, "a", &[]).unwrap();
    page.pump();
    page.document_mut().set_attribute(a, "href", "/late").unwrap();
    page.pump();
    assert_eq!(page.state(), State::Buffering);

    assert_eq!(page.advance(Duration::from_millis(1999)), 0);
    assert!(batches.borrow().is_empty());
    assert_eq!(page.advance(Duration::from_millis(1)), 1);
    assert_eq!(batches.borrow().len(), 1);
    assert_eq!(batches.borrow()[0].len(), 2);

    assert!(page.settle());
    assert!(batches.borrow().iter().all(|b| !b.is_empty()));
    assert_eq!(
        target_of(page.document().get_attribute(a, "href").unwrap()),
        "http://target.com/late"
    );
}

#[test]
fn script_overwriting_a_link_is_rewritten_again() {
    let (mut page, _batches) = recording_page(1);
    let root = page.document().root();
    let a = page.document_mut().append_new(root, "a", &[("href", "/one")]).unwrap();
    page.load();

    page.document_mut().set_attribute(a, "href", "/two").unwrap();
    assert!(page.pump());
    assert!(page.settle());
    assert_eq!(
        target_of(page.document().get_attribute(a, "href").unwrap()),
        "http://target.com/two"
    );
}

#[test]
fn rewrite_is_idempotent_across_origins() {
    let ctx = RewriteContext::new(PROXY);
    let inputs = [
        "http://abc.com/file.txt?q=s",
        "index.js",
        "/path/12345",
        "path/index.js?q=s",
        "/",
        "//en.wikipedia.org/",
        "https://x.org/a%20b?c=d&e=f#g",
        "./rel/../x.css",
        "",
        "blob:x",
        "data:x",
    ];
    for origin in ["target.com", "wikipedia.org", "localhost:8080"] {
        for raw in inputs {
            let once = rewrite(raw, origin, &ctx);
            assert_eq!(rewrite(&once, origin, &ctx), once, "{raw:?} @ {origin}");
        }
    }
}
