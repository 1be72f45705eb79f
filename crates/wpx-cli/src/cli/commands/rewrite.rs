//! `wpx rewrite <url>` – print the proxied form of one URL.

use anyhow::Result;
use wpx_core::rewrite::{self, Rewriter};

pub fn run_rewrite(rewriter: &Rewriter, url: &str, explain: bool) -> Result<()> {
    if !explain {
        println!("{}", rewriter.rewrite(url));
        return Ok(());
    }

    let decision = rewrite::explain(url, rewriter.target_origin(), rewriter.context())?;
    println!("kind:   {:?}", decision.kind);
    match &decision.target {
        Some(target) => println!("target: {target}"),
        None => println!("target: - (left as is)"),
    }
    println!("output: {}", decision.output);
    Ok(())
}
