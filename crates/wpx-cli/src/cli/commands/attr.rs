//! `wpx attr <name> <value>` – rewrite an attribute value by its strategy.

use wpx_core::adapter::strategy_for;
use wpx_core::page::is_link_attribute;
use wpx_core::rewrite::Rewriter;

pub fn run_attr(rewriter: &Rewriter, name: &str, value: &str) {
    let strategy = strategy_for(name);
    if !is_link_attribute(name) {
        eprintln!("note: {name} is not a link attribute; the page would leave it alone");
    }
    println!("strategy: {strategy:?}");
    println!("{}", strategy.apply(value, rewriter));
}
