//! `wpx navigate <location>` – show the entry redirect for a page location.

use wpx_core::navigate::redirect_for;

pub fn run_navigate(location: &str) {
    match redirect_for(location) {
        Some(to) => println!("redirect: {to}"),
        None => println!("no redirect"),
    }
}
