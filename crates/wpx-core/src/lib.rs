//! Client-side rewriting core of a forward/reverse web proxy.
//!
//! [`rewrite`] turns page URLs into proxied URLs, [`adapter`] applies it to
//! attribute values of different shapes, and [`coalescer`] batches DOM
//! mutations so rewritten attributes are re-checked without feedback loops.
//! [`page`] wires them together over the in-memory [`dom`].

pub mod config;
pub mod logging;

pub mod adapter;
pub mod coalescer;
pub mod dom;
pub mod navigate;
pub mod page;
pub mod rewrite;
