//! Selector parsing and matching against a live [`dom::Document`].
//!
//! Supported: type, universal, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! descendant and child combinators, and comma-separated lists.

pub mod matching;
pub mod syntax;

pub use matching::{closest, query_selector_all};
pub use syntax::{
    Combinator, ComplexSelector, Selector, SelectorError, SelectorList, parse_selector_list,
};
