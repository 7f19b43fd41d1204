//! Shared utilities for the tessella object model.
//!
//! This crate contains the small leaf helpers the rest of the workspace
//! builds on: object stamping, whitespace tokenizing, shallow map merging,
//! string templating, and numeric helpers. It has no knowledge of templates
//! or events.

pub mod merge;
pub mod num;
pub mod stamp;
pub mod template;
pub mod text;

pub use merge::{merge_into, merged, JsonMap};
pub use num::{format_num, wrap_num, DEFAULT_PRECISION};
pub use stamp::{next_stamp, Stamp};
pub use template::{template, TemplateError};
pub use text::split_words;
