//! The library code for the `posthorn` static site generator. A build runs in
//! two phases:
//!
//! 1. Aggregation: posts and projects are loaded from their source
//!    directories ([`crate::parser`]) into a [`crate::collection::Collection`],
//!    which also derives the site's tags ([`crate::tag`]).
//! 2. Rendering: every source file is rendered against a context built from
//!    the collection ([`crate::context`]) and written to the output directory
//!    ([`crate::build`]). The post bodies rendered along the way feed the RSS
//!    feed ([`crate::feed`]).
//!
//! Markdown pages go through [`crate::frontmatter`] and [`crate::markdown`]
//! before being wrapped in a template ([`crate::render`]). HTML pages are
//! templates themselves.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod assets;
pub mod build;
pub mod collection;
pub mod config;
pub mod context;
pub mod feed;
pub mod frontmatter;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod project;
pub mod render;
pub mod tag;
pub mod url;
pub mod value;
