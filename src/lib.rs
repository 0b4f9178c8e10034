//! Browser acceptance tests written as plain sentences.
//!
//! Instructions in Japanese, Chinese or English are compiled into a closed
//! set of [`action::action_model::Action`]s, deterministically by the rule
//! library in [`pattern`] and, when no rule matches, by a schema-checked
//! [`agent::extractor::SemanticExtractor`]. The engine in [`spec::runner`]
//! executes them through a [`browser::driver::BrowserDriver`] and rolls the
//! results up for the writers in [`report`].

pub mod action;
pub mod agent;
pub mod browser;
pub mod cli;
pub mod compile;
pub mod pattern;
pub mod report;
pub mod spec;
pub mod trace;
