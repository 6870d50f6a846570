#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::single_match_else,
    clippy::uninlined_format_args
)]

pub mod channels;
pub mod config;
pub mod scope;
pub mod tracker;

pub use config::Config;
