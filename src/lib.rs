#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod merge;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod util;
