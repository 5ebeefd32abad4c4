//! The `speech` command-line tool.
#![deny(unused_crate_dependencies)]

// Used by the binary only.
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

pub mod handlers;
pub mod parser;

pub use parser::{Cli, Commands};
