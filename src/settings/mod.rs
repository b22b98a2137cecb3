//! Process configuration: a `--settings <path>` flag plus a TOML file.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
