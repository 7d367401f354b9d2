//! Process settings: a TOML file named on the command line, overridable through
//! `WARDEN_<SECTION>__<KEY>` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
