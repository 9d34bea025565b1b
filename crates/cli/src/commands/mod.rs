//! Subcommands of the simulator binary.

mod list;
mod run;

pub use list::List;
pub use run::Run;
