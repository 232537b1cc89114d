// ABOUTME: Command module aggregator for the ecsroll CLI.
// ABOUTME: Re-exports deploy, events and run command handlers.

mod deploy;
mod events;
mod run;

pub use deploy::deploy;
pub use events::events;
pub use run::run;
