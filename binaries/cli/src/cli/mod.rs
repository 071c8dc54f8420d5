pub mod bridge;
pub mod commands;
pub mod console;

#[cfg(test)]
mod tests;

pub use bridge::{ConnectionOverrides, client_config, default_service_bundle};
pub use commands::{Command, Target, execute};
pub use console::{ConsoleSink, OutcomeReport, format_event, format_log};
