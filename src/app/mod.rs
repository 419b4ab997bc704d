//! The `gtm-client` command-line front end

pub mod args;
pub mod error;
pub mod startup;
