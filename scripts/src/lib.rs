//! Tasks for deploying the ERC404Stake contract behind an upgradeable proxy
//! and verifying its source on a block explorer.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod errors;
pub mod executor;
pub mod reporter;
pub mod schema;
pub mod tasks;
pub mod types;
pub mod utils;
