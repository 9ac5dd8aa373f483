#[macro_use]
extern crate log;

pub mod common;
mod error;

pub mod client;
pub mod compression;
pub mod credential;
pub mod formatter;
pub mod load_generator;
pub mod proto;
pub mod query;
pub mod remote_write;
pub mod signer;
pub mod transport;

pub use client::AmpClient;
pub use common::*;
pub use error::*;

pub const WORKSPACE_ARG: &str = "workspace";
pub const REGION_ARG: &str = "region";
pub const ENDPOINT_ARG: &str = "endpoint";
pub const CONFIG_ARG: &str = "config";
pub const TIMEOUT_ARG: &str = "timeout";
