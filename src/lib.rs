#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths, unreachable_pub)]
#![warn(
    missing_docs,
    clippy::doc_link_with_quotes,
    clippy::doc_markdown,
    clippy::missing_errors_doc
)]

mod config;
pub mod error;
mod factory;
mod metrics;
mod pool;
mod resource;

pub use crate::{
    config::{PoolConfig, PoolConfigBuilder, PoolConfigError},
    error::Error,
    factory::Factory,
    metrics::PoolState,
    pool::Pool,
    resource::{Pooled, Resource},
};
