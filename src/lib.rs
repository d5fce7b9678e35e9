#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

pub mod block_state;
pub mod cli;
pub mod configuration;
pub mod dao;
pub mod error;
pub mod event_dispatch;
pub mod event_parsing;
pub mod handler;
pub mod helpers;
pub mod migration;
pub mod model;
pub mod provider;
pub mod types;

#[cfg(test)]
mod test_support;
