pub use self::{
    chain_reader::{ChainReader, TypedValue, View_Function},
    database::DatabasePool,
    event::{Event, Feed_Summary},
    rpc::Rpc,
};

mod chain_reader;
mod database;
mod event;
mod rpc;
