use sqlx::{
    postgres::{PgPoolOptions, PgQueryResult},
    PgPool, Postgres,
};

mod account;
mod account_position;
mod block;
mod entity_revision;
mod market;
mod protocol_config;

pub type PoolType = PgPool;
pub type PoolOption = PgPoolOptions;
pub type QueryResult = PgQueryResult;
pub type DataBase = Postgres;
