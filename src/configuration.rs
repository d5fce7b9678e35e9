use std::{env, fs, ops::Deref, str::FromStr, sync::Arc};

use bigdecimal::BigDecimal;

use crate::{
    dao::EntityStore, error::Error, helpers::normalize_address,
    provider::ChainReader,
};

const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

pub struct State {
    pub config: Config,
    pub store: Box<dyn EntityStore>,
    pub reader: Box<dyn ChainReader>,
}

impl State {
    pub fn new(
        config: Config,
        store: Box<dyn EntityStore>,
        reader: Box<dyn ChainReader>,
    ) -> State {
        Self {
            config,
            store,
            reader,
        }
    }

    pub fn is_native_market(&self, market: &str) -> bool {
        self.config
            .native_market
            .as_deref()
            .is_some_and(|native| native == market)
    }

    pub fn is_reference_market(&self, market: &str) -> bool {
        self.config.reference_market == market
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rpc_host: String,
    pub timeout: u64,
    pub events_source: String,
    pub share_token_decimals: i64,
    pub blocks_per_year: i64,
    pub oracle_switch_block: i64,
    pub legacy_price_oracle: String,
    pub reference_market: String,
    pub reference_underlying: String,
    pub reference_underlying_decimals: i64,
    pub native_market: Option<String>,
    pub native_symbol: String,
    pub native_name: String,
    pub collateral_multiplier: BigDecimal,
}

pub fn blocks_per_year(block_time_in_seconds: i64) -> Result<i64, Error> {
    if block_time_in_seconds <= 0 {
        return Err(Error::ConfigurationError(format!(
            "BLOCK_TIME_IN_SECONDS must be positive, got {}",
            block_time_in_seconds
        )));
    }

    Ok(SECONDS_PER_YEAR / block_time_in_seconds)
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let rpc_host = env::var("RPC_HOST")?;
    let timeout = env::var("TIMEOUT")?.parse()?;
    let events_source =
        env::var("EVENTS_SOURCE").unwrap_or_else(|_| String::from("-"));
    let share_token_decimals = env::var("SHARE_TOKEN_DECIMALS")?.parse()?;
    let block_time: i64 = env::var("BLOCK_TIME_IN_SECONDS")?.parse()?;
    let blocks_per_year = blocks_per_year(block_time)?;
    let oracle_switch_block = env::var("ORACLE_SWITCH_BLOCK")?.parse()?;
    let legacy_price_oracle =
        normalize_address(&env::var("LEGACY_PRICE_ORACLE")?);
    let reference_market = normalize_address(&env::var("REFERENCE_MARKET")?);
    let reference_underlying =
        normalize_address(&env::var("REFERENCE_UNDERLYING")?);
    let reference_underlying_decimals =
        env::var("REFERENCE_UNDERLYING_DECIMALS")?.parse()?;
    let native_market = env::var("NATIVE_MARKET")
        .ok()
        .map(|value| normalize_address(&value))
        .filter(|value| !value.is_empty());
    let native_symbol = env::var("NATIVE_SYMBOL")?;
    let native_name = env::var("NATIVE_NAME")?;
    let collateral_multiplier =
        BigDecimal::from_str(&env::var("COLLATERAL_MULTIPLIER")?)?;

    if collateral_multiplier <= BigDecimal::from(0) {
        return Err(Error::ConfigurationError(String::from(
            "COLLATERAL_MULTIPLIER must be positive",
        )));
    }

    let config = Config {
        database_url,
        rpc_host,
        timeout,
        events_source,
        share_token_decimals,
        blocks_per_year,
        oracle_switch_block,
        legacy_price_oracle,
        reference_market,
        reference_underlying,
        reference_underlying_decimals,
        native_market,
        native_symbol,
        native_name,
        collateral_multiplier,
    };

    Ok(config)
}

pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";
    let etl_config_file: &str = "etl.conf";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);
    let etl_config_path = format!("{}/{}", directory, etl_config_file);

    let config_string = fs::read_to_string(path)?;
    let etl_config_string = fs::read_to_string(etl_config_path)?;

    parse_config_string(config_string)?;
    parse_config_string(etl_config_string)?;

    Ok(())
}

fn parse_config_string(config: String) -> Result<(), Error> {
    for (key, value) in parse_config_pairs(&config) {
        env::set_var(key, value);
    }

    Ok(())
}

fn parse_config_pairs(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}
