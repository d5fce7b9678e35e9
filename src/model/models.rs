//! Derived entities of the money market.

use bigdecimal::BigDecimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::FromRow;

use crate::helpers::{position_id, PROTOCOL_CONFIG_ID, ZERO_ADDRESS};

/// Implemented by everything the per-block unit of work tracks.
pub trait Entity:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync
{
    const NAME: &'static str;

    fn entity_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub underlying_address: String,
    pub underlying_decimals: i32,
    pub underlying_symbol: String,
    pub underlying_name: String,
    pub total_supply: BigDecimal,
    pub total_borrows: BigDecimal,
    pub total_reserves: BigDecimal,
    pub cash: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub borrow_index: BigDecimal,
    pub borrow_rate_per_block: BigDecimal,
    pub supply_rate_per_block: BigDecimal,
    pub borrow_rate: BigDecimal,
    pub supply_rate: BigDecimal,
    pub underlying_price: BigDecimal,
    pub underlying_price_usd: BigDecimal,
    pub reserve_factor: BigDecimal,
    pub collateral_factor: BigDecimal,
    pub interest_rate_model_address: String,
    pub accrual_block_number: i64,
    pub contract_accrual_block_number: i64,
    pub block_timestamp: i64,
    pub number_of_suppliers: i32,
    pub number_of_borrowers: i32,
}

impl Market {
    pub fn new(id: &str) -> Market {
        Market {
            id: id.to_owned(),
            symbol: String::new(),
            name: String::new(),
            underlying_address: String::from(ZERO_ADDRESS),
            underlying_decimals: 18,
            underlying_symbol: String::new(),
            underlying_name: String::new(),
            total_supply: BigDecimal::from(0),
            total_borrows: BigDecimal::from(0),
            total_reserves: BigDecimal::from(0),
            cash: BigDecimal::from(0),
            exchange_rate: BigDecimal::from(0),
            borrow_index: BigDecimal::from(0),
            borrow_rate_per_block: BigDecimal::from(0),
            supply_rate_per_block: BigDecimal::from(0),
            borrow_rate: BigDecimal::from(0),
            supply_rate: BigDecimal::from(0),
            underlying_price: BigDecimal::from(0),
            underlying_price_usd: BigDecimal::from(0),
            reserve_factor: BigDecimal::from(0),
            collateral_factor: BigDecimal::from(0),
            interest_rate_model_address: String::from(ZERO_ADDRESS),
            accrual_block_number: 0,
            contract_accrual_block_number: 0,
            block_timestamp: 0,
            number_of_suppliers: 0,
            number_of_borrowers: 0,
        }
    }

    pub fn decimals(&self) -> i64 {
        i64::from(self.underlying_decimals)
    }
}

impl Entity for Market {
    const NAME: &'static str = "Market";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub count_liquidated: i32,
    pub count_liquidator: i32,
    pub has_borrowed: bool,
    pub total_supply_value: BigDecimal,
    pub total_borrow_value: BigDecimal,
    pub account_liquidity: Option<BigDecimal>,
    pub available_to_borrow: Option<BigDecimal>,
}

impl Account {
    pub fn new(id: &str) -> Account {
        Account {
            id: id.to_owned(),
            count_liquidated: 0,
            count_liquidator: 0,
            has_borrowed: false,
            total_supply_value: BigDecimal::from(0),
            total_borrow_value: BigDecimal::from(0),
            account_liquidity: None,
            available_to_borrow: None,
        }
    }
}

impl Entity for Account {
    const NAME: &'static str = "Account";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Account_Position {
    pub id: String,
    pub market_id: String,
    pub account_id: String,
    pub symbol: String,
    pub share_balance: BigDecimal,
    pub total_underlying_supplied: BigDecimal,
    pub total_underlying_redeemed: BigDecimal,
    pub total_underlying_borrowed: BigDecimal,
    pub total_underlying_repaid: BigDecimal,
    pub stored_borrow_balance: BigDecimal,
    pub account_borrow_index: BigDecimal,
    pub realized_lend_balance: BigDecimal,
    pub realized_supply_interest: BigDecimal,
    pub realized_borrow_interest: BigDecimal,
    pub transaction_hashes: Vec<String>,
    pub transaction_times: Vec<i64>,
    pub accrual_block_number: i64,
    pub entered_market: bool,
}

impl Account_Position {
    pub fn new(market: &Market, account: &str) -> Account_Position {
        Account_Position {
            id: position_id(&market.id, account),
            market_id: market.id.to_owned(),
            account_id: account.to_owned(),
            symbol: market.symbol.to_owned(),
            share_balance: BigDecimal::from(0),
            total_underlying_supplied: BigDecimal::from(0),
            total_underlying_redeemed: BigDecimal::from(0),
            total_underlying_borrowed: BigDecimal::from(0),
            total_underlying_repaid: BigDecimal::from(0),
            stored_borrow_balance: BigDecimal::from(0),
            account_borrow_index: BigDecimal::from(0),
            realized_lend_balance: BigDecimal::from(0),
            realized_supply_interest: BigDecimal::from(0),
            realized_borrow_interest: BigDecimal::from(0),
            transaction_hashes: vec![],
            transaction_times: vec![],
            accrual_block_number: 0,
            entered_market: false,
        }
    }

    /// Appends the transaction unless it is already the latest entry.
    pub fn record_transaction(&mut self, hash: &str, timestamp: i64) {
        if self.transaction_hashes.last().map(String::as_str) == Some(hash) {
            return;
        }
        self.transaction_hashes.push(hash.to_owned());
        self.transaction_times.push(timestamp);
    }
}

impl Entity for Account_Position {
    const NAME: &'static str = "Account_Position";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Protocol_Config {
    pub id: String,
    pub close_factor: BigDecimal,
    pub liquidation_incentive: BigDecimal,
    pub price_oracle: Option<String>,
    pub max_assets: Option<i32>,
}

impl Default for Protocol_Config {
    fn default() -> Self {
        Protocol_Config {
            id: String::from(PROTOCOL_CONFIG_ID),
            close_factor: BigDecimal::from(0),
            liquidation_incentive: BigDecimal::from(0),
            price_oracle: None,
            max_assets: None,
        }
    }
}

impl Entity for Protocol_Config {
    const NAME: &'static str = "Protocol_Config";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Block {
    pub id: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Entity_Revision {
    pub block_number: i64,
    pub entity: String,
    pub entity_id: String,
    pub previous: Option<String>,
}
