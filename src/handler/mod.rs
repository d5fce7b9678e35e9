pub mod ctoken_accrue_interest;
pub mod ctoken_borrow;
pub mod ctoken_liquidate;
pub mod ctoken_repay;
pub mod ctoken_supply;
pub mod ctoken_transfer;
pub mod ctoken_withdraw;
pub mod liquidity;
pub mod market_state;
pub mod parameter_change;
pub mod position_ledger;
pub mod price;
