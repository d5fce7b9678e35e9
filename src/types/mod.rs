use std::collections::HashMap;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::helpers::Parameter_Kind;

/// One log record of the input feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raw_Event {
    pub event_type: String,
    pub contract_address: String,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub transaction_hash: String,
    pub log_index: i64,
    #[serde(default)]
    pub event_params: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revert_Type {
    pub revert_to: i64,
}

/// A feed line is either a log record or a rollback instruction issued by
/// the upstream source after a reorganization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feed_Message {
    Revert(Revert_Type),
    Event(Raw_Event),
}

/// Envelope shared by every typed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event_Meta {
    pub market: String,
    pub transaction_hash: String,
    pub log_index: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Supply_Type {
    pub meta: Event_Meta,
    pub actor: String,
    pub underlying_amount: BigDecimal,
    pub share_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Withdraw_Type {
    pub meta: Event_Meta,
    pub actor: String,
    pub underlying_amount: BigDecimal,
    pub share_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Borrow_Type {
    pub meta: Event_Meta,
    pub borrower: String,
    pub borrow_delta: BigDecimal,
    pub account_total_borrows: Option<BigDecimal>,
    pub market_total_borrows: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repay_Type {
    pub meta: Event_Meta,
    pub payer: String,
    pub borrower: String,
    pub repay_delta: BigDecimal,
    pub account_total_borrows: Option<BigDecimal>,
    pub market_total_borrows: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Liquidate_Type {
    pub meta: Event_Meta,
    pub liquidator: String,
    pub borrower: String,
    pub collateral_market: String,
    pub repay_amount: BigDecimal,
    pub seize_share_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer_Type {
    pub meta: Event_Meta,
    pub from: String,
    pub to: String,
    pub share_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accrue_Interest_Type {
    pub meta: Event_Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter_Change_Type {
    pub meta: Event_Meta,
    pub parameter: Parameter_Kind,
    pub value: String,
    /// Market the parameter applies to; the emitting contract when absent.
    pub target_market: Option<String>,
    pub account: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Protocol_Event {
    Supply(Supply_Type),
    Withdraw(Withdraw_Type),
    Borrow(Borrow_Type),
    Repay(Repay_Type),
    Liquidate(Liquidate_Type),
    Transfer(Transfer_Type),
    AccrueInterest(Accrue_Interest_Type),
    ParameterChange(Parameter_Change_Type),
}

impl Protocol_Event {
    pub fn meta(&self) -> &Event_Meta {
        match self {
            Protocol_Event::Supply(item) => &item.meta,
            Protocol_Event::Withdraw(item) => &item.meta,
            Protocol_Event::Borrow(item) => &item.meta,
            Protocol_Event::Repay(item) => &item.meta,
            Protocol_Event::Liquidate(item) => &item.meta,
            Protocol_Event::Transfer(item) => &item.meta,
            Protocol_Event::AccrueInterest(item) => &item.meta,
            Protocol_Event::ParameterChange(item) => &item.meta,
        }
    }
}

/// One logical protocol action, after co-emitted events of a transaction
/// have been paired.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Supply(Supply_Type, Option<Transfer_Type>),
    Withdraw(Withdraw_Type, Option<Transfer_Type>),
    Borrow(Borrow_Type),
    Repay(Repay_Type),
    Liquidate(Liquidate_Type),
    Transfer(Transfer_Type),
    AccrueInterest(Accrue_Interest_Type),
    ParameterChange(Parameter_Change_Type),
}
