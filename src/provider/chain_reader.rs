use std::fmt;

use async_trait::async_trait;
use bigdecimal::{num_bigint::BigInt, BigDecimal};

use crate::error::ReadFailure;

/// Historical, side-effect free read of a contract view function.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn read(
        &self,
        contract: &str,
        function: &View_Function,
        block: i64,
    ) -> Result<TypedValue, ReadFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum View_Function {
    AccrualBlockNumber,
    TotalSupply,
    ExchangeRateStored,
    TotalReserves,
    TotalBorrows,
    BorrowIndex,
    BorrowRatePerBlock,
    SupplyRatePerBlock,
    GetCash,
    Name,
    Symbol,
    Decimals,
    Underlying,
    GetUnderlyingPrice(String),
    GetPrice(String),
}

impl View_Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            View_Function::AccrualBlockNumber => "accrualBlockNumber",
            View_Function::TotalSupply => "totalSupply",
            View_Function::ExchangeRateStored => "exchangeRateStored",
            View_Function::TotalReserves => "totalReserves",
            View_Function::TotalBorrows => "totalBorrows",
            View_Function::BorrowIndex => "borrowIndex",
            View_Function::BorrowRatePerBlock => "borrowRatePerBlock",
            View_Function::SupplyRatePerBlock => "supplyRatePerBlock",
            View_Function::GetCash => "getCash",
            View_Function::Name => "name",
            View_Function::Symbol => "symbol",
            View_Function::Decimals => "decimals",
            View_Function::Underlying => "underlying",
            View_Function::GetUnderlyingPrice(_) => "getUnderlyingPrice",
            View_Function::GetPrice(_) => "getPrice",
        }
    }
}

impl fmt::Display for View_Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            View_Function::GetUnderlyingPrice(address)
            | View_Function::GetPrice(address) => {
                write!(f, "{}({})", self.as_str(), address)
            },
            _ => write!(f, "{}()", self.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Uint(BigInt),
    Address(String),
    Text(String),
}

impl TypedValue {
    pub fn into_uint(self) -> Result<BigInt, ReadFailure> {
        match self {
            TypedValue::Uint(value) => Ok(value),
            other => Err(ReadFailure::Decode(format!(
                "expected uint, got {:?}",
                other
            ))),
        }
    }

    pub fn into_decimal(self) -> Result<BigDecimal, ReadFailure> {
        Ok(BigDecimal::from(self.into_uint()?))
    }

    pub fn into_address(self) -> Result<String, ReadFailure> {
        match self {
            TypedValue::Address(value) => Ok(value),
            other => Err(ReadFailure::Decode(format!(
                "expected address, got {:?}",
                other
            ))),
        }
    }

    pub fn into_text(self) -> Result<String, ReadFailure> {
        match self {
            TypedValue::Text(value) => Ok(value),
            other => Err(ReadFailure::Decode(format!(
                "expected string, got {:?}",
                other
            ))),
        }
    }
}
