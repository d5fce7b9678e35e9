use std::{collections::HashMap, fmt, io, str::FromStr};

use bigdecimal::{num_bigint::BigInt, BigDecimal, RoundingMode};

use crate::error::Error;

pub const MANTISSA_DECIMALS: i64 = 18;
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const PROTOCOL_CONFIG_ID: &str = "1";

/// 10^decimals as an exact decimal.
pub fn exponent_to_big_decimal(decimals: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(1), -decimals)
}

/// Drops every digit past `decimals`, rounding toward zero the way the
/// monitored contracts do integer division.
pub fn truncate(value: &BigDecimal, decimals: i64) -> BigDecimal {
    value.with_scale_round(decimals, RoundingMode::Down)
}

/// raw / 10^decimals, truncated to `decimals`.
pub fn scale_down(raw: &BigDecimal, decimals: i64) -> BigDecimal {
    truncate(&(raw * BigDecimal::new(BigInt::from(1), decimals)), decimals)
}

pub fn from_mantissa(raw: &BigDecimal) -> BigDecimal {
    scale_down(raw, MANTISSA_DECIMALS)
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

pub fn position_id(market: &str, account: &str) -> String {
    format!("{}-{}", market, account)
}

pub fn extract_field(
    map: &HashMap<String, String>,
    key: &str,
) -> Result<String, Error> {
    map.get(key)
        .cloned()
        .ok_or_else(|| Error::FieldNotExist(key.to_string()))
}

/// Looks a parameter up under its canonical name first, then under the
/// names the Compound contracts emit.
pub fn extract_field_any(
    map: &HashMap<String, String>,
    keys: &[&str],
) -> Result<String, Error> {
    keys.iter()
        .find_map(|key| map.get(*key).cloned())
        .ok_or_else(|| Error::FieldNotExist(keys.join("|")))
}

pub fn parse_amount(value: &str) -> Result<BigDecimal, Error> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        let int = BigInt::parse_bytes(hex.as_bytes(), 16).ok_or_else(|| {
            Error::ParseMessage(format!("invalid hex amount {}", value))
        })?;
        return Ok(BigDecimal::from(int));
    }

    Ok(BigDecimal::from_str(value)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventsType {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    Liquidate,
    Transfer,
    AccrueInterest,
    ParameterChange,
}

impl EventsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventsType::Supply => "Supply",
            EventsType::Withdraw => "Withdraw",
            EventsType::Borrow => "Borrow",
            EventsType::Repay => "Repay",
            EventsType::Liquidate => "Liquidate",
            EventsType::Transfer => "Transfer",
            EventsType::AccrueInterest => "AccrueInterest",
            EventsType::ParameterChange => "ParameterChange",
        }
    }
}

impl fmt::Display for EventsType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<EventsType> for String {
    fn from(value: EventsType) -> Self {
        String::from(value.as_str())
    }
}

impl FromStr for EventsType {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<EventsType, Self::Err> {
        match value {
            "Supply" | "Mint" => Ok(EventsType::Supply),
            "Withdraw" | "Redeem" => Ok(EventsType::Withdraw),
            "Borrow" => Ok(EventsType::Borrow),
            "Repay" | "RepayBorrow" => Ok(EventsType::Repay),
            "Liquidate" | "LiquidateBorrow" => Ok(EventsType::Liquidate),
            "Transfer" => Ok(EventsType::Transfer),
            "AccrueInterest" => Ok(EventsType::AccrueInterest),
            "ParameterChange" => Ok(EventsType::ParameterChange),
            other if Parameter_Kind::from_event_name(other).is_some() => {
                Ok(EventsType::ParameterChange)
            },
            _ => Err(io::Error::other("Message Type not supported")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter_Kind {
    New_Reserve_Factor,
    New_Collateral_Factor,
    New_Liquidation_Incentive,
    New_Price_Oracle,
    New_Interest_Rate_Model,
    Market_Entered,
    Market_Exited,
    New_Close_Factor,
    New_Max_Assets,
}

impl Parameter_Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter_Kind::New_Reserve_Factor => "newReserveFactor",
            Parameter_Kind::New_Collateral_Factor => "newCollateralFactor",
            Parameter_Kind::New_Liquidation_Incentive => {
                "newLiquidationIncentive"
            },
            Parameter_Kind::New_Price_Oracle => "newPriceOracle",
            Parameter_Kind::New_Interest_Rate_Model => "newInterestRateModel",
            Parameter_Kind::Market_Entered => "marketEntered",
            Parameter_Kind::Market_Exited => "marketExited",
            Parameter_Kind::New_Close_Factor => "newCloseFactor",
            Parameter_Kind::New_Max_Assets => "newMaxAssets",
        }
    }

    /// Maps a dedicated Comptroller/CToken event name onto its parameter.
    pub fn from_event_name(name: &str) -> Option<Parameter_Kind> {
        match name {
            "NewReserveFactor" => Some(Parameter_Kind::New_Reserve_Factor),
            "NewCollateralFactor" => Some(Parameter_Kind::New_Collateral_Factor),
            "NewLiquidationIncentive" => {
                Some(Parameter_Kind::New_Liquidation_Incentive)
            },
            "NewPriceOracle" => Some(Parameter_Kind::New_Price_Oracle),
            "NewMarketInterestRateModel" => {
                Some(Parameter_Kind::New_Interest_Rate_Model)
            },
            "MarketEntered" => Some(Parameter_Kind::Market_Entered),
            "MarketExited" => Some(Parameter_Kind::Market_Exited),
            "NewCloseFactor" => Some(Parameter_Kind::New_Close_Factor),
            "NewMaxAssets" => Some(Parameter_Kind::New_Max_Assets),
            _ => None,
        }
    }

    /// Param name carrying the new value on the dedicated event.
    pub fn legacy_value_key(&self) -> &'static str {
        match self {
            Parameter_Kind::New_Reserve_Factor => "newReserveFactorMantissa",
            Parameter_Kind::New_Collateral_Factor => {
                "newCollateralFactorMantissa"
            },
            Parameter_Kind::New_Liquidation_Incentive => {
                "newLiquidationIncentiveMantissa"
            },
            Parameter_Kind::New_Price_Oracle => "newPriceOracle",
            Parameter_Kind::New_Interest_Rate_Model => "newInterestRateModel",
            Parameter_Kind::Market_Entered => "account",
            Parameter_Kind::Market_Exited => "account",
            Parameter_Kind::New_Close_Factor => "newCloseFactorMantissa",
            Parameter_Kind::New_Max_Assets => "newMaxAssets",
        }
    }
}

impl fmt::Display for Parameter_Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Parameter_Kind {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Parameter_Kind, Self::Err> {
        match value {
            "newReserveFactor" => Ok(Parameter_Kind::New_Reserve_Factor),
            "newCollateralFactor" => Ok(Parameter_Kind::New_Collateral_Factor),
            "newLiquidationIncentive" => {
                Ok(Parameter_Kind::New_Liquidation_Incentive)
            },
            "newPriceOracle" => Ok(Parameter_Kind::New_Price_Oracle),
            "newInterestRateModel" => Ok(Parameter_Kind::New_Interest_Rate_Model),
            "marketEntered" => Ok(Parameter_Kind::Market_Entered),
            "marketExited" => Ok(Parameter_Kind::Market_Exited),
            "newCloseFactor" => Ok(Parameter_Kind::New_Close_Factor),
            "newMaxAssets" => Ok(Parameter_Kind::New_Max_Assets),
            _ => Err(io::Error::other("Parameter not supported")),
        }
    }
}
