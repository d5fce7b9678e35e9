use bigdecimal::{BigDecimal, ToPrimitive};
use tracing::info;

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    helpers::{from_mantissa, normalize_address, parse_amount, Parameter_Kind},
    types::Parameter_Change_Type,
};

use super::market_state::get_or_create_market;

enum Parameter_Value {
    Mantissa(BigDecimal),
    Address(String),
    Count(i32),
    Flag(bool),
}

fn parse_value(item: &Parameter_Change_Type) -> Result<Parameter_Value, Error> {
    let value = match item.parameter {
        Parameter_Kind::New_Reserve_Factor
        | Parameter_Kind::New_Collateral_Factor
        | Parameter_Kind::New_Liquidation_Incentive
        | Parameter_Kind::New_Close_Factor => {
            Parameter_Value::Mantissa(from_mantissa(&parse_amount(&item.value)?))
        },
        Parameter_Kind::New_Price_Oracle | Parameter_Kind::New_Interest_Rate_Model => {
            Parameter_Value::Address(normalize_address(&item.value))
        },
        Parameter_Kind::New_Max_Assets => {
            let count = parse_amount(&item.value)?.to_i32().ok_or_else(|| {
                Error::ParseMessage(format!("max assets out of range: {}", item.value))
            })?;
            Parameter_Value::Count(count)
        },
        Parameter_Kind::Market_Entered => Parameter_Value::Flag(true),
        Parameter_Kind::Market_Exited => Parameter_Value::Flag(false),
    };

    Ok(value)
}

/// Reserve factor and rate model changes are emitted by the market
/// contract itself. Every other market scoped parameter comes from the
/// Comptroller and has to name its market.
fn target_market(item: &Parameter_Change_Type) -> Result<String, Error> {
    match (&item.target_market, item.parameter) {
        (Some(market), _) => Ok(market.to_owned()),
        (
            None,
            Parameter_Kind::New_Reserve_Factor | Parameter_Kind::New_Interest_Rate_Model,
        ) => Ok(item.meta.market.to_owned()),
        (None, parameter) => Err(Error::ParseMessage(format!(
            "{} without market in tx {}",
            parameter, item.meta.transaction_hash
        ))),
    }
}

/// Governance and membership updates. The value is validated before any
/// entity is touched, so a malformed event leaves the block state as is.
pub async fn parse_and_insert(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Parameter_Change_Type,
) -> Result<(), Error> {
    let value = parse_value(&item)?;

    match (item.parameter, value) {
        (Parameter_Kind::New_Reserve_Factor, Parameter_Value::Mantissa(factor)) => {
            let market_id = target_market(&item)?;
            let mut market =
                get_or_create_market(app_state, block_state, &market_id).await?;
            market.reserve_factor = factor;
            block_state.save_market(market).await?;
        },
        (Parameter_Kind::New_Collateral_Factor, Parameter_Value::Mantissa(factor)) => {
            let market_id = target_market(&item)?;
            let mut market =
                get_or_create_market(app_state, block_state, &market_id).await?;
            market.collateral_factor = factor;
            block_state.save_market(market).await?;
        },
        (Parameter_Kind::New_Interest_Rate_Model, Parameter_Value::Address(model)) => {
            let market_id = target_market(&item)?;
            let mut market =
                get_or_create_market(app_state, block_state, &market_id).await?;
            market.interest_rate_model_address = model;
            block_state.save_market(market).await?;
        },
        (Parameter_Kind::New_Close_Factor, Parameter_Value::Mantissa(factor)) => {
            let mut config = block_state.get_or_create_protocol_config().await?;
            config.close_factor = factor;
            block_state.save_protocol_config(config).await?;
        },
        (
            Parameter_Kind::New_Liquidation_Incentive,
            Parameter_Value::Mantissa(incentive),
        ) => {
            let mut config = block_state.get_or_create_protocol_config().await?;
            config.liquidation_incentive = incentive;
            block_state.save_protocol_config(config).await?;
        },
        (Parameter_Kind::New_Price_Oracle, Parameter_Value::Address(oracle)) => {
            info!(
                "price oracle set to {} at block {}",
                oracle,
                block_state.block_number()
            );
            let mut config = block_state.get_or_create_protocol_config().await?;
            config.price_oracle = Some(oracle);
            block_state.save_protocol_config(config).await?;
        },
        (Parameter_Kind::New_Max_Assets, Parameter_Value::Count(count)) => {
            let mut config = block_state.get_or_create_protocol_config().await?;
            config.max_assets = Some(count);
            block_state.save_protocol_config(config).await?;
        },
        (
            Parameter_Kind::Market_Entered | Parameter_Kind::Market_Exited,
            Parameter_Value::Flag(entered),
        ) => {
            let account = item.account.as_deref().ok_or_else(|| {
                Error::ParseMessage(format!(
                    "{} without account in tx {}",
                    item.parameter, item.meta.transaction_hash
                ))
            })?;
            let market_id = target_market(&item)?;
            let market =
                get_or_create_market(app_state, block_state, &market_id).await?;
            let mut position =
                block_state.get_or_create_position(&market, account).await?;
            position.entered_market = entered;
            block_state.save_position(position).await?;
        },
        (parameter, _) => {
            return Err(Error::ParseMessage(format!(
                "value of {} has the wrong shape",
                parameter
            )));
        },
    }

    Ok(())
}
