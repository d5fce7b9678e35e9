use bigdecimal::{BigDecimal, Zero};

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::{Error, ReadFailure},
    helpers::{exponent_to_big_decimal, truncate, MANTISSA_DECIMALS},
    model::Market,
    provider::View_Function,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Underlying_Price {
    /// Price in the protocol's reference currency.
    pub price: BigDecimal,
    pub price_usd: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Price_Resolution {
    Resolved(Underlying_Price),
    Unresolved(String),
}

/// The two oracle generations. Which one answers depends only on the block.
#[derive(Debug, Clone, PartialEq)]
enum Oracle {
    Legacy(String),
    Current(String),
}

impl Oracle {
    async fn price_of(
        &self,
        app_state: &AppState<State>,
        market: &str,
        underlying: &str,
        decimals: i64,
        block: i64,
    ) -> Result<BigDecimal, ReadFailure> {
        let (contract, function, scale) = match self {
            Oracle::Legacy(contract) => (
                contract,
                View_Function::GetPrice(underlying.to_owned()),
                MANTISSA_DECIMALS,
            ),
            Oracle::Current(contract) => (
                contract,
                View_Function::GetUnderlyingPrice(market.to_owned()),
                2 * MANTISSA_DECIMALS - decimals,
            ),
        };

        let raw = app_state
            .reader
            .read(contract, &function, block)
            .await?
            .into_decimal()?;

        Ok(raw / exponent_to_big_decimal(scale))
    }
}

async fn select_oracle(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
) -> Result<Option<Oracle>, Error> {
    let config = &app_state.config;

    if block_state.block_number() < config.oracle_switch_block {
        return Ok(Some(Oracle::Legacy(config.legacy_price_oracle.to_owned())));
    }

    let protocol = block_state.get_or_create_protocol_config().await?;
    Ok(protocol.price_oracle.map(Oracle::Current))
}

/// Resolves the underlying price of `market` at the current block. Oracle
/// failures and a zero reference price come back as `Unresolved`.
pub async fn resolve_price(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    market: &Market,
) -> Result<Price_Resolution, Error> {
    let Some(oracle) = select_oracle(app_state, block_state).await? else {
        return Ok(Price_Resolution::Unresolved(String::from(
            "no price oracle configured",
        )));
    };

    let config = &app_state.config;
    let block = block_state.block_number();
    let decimals = market.decimals();

    if app_state.is_reference_market(&market.id) {
        let price = oracle
            .price_of(
                app_state,
                &market.id,
                &market.underlying_address,
                decimals,
                block,
            )
            .await;
        return Ok(match price {
            Ok(price) => Price_Resolution::Resolved(Underlying_Price {
                price: truncate(&price, decimals),
                price_usd: BigDecimal::from(1),
            }),
            Err(failure) => Price_Resolution::Unresolved(failure.to_string()),
        });
    }

    let reference_price = oracle
        .price_of(
            app_state,
            &config.reference_market,
            &config.reference_underlying,
            config.reference_underlying_decimals,
            block,
        )
        .await;
    let reference_price = match reference_price {
        Ok(price) if price.is_zero() => {
            return Ok(Price_Resolution::Unresolved(String::from(
                "reference price is zero",
            )))
        },
        Ok(price) => price,
        Err(failure) => {
            return Ok(Price_Resolution::Unresolved(failure.to_string()))
        },
    };

    let price = if app_state.is_native_market(&market.id) {
        BigDecimal::from(1)
    } else {
        let price = oracle
            .price_of(
                app_state,
                &market.id,
                &market.underlying_address,
                decimals,
                block,
            )
            .await;
        match price {
            Ok(price) => truncate(&price, decimals),
            Err(failure) => {
                return Ok(Price_Resolution::Unresolved(failure.to_string()))
            },
        }
    };

    let price_usd = truncate(&(&price / &reference_price), decimals);

    Ok(Price_Resolution::Resolved(Underlying_Price { price, price_usd }))
}
