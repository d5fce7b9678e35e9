use bigdecimal::{BigDecimal, ToPrimitive};
use tracing::{debug, info, warn};

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::{Error, ReadFailure},
    helpers::{
        exponent_to_big_decimal, from_mantissa, scale_down, truncate,
        MANTISSA_DECIMALS, ZERO_ADDRESS,
    },
    model::Market,
    provider::View_Function,
};

use super::price::{resolve_price, Price_Resolution};

/// Values read from the market contract for one refresh.
#[derive(Debug, Clone, PartialEq)]
struct Market_Reads {
    accrual_block_number: BigDecimal,
    total_supply: BigDecimal,
    exchange_rate: BigDecimal,
    total_reserves: BigDecimal,
    total_borrows: BigDecimal,
    borrow_index: BigDecimal,
    borrow_rate_per_block: BigDecimal,
    cash: BigDecimal,
}

/// raw / 10^decimals × 10^share_decimals / 10^18, truncated to `decimals`.
pub fn scale_exchange_rate(
    raw: &BigDecimal,
    decimals: i64,
    share_decimals: i64,
) -> BigDecimal {
    let scale = exponent_to_big_decimal(share_decimals)
        / exponent_to_big_decimal(decimals + MANTISSA_DECIMALS);
    truncate(&(raw * scale), decimals)
}

pub fn annualize_rate(raw: &BigDecimal, blocks_per_year: i64) -> BigDecimal {
    from_mantissa(&(raw * BigDecimal::from(blocks_per_year)))
}

async fn read_value(
    app_state: &AppState<State>,
    contract: &str,
    function: View_Function,
    block: i64,
) -> Result<BigDecimal, ReadFailure> {
    app_state
        .reader
        .read(contract, &function, block)
        .await?
        .into_decimal()
}

async fn read_market(
    app_state: &AppState<State>,
    market: &str,
    block: i64,
) -> Result<Market_Reads, ReadFailure> {
    let (
        accrual_block_number,
        total_supply,
        exchange_rate,
        total_reserves,
        total_borrows,
        borrow_index,
        borrow_rate_per_block,
        cash,
    ) = futures::try_join!(
        read_value(app_state, market, View_Function::AccrualBlockNumber, block),
        read_value(app_state, market, View_Function::TotalSupply, block),
        read_value(app_state, market, View_Function::ExchangeRateStored, block),
        read_value(app_state, market, View_Function::TotalReserves, block),
        read_value(app_state, market, View_Function::TotalBorrows, block),
        read_value(app_state, market, View_Function::BorrowIndex, block),
        read_value(app_state, market, View_Function::BorrowRatePerBlock, block),
        read_value(app_state, market, View_Function::GetCash, block),
    )?;

    Ok(Market_Reads {
        accrual_block_number,
        total_supply,
        exchange_rate,
        total_reserves,
        total_borrows,
        borrow_index,
        borrow_rate_per_block,
        cash,
    })
}

async fn read_text(
    app_state: &AppState<State>,
    contract: &str,
    function: View_Function,
    block: i64,
) -> String {
    let result = app_state.reader.read(contract, &function, block).await;
    match result.and_then(|value| value.into_text()) {
        Ok(text) => text,
        Err(failure) => {
            warn!("{}.{} unavailable: {}", contract, function, failure);
            String::new()
        },
    }
}

async fn create_market(
    app_state: &AppState<State>,
    market_id: &str,
    block: i64,
) -> Market {
    let config = &app_state.config;
    let mut market = Market::new(market_id);

    market.symbol = read_text(app_state, market_id, View_Function::Symbol, block).await;
    market.name = read_text(app_state, market_id, View_Function::Name, block).await;

    if app_state.is_native_market(market_id) {
        market.underlying_address = String::from(ZERO_ADDRESS);
        market.underlying_decimals = 18;
        market.underlying_symbol = config.native_symbol.to_owned();
        market.underlying_name = config.native_name.to_owned();
        market.underlying_price = BigDecimal::from(1);
        return market;
    }

    let underlying = app_state
        .reader
        .read(market_id, &View_Function::Underlying, block)
        .await
        .and_then(|value| value.into_address());

    match underlying {
        Ok(address) => {
            let decimals = app_state
                .reader
                .read(&address, &View_Function::Decimals, block)
                .await
                .and_then(|value| value.into_uint());
            match decimals.map(|value| value.to_i32()) {
                Ok(Some(decimals)) => market.underlying_decimals = decimals,
                Ok(None) => warn!("{} reports out of range decimals", address),
                Err(failure) => {
                    warn!("{}.decimals() unavailable: {}", address, failure)
                },
            }
            market.underlying_symbol =
                read_text(app_state, &address, View_Function::Symbol, block).await;
            market.underlying_name =
                read_text(app_state, &address, View_Function::Name, block).await;
            market.underlying_address = address;
        },
        Err(failure) => {
            warn!("{}.underlying() unavailable: {}", market_id, failure);
        },
    }

    info!(
        "new market {} ({}) over {} with {} decimals",
        market.id, market.symbol, market.underlying_address, market.underlying_decimals
    );

    market
}

/// Loads the market, creating it from its static contract properties on
/// first sight.
pub async fn get_or_create_market(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    market_id: &str,
) -> Result<Market, Error> {
    if let Some(market) = block_state.get_market(market_id).await? {
        return Ok(market);
    }

    let market =
        create_market(app_state, market_id, block_state.block_number()).await;
    block_state.save_market(market.clone()).await?;

    Ok(market)
}

/// Refreshes the cached economic fields of a market at most once per block.
pub async fn update_market(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    market_id: &str,
) -> Result<Market, Error> {
    let mut market = get_or_create_market(app_state, block_state, market_id).await?;
    let block = block_state.block_number();

    if market.accrual_block_number >= block {
        return Ok(market);
    }

    let reads = match read_market(app_state, market_id, block).await {
        Ok(reads) => reads,
        Err(failure) => {
            warn!(
                "market {} not refreshed at block {}: {}",
                market_id, block, failure
            );
            return Ok(market);
        },
    };

    let config = &app_state.config;
    let decimals = market.decimals();

    market.contract_accrual_block_number =
        reads.accrual_block_number.to_i64().unwrap_or(block);
    market.total_supply = scale_down(&reads.total_supply, config.share_token_decimals);
    market.exchange_rate = scale_exchange_rate(
        &reads.exchange_rate,
        decimals,
        config.share_token_decimals,
    );
    market.total_reserves = scale_down(&reads.total_reserves, decimals);
    market.total_borrows = scale_down(&reads.total_borrows, decimals);
    market.cash = scale_down(&reads.cash, decimals);
    market.borrow_index = from_mantissa(&reads.borrow_index);
    market.borrow_rate_per_block = from_mantissa(&reads.borrow_rate_per_block);
    market.borrow_rate =
        annualize_rate(&reads.borrow_rate_per_block, config.blocks_per_year);

    match read_value(app_state, market_id, View_Function::SupplyRatePerBlock, block)
        .await
    {
        Ok(raw) => {
            market.supply_rate_per_block = from_mantissa(&raw);
            market.supply_rate = annualize_rate(&raw, config.blocks_per_year);
        },
        Err(failure) => {
            info!(
                "supplyRatePerBlock of {} failed at block {}, keeping {}: {}",
                market_id, block, market.supply_rate_per_block, failure
            );
        },
    }

    market.accrual_block_number = block;
    market.block_timestamp = block_state.timestamp();

    match resolve_price(app_state, block_state, &market).await? {
        Price_Resolution::Resolved(price) => {
            market.underlying_price = price.price;
            market.underlying_price_usd = price.price_usd;
        },
        Price_Resolution::Unresolved(reason) => {
            debug!("price of {} kept at block {}: {}", market_id, block, reason);
        },
    }

    block_state.save_market(market.clone()).await?;

    Ok(market)
}
