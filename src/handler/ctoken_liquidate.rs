use tracing::info;

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    types::Liquidate_Type,
};

/// Only the liquidation counters. Balances move through the Repay and the
/// seize Transfer emitted in the same transaction.
pub async fn parse_and_insert(
    _app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Liquidate_Type,
) -> Result<(), Error> {
    let mut liquidator = block_state.get_or_create_account(&item.liquidator).await?;
    liquidator.count_liquidator += 1;
    block_state.save_account(liquidator).await?;

    let mut borrower = block_state.get_or_create_account(&item.borrower).await?;
    borrower.count_liquidated += 1;
    block_state.save_account(borrower).await?;

    info!(
        "{} liquidated {} in {} (collateral {}, tx {})",
        item.liquidator,
        item.borrower,
        item.meta.market,
        item.collateral_market,
        item.meta.transaction_hash
    );

    Ok(())
}
