use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    helpers::scale_down,
    types::Transfer_Type,
};

use super::{
    liquidity::refresh_if_borrower, market_state::update_market,
    position_ledger::apply_share_transfer,
};

/// Account to account share movement, including collateral seized in a
/// liquidation.
pub async fn parse_and_insert(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Transfer_Type,
) -> Result<(), Error> {
    let mut market = update_market(app_state, block_state, &item.meta.market).await?;
    let shares = scale_down(&item.share_amount, app_state.config.share_token_decimals);

    apply_share_transfer(
        block_state,
        &mut market,
        &item.from,
        &item.to,
        &shares,
        &item.meta,
    )
    .await?;

    let market_id = market.id.to_owned();
    block_state.save_market(market).await?;

    for account in [&item.from, &item.to] {
        if account != &market_id {
            refresh_if_borrower(app_state, block_state, account).await?;
        }
    }

    Ok(())
}
