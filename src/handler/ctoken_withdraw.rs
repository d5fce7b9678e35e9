use tracing::debug;

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    helpers::scale_down,
    types::{Transfer_Type, Withdraw_Type},
};

use super::{
    liquidity::refresh_if_borrower, market_state::update_market,
    position_ledger::apply_share_transfer,
};

pub async fn parse_and_insert(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Withdraw_Type,
    transfer: Option<Transfer_Type>,
) -> Result<(), Error> {
    let mut market = update_market(app_state, block_state, &item.meta.market).await?;
    let market_id = market.id.to_owned();

    let shares_raw = transfer
        .as_ref()
        .map(|transfer| &transfer.share_amount)
        .unwrap_or(&item.share_amount);
    let shares = scale_down(shares_raw, app_state.config.share_token_decimals);

    let underlying = apply_share_transfer(
        block_state,
        &mut market,
        &item.actor,
        &market_id,
        &shares,
        &item.meta,
    )
    .await?;

    let reported = scale_down(&item.underlying_amount, market.decimals());
    if reported != underlying {
        debug!(
            "withdraw of {} in {}: event reports {} underlying, exchange rate gives {}",
            item.actor, market_id, reported, underlying
        );
    }

    block_state.save_market(market).await?;
    refresh_if_borrower(app_state, block_state, &item.actor).await?;

    Ok(())
}
