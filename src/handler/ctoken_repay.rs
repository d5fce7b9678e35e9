use tracing::debug;

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    helpers::scale_down,
    types::Repay_Type,
};

use super::{
    liquidity::refresh_if_borrower,
    market_state::update_market,
    position_ledger::{apply_borrow, Borrow_Change, Borrow_Kind},
};

/// Repayment is booked against the borrower; the payer may be a third
/// party, e.g. a liquidator.
pub async fn parse_and_insert(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Repay_Type,
) -> Result<(), Error> {
    let mut market = update_market(app_state, block_state, &item.meta.market).await?;
    let decimals = market.decimals();

    if item.payer != item.borrower {
        debug!("{} repays on behalf of {}", item.payer, item.borrower);
    }

    let change = Borrow_Change {
        kind: Borrow_Kind::Repay,
        amount: scale_down(&item.repay_delta, decimals),
        account_total_borrows: item
            .account_total_borrows
            .as_ref()
            .map(|total| scale_down(total, decimals)),
    };

    apply_borrow(block_state, &mut market, &item.borrower, &change, &item.meta)
        .await?;

    if let Some(total) = &item.market_total_borrows {
        market.total_borrows = scale_down(total, decimals);
    }

    block_state.save_market(market).await?;
    refresh_if_borrower(app_state, block_state, &item.borrower).await?;

    Ok(())
}
