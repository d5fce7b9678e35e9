use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    types::Accrue_Interest_Type,
};

use super::market_state::update_market;

pub async fn parse_and_insert(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    item: Accrue_Interest_Type,
) -> Result<(), Error> {
    update_market(app_state, block_state, &item.meta.market).await?;
    Ok(())
}
