use bigdecimal::{BigDecimal, Zero};

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    helpers::{truncate, MANTISSA_DECIMALS},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Liquidity {
    pub supply_value: BigDecimal,
    pub borrow_value: BigDecimal,
    pub account_liquidity: Option<BigDecimal>,
    pub available_to_borrow: Option<BigDecimal>,
}

/// Ratio and headroom are only defined while something is borrowed.
/// Headroom is allowed to go negative for under-collateralized accounts.
pub fn compute_liquidity(
    supply_value: BigDecimal,
    borrow_value: BigDecimal,
    collateral_multiplier: &BigDecimal,
) -> Liquidity {
    if borrow_value.is_zero() || collateral_multiplier.is_zero() {
        return Liquidity {
            supply_value,
            borrow_value,
            account_liquidity: None,
            available_to_borrow: None,
        };
    }

    let ratio = truncate(&(&supply_value / &borrow_value), MANTISSA_DECIMALS);
    let available = truncate(
        &(&supply_value / collateral_multiplier - &borrow_value),
        MANTISSA_DECIMALS,
    );

    Liquidity {
        supply_value,
        borrow_value,
        account_liquidity: Some(ratio),
        available_to_borrow: Some(available),
    }
}

/// Recomputes the cross-market exposure of `account_id`.
pub async fn update_account_liquidity(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    account_id: &str,
) -> Result<(), Error> {
    let mut supply_value = BigDecimal::from(0);
    let mut borrow_value = BigDecimal::from(0);

    for position in block_state.get_account_positions(account_id).await? {
        let Some(market) = block_state.get_market(&position.market_id).await? else {
            continue;
        };
        supply_value += &position.realized_lend_balance * &market.underlying_price;
        borrow_value += &position.stored_borrow_balance * &market.underlying_price;
    }

    let liquidity = compute_liquidity(
        truncate(&supply_value, MANTISSA_DECIMALS),
        truncate(&borrow_value, MANTISSA_DECIMALS),
        &app_state.config.collateral_multiplier,
    );

    let mut account = block_state.get_or_create_account(account_id).await?;
    account.total_supply_value = liquidity.supply_value;
    account.total_borrow_value = liquidity.borrow_value;
    account.account_liquidity = liquidity.account_liquidity;
    account.available_to_borrow = liquidity.available_to_borrow;
    block_state.save_account(account).await?;

    Ok(())
}

/// Same as `update_account_liquidity`, restricted to accounts that have
/// borrowed at least once.
pub async fn refresh_if_borrower(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    account_id: &str,
) -> Result<(), Error> {
    let account = block_state.get_or_create_account(account_id).await?;
    if account.has_borrowed {
        update_account_liquidity(app_state, block_state, account_id).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::{
        dao::MemoryStore,
        model::{Block, Market},
        test_support::{app_state, MockReader},
    };

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn no_borrow_means_no_liquidity_ratio() {
        let liquidity = compute_liquidity(dec("100"), dec("0"), &dec("1.5"));
        assert_eq!(liquidity.account_liquidity, None);
        assert_eq!(liquidity.available_to_borrow, None);
    }

    #[test]
    fn ratio_and_headroom_with_borrow() {
        let liquidity = compute_liquidity(dec("150"), dec("50"), &dec("1.5"));
        assert_eq!(liquidity.account_liquidity, Some(dec("3")));
        assert_eq!(liquidity.available_to_borrow, Some(dec("50")));
    }

    #[test]
    fn headroom_goes_negative_when_under_collateralized() {
        let liquidity = compute_liquidity(dec("30"), dec("40"), &dec("1.5"));
        assert_eq!(liquidity.account_liquidity, Some(dec("0.75")));
        assert_eq!(liquidity.available_to_borrow, Some(dec("-20")));
    }

    #[tokio::test]
    async fn exposure_is_summed_over_markets() {
        let store = MemoryStore::new();
        let app_state = app_state(MockReader::new(), &store);
        let mut state = BlockState::new(
            app_state.store.as_ref(),
            Block {
                id: 1,
                timestamp: 5,
            },
        );

        let mut supplied = Market::new("0xm1");
        supplied.underlying_price = dec("2");
        let mut borrowed = Market::new("0xm2");
        borrowed.underlying_price = dec("0.5");
        state.save_market(supplied.clone()).await.unwrap();
        state.save_market(borrowed.clone()).await.unwrap();

        let mut position = state.get_or_create_position(&supplied, "0xa").await.unwrap();
        position.realized_lend_balance = dec("100");
        state.save_position(position).await.unwrap();
        let mut position = state.get_or_create_position(&borrowed, "0xa").await.unwrap();
        position.stored_borrow_balance = dec("40");
        state.save_position(position).await.unwrap();

        update_account_liquidity(&app_state, &mut state, "0xa").await.unwrap();

        let account = state.get_or_create_account("0xa").await.unwrap();
        assert_eq!(account.total_supply_value, dec("200"));
        assert_eq!(account.total_borrow_value, dec("20"));
        assert_eq!(account.account_liquidity, Some(dec("10")));
        assert_eq!(
            account.available_to_borrow,
            Some(truncate(&(dec("200") / dec("1.5") - dec("20")), 18))
        );
    }
}
