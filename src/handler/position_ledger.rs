//! Per (market, account) balances.
//!
//! Borrow balances are stored together with the market borrow index at the
//! time they were last touched; the balance owed at any later index is
//! `stored × index_now / index_then`.

use bigdecimal::{BigDecimal, Zero};
use tracing::debug;

use crate::{
    block_state::BlockState,
    error::Error,
    helpers::truncate,
    model::{Account_Position, Market},
    types::Event_Meta,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Borrow_Kind {
    Borrow,
    Repay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Borrow_Change {
    pub kind: Borrow_Kind,
    /// Absolute amount borrowed or repaid, in underlying units.
    pub amount: BigDecimal,
    /// Borrow balance of the account after the action, as reported by the
    /// market contract.
    pub account_total_borrows: Option<BigDecimal>,
}

/// Borrow balance owed at `market_index` for a balance stored at
/// `account_index`. Zero when the account never borrowed.
pub fn accrue_borrow_balance(
    stored: &BigDecimal,
    account_index: &BigDecimal,
    market_index: &BigDecimal,
    decimals: i64,
) -> BigDecimal {
    if account_index.is_zero() {
        return BigDecimal::from(0);
    }

    truncate(&(stored * market_index / account_index), decimals)
}

fn refresh_realized_supply(position: &mut Account_Position, market: &Market) {
    position.realized_lend_balance =
        truncate(&(&position.share_balance * &market.exchange_rate), market.decimals());
    position.realized_supply_interest = &position.realized_lend_balance
        - &position.total_underlying_supplied
        + &position.total_underlying_redeemed;
}

fn touch(
    position: &mut Account_Position,
    meta: &Event_Meta,
    block_number: i64,
    timestamp: i64,
) {
    position.accrual_block_number = block_number;
    position.record_transaction(&meta.transaction_hash, timestamp);
}

/// Applies a Borrow or Repay of `account` in `market`. The caller owns
/// saving `market`, whose borrower count may change.
pub async fn apply_borrow(
    block_state: &mut BlockState<'_>,
    market: &mut Market,
    account: &str,
    change: &Borrow_Change,
    meta: &Event_Meta,
) -> Result<Account_Position, Error> {
    let decimals = market.decimals();
    let mut position = block_state.get_or_create_position(market, account).await?;

    let previous = position.stored_borrow_balance.clone();
    let accrued = accrue_borrow_balance(
        &previous,
        &position.account_borrow_index,
        &market.borrow_index,
        decimals,
    );
    let computed = match change.kind {
        Borrow_Kind::Borrow => &accrued + &change.amount,
        Borrow_Kind::Repay => &accrued - &change.amount,
    };

    let stored = match &change.account_total_borrows {
        Some(reported) => {
            if reported != &computed {
                debug!(
                    "{} in {}: reported borrow balance {} differs from computed {}",
                    account, market.id, reported, computed
                );
            }
            truncate(reported, decimals)
        },
        None => truncate(&computed, decimals),
    };

    position.stored_borrow_balance = stored;
    position.account_borrow_index = market.borrow_index.clone();
    match change.kind {
        Borrow_Kind::Borrow => {
            position.total_underlying_borrowed += change.amount.abs();
        },
        Borrow_Kind::Repay => {
            position.total_underlying_repaid += change.amount.abs();
        },
    }
    position.realized_borrow_interest = &position.stored_borrow_balance
        - &position.total_underlying_borrowed
        + &position.total_underlying_repaid;

    if previous.is_zero() && !position.stored_borrow_balance.is_zero() {
        market.number_of_borrowers += 1;
    } else if !previous.is_zero() && position.stored_borrow_balance.is_zero() {
        market.number_of_borrowers -= 1;
    }

    touch(
        &mut position,
        meta,
        block_state.block_number(),
        block_state.timestamp(),
    );
    block_state.save_position(position.clone()).await?;

    if change.kind == Borrow_Kind::Borrow {
        let mut account = block_state.get_or_create_account(account).await?;
        if !account.has_borrowed {
            account.has_borrowed = true;
            block_state.save_account(account).await?;
        }
    }

    Ok(position)
}

/// Moves `shares` from `from` to `to`. A side equal to the market contract
/// is the issuance or burn leg and is not booked. Returns the underlying
/// equivalent of the moved shares. The caller owns saving `market`.
pub async fn apply_share_transfer(
    block_state: &mut BlockState<'_>,
    market: &mut Market,
    from: &str,
    to: &str,
    shares: &BigDecimal,
    meta: &Event_Meta,
) -> Result<BigDecimal, Error> {
    let underlying = truncate(&(shares * &market.exchange_rate), market.decimals());
    let block_number = block_state.block_number();
    let timestamp = block_state.timestamp();

    if from != market.id {
        let mut position = block_state.get_or_create_position(market, from).await?;
        let had_shares = !position.share_balance.is_zero();

        position.share_balance -= shares;
        position.total_underlying_redeemed += &underlying;
        if had_shares && position.share_balance.is_zero() {
            market.number_of_suppliers -= 1;
        }

        refresh_realized_supply(&mut position, market);
        touch(&mut position, meta, block_number, timestamp);
        block_state.save_position(position).await?;
    }

    if to != market.id {
        let mut position = block_state.get_or_create_position(market, to).await?;
        let had_shares = !position.share_balance.is_zero();

        position.share_balance += shares;
        position.total_underlying_supplied += &underlying;
        if !had_shares && !position.share_balance.is_zero() {
            market.number_of_suppliers += 1;
        }

        refresh_realized_supply(&mut position, market);
        touch(&mut position, meta, block_number, timestamp);
        block_state.save_position(position).await?;
    }

    Ok(underlying)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::{dao::MemoryStore, model::Block};

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn meta(tx: &str) -> Event_Meta {
        Event_Meta {
            market: String::from("0xm"),
            transaction_hash: tx.to_owned(),
            log_index: 0,
        }
    }

    fn market() -> Market {
        let mut market = Market::new("0xm");
        market.exchange_rate = dec("0.02");
        market.borrow_index = dec("1");
        market
    }

    fn state(store: &MemoryStore) -> BlockState<'_> {
        BlockState::new(
            store,
            Block {
                id: 5,
                timestamp: 25,
            },
        )
    }

    #[test]
    fn index_ratio_scales_stored_balance() {
        assert_eq!(
            accrue_borrow_balance(&dec("10"), &dec("1.0"), &dec("1.05"), 18),
            dec("10.5")
        );
        assert_eq!(
            accrue_borrow_balance(&dec("1"), &dec("3"), &dec("1"), 2),
            dec("0.33")
        );
    }

    #[test]
    fn never_borrowed_accrues_nothing() {
        assert_eq!(
            accrue_borrow_balance(&dec("10"), &dec("0"), &dec("1.05"), 18),
            dec("0")
        );
    }

    #[tokio::test]
    async fn supply_leg_skips_market_side() {
        let store = MemoryStore::new();
        let mut state = state(&store);
        let mut market = market();

        let underlying = apply_share_transfer(
            &mut state,
            &mut market,
            "0xm",
            "0xa",
            &dec("5000"),
            &meta("0x1"),
        )
        .await
        .unwrap();

        assert_eq!(underlying, dec("100"));
        assert_eq!(market.number_of_suppliers, 1);

        let position = state.get_or_create_position(&market, "0xa").await.unwrap();
        assert_eq!(position.share_balance, dec("5000"));
        assert_eq!(position.total_underlying_supplied, dec("100"));
        assert_eq!(position.realized_lend_balance, dec("100"));
        assert_eq!(position.realized_supply_interest, dec("0"));
        assert_eq!(position.transaction_hashes, vec!["0x1"]);

        let changes = state.into_changes();
        assert!(changes.positions.iter().all(|c| c.current.account_id != "0xm"));
    }

    #[tokio::test]
    async fn emptying_a_position_drops_a_supplier() {
        let store = MemoryStore::new();
        let mut state = state(&store);
        let mut market = market();

        apply_share_transfer(&mut state, &mut market, "0xm", "0xa", &dec("100"), &meta("0x1"))
            .await
            .unwrap();
        apply_share_transfer(&mut state, &mut market, "0xa", "0xb", &dec("100"), &meta("0x2"))
            .await
            .unwrap();

        assert_eq!(market.number_of_suppliers, 1);
        let a = state.get_or_create_position(&market, "0xa").await.unwrap();
        assert_eq!(a.share_balance, dec("0"));
        assert_eq!(a.total_underlying_redeemed, dec("2"));
        assert_eq!(a.total_underlying_supplied, dec("2"));
    }

    #[tokio::test]
    async fn borrow_then_full_repay_tracks_borrowers() {
        let store = MemoryStore::new();
        let mut state = state(&store);
        let mut market = market();

        let borrow = Borrow_Change {
            kind: Borrow_Kind::Borrow,
            amount: dec("10"),
            account_total_borrows: Some(dec("10")),
        };
        let position = apply_borrow(&mut state, &mut market, "0xa", &borrow, &meta("0x1"))
            .await
            .unwrap();
        assert_eq!(position.stored_borrow_balance, dec("10"));
        assert_eq!(position.account_borrow_index, dec("1"));
        assert_eq!(market.number_of_borrowers, 1);
        assert!(state.get_or_create_account("0xa").await.unwrap().has_borrowed);

        let repay = Borrow_Change {
            kind: Borrow_Kind::Repay,
            amount: dec("10"),
            account_total_borrows: Some(dec("0")),
        };
        let position = apply_borrow(&mut state, &mut market, "0xa", &repay, &meta("0x2"))
            .await
            .unwrap();
        assert_eq!(position.stored_borrow_balance, dec("0"));
        assert_eq!(position.total_underlying_repaid, dec("10"));
        assert_eq!(market.number_of_borrowers, 0);
    }

    #[tokio::test]
    async fn reported_total_wins_over_local_sum() {
        let store = MemoryStore::new();
        let mut state = state(&store);
        let mut market = market();

        let borrow = Borrow_Change {
            kind: Borrow_Kind::Borrow,
            amount: dec("10"),
            account_total_borrows: None,
        };
        apply_borrow(&mut state, &mut market, "0xa", &borrow, &meta("0x1"))
            .await
            .unwrap();

        market.borrow_index = dec("1.1");
        let borrow = Borrow_Change {
            kind: Borrow_Kind::Borrow,
            amount: dec("1"),
            account_total_borrows: Some(dec("12.5")),
        };
        let position = apply_borrow(&mut state, &mut market, "0xa", &borrow, &meta("0x2"))
            .await
            .unwrap();

        assert_eq!(position.stored_borrow_balance, dec("12.5"));
        assert_eq!(position.total_underlying_borrowed, dec("11"));
        assert_eq!(position.realized_borrow_interest, dec("1.5"));
        assert_eq!(position.account_borrow_index, dec("1.1"));
        assert_eq!(market.number_of_borrowers, 1);
    }
}
