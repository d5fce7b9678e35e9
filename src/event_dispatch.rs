use chrono::DateTime;
use tracing::{debug, info, warn};

use crate::{
    block_state::BlockState,
    configuration::{AppState, State},
    error::Error,
    event_parsing::{parse_event, reconcile},
    handler::{
        ctoken_accrue_interest, ctoken_borrow, ctoken_liquidate, ctoken_repay,
        ctoken_supply, ctoken_transfer, ctoken_withdraw, parameter_change,
    },
    model::Block,
    types::{Action, Raw_Event},
};

pub async fn parse_action(
    app_state: &AppState<State>,
    block_state: &mut BlockState<'_>,
    action: Action,
) -> Result<(), Error> {
    match action {
        Action::Supply(item, transfer) => {
            ctoken_supply::parse_and_insert(app_state, block_state, item, transfer)
                .await?;
        },
        Action::Withdraw(item, transfer) => {
            ctoken_withdraw::parse_and_insert(
                app_state,
                block_state,
                item,
                transfer,
            )
            .await?;
        },
        Action::Borrow(item) => {
            ctoken_borrow::parse_and_insert(app_state, block_state, item).await?;
        },
        Action::Repay(item) => {
            ctoken_repay::parse_and_insert(app_state, block_state, item).await?;
        },
        Action::Liquidate(item) => {
            ctoken_liquidate::parse_and_insert(app_state, block_state, item)
                .await?;
        },
        Action::Transfer(item) => {
            ctoken_transfer::parse_and_insert(app_state, block_state, item)
                .await?;
        },
        Action::AccrueInterest(item) => {
            ctoken_accrue_interest::parse_and_insert(app_state, block_state, item)
                .await?;
        },
        Action::ParameterChange(item) => {
            parameter_change::parse_and_insert(app_state, block_state, item)
                .await?;
        },
    };

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block_Outcome {
    Applied,
    /// The block was at or below the last committed one; everything from
    /// it onwards was rolled back before applying it.
    Reapplied { restored: usize },
}

/// Applies every event of one block and commits the result as a single
/// unit. A block that is not above the last committed block is a
/// re-delivery from a common ancestor: the store is reverted to the block
/// before it first.
pub async fn insert_block(
    app_state: &AppState<State>,
    block: Block,
    events: Vec<Raw_Event>,
) -> Result<Block_Outcome, Error> {
    let mut outcome = Block_Outcome::Applied;

    if let Some(last) = app_state.store.get_last_block().await? {
        if block.id <= last {
            let restored = app_state.store.revert_to(block.id - 1).await?;
            info!(
                "block {} re-delivered after {}, {} entity images restored",
                block.id, last, restored
            );
            outcome = Block_Outcome::Reapplied { restored };
        }
    }

    let mut parsed = vec![];
    for event in &events {
        match parse_event(event) {
            Ok(Some(item)) => parsed.push(item),
            Ok(None) => {
                debug!(
                    "ignoring {} from {} at block {}",
                    event.event_type, event.contract_address, block.id
                );
            },
            Err(e) if e.is_malformed_event() => {
                warn!(
                    "dropping malformed {} in tx {}: {}",
                    event.event_type, event.transaction_hash, e
                );
            },
            Err(e) => return Err(e),
        }
    }

    let block_id = block.id;
    let block_time = DateTime::from_timestamp(block.timestamp, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| block.timestamp.to_string());
    let mut block_state = BlockState::new(app_state.store.as_ref(), block);

    for action in reconcile(parsed) {
        if let Err(e) = parse_action(app_state, &mut block_state, action).await {
            if !e.is_malformed_event() {
                return Err(e);
            }
            warn!("action skipped at block {}: {}", block_id, e);
        }
    }

    let changes = block_state.into_changes();
    info!(
        "block {} ({}): {} markets, {} accounts, {} positions changed",
        block_id,
        block_time,
        changes.markets.len(),
        changes.accounts.len(),
        changes.positions.len()
    );
    app_state.store.commit(changes).await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, str::FromStr};

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::{
        dao::{EntityStore, MemoryStore},
        helpers::position_id,
        model::{Account_Position, Market},
        test_support::{app_state, MockReader, MARKET},
    };

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn event(
        event_type: &str,
        block: i64,
        tx: &str,
        log_index: i64,
        params: &[(&str, &str)],
    ) -> Raw_Event {
        Raw_Event {
            event_type: event_type.to_owned(),
            contract_address: String::from(MARKET),
            block_number: block,
            block_timestamp: block * 5,
            transaction_hash: tx.to_owned(),
            log_index,
            event_params: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn block(id: i64) -> Block {
        Block {
            id,
            timestamp: id * 5,
        }
    }

    fn supply(block: i64, tx: &str, actor: &str, underlying: &str, shares: &str) -> Vec<Raw_Event> {
        vec![
            event(
                "Supply",
                block,
                tx,
                0,
                &[
                    ("actor", actor),
                    ("underlyingAmount", underlying),
                    ("shareAmount", shares),
                ],
            ),
            event(
                "Transfer",
                block,
                tx,
                1,
                &[("from", MARKET), ("to", actor), ("amount", shares)],
            ),
        ]
    }

    /// 5000 shares at 0.02, borrow 10, index moves to 1.05, repay 0.5
    /// with a reported balance of 10.
    #[tokio::test]
    async fn supply_borrow_accrue_repay_walkthrough() {
        let store = MemoryStore::new();
        let reader = MockReader::with_market(18);
        let app_state = app_state(reader.clone(), &store);

        // 5000 shares with 8 decimals, 100 underlying with 18 decimals
        let events = supply(
            20,
            "0x01",
            ALICE,
            "100000000000000000000",
            "500000000000",
        );
        assert_eq!(
            insert_block(&app_state, block(20), events).await.unwrap(),
            Block_Outcome::Applied
        );

        let position = store
            .get_position(&position_id(MARKET, ALICE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.share_balance, dec("5000"));
        assert_eq!(position.total_underlying_supplied, dec("100"));
        assert_eq!(position.realized_lend_balance, dec("100"));

        let events = vec![event(
            "Borrow",
            21,
            "0x02",
            0,
            &[
                ("borrower", ALICE),
                ("borrowAmount", "10000000000000000000"),
                ("accountBorrows", "10000000000000000000"),
                ("totalBorrows", "10000000000000000000"),
            ],
        )];
        assert_eq!(
            insert_block(&app_state, block(21), events).await.unwrap(),
            Block_Outcome::Applied
        );

        let market = store.get_market(MARKET).await.unwrap().unwrap();
        assert_eq!(market.number_of_borrowers, 1);
        assert_eq!(market.total_borrows, dec("10"));

        reader.set(MARKET, "borrowIndex", 22, "1050000000000000000");
        let events = vec![event("AccrueInterest", 22, "0x03", 0, &[])];
        assert_eq!(
            insert_block(&app_state, block(22), events).await.unwrap(),
            Block_Outcome::Applied
        );
        let market = store.get_market(MARKET).await.unwrap().unwrap();
        assert_eq!(market.borrow_index, dec("1.05"));

        let events = vec![event(
            "Repay",
            23,
            "0x04",
            0,
            &[
                ("payer", ALICE),
                ("borrower", ALICE),
                ("repayAmount", "500000000000000000"),
                ("accountBorrows", "10000000000000000000"),
                ("totalBorrows", "10000000000000000000"),
            ],
        )];
        assert_eq!(
            insert_block(&app_state, block(23), events).await.unwrap(),
            Block_Outcome::Applied
        );

        let position = store
            .get_position(&position_id(MARKET, ALICE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.stored_borrow_balance, dec("10"));
        assert_eq!(position.account_borrow_index, dec("1.05"));
        assert_eq!(position.total_underlying_borrowed, dec("10"));
        assert_eq!(position.total_underlying_repaid, dec("0.5"));
        assert_eq!(position.realized_borrow_interest, dec("0.5"));
        assert_eq!(position.transaction_hashes, vec!["0x01", "0x02", "0x04"]);

        let account = store.get_account(ALICE).await.unwrap().unwrap();
        assert!(account.has_borrowed);
        assert!(account.account_liquidity.is_some());
    }

    #[tokio::test]
    async fn redelivered_block_rolls_back_later_blocks() {
        let store = MemoryStore::new();
        let app_state = app_state(MockReader::with_market(18), &store);

        let first = supply(20, "0x01", ALICE, "100000000000000000000", "500000000000");
        insert_block(&app_state, block(20), first.clone()).await.unwrap();
        let after_first = store.snapshot().await;

        let orphaned = supply(21, "0x02", ALICE, "100000000000000000000", "500000000000");
        insert_block(&app_state, block(21), orphaned).await.unwrap();

        // plain replay of an applied block is a no-op
        let outcome = insert_block(&app_state, block(20), first).await.unwrap();
        assert!(matches!(outcome, Block_Outcome::Reapplied { restored } if restored > 0));
        assert_eq!(store.snapshot().await, after_first);

        let canonical = supply(21, "0x03", BOB, "20000000000000000000", "100000000000");
        insert_block(&app_state, block(21), canonical).await.unwrap();

        let alice = store
            .get_position(&position_id(MARKET, ALICE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.transaction_hashes, vec!["0x01"]);
        assert_eq!(alice.share_balance, dec("5000"));
        let bob = store
            .get_position(&position_id(MARKET, BOB))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.share_balance, dec("1000"));
        assert_eq!(store.get_last_block().await.unwrap(), Some(21));
    }

    #[tokio::test]
    async fn revert_and_replay_is_idempotent() {
        let store = MemoryStore::new();
        let app_state = app_state(MockReader::with_market(18), &store);

        let first = supply(20, "0x01", ALICE, "100000000000000000000", "500000000000");
        insert_block(&app_state, block(20), first).await.unwrap();
        let after_first = store.snapshot().await;

        let second = vec![event(
            "Transfer",
            21,
            "0x02",
            0,
            &[("from", ALICE), ("to", BOB), ("amount", "100000000000")],
        )];
        insert_block(&app_state, block(21), second.clone()).await.unwrap();
        let after_second = store.snapshot().await;

        store.revert_to(20).await.unwrap();
        assert_eq!(store.snapshot().await, after_first);

        insert_block(&app_state, block(21), second).await.unwrap();
        assert_eq!(store.snapshot().await, after_second);
    }

    #[tokio::test]
    async fn share_balances_add_up_to_total_supply() {
        let store = MemoryStore::new();
        let reader = MockReader::with_market(18);
        let app_state = app_state(reader.clone(), &store);

        let mut events = supply(20, "0x01", ALICE, "100000000000000000000", "500000000000");
        events.extend(supply(20, "0x02", BOB, "20000000000000000000", "100000000000"));
        for (index, item) in events.iter_mut().enumerate() {
            item.log_index = index as i64;
        }
        events.push(event(
            "Transfer",
            20,
            "0x03",
            10,
            &[("from", ALICE), ("to", BOB), ("amount", "50000000000")],
        ));
        events.push(event(
            "Withdraw",
            20,
            "0x04",
            11,
            &[
                ("actor", BOB),
                ("underlyingAmount", "1000000000000000000"),
                ("shareAmount", "5000000000"),
            ],
        ));
        events.push(event(
            "Transfer",
            20,
            "0x04",
            12,
            &[("from", BOB), ("to", MARKET), ("amount", "5000000000")],
        ));
        // 5000 + 1000 - 50 shares
        reader.set(MARKET, "totalSupply", 20, "595000000000");

        insert_block(&app_state, block(20), events).await.unwrap();

        let snapshot = store.snapshot().await;
        let held: BigDecimal = snapshot
            .positions
            .values()
            .map(|position| position.share_balance.clone())
            .sum();
        let market = &snapshot.markets[MARKET];
        assert_eq!(held, market.total_supply);
        assert_eq!(market.number_of_suppliers, 2);
    }

    #[tokio::test]
    async fn transfer_order_within_block_does_not_change_balances() {
        async fn balances(transfer_first: bool) -> (BigDecimal, BigDecimal) {
            let store = MemoryStore::new();
            let app_state = app_state(MockReader::with_market(18), &store);

            let mut events =
                supply(20, "0x01", BOB, "20000000000000000000", "100000000000");
            let mut alice =
                supply(20, "0x02", ALICE, "100000000000000000000", "500000000000");
            let transfer = event(
                "Transfer",
                20,
                "0x03",
                0,
                &[("from", BOB), ("to", ALICE), ("amount", "40000000000")],
            );
            if transfer_first {
                events.push(transfer);
                events.append(&mut alice);
            } else {
                events.append(&mut alice);
                events.push(transfer);
            }
            insert_block(&app_state, block(20), events).await.unwrap();

            let alice = store
                .get_position(&position_id(MARKET, ALICE))
                .await
                .unwrap()
                .unwrap();
            let bob = store
                .get_position(&position_id(MARKET, BOB))
                .await
                .unwrap()
                .unwrap();
            (alice.share_balance, bob.share_balance)
        }

        let early = balances(true).await;
        assert_eq!(early, (dec("5400"), dec("600")));
        assert_eq!(balances(false).await, early);
    }

    #[tokio::test]
    async fn paired_transfer_order_does_not_change_the_position() {
        async fn position(transfer_first: bool) -> (Account_Position, Market) {
            let store = MemoryStore::new();
            let app_state = app_state(MockReader::with_market(18), &store);

            let mut events =
                supply(20, "0x01", ALICE, "100000000000000000000", "500000000000");
            if transfer_first {
                events.reverse();
                events[0].log_index = 0;
                events[1].log_index = 1;
            }
            insert_block(&app_state, block(20), events).await.unwrap();

            let position = store
                .get_position(&position_id(MARKET, ALICE))
                .await
                .unwrap()
                .unwrap();
            let market = store.get_market(MARKET).await.unwrap().unwrap();
            (position, market)
        }

        let (supply_first, market) = position(false).await;
        assert_eq!(supply_first.share_balance, dec("5000"));
        assert_eq!(supply_first.total_underlying_supplied, dec("100"));
        assert_eq!(market.number_of_suppliers, 1);

        assert_eq!(position(true).await, (supply_first, market));
    }

    #[tokio::test]
    async fn malformed_and_unknown_events_do_not_abort_the_block() {
        let store = MemoryStore::new();
        let app_state = app_state(MockReader::with_market(18), &store);

        let mut events = supply(20, "0x01", ALICE, "100000000000000000000", "500000000000");
        events.push(event("Borrow", 20, "0x02", 5, &[("borrower", ALICE)]));
        events.push(event("Approval", 20, "0x03", 6, &[]));

        assert_eq!(
            insert_block(&app_state, block(20), events).await.unwrap(),
            Block_Outcome::Applied
        );
        assert_eq!(store.get_last_block().await.unwrap(), Some(20));

        let position = store
            .get_position(&position_id(MARKET, ALICE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.share_balance, dec("5000"));
        assert_eq!(position.stored_borrow_balance, dec("0"));
    }

    #[tokio::test]
    async fn liquidation_counters_accumulate() {
        let store = MemoryStore::new();
        let app_state = app_state(MockReader::with_market(18), &store);

        for (id, tx) in [(20, "0x01"), (21, "0x02")] {
            let events = vec![event(
                "Liquidate",
                id,
                tx,
                0,
                &[
                    ("liquidator", BOB),
                    ("borrower", ALICE),
                    ("repayAmount", "1"),
                    ("cTokenCollateral", MARKET),
                    ("seizeTokens", "1"),
                ],
            )];
            insert_block(&app_state, block(id), events).await.unwrap();
        }

        let alice = store.get_account(ALICE).await.unwrap().unwrap();
        let bob = store.get_account(BOB).await.unwrap().unwrap();
        assert_eq!(alice.count_liquidated, 2);
        assert_eq!(bob.count_liquidator, 2);
        assert_eq!(bob.count_liquidated, 0);
    }

    #[tokio::test]
    async fn cumulative_counters_never_decrease() {
        let store = MemoryStore::new();
        let reader = MockReader::with_market(18);
        let app_state = app_state(reader.clone(), &store);
        reader.set(MARKET, "borrowIndex", 24, "1050000000000000000");

        let history = vec![
            supply(20, "0x01", ALICE, "100000000000000000000", "500000000000"),
            vec![event(
                "Transfer",
                21,
                "0x02",
                0,
                &[("from", ALICE), ("to", BOB), ("amount", "100000000000")],
            )],
            vec![
                event(
                    "Withdraw",
                    22,
                    "0x03",
                    0,
                    &[
                        ("actor", ALICE),
                        ("underlyingAmount", "10000000000000000000"),
                        ("shareAmount", "50000000000"),
                    ],
                ),
                event(
                    "Transfer",
                    22,
                    "0x03",
                    1,
                    &[("from", ALICE), ("to", MARKET), ("amount", "50000000000")],
                ),
            ],
            vec![event(
                "Borrow",
                23,
                "0x04",
                0,
                &[
                    ("borrower", ALICE),
                    ("borrowAmount", "10000000000000000000"),
                    ("accountBorrows", "10000000000000000000"),
                    ("totalBorrows", "10000000000000000000"),
                ],
            )],
            vec![event("AccrueInterest", 24, "0x05", 0, &[])],
            vec![event(
                "Repay",
                25,
                "0x06",
                0,
                &[
                    ("payer", ALICE),
                    ("borrower", ALICE),
                    ("repayAmount", "500000000000000000"),
                    ("accountBorrows", "10000000000000000000"),
                    ("totalBorrows", "10000000000000000000"),
                ],
            )],
        ];

        let zero = dec("0");
        let mut previous = [zero.clone(), zero.clone(), zero.clone(), zero];
        for events in history {
            let id = events[0].block_number;
            insert_block(&app_state, block(id), events).await.unwrap();

            let position = store
                .get_position(&position_id(MARKET, ALICE))
                .await
                .unwrap()
                .unwrap();
            let current = [
                position.total_underlying_supplied,
                position.total_underlying_redeemed,
                position.total_underlying_borrowed,
                position.total_underlying_repaid,
            ];
            for (before, after) in previous.iter().zip(current.iter()) {
                assert!(after >= before, "block {}: {} < {}", id, after, before);
            }
            previous = current;
        }

        // supplied 100, moved 20 to bob and 10 back to the market
        assert_eq!(previous, [dec("100"), dec("30"), dec("10"), dec("0.5")]);
    }
}
