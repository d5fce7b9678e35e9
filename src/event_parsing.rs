use std::{collections::HashMap, str::FromStr};

use bigdecimal::BigDecimal;

use crate::{
    error::Error,
    helpers::{
        extract_field, extract_field_any, normalize_address, parse_amount,
        EventsType, Parameter_Kind,
    },
    types::{
        Accrue_Interest_Type, Action, Borrow_Type, Event_Meta, Liquidate_Type,
        Parameter_Change_Type, Protocol_Event, Raw_Event, Repay_Type,
        Supply_Type, Transfer_Type, Withdraw_Type,
    },
};

fn address(map: &HashMap<String, String>, keys: &[&str]) -> Result<String, Error> {
    Ok(normalize_address(&extract_field_any(map, keys)?))
}

fn amount(map: &HashMap<String, String>, keys: &[&str]) -> Result<BigDecimal, Error> {
    parse_amount(&extract_field_any(map, keys)?)
}

fn optional_amount(
    map: &HashMap<String, String>,
    keys: &[&str],
) -> Result<Option<BigDecimal>, Error> {
    match keys.iter().find_map(|key| map.get(*key)) {
        Some(value) => Ok(Some(parse_amount(value)?)),
        None => Ok(None),
    }
}

fn optional_address(map: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key))
        .map(|value| normalize_address(value))
}

fn parse_meta(event: &Raw_Event) -> Event_Meta {
    Event_Meta {
        market: normalize_address(&event.contract_address),
        transaction_hash: event.transaction_hash.to_owned(),
        log_index: event.log_index,
    }
}

/// Turns a feed record into a typed event. `Ok(None)` for event types the
/// engine does not follow.
pub fn parse_event(event: &Raw_Event) -> Result<Option<Protocol_Event>, Error> {
    let Ok(event_type) = EventsType::from_str(&event.event_type) else {
        return Ok(None);
    };

    let params = &event.event_params;
    let meta = parse_meta(event);

    let parsed = match event_type {
        EventsType::Supply => Protocol_Event::Supply(Supply_Type {
            meta,
            actor: address(params, &["actor", "minter"])?,
            underlying_amount: amount(params, &["underlyingAmount", "mintAmount"])?,
            share_amount: amount(params, &["shareAmount", "mintTokens"])?,
        }),
        EventsType::Withdraw => Protocol_Event::Withdraw(Withdraw_Type {
            meta,
            actor: address(params, &["actor", "redeemer"])?,
            underlying_amount: amount(
                params,
                &["underlyingAmount", "redeemAmount"],
            )?,
            share_amount: amount(params, &["shareAmount", "redeemTokens"])?,
        }),
        EventsType::Borrow => Protocol_Event::Borrow(Borrow_Type {
            meta,
            borrower: address(params, &["borrower"])?,
            borrow_delta: amount(params, &["borrowDelta", "borrowAmount"])?,
            account_total_borrows: optional_amount(
                params,
                &["accountTotalBorrows", "accountBorrows"],
            )?,
            market_total_borrows: optional_amount(
                params,
                &["marketTotalBorrows", "totalBorrows"],
            )?,
        }),
        EventsType::Repay => Protocol_Event::Repay(Repay_Type {
            meta,
            payer: address(params, &["payer"])?,
            borrower: address(params, &["borrower"])?,
            repay_delta: amount(params, &["repayDelta", "repayAmount"])?,
            account_total_borrows: optional_amount(
                params,
                &["accountTotalBorrows", "accountBorrows"],
            )?,
            market_total_borrows: optional_amount(
                params,
                &["marketTotalBorrows", "totalBorrows"],
            )?,
        }),
        EventsType::Liquidate => Protocol_Event::Liquidate(Liquidate_Type {
            meta,
            liquidator: address(params, &["liquidator"])?,
            borrower: address(params, &["borrower"])?,
            collateral_market: address(
                params,
                &["collateralMarket", "cTokenCollateral"],
            )?,
            repay_amount: amount(params, &["repayAmount"])?,
            seize_share_amount: amount(
                params,
                &["seizeShareAmount", "seizeTokens"],
            )?,
        }),
        EventsType::Transfer => Protocol_Event::Transfer(Transfer_Type {
            meta,
            from: address(params, &["from"])?,
            to: address(params, &["to"])?,
            share_amount: amount(params, &["shareAmount", "amount"])?,
        }),
        EventsType::AccrueInterest => {
            Protocol_Event::AccrueInterest(Accrue_Interest_Type { meta })
        },
        EventsType::ParameterChange => {
            Protocol_Event::ParameterChange(parse_parameter_change(event, meta)?)
        },
    };

    Ok(Some(parsed))
}

fn parse_parameter_change(
    event: &Raw_Event,
    meta: Event_Meta,
) -> Result<Parameter_Change_Type, Error> {
    let params = &event.event_params;

    let (parameter, value) = match Parameter_Kind::from_event_name(&event.event_type) {
        Some(kind) => (kind, extract_field(params, kind.legacy_value_key())?),
        None => {
            let name = extract_field(params, "parameter")?;
            let kind = Parameter_Kind::from_str(&name).map_err(|_| {
                Error::ParseMessage(format!("unknown parameter {}", name))
            })?;
            (kind, extract_field(params, "value")?)
        },
    };

    let (target_market, account) = match parameter {
        Parameter_Kind::Market_Entered | Parameter_Kind::Market_Exited => (
            optional_address(params, &["market", "cToken"]),
            Some(normalize_address(&value)),
        ),
        _ => (
            optional_address(params, &["market", "cToken"]),
            optional_address(params, &["account"]),
        ),
    };

    Ok(Parameter_Change_Type {
        meta,
        parameter,
        value,
        target_market,
        account,
    })
}

/// Pairs every Supply with the share issuance Transfer (market to actor)
/// and every Withdraw with the share burn Transfer (actor to market) of the
/// same transaction and share amount. A paired Transfer is folded into its
/// action and not emitted on its own. Feed order is kept as delivered.
pub fn reconcile(events: Vec<Protocol_Event>) -> Vec<Action> {
    let mut consumed = vec![false; events.len()];
    let mut pairs: HashMap<usize, usize> = HashMap::new();

    for (index, event) in events.iter().enumerate() {
        let (meta, from, to, shares) = match event {
            Protocol_Event::Supply(item) => {
                (&item.meta, &item.meta.market, &item.actor, &item.share_amount)
            },
            Protocol_Event::Withdraw(item) => {
                (&item.meta, &item.actor, &item.meta.market, &item.share_amount)
            },
            _ => continue,
        };

        let paired = events.iter().enumerate().position(|(candidate, other)| {
            if consumed[candidate]
                || other.meta().transaction_hash != meta.transaction_hash
            {
                return false;
            }
            match other {
                Protocol_Event::Transfer(transfer) => {
                    transfer.meta.market == meta.market
                        && &transfer.from == from
                        && &transfer.to == to
                        && &transfer.share_amount == shares
                },
                _ => false,
            }
        });

        if let Some(candidate) = paired {
            consumed[candidate] = true;
            pairs.insert(index, candidate);
        }
    }

    let mut slots: Vec<Option<Protocol_Event>> =
        events.into_iter().map(Some).collect();
    let mut actions = vec![];

    for index in 0..slots.len() {
        if consumed[index] {
            continue;
        }

        let paired = pairs.get(&index).and_then(|candidate| {
            match slots[*candidate].take() {
                Some(Protocol_Event::Transfer(transfer)) => Some(transfer),
                _ => None,
            }
        });

        let Some(event) = slots[index].take() else {
            continue;
        };

        let action = match event {
            Protocol_Event::Supply(item) => Action::Supply(item, paired),
            Protocol_Event::Withdraw(item) => Action::Withdraw(item, paired),
            Protocol_Event::Borrow(item) => Action::Borrow(item),
            Protocol_Event::Repay(item) => Action::Repay(item),
            Protocol_Event::Liquidate(item) => Action::Liquidate(item),
            Protocol_Event::Transfer(item) => Action::Transfer(item),
            Protocol_Event::AccrueInterest(item) => Action::AccrueInterest(item),
            Protocol_Event::ParameterChange(item) => Action::ParameterChange(item),
        };
        actions.push(action);
    }

    actions
}
