//! Per-block unit of work.
//!
//! Handlers read entities through `BlockState`, mutate owned copies and save
//! them back. Nothing reaches the store until the whole block has been
//! applied and `into_changes` hands the diff to `EntityStore::commit`.

use std::{collections::BTreeMap, future::Future};

use crate::{
    dao::{Block_Changes, Change, EntityStore},
    error::Error,
    helpers::{position_id, PROTOCOL_CONFIG_ID},
    model::{
        Account, Account_Position, Block, Entity, Market, Protocol_Config,
    },
};

#[derive(Debug)]
struct Slot<T> {
    previous: Option<T>,
    current: Option<T>,
}

#[derive(Debug)]
struct Slots<T> {
    items: BTreeMap<String, Slot<T>>,
}

impl<T: Entity> Slots<T> {
    fn new() -> Self {
        Slots {
            items: BTreeMap::new(),
        }
    }

    async fn fetch<F>(&mut self, id: &str, load: F) -> Result<Option<T>, Error>
    where
        F: Future<Output = Result<Option<T>, Error>>,
    {
        if let Some(slot) = self.items.get(id) {
            return Ok(slot.current.clone());
        }

        let stored = load.await?;
        self.items.insert(
            id.to_owned(),
            Slot {
                previous: stored.clone(),
                current: stored.clone(),
            },
        );

        Ok(stored)
    }

    async fn put<F>(&mut self, entity: T, load: F) -> Result<(), Error>
    where
        F: Future<Output = Result<Option<T>, Error>>,
    {
        let id = entity.entity_id().to_owned();
        self.fetch(&id, load).await?;
        if let Some(slot) = self.items.get_mut(&id) {
            slot.current = Some(entity);
        }

        Ok(())
    }

    fn changes(self) -> Vec<Change<T>> {
        self.items
            .into_values()
            .filter_map(|slot| match slot.current {
                Some(current) if slot.previous.as_ref() != Some(&current) => {
                    Some(Change {
                        previous: slot.previous,
                        current,
                    })
                },
                _ => None,
            })
            .collect()
    }
}

pub struct BlockState<'a> {
    store: &'a dyn EntityStore,
    block: Block,
    markets: Slots<Market>,
    accounts: Slots<Account>,
    positions: Slots<Account_Position>,
    protocol_config: Slots<Protocol_Config>,
}

impl<'a> BlockState<'a> {
    pub fn new(store: &'a dyn EntityStore, block: Block) -> BlockState<'a> {
        BlockState {
            store,
            block,
            markets: Slots::new(),
            accounts: Slots::new(),
            positions: Slots::new(),
            protocol_config: Slots::new(),
        }
    }

    pub fn block_number(&self) -> i64 {
        self.block.id
    }

    pub fn timestamp(&self) -> i64 {
        self.block.timestamp
    }

    pub async fn get_market(&mut self, id: &str) -> Result<Option<Market>, Error> {
        let store = self.store;
        self.markets.fetch(id, store.get_market(id)).await
    }

    pub async fn save_market(&mut self, market: Market) -> Result<(), Error> {
        let store = self.store;
        let id = market.id.to_owned();
        self.markets.put(market, store.get_market(&id)).await
    }

    pub async fn get_or_create_account(
        &mut self,
        id: &str,
    ) -> Result<Account, Error> {
        let store = self.store;
        let account = self.accounts.fetch(id, store.get_account(id)).await?;
        Ok(account.unwrap_or_else(|| Account::new(id)))
    }

    pub async fn save_account(&mut self, account: Account) -> Result<(), Error> {
        let store = self.store;
        let id = account.id.to_owned();
        self.accounts.put(account, store.get_account(&id)).await
    }

    pub async fn get_or_create_position(
        &mut self,
        market: &Market,
        account: &str,
    ) -> Result<Account_Position, Error> {
        let store = self.store;
        let id = position_id(&market.id, account);
        let position = self.positions.fetch(&id, store.get_position(&id)).await?;
        Ok(position.unwrap_or_else(|| Account_Position::new(market, account)))
    }

    pub async fn save_position(
        &mut self,
        position: Account_Position,
    ) -> Result<(), Error> {
        let store = self.store;
        let id = position.id.to_owned();
        self.positions.put(position, store.get_position(&id)).await
    }

    /// Every position of `account`, with changes made earlier in this block
    /// taking precedence over the stored rows.
    pub async fn get_account_positions(
        &mut self,
        account: &str,
    ) -> Result<Vec<Account_Position>, Error> {
        let mut positions: BTreeMap<String, Account_Position> = self
            .store
            .get_account_positions(account)
            .await?
            .into_iter()
            .map(|position| (position.id.to_owned(), position))
            .collect();

        for (id, slot) in &self.positions.items {
            match &slot.current {
                Some(position) if position.account_id == account => {
                    positions.insert(id.to_owned(), position.clone());
                },
                _ => {},
            }
        }

        Ok(positions.into_values().collect())
    }

    pub async fn get_or_create_protocol_config(
        &mut self,
    ) -> Result<Protocol_Config, Error> {
        let store = self.store;
        let config = self
            .protocol_config
            .fetch(PROTOCOL_CONFIG_ID, store.get_protocol_config())
            .await?;
        Ok(config.unwrap_or_default())
    }

    pub async fn save_protocol_config(
        &mut self,
        config: Protocol_Config,
    ) -> Result<(), Error> {
        let store = self.store;
        self.protocol_config
            .put(config, store.get_protocol_config())
            .await
    }

    pub fn into_changes(self) -> Block_Changes {
        Block_Changes {
            block: self.block,
            markets: self.markets.changes(),
            accounts: self.accounts.changes(),
            positions: self.positions.changes(),
            protocol_config: self.protocol_config.changes().pop(),
        }
    }
}
