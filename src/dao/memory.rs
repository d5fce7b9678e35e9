use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::Error,
    model::{
        Account, Account_Position, Block, Entity, Entity_Revision, Market,
        Protocol_Config,
    },
};

use super::{Block_Changes, Change, EntityStore};

/// Full contents of a `MemoryStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub markets: BTreeMap<String, Market>,
    pub accounts: BTreeMap<String, Account>,
    pub positions: BTreeMap<String, Account_Position>,
    pub protocol_config: Option<Protocol_Config>,
    pub blocks: BTreeMap<i64, Block>,
    pub revisions: Vec<Entity_Revision>,
}

/// In-process store used for dry runs and tests. Clones share the same
/// data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.data.lock().await.clone()
    }
}

fn apply<T: Entity>(map: &mut BTreeMap<String, T>, changes: Vec<Change<T>>) {
    for change in changes {
        map.insert(change.current.entity_id().to_owned(), change.current);
    }
}

fn restore<T: Entity>(
    map: &mut BTreeMap<String, T>,
    revision: &Entity_Revision,
) -> Result<(), Error> {
    match &revision.previous {
        Some(previous) => {
            let entity: T = serde_json::from_str(previous)?;
            map.insert(revision.entity_id.to_owned(), entity);
        },
        None => {
            map.remove(&revision.entity_id);
        },
    }

    Ok(())
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_market(&self, id: &str) -> Result<Option<Market>, Error> {
        Ok(self.data.lock().await.markets.get(id).cloned())
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, Error> {
        Ok(self.data.lock().await.accounts.get(id).cloned())
    }

    async fn get_position(
        &self,
        id: &str,
    ) -> Result<Option<Account_Position>, Error> {
        Ok(self.data.lock().await.positions.get(id).cloned())
    }

    async fn get_account_positions(
        &self,
        account: &str,
    ) -> Result<Vec<Account_Position>, Error> {
        let data = self.data.lock().await;
        let positions = data
            .positions
            .values()
            .filter(|position| position.account_id == account)
            .cloned()
            .collect();

        Ok(positions)
    }

    async fn get_protocol_config(
        &self,
    ) -> Result<Option<Protocol_Config>, Error> {
        Ok(self.data.lock().await.protocol_config.clone())
    }

    async fn get_last_block(&self) -> Result<Option<i64>, Error> {
        Ok(self.data.lock().await.blocks.keys().next_back().copied())
    }

    async fn commit(&self, changes: Block_Changes) -> Result<(), Error> {
        let revisions = changes.revisions()?;
        let mut data = self.data.lock().await;

        apply(&mut data.markets, changes.markets);
        apply(&mut data.accounts, changes.accounts);
        apply(&mut data.positions, changes.positions);
        if let Some(change) = changes.protocol_config {
            data.protocol_config = Some(change.current);
        }
        data.revisions.extend(revisions);
        data.blocks.insert(changes.block.id, changes.block);

        Ok(())
    }

    async fn revert_to(&self, block: i64) -> Result<usize, Error> {
        let mut data = self.data.lock().await;
        let split = data
            .revisions
            .iter()
            .position(|revision| revision.block_number > block)
            .unwrap_or(data.revisions.len());
        let undone: Vec<Entity_Revision> = data.revisions.split_off(split);

        for revision in undone.iter().rev() {
            match revision.entity.as_str() {
                Market::NAME => restore(&mut data.markets, revision)?,
                Account::NAME => restore(&mut data.accounts, revision)?,
                Account_Position::NAME => {
                    restore(&mut data.positions, revision)?
                },
                Protocol_Config::NAME => {
                    data.protocol_config = match &revision.previous {
                        Some(previous) => Some(serde_json::from_str(previous)?),
                        None => None,
                    };
                },
                other => {
                    return Err(Error::ParseMessage(format!(
                        "unknown entity in revision log: {}",
                        other
                    )))
                },
            }
        }

        data.blocks.retain(|id, _| *id <= block);
        debug!("reverted {} entity images above block {}", undone.len(), block);

        Ok(undone.len())
    }
}
