use async_trait::async_trait;

use crate::{
    error::Error,
    model::{
        Account, Account_Position, Block, Entity, Entity_Revision, Market,
        Protocol_Config,
    },
};

mod memory;
mod postgre;

pub use memory::{MemoryStore, Snapshot};
pub use postgre::{DataBase, PoolOption, PoolType, QueryResult};

/// Durable home of the derived entities. The engine reads through it lazily
/// and hands it one `Block_Changes` per block.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_market(&self, id: &str) -> Result<Option<Market>, Error>;

    async fn get_account(&self, id: &str) -> Result<Option<Account>, Error>;

    async fn get_position(
        &self,
        id: &str,
    ) -> Result<Option<Account_Position>, Error>;

    async fn get_account_positions(
        &self,
        account: &str,
    ) -> Result<Vec<Account_Position>, Error>;

    async fn get_protocol_config(
        &self,
    ) -> Result<Option<Protocol_Config>, Error>;

    async fn get_last_block(&self) -> Result<Option<i64>, Error>;

    /// Persists every change of one block, its revision images and the
    /// block marker atomically.
    async fn commit(&self, changes: Block_Changes) -> Result<(), Error>;

    /// Rolls back every block above `block`. Returns the number of entity
    /// images restored.
    async fn revert_to(&self, block: i64) -> Result<usize, Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub previous: Option<T>,
    pub current: T,
}

impl<T: Entity> Change<T> {
    pub fn revision(&self, block_number: i64) -> Result<Entity_Revision, Error> {
        let previous = match &self.previous {
            Some(previous) => Some(serde_json::to_string(previous)?),
            None => None,
        };

        Ok(Entity_Revision {
            block_number,
            entity: String::from(T::NAME),
            entity_id: self.current.entity_id().to_owned(),
            previous,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block_Changes {
    pub block: Block,
    pub markets: Vec<Change<Market>>,
    pub accounts: Vec<Change<Account>>,
    pub positions: Vec<Change<Account_Position>>,
    pub protocol_config: Option<Change<Protocol_Config>>,
}

impl Block_Changes {
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.accounts.is_empty()
            && self.positions.is_empty()
            && self.protocol_config.is_none()
    }

    pub fn revisions(&self) -> Result<Vec<Entity_Revision>, Error> {
        let id = self.block.id;
        let mut revisions = vec![];

        for change in &self.markets {
            revisions.push(change.revision(id)?);
        }
        for change in &self.accounts {
            revisions.push(change.revision(id)?);
        }
        for change in &self.positions {
            revisions.push(change.revision(id)?);
        }
        if let Some(change) = &self.protocol_config {
            revisions.push(change.revision(id)?);
        }

        Ok(revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_keeps_previous_image() {
        let mut market = Market::new("0xm");
        let change = Change {
            previous: Some(market.clone()),
            current: {
                market.accrual_block_number = 7;
                market
            },
        };
        let revision = change.revision(7).unwrap();
        assert_eq!(revision.entity, "Market");
        assert_eq!(revision.entity_id, "0xm");

        let previous: Market =
            serde_json::from_str(revision.previous.as_deref().unwrap()).unwrap();
        assert_eq!(previous.accrual_block_number, 0);
    }

    #[test]
    fn created_entity_has_no_previous_image() {
        let change = Change {
            previous: None,
            current: Account::new("0xa"),
        };
        assert_eq!(change.revision(3).unwrap().previous, None);
    }
}
