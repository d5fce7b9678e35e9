use async_trait::async_trait;
use sqlx::Transaction;
use tracing::debug;

use crate::{
    configuration::Config,
    dao::{Block_Changes, DataBase, EntityStore, PoolOption, PoolType},
    error::Error,
    helpers::PROTOCOL_CONFIG_ID,
    model::{
        Account, Account_Position, Block, Entity, Entity_Revision, Market,
        Protocol_Config, Table,
    },
};

#[derive(Debug)]
pub struct DatabasePool {
    pub block: Table<Block>,
    pub market: Table<Market>,
    pub account: Table<Account>,
    pub account_position: Table<Account_Position>,
    pub protocol_config: Table<Protocol_Config>,
    pub entity_revision: Table<Entity_Revision>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .after_connect(|_conn, _meta| Box::pin(async move { Ok(()) }))
            .max_connections(20)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            pool: pool.clone(),
            block: Table::new(pool.clone()),
            market: Table::new(pool.clone()),
            account: Table::new(pool.clone()),
            account_position: Table::new(pool.clone()),
            protocol_config: Table::new(pool.clone()),
            entity_revision: Table::new(pool),
        })
    }

    async fn restore(
        &self,
        revision: &Entity_Revision,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<(), Error> {
        let id = revision.entity_id.as_str();
        let previous = revision.previous.as_deref();

        match (revision.entity.as_str(), previous) {
            (Market::NAME, Some(image)) => {
                let market: Market = serde_json::from_str(image)?;
                self.market.upsert(&market, transaction).await?;
            },
            (Market::NAME, None) => {
                self.market.delete(id, transaction).await?;
            },
            (Account::NAME, Some(image)) => {
                let account: Account = serde_json::from_str(image)?;
                self.account.upsert(&account, transaction).await?;
            },
            (Account::NAME, None) => {
                self.account.delete(id, transaction).await?;
            },
            (Account_Position::NAME, Some(image)) => {
                let position: Account_Position = serde_json::from_str(image)?;
                self.account_position.upsert(&position, transaction).await?;
            },
            (Account_Position::NAME, None) => {
                self.account_position.delete(id, transaction).await?;
            },
            (Protocol_Config::NAME, Some(image)) => {
                let config: Protocol_Config = serde_json::from_str(image)?;
                self.protocol_config.upsert(&config, transaction).await?;
            },
            (Protocol_Config::NAME, None) => {
                self.protocol_config.delete(id, transaction).await?;
            },
            (other, _) => {
                return Err(Error::ParseMessage(format!(
                    "unknown entity in revision log: {}",
                    other
                )));
            },
        };

        Ok(())
    }
}

#[async_trait]
impl EntityStore for DatabasePool {
    async fn get_market(&self, id: &str) -> Result<Option<Market>, Error> {
        Ok(self.market.get_one(id).await?)
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, Error> {
        Ok(self.account.get_one(id).await?)
    }

    async fn get_position(
        &self,
        id: &str,
    ) -> Result<Option<Account_Position>, Error> {
        Ok(self.account_position.get_one(id).await?)
    }

    async fn get_account_positions(
        &self,
        account: &str,
    ) -> Result<Vec<Account_Position>, Error> {
        Ok(self.account_position.get_by_account(account).await?)
    }

    async fn get_protocol_config(
        &self,
    ) -> Result<Option<Protocol_Config>, Error> {
        Ok(self.protocol_config.get_one(PROTOCOL_CONFIG_ID).await?)
    }

    async fn get_last_block(&self) -> Result<Option<i64>, Error> {
        let block = self.block.get_last_block().await?;
        Ok(block.map(|(id,)| id))
    }

    async fn commit(&self, changes: Block_Changes) -> Result<(), Error> {
        let revisions = changes.revisions()?;
        let mut tx = self.pool.begin().await?;

        for change in &changes.markets {
            self.market.upsert(&change.current, &mut tx).await?;
        }
        for change in &changes.accounts {
            self.account.upsert(&change.current, &mut tx).await?;
        }
        for change in &changes.positions {
            self.account_position.upsert(&change.current, &mut tx).await?;
        }
        if let Some(change) = &changes.protocol_config {
            self.protocol_config.upsert(&change.current, &mut tx).await?;
        }

        self.entity_revision.insert_many(&revisions, &mut tx).await?;
        self.block.insert(&changes.block, &mut tx).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn revert_to(&self, block: i64) -> Result<usize, Error> {
        let mut tx = self.pool.begin().await?;

        let revisions = self.entity_revision.get_after(block, &mut tx).await?;
        for revision in &revisions {
            self.restore(revision, &mut tx).await?;
        }

        self.entity_revision.delete_after(block, &mut tx).await?;
        self.block.delete_after(block, &mut tx).await?;

        tx.commit().await?;
        debug!(
            "reverted {} entity images above block {}",
            revisions.len(),
            block
        );

        Ok(revisions.len())
    }
}
