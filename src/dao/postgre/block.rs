use sqlx::{Error, Transaction};

use crate::model::{Block, Table};

use super::{DataBase, QueryResult};

impl Table<Block> {
    pub async fn insert(
        &self,
        block: &Block,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO block (id, timestamp)
            VALUES($1, $2)
            "#,
        )
        .bind(block.id)
        .bind(block.timestamp)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }

    pub async fn get_last_block(&self) -> Result<Option<(i64,)>, Error> {
        sqlx::query_as(
            r#"
            SELECT id FROM block ORDER BY id DESC LIMIT 1
            "#,
        )
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_after(
        &self,
        id: i64,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM block WHERE id > $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
