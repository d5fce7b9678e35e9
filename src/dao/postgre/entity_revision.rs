use sqlx::{Error, QueryBuilder, Transaction};

use crate::model::{Entity_Revision, Table};

use super::{DataBase, QueryResult};

impl Table<Entity_Revision> {
    pub async fn insert_many(
        &self,
        data: &[Entity_Revision],
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(
            r#"
            INSERT INTO "Entity_Revision" (
                block_number,
                entity,
                entity_id,
                previous
            )"#,
        );

        query_builder.push_values(data, |mut b, data| {
            b.push_bind(data.block_number)
                .push_bind(&data.entity)
                .push_bind(&data.entity_id)
                .push_bind(&data.previous);
        });

        let query = query_builder.build().persistent(true);
        query.execute(&mut **transaction).await?;
        Ok(())
    }

    /// Revisions above `block`, newest first.
    pub async fn get_after(
        &self,
        block: i64,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<Vec<Entity_Revision>, Error> {
        sqlx::query_as(
            r#"
            SELECT block_number, entity, entity_id, previous
            FROM "Entity_Revision"
            WHERE block_number > $1
            ORDER BY revision_idx DESC
            "#,
        )
        .bind(block)
        .persistent(true)
        .fetch_all(&mut **transaction)
        .await
    }

    pub async fn delete_after(
        &self,
        block: i64,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM "Entity_Revision" WHERE block_number > $1
            "#,
        )
        .bind(block)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
