use sqlx::{Error, Transaction};

use crate::model::{Protocol_Config, Table};

use super::{DataBase, QueryResult};

impl Table<Protocol_Config> {
    pub async fn get_one(
        &self,
        id: &str,
    ) -> Result<Option<Protocol_Config>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "Protocol_Config" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        data: &Protocol_Config,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO "Protocol_Config" (
                id,
                close_factor,
                liquidation_incentive,
                price_oracle,
                max_assets
            )
            VALUES($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                close_factor = EXCLUDED.close_factor,
                liquidation_incentive = EXCLUDED.liquidation_incentive,
                price_oracle = EXCLUDED.price_oracle,
                max_assets = EXCLUDED.max_assets
            "#,
        )
        .bind(&data.id)
        .bind(&data.close_factor)
        .bind(&data.liquidation_incentive)
        .bind(&data.price_oracle)
        .bind(data.max_assets)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }

    pub async fn delete(
        &self,
        id: &str,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM "Protocol_Config" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
