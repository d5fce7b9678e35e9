use sqlx::{Error, Transaction};

use crate::model::{Account, Table};

use super::{DataBase, QueryResult};

impl Table<Account> {
    pub async fn get_one(&self, id: &str) -> Result<Option<Account>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "Account" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        data: &Account,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO "Account" (
                id,
                count_liquidated,
                count_liquidator,
                has_borrowed,
                total_supply_value,
                total_borrow_value,
                account_liquidity,
                available_to_borrow
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                count_liquidated = EXCLUDED.count_liquidated,
                count_liquidator = EXCLUDED.count_liquidator,
                has_borrowed = EXCLUDED.has_borrowed,
                total_supply_value = EXCLUDED.total_supply_value,
                total_borrow_value = EXCLUDED.total_borrow_value,
                account_liquidity = EXCLUDED.account_liquidity,
                available_to_borrow = EXCLUDED.available_to_borrow
            "#,
        )
        .bind(&data.id)
        .bind(data.count_liquidated)
        .bind(data.count_liquidator)
        .bind(data.has_borrowed)
        .bind(&data.total_supply_value)
        .bind(&data.total_borrow_value)
        .bind(&data.account_liquidity)
        .bind(&data.available_to_borrow)
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
            DELETE FROM "Account" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
