use sqlx::{Error, Transaction};

use crate::model::{Account_Position, Table};

use super::{DataBase, QueryResult};

impl Table<Account_Position> {
    pub async fn get_one(
        &self,
        id: &str,
    ) -> Result<Option<Account_Position>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "Account_Position" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<Account_Position>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "Account_Position" WHERE account_id = $1 ORDER BY id
            "#,
        )
        .bind(account_id)
        .persistent(true)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        data: &Account_Position,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO "Account_Position" (
                id,
                market_id,
                account_id,
                symbol,
                share_balance,
                total_underlying_supplied,
                total_underlying_redeemed,
                total_underlying_borrowed,
                total_underlying_repaid,
                stored_borrow_balance,
                account_borrow_index,
                realized_lend_balance,
                realized_supply_interest,
                realized_borrow_interest,
                transaction_hashes,
                transaction_times,
                accrual_block_number,
                entered_market
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                   $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                share_balance = EXCLUDED.share_balance,
                total_underlying_supplied = EXCLUDED.total_underlying_supplied,
                total_underlying_redeemed = EXCLUDED.total_underlying_redeemed,
                total_underlying_borrowed = EXCLUDED.total_underlying_borrowed,
                total_underlying_repaid = EXCLUDED.total_underlying_repaid,
                stored_borrow_balance = EXCLUDED.stored_borrow_balance,
                account_borrow_index = EXCLUDED.account_borrow_index,
                realized_lend_balance = EXCLUDED.realized_lend_balance,
                realized_supply_interest = EXCLUDED.realized_supply_interest,
                realized_borrow_interest = EXCLUDED.realized_borrow_interest,
                transaction_hashes = EXCLUDED.transaction_hashes,
                transaction_times = EXCLUDED.transaction_times,
                accrual_block_number = EXCLUDED.accrual_block_number,
                entered_market = EXCLUDED.entered_market
            "#,
        )
        .bind(&data.id)
        .bind(&data.market_id)
        .bind(&data.account_id)
        .bind(&data.symbol)
        .bind(&data.share_balance)
        .bind(&data.total_underlying_supplied)
        .bind(&data.total_underlying_redeemed)
        .bind(&data.total_underlying_borrowed)
        .bind(&data.total_underlying_repaid)
        .bind(&data.stored_borrow_balance)
        .bind(&data.account_borrow_index)
        .bind(&data.realized_lend_balance)
        .bind(&data.realized_supply_interest)
        .bind(&data.realized_borrow_interest)
        .bind(&data.transaction_hashes)
        .bind(&data.transaction_times)
        .bind(data.accrual_block_number)
        .bind(data.entered_market)
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
            DELETE FROM "Account_Position" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
