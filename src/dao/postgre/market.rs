use sqlx::{Error, Transaction};

use crate::model::{Market, Table};

use super::{DataBase, QueryResult};

impl Table<Market> {
    pub async fn get_one(&self, id: &str) -> Result<Option<Market>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "Market" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        data: &Market,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO "Market" (
                id,
                symbol,
                name,
                underlying_address,
                underlying_decimals,
                underlying_symbol,
                underlying_name,
                total_supply,
                total_borrows,
                total_reserves,
                cash,
                exchange_rate,
                borrow_index,
                borrow_rate_per_block,
                supply_rate_per_block,
                borrow_rate,
                supply_rate,
                underlying_price,
                underlying_price_usd,
                reserve_factor,
                collateral_factor,
                interest_rate_model_address,
                accrual_block_number,
                contract_accrual_block_number,
                block_timestamp,
                number_of_suppliers,
                number_of_borrowers
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                   $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            ON CONFLICT (id) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                underlying_address = EXCLUDED.underlying_address,
                underlying_decimals = EXCLUDED.underlying_decimals,
                underlying_symbol = EXCLUDED.underlying_symbol,
                underlying_name = EXCLUDED.underlying_name,
                total_supply = EXCLUDED.total_supply,
                total_borrows = EXCLUDED.total_borrows,
                total_reserves = EXCLUDED.total_reserves,
                cash = EXCLUDED.cash,
                exchange_rate = EXCLUDED.exchange_rate,
                borrow_index = EXCLUDED.borrow_index,
                borrow_rate_per_block = EXCLUDED.borrow_rate_per_block,
                supply_rate_per_block = EXCLUDED.supply_rate_per_block,
                borrow_rate = EXCLUDED.borrow_rate,
                supply_rate = EXCLUDED.supply_rate,
                underlying_price = EXCLUDED.underlying_price,
                underlying_price_usd = EXCLUDED.underlying_price_usd,
                reserve_factor = EXCLUDED.reserve_factor,
                collateral_factor = EXCLUDED.collateral_factor,
                interest_rate_model_address = EXCLUDED.interest_rate_model_address,
                accrual_block_number = EXCLUDED.accrual_block_number,
                contract_accrual_block_number = EXCLUDED.contract_accrual_block_number,
                block_timestamp = EXCLUDED.block_timestamp,
                number_of_suppliers = EXCLUDED.number_of_suppliers,
                number_of_borrowers = EXCLUDED.number_of_borrowers
            "#,
        )
        .bind(&data.id)
        .bind(&data.symbol)
        .bind(&data.name)
        .bind(&data.underlying_address)
        .bind(data.underlying_decimals)
        .bind(&data.underlying_symbol)
        .bind(&data.underlying_name)
        .bind(&data.total_supply)
        .bind(&data.total_borrows)
        .bind(&data.total_reserves)
        .bind(&data.cash)
        .bind(&data.exchange_rate)
        .bind(&data.borrow_index)
        .bind(&data.borrow_rate_per_block)
        .bind(&data.supply_rate_per_block)
        .bind(&data.borrow_rate)
        .bind(&data.supply_rate)
        .bind(&data.underlying_price)
        .bind(&data.underlying_price_usd)
        .bind(&data.reserve_factor)
        .bind(&data.collateral_factor)
        .bind(&data.interest_rate_model_address)
        .bind(data.accrual_block_number)
        .bind(data.contract_accrual_block_number)
        .bind(data.block_timestamp)
        .bind(data.number_of_suppliers)
        .bind(data.number_of_borrowers)
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
            DELETE FROM "Market" WHERE id = $1
            "#,
        )
        .bind(id)
        .persistent(true)
        .execute(&mut **transaction)
        .await
    }
}
