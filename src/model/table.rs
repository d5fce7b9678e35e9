use std::marker::PhantomData;

use crate::dao::PoolType;

/// Typed handle to one table. Queries for entity `T` are implemented as
/// `impl Table<T>` blocks under `dao::postgre`.
#[derive(Debug)]
pub struct Table<T> {
    pub pool: PoolType,
    _entity: PhantomData<T>,
}

impl<T> Table<T> {
    pub fn new(pool: PoolType) -> Self {
        Table {
            pool,
            _entity: PhantomData,
        }
    }
}
