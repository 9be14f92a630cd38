use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    TransactionTrait,
};

use crate::ResultEngine;

mod advances;
mod batches;
mod numbers;
mod posting;
mod runs;
mod sequence;
mod void;

pub use batches::BatchFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Rows per multi-row insert, well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 500;

/// Insert `rows` in chunks of [`INSERT_CHUNK`]. Nothing is sent for an empty
/// input.
async fn insert_chunked<A, C>(db: &C, rows: Vec<A>) -> ResultEngine<()>
where
    A: ActiveModelTrait + Send,
    C: ConnectionTrait,
{
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<A> = rows.by_ref().take(INSERT_CHUNK).collect();
        A::Entity::insert_many(chunk).exec(db).await?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Open a transaction for the `*_in` operations.
    ///
    /// The caller commits it; dropping it rolls everything back.
    pub async fn begin(&self) -> ResultEngine<DatabaseTransaction> {
        Ok(self.database.begin().await?)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
