//! PostgreSQL collection
//!
//! Stores transactions as rows of one table. Predicates compile to a
//! parameterised `WHERE` clause and the aggregation pipeline compiles to a
//! single grouped `SELECT`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{
    split_pipeline, Accumulator, AggregateRow, Field, IndexSpec, Predicate, Stage, StorageError,
    TransactionCollection,
};
use crate::domain::{NewTransaction, Transaction};

/// Collection backed by a PostgreSQL table.
#[derive(Debug)]
pub struct PgCollection {
    pool: PgPool,
    table: String,
    /// One cell per index name; a cell is set once the index is valid
    ensured: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

/// Attempts at building an index before giving up
const INDEX_BUILD_ATTEMPTS: usize = 3;

// SQLSTATE codes
const DUPLICATE_TABLE: &str = "42P07";
const UNIQUE_VIOLATION: &str = "23505";
const DEADLOCK_DETECTED: &str = "40P01";

impl PgCollection {
    /// Create a collection over `table`.
    ///
    /// `table` is interpolated into SQL and must be a plain identifier;
    /// [`crate::Config`] validates it at startup.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            ensured: Mutex::new(HashMap::new()),
        }
    }

    fn index_name(&self, index: &IndexSpec) -> String {
        format!("{}_{}", self.table, index.name())
    }

    fn index_cell(&self, name: &str) -> Result<Arc<OnceCell<()>>, StorageError> {
        let mut cells = self
            .ensured
            .lock()
            .map_err(|_| StorageError::Unavailable("index cache lock poisoned".to_string()))?;
        Ok(cells.entry(name.to_string()).or_default().clone())
    }

    /// Whether `name` exists in the current schema and is usable.
    ///
    /// An interrupted `CREATE INDEX CONCURRENTLY` leaves the index behind
    /// with `indisvalid = false`, and `IF NOT EXISTS` still skips it.
    async fn index_is_valid(&self, name: &str) -> Result<bool, StorageError> {
        let valid: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT i.indisvalid
            FROM pg_index i
            JOIN pg_class c ON c.oid = i.indexrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relname = $1 AND n.nspname = current_schema()
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(valid.unwrap_or(false))
    }

    /// Create `index` and make sure the result is valid, dropping and
    /// rebuilding an invalid leftover.
    async fn build_index(&self, name: &str, index: &IndexSpec) -> Result<(), StorageError> {
        // Sent without bind parameters so it goes over the simple query
        // protocol; CONCURRENTLY is rejected inside an implicit transaction.
        let create_sql = create_index_sql(&self.table, name, index);
        let drop_sql = drop_index_sql(name, index);

        for attempt in 1..=INDEX_BUILD_ATTEMPTS {
            match self.pool.execute(create_sql.as_str()).await {
                Ok(_) => {}
                // Another session created the same name first
                Err(e) if has_sqlstate(&e, &[DUPLICATE_TABLE, UNIQUE_VIOLATION]) => {
                    tracing::debug!(index = %name, "Index created concurrently by another session");
                }
                Err(e) if has_sqlstate(&e, &[DEADLOCK_DETECTED]) && attempt < INDEX_BUILD_ATTEMPTS => {
                    tracing::warn!(index = %name, attempt, "Deadlock while creating index, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if self.index_is_valid(name).await? {
                return Ok(());
            }

            if attempt < INDEX_BUILD_ATTEMPTS {
                tracing::warn!(index = %name, attempt, "Dropping invalid index before rebuilding");
                self.pool.execute(drop_sql.as_str()).await?;
            }
        }

        Err(StorageError::InvalidIndex {
            name: name.to_string(),
        })
    }
}

fn has_sqlstate(error: &sqlx::Error, codes: &[&str]) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| codes.iter().any(|c| code == *c))
}

fn column(field: Field) -> &'static str {
    match field {
        Field::Id => "id",
        Field::Sender => "sender",
        Field::Receiver => "receiver",
        Field::Timestamp => "\"timestamp\"",
        Field::Sum => "sum",
    }
}

/// Append `predicate` to `qb` as a boolean SQL expression.
fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Exists(field) => {
            qb.push(column(*field)).push(" IS NOT NULL");
        }
        Predicate::Eq(field, value) => {
            qb.push(column(*field)).push(" = ").push_bind(*value);
        }
        Predicate::Gte(field, value) => {
            qb.push(column(*field)).push(" >= ").push_bind(*value);
        }
        Predicate::Lt(field, value) => {
            qb.push(column(*field)).push(" < ").push_bind(*value);
        }
        Predicate::And(clauses) => push_joined(qb, clauses, " AND ", "TRUE"),
        Predicate::Or(clauses) => push_joined(qb, clauses, " OR ", "FALSE"),
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'_, Postgres>,
    clauses: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if clauses.is_empty() {
        qb.push(empty);
        return;
    }

    qb.push("(");
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, clause);
    }
    qb.push(")");
}

/// Build the `CREATE INDEX` statement for `index`.
///
/// Sparse indexes become partial indexes over rows where every key is set.
fn create_index_sql(table: &str, name: &str, index: &IndexSpec) -> String {
    let columns: Vec<&str> = index.keys.iter().map(|field| column(*field)).collect();

    let mut sql = String::from("CREATE ");
    if index.options.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    if index.options.background {
        sql.push_str("CONCURRENTLY ");
    }
    sql.push_str(&format!(
        "IF NOT EXISTS {} ON {} ({})",
        name,
        table,
        columns.join(", ")
    ));
    if index.options.sparse {
        let conditions: Vec<String> = columns
            .iter()
            .map(|column| format!("{} IS NOT NULL", column))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql
}

/// Build the `DROP INDEX` statement matching [`create_index_sql`].
fn drop_index_sql(name: &str, index: &IndexSpec) -> String {
    if index.options.background {
        format!("DROP INDEX CONCURRENTLY IF EXISTS {}", name)
    } else {
        format!("DROP INDEX IF EXISTS {}", name)
    }
}

#[async_trait]
impl TransactionCollection for PgCollection {
    async fn insert_one(&self, record: NewTransaction) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();

        sqlx::query(&format!(
            r#"INSERT INTO {} (id, sender, receiver, "timestamp", sum) VALUES ($1, $2, $3, $4, $5)"#,
            self.table
        ))
        .bind(id)
        .bind(record.sender)
        .bind(record.receiver)
        .bind(record.timestamp)
        .bind(record.sum)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_all(&self, predicate: &Predicate) -> Result<Vec<Transaction>, StorageError> {
        let mut qb = QueryBuilder::new(format!(
            r#"SELECT id, sender, receiver, "timestamp", sum FROM {} WHERE "#,
            self.table
        ));
        push_predicate(&mut qb, predicate);

        let rows: Vec<(Uuid, i64, i64, i64, i64)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, sender, receiver, timestamp, sum)| Transaction {
                id: Some(id),
                sender,
                receiver,
                timestamp,
                sum,
            })
            .collect())
    }

    async fn ensure_index(&self, index: &IndexSpec) -> Result<(), StorageError> {
        let name = self.index_name(index);

        // Concurrent callers for the same name wait on the first build; a
        // failed build leaves the cell empty for the next caller.
        let cell = self.index_cell(&name)?;
        cell.get_or_try_init(|| async {
            self.build_index(&name, index).await?;
            tracing::info!(index = %name, "Ensured index");
            Ok::<(), StorageError>(())
        })
        .await?;

        Ok(())
    }

    async fn aggregate(&self, stages: &[Stage]) -> Result<Vec<AggregateRow>, StorageError> {
        let (filter, group) = split_pipeline(stages)?;

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        qb.push_bind(group.key).push("::BIGINT AS key, ");

        match &group.accumulator {
            Accumulator::NetSum {
                add_when,
                subtract_when,
            } => {
                qb.push("SUM((CASE WHEN ");
                push_predicate(&mut qb, add_when);
                qb.push(" THEN sum ELSE 0 END) - (CASE WHEN ");
                push_predicate(&mut qb, subtract_when);
                qb.push(" THEN sum ELSE 0 END))::BIGINT AS balance");
            }
        }

        qb.push(format!(" FROM {} WHERE ", self.table));
        push_predicate(&mut qb, &filter);
        // Without this an empty match still yields one row with a NULL sum.
        qb.push(" HAVING COUNT(*) > 0");

        let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(key, balance)| AggregateRow { key, balance })
            .collect())
    }
}
