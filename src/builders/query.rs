use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::clauses::{Condition, Join, JoinKind, Operator, SearchGroup};
use crate::dialect::Dialect;
use crate::error::{FlowSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{Row, SqlValue};

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Aggregate function selected by `aggregate` and its shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Max,
    Min,
    Avg,
    Sum,
}

impl Aggregate {
    fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Avg => "AVG",
            Aggregate::Sum => "SUM",
        }
    }
}

#[derive(Debug, Clone)]
enum OrderClause {
    Expr { column: String, order: SortOrder },
    /// Database-native random ordering; the function is dialect-resolved at
    /// compile time.
    Random,
}

#[derive(Debug, Clone)]
struct RawWhere {
    sql: String,
    bindings: Vec<SqlValue>,
}

#[derive(Debug, Clone)]
struct RawStatement {
    sql: String,
    bindings: Vec<SqlValue>,
}

/// The accumulated, per-query state of a builder. Drained back to this
/// default at every terminal operation.
#[derive(Debug, Default)]
struct QueryState {
    table: Option<String>,
    projection: Vec<String>,
    conditions: Vec<Condition>,
    searches: Vec<SearchGroup>,
    raw_wheres: Vec<RawWhere>,
    joins: Vec<Join>,
    order: Option<OrderClause>,
    group: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    raw_statement: Option<RawStatement>,
}

impl QueryState {
    fn table_name(&self) -> Result<&str> {
        self.table.as_deref().ok_or(FlowSqlError::MissingTable)
    }

    fn validate(&self) -> Result<()> {
        for condition in &self.conditions {
            if condition.has_empty_in() {
                return Err(FlowSqlError::InvalidArgument(
                    "IN predicate requires at least one value".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Appends the single WHERE clause: conditions, then search groups, then
    /// raw-where fragments, concatenated with AND. Bindings are pushed in the
    /// same pass, so their order always matches the placeholder order.
    fn push_where(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        if self.conditions.is_empty() && self.searches.is_empty() && self.raw_wheres.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for condition in &self.conditions {
            if !first {
                sql.push_str(" AND ");
            }
            condition.push_sql(sql, params);
            first = false;
        }
        for search in &self.searches {
            if !first {
                sql.push_str(" AND ");
            }
            search.push_sql(sql, params);
            first = false;
        }
        for raw in &self.raw_wheres {
            if !first {
                sql.push_str(" AND ");
            }
            sql.push_str(&raw.sql);
            params.extend(raw.bindings.iter().cloned());
            first = false;
        }
    }

    fn push_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push(' ');
            join.push_sql(sql);
        }
    }

    fn build_select(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        self.validate()?;
        let table = self.table_name()?;

        let mut sql = String::with_capacity(256);
        let mut params = Vec::new();

        sql.push_str("SELECT ");
        if self.projection.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.projection.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(table);

        self.push_joins(&mut sql);
        self.push_where(&mut sql, &mut params);

        if let Some(group) = &self.group {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }

        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            match order {
                OrderClause::Expr { column, order } => {
                    sql.push_str(column);
                    sql.push(' ');
                    sql.push_str(order.as_sql());
                }
                OrderClause::Random => sql.push_str(dialect.random_order()),
            }
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }

        if let Some(offset) = self.offset {
            sql.push_str(" OFFSET ");
            sql.push_str(&offset.to_string());
        }

        Ok((dialect.finalize(&sql), params))
    }

    /// COUNT and aggregate statements share the FROM/join/WHERE assembly of
    /// SELECT but never carry group, order, limit, or offset.
    fn build_projection_query(
        &self,
        dialect: Dialect,
        projection: &str,
    ) -> Result<(String, Vec<SqlValue>)> {
        self.validate()?;
        let table = self.table_name()?;

        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();

        sql.push_str("SELECT ");
        sql.push_str(projection);
        sql.push_str(" FROM ");
        sql.push_str(table);

        self.push_joins(&mut sql);
        self.push_where(&mut sql, &mut params);

        Ok((dialect.finalize(&sql), params))
    }

    fn build_count(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        self.build_projection_query(dialect, "COUNT(*)")
    }

    fn build_aggregate(
        &self,
        dialect: Dialect,
        function: Aggregate,
        column: &str,
    ) -> Result<(String, Vec<SqlValue>)> {
        let projection = format!("{}({})", function.as_sql(), column);
        self.build_projection_query(dialect, &projection)
    }

    fn build_insert(
        &self,
        dialect: Dialect,
        data: &[(&str, SqlValue)],
    ) -> Result<(String, Vec<SqlValue>)> {
        let table = self.table_name()?;
        if data.is_empty() {
            return Err(FlowSqlError::InvalidArgument(
                "insert requires at least one column".to_string(),
            ));
        }

        let columns: Vec<&str> = data.iter().map(|(column, _)| *column).collect();
        let placeholders = vec!["?"; data.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );
        let params: Vec<SqlValue> = data.iter().map(|(_, value)| value.clone()).collect();

        Ok((dialect.finalize(&sql), params))
    }

    fn build_update(
        &self,
        dialect: Dialect,
        data: &[(&str, SqlValue)],
    ) -> Result<(String, Vec<SqlValue>)> {
        self.validate()?;
        let table = self.table_name()?;
        if data.is_empty() {
            return Err(FlowSqlError::InvalidArgument(
                "update requires at least one column".to_string(),
            ));
        }

        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();

        sql.push_str("UPDATE ");
        sql.push_str(table);
        sql.push_str(" SET ");
        for (i, (column, value)) in data.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column);
            sql.push_str(" = ?");
            params.push(value.clone());
        }

        self.push_where(&mut sql, &mut params);

        Ok((dialect.finalize(&sql), params))
    }

    fn build_delete(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        self.validate()?;
        let table = self.table_name()?;

        let mut sql = String::with_capacity(64);
        let mut params = Vec::new();

        sql.push_str("DELETE FROM ");
        sql.push_str(table);
        self.push_where(&mut sql, &mut params);

        Ok((dialect.finalize(&sql), params))
    }

    /// `SET column = column + ?` with a signed delta, for increment and
    /// decrement.
    fn build_step(
        &self,
        dialect: Dialect,
        column: &str,
        delta: i64,
    ) -> Result<(String, Vec<SqlValue>)> {
        self.validate()?;
        let table = self.table_name()?;

        let mut sql = String::with_capacity(64);
        let mut params = Vec::new();

        sql.push_str("UPDATE ");
        sql.push_str(table);
        sql.push_str(" SET ");
        sql.push_str(column);
        sql.push_str(" = ");
        sql.push_str(column);
        sql.push_str(" + ?");
        params.push(SqlValue::Int64(delta));

        self.push_where(&mut sql, &mut params);

        Ok((dialect.finalize(&sql), params))
    }
}

fn is_random_sentinel(column: &str) -> bool {
    column.eq_ignore_ascii_case("rand")
        || column.eq_ignore_ascii_case("rand()")
        || column.eq_ignore_ascii_case("random()")
}

/// Fluent query builder.
///
/// Accumulation methods mutate the builder and return it for chaining; a
/// terminal operation (`get`, `first`, `insert`, `update`, `delete`, `count`,
/// …) compiles the accumulated state into one parameterized statement, runs it
/// through the driver, and resets the builder — on the error path too — so the
/// same builder can serve an unrelated query next.
///
/// # Trust boundary
///
/// Table names, columns, projections, raw fragments, join expressions,
/// group/order expressions, and limit/offset are interpolated into SQL text,
/// never parameter-bound. They must be trusted by the caller and must never
/// carry user input; only values bound as [`SqlValue`] parameters are
/// injection-safe.
///
/// A builder is single-query state: build each logical query on its own
/// builder (cheap to create from the client) rather than sharing one across
/// tasks.
pub struct QueryBuilder {
    driver: Arc<dyn DatabaseDriver>,
    state: QueryState,
}

impl QueryBuilder {
    pub(crate) fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            state: QueryState::default(),
        }
    }

    fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Returns the builder to its default, empty configuration.
    ///
    /// Every terminal operation calls this implicitly by draining the state
    /// before compiling; it is public for callers that want to abandon a
    /// half-built chain.
    pub fn reset(&mut self) -> &mut Self {
        self.state = QueryState::default();
        self
    }

    fn drain(&mut self) -> QueryState {
        std::mem::take(&mut self.state)
    }

    // ---- clause accumulation ----

    /// Sets the target table. The name is trusted text, not validated.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.state.table = Some(name.to_string());
        self
    }

    /// Sets the projection; the slice is joined into a comma-separated list.
    /// Defaults to `*` when never called.
    pub fn select(&mut self, columns: &[&str]) -> &mut Self {
        self.state.projection = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// `column = ?` shorthand.
    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.where_op(column, Operator::Eq, value)
    }

    /// `column <op> ?` with an explicit operator.
    pub fn where_op(
        &mut self,
        column: &str,
        op: Operator,
        value: impl Into<SqlValue>,
    ) -> &mut Self {
        self.state.conditions.push(Condition::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Appends an opaque predicate with no bindings to the condition list.
    pub fn where_fragment(&mut self, sql: &str) -> &mut Self {
        self.state.conditions.push(Condition::Fragment {
            sql: sql.to_string(),
        });
        self
    }

    /// Appends one comparison per `(column, operator, value)` triple.
    pub fn where_all(&mut self, triples: &[(&str, Operator, SqlValue)]) -> &mut Self {
        for (column, op, value) in triples {
            self.state.conditions.push(Condition::Compare {
                column: column.to_string(),
                op: *op,
                value: value.clone(),
            });
        }
        self
    }

    /// Pops the most recently added condition and re-pushes it OR-combined
    /// with `condition`. With no prior condition this is a plain push, so
    /// a leading `or_where` behaves like `where_eq`. Chained calls nest
    /// left-associatively, combining only with the immediately preceding
    /// fragment.
    fn push_or(&mut self, condition: Condition) -> &mut Self {
        let combined = match self.state.conditions.pop() {
            Some(previous) => Condition::Or(Box::new(previous), Box::new(condition)),
            None => condition,
        };
        self.state.conditions.push(combined);
        self
    }

    pub fn or_where(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.or_where_op(column, Operator::Eq, value)
    }

    pub fn or_where_op(
        &mut self,
        column: &str,
        op: Operator,
        value: impl Into<SqlValue>,
    ) -> &mut Self {
        self.push_or(Condition::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        })
    }

    /// `column IN (?, …)` with one placeholder per value. An empty value list
    /// is rejected when the statement is compiled.
    pub fn where_in<V: Into<SqlValue>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.state.conditions.push(Condition::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn or_where_in<V: Into<SqlValue>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.push_or(Condition::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        self.state.conditions.push(Condition::IsNull {
            column: column.to_string(),
        });
        self
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.state.conditions.push(Condition::IsNotNull {
            column: column.to_string(),
        });
        self
    }

    /// Appends an opaque predicate with its own bindings to the raw-where
    /// list, which compiles after conditions and search groups.
    pub fn where_raw(&mut self, sql: &str, bindings: Vec<SqlValue>) -> &mut Self {
        self.state.raw_wheres.push(RawWhere {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    /// Multi-column fuzzy search: one OR-grouped LIKE predicate binding
    /// `%value%` once per column.
    pub fn search(&mut self, columns: &[&str], value: &str) -> &mut Self {
        self.state.searches.push(SearchGroup {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            value: value.to_string(),
        });
        self
    }

    pub fn join(&mut self, table: &str, first: &str, op: Operator, second: &str) -> &mut Self {
        self.state
            .joins
            .push(Join::on(JoinKind::Inner, table, first, op, second));
        self
    }

    pub fn left_join(&mut self, table: &str, first: &str, op: Operator, second: &str) -> &mut Self {
        self.state
            .joins
            .push(Join::on(JoinKind::Left, table, first, op, second));
        self
    }

    pub fn right_join(
        &mut self,
        table: &str,
        first: &str,
        op: Operator,
        second: &str,
    ) -> &mut Self {
        self.state
            .joins
            .push(Join::on(JoinKind::Right, table, first, op, second));
        self
    }

    /// LEFT JOIN with a caller-written join expression and no generated ON
    /// clause.
    pub fn left_join_raw(&mut self, expression: &str) -> &mut Self {
        self.state.joins.push(Join::raw(JoinKind::Left, expression));
        self
    }

    /// RIGHT JOIN with a caller-written join expression and no generated ON
    /// clause.
    pub fn right_join_raw(&mut self, expression: &str) -> &mut Self {
        self.state
            .joins
            .push(Join::raw(JoinKind::Right, expression));
        self
    }

    /// Orders by a column. The reserved names `rand`, `rand()`, and
    /// `random()` (any case) request database-native random ordering instead
    /// of a column reference.
    pub fn order_by(&mut self, column: &str, order: SortOrder) -> &mut Self {
        self.state.order = Some(if is_random_sentinel(column) {
            OrderClause::Random
        } else {
            OrderClause::Expr {
                column: column.to_string(),
                order,
            }
        });
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.state.group = Some(column.to_string());
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.state.offset = Some(offset);
        self
    }

    /// Full SQL override. Read operations and `run` use this text verbatim —
    /// no compilation and no placeholder rewriting, so write placeholders in
    /// the backend's native syntax.
    pub fn raw(&mut self, sql: &str, bindings: Vec<SqlValue>) -> &mut Self {
        self.state.raw_statement = Some(RawStatement {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    // ---- terminal operations ----

    /// Compiles (or takes the raw override), executes, and fetches all rows.
    pub async fn get(&mut self) -> Result<Vec<Row>> {
        let mut state = self.drain();
        let (sql, params) = match state.raw_statement.take() {
            Some(raw) => (raw.sql, raw.bindings),
            None => state.build_select(self.dialect())?,
        };
        debug!(sql = %sql, params = params.len(), "executing select");
        let raw = self.driver.query(&sql, &params).await?;
        Ok(raw.into_rows())
    }

    /// Forces `LIMIT 1` and returns the first row, if any.
    pub async fn first(&mut self) -> Result<Option<Row>> {
        self.limit(1);
        let rows = self.get().await?;
        Ok(rows.into_iter().next())
    }

    /// Returns the row with the greatest `column` value.
    pub async fn last(&mut self, column: &str) -> Result<Option<Row>> {
        self.order_by(column, SortOrder::Desc);
        self.first().await
    }

    /// Like `first`, but an empty result is an error.
    pub async fn first_or_fail(&mut self) -> Result<Row> {
        self.first().await?.ok_or(FlowSqlError::NotFound)
    }

    /// Forces the projection to `column` and `LIMIT 1`, returning that
    /// column's value from the first row.
    pub async fn value(&mut self, column: &str) -> Result<Option<SqlValue>> {
        self.select(&[column]);
        let row = self.first().await?;
        Ok(row.and_then(|row| row.try_get(column).cloned()))
    }

    /// Forces the projection to `column` and returns its value from every
    /// row, in result order.
    pub async fn pluck(&mut self, column: &str) -> Result<Vec<SqlValue>> {
        self.select(&[column]);
        let rows = self.get().await?;
        rows.iter()
            .map(|row| row.get(column).map(|value| value.clone()))
            .collect()
    }

    /// Compiles and executes a `COUNT(*)` query over the accumulated state.
    pub async fn count(&mut self) -> Result<u64> {
        let state = self.drain();
        let (sql, params) = state.build_count(self.dialect())?;
        debug!(sql = %sql, params = params.len(), "executing count");
        let raw = self.driver.query(&sql, &params).await?;
        let value = raw
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| FlowSqlError::QueryFailed("COUNT returned no value".to_string()))?;
        Ok(value.max(0) as u64)
    }

    pub async fn exists(&mut self) -> Result<bool> {
        Ok(self.count().await? > 0)
    }

    pub async fn doesnt_exist(&mut self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    /// Compiles and executes `<FUNCTION>(column)` over the accumulated state.
    /// Returns `None` when the result set is empty or the aggregate is NULL
    /// (aggregating zero rows).
    pub async fn aggregate(
        &mut self,
        function: Aggregate,
        column: &str,
    ) -> Result<Option<SqlValue>> {
        let state = self.drain();
        let (sql, params) = state.build_aggregate(self.dialect(), function, column)?;
        debug!(sql = %sql, params = params.len(), "executing aggregate");
        let raw = self.driver.query(&sql, &params).await?;
        Ok(raw
            .rows
            .into_iter()
            .next()
            .and_then(|mut row| if row.is_empty() { None } else { Some(row.remove(0)) })
            .filter(|value| !value.is_null()))
    }

    pub async fn max(&mut self, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(Aggregate::Max, column).await
    }

    pub async fn min(&mut self, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(Aggregate::Min, column).await
    }

    pub async fn avg(&mut self, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(Aggregate::Avg, column).await
    }

    pub async fn sum(&mut self, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(Aggregate::Sum, column).await
    }

    /// Inserts one row from ordered column/value pairs and returns the
    /// generated identifier.
    pub async fn insert(&mut self, data: &[(&str, SqlValue)]) -> Result<i64> {
        let state = self.drain();
        let (sql, params) = state.build_insert(self.dialect(), data)?;
        debug!(sql = %sql, params = params.len(), "executing insert");
        self.driver.execute(&sql, &params).await?;
        self.driver.last_insert_id().await
    }

    /// Updates matching rows from ordered column/value pairs; data bindings
    /// precede where bindings. With no accumulated predicates this updates
    /// the whole table.
    pub async fn update(&mut self, data: &[(&str, SqlValue)]) -> Result<u64> {
        let state = self.drain();
        let (sql, params) = state.build_update(self.dialect(), data)?;
        debug!(sql = %sql, params = params.len(), "executing update");
        self.driver.execute(&sql, &params).await
    }

    /// Deletes matching rows. With no accumulated predicates this deletes
    /// every row in the table.
    pub async fn delete(&mut self) -> Result<u64> {
        let state = self.drain();
        let (sql, params) = state.build_delete(self.dialect())?;
        debug!(sql = %sql, params = params.len(), "executing delete");
        self.driver.execute(&sql, &params).await
    }

    /// `SET column = column + amount` over matching rows.
    pub async fn increment(&mut self, column: &str, amount: i64) -> Result<u64> {
        let state = self.drain();
        let (sql, params) = state.build_step(self.dialect(), column, amount)?;
        debug!(sql = %sql, params = params.len(), "executing increment");
        self.driver.execute(&sql, &params).await
    }

    /// `SET column = column - amount` over matching rows.
    pub async fn decrement(&mut self, column: &str, amount: i64) -> Result<u64> {
        self.increment(column, -amount).await
    }

    /// Unconditionally deletes every row, through the driver's
    /// unparameterized path (no prepare step).
    pub async fn truncate(&mut self) -> Result<()> {
        let state = self.drain();
        let sql = format!("DELETE FROM {}", state.table_name()?);
        debug!(sql = %sql, "executing truncate");
        self.driver.exec_raw(&sql).await
    }

    /// Executes the accumulated raw statement with its bindings.
    pub async fn run(&mut self) -> Result<u64> {
        let mut state = self.drain();
        let raw = state.raw_statement.take().ok_or_else(|| {
            FlowSqlError::InvalidArgument("run requires a raw statement".to_string())
        })?;
        debug!(sql = %raw.sql, params = raw.bindings.len(), "executing raw statement");
        self.driver.execute(&raw.sql, &raw.bindings).await
    }

    /// Returns the SQL that `get` would execute, without executing anything
    /// and without resetting the accumulated state.
    pub fn to_sql(&self) -> Result<String> {
        match &self.state.raw_statement {
            Some(raw) => Ok(raw.sql.clone()),
            None => Ok(self.state.build_select(self.dialect())?.0),
        }
    }

    /// Runs `work` inside a transaction: BEGIN before, COMMIT on `Ok`,
    /// ROLLBACK on `Err`. The failure that triggered the rollback is
    /// propagated; a failing rollback is logged and does not mask it.
    pub async fn transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut QueryBuilder) -> BoxFuture<'a, Result<T>>,
    {
        self.driver.begin().await?;
        match work(&mut *self).await {
            Ok(value) => {
                self.driver.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.driver.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after transaction error");
                }
                Err(err)
            }
        }
    }
}
