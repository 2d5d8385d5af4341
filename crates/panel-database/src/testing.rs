//! In-memory stand-in for a MySQL server.
//!
//! Understands the statements this workspace generates (`SHOW DATABASES`,
//! `SHOW TABLES FROM`, `SELECT ... FROM ... [WHERE col = ?] [LIMIT n]`,
//! `INSERT INTO`, `CREATE ... IF NOT EXISTS`, `USE`, `SELECT DATABASE()`)
//! plus exact-text scripted outcomes. Anything else fails the way MySQL
//! reports a syntax error. Every statement is recorded with the id of the
//! connection that sent it and the database selected at the time.

use crate::ident::unquote_identifier;
use crate::{
    Connector, DatabaseError, DatabaseResult, Identifier, MutationSummary, QueryResult, RowMap,
    ServerConnection,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A canned response for one exact statement text.
#[derive(Debug, Clone)]
pub enum Scripted {
    Rows(Vec<RowMap>),
    Mutation(MutationSummary),
    Error(String),
}

/// One statement as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRecord {
    pub connection_id: usize,
    pub database: Option<String>,
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone)]
struct ColumnDef {
    name: String,
    unique: bool,
    auto_increment: bool,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Value>>,
    next_auto: u64,
}

#[derive(Debug, Clone)]
struct MemoryDatabase {
    name: String,
    tables: Vec<MemoryTable>,
}

#[derive(Default)]
struct ServerState {
    databases: Vec<MemoryDatabase>,
    scripted: HashMap<String, Scripted>,
    log: Vec<StatementRecord>,
    refuse_connections: bool,
    statement_delay: Option<Duration>,
    next_connection_id: usize,
    opened: usize,
    closed: usize,
}

enum Outcome {
    Rows(Vec<RowMap>),
    Mutation(MutationSummary),
}

/// Shared handle to the fake server. Clones see the same state.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// A server holding only the system schemas.
    pub fn new() -> Self {
        let server = Self {
            state: Arc::new(Mutex::new(ServerState::default())),
        };
        for name in ["information_schema", "mysql", "performance_schema", "sys"] {
            server.create_database(name);
        }
        server.create_table("mysql", "user", &["Host", "User"]);
        server
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
        }
    }

    pub fn create_database(&self, name: &str) {
        let mut state = self.state.lock();
        if find_database(&state.databases, name).is_none() {
            state.databases.push(MemoryDatabase {
                name: name.to_string(),
                tables: Vec::new(),
            });
        }
    }

    /// Create (or replace) a table, creating its database if needed.
    pub fn create_table(&self, database: &str, table: &str, columns: &[&str]) {
        self.create_database(database);
        let columns = columns
            .iter()
            .map(|name| ColumnDef {
                name: name.to_string(),
                unique: false,
                auto_increment: false,
            })
            .collect();
        let mut state = self.state.lock();
        if let Some(db) = find_database_mut(&mut state.databases, database) {
            db.tables.retain(|t| t.name != table);
            db.tables.push(MemoryTable {
                name: table.to_string(),
                columns,
                rows: Vec::new(),
                next_auto: 1,
            });
        }
    }

    /// Append a row of values in column order.
    pub fn insert_row(&self, database: &str, table: &str, values: Vec<Value>) {
        let mut state = self.state.lock();
        if let Some(t) = find_database_mut(&mut state.databases, database)
            .and_then(|db| db.tables.iter_mut().find(|t| t.name == table))
        {
            t.rows.push(values);
        }
    }

    /// Rows of a table as column-ordered values.
    pub fn table_rows(&self, database: &str, table: &str) -> Vec<Vec<Value>> {
        let state = self.state.lock();
        find_database(&state.databases, database)
            .and_then(|db| db.tables.iter().find(|t| t.name == table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn has_table(&self, database: &str, table: &str) -> bool {
        let state = self.state.lock();
        find_database(&state.databases, database)
            .map(|db| db.tables.iter().any(|t| t.name == table))
            .unwrap_or(false)
    }

    /// Answer `sql` (matched after trimming) with a canned outcome.
    pub fn script(&self, sql: &str, outcome: Scripted) {
        self.state
            .lock()
            .scripted
            .insert(normalize(sql).to_string(), outcome);
    }

    /// Make every new connection attempt fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse_connections = refuse;
    }

    /// Delay every statement, to hold connections open in concurrency tests.
    pub fn set_statement_delay(&self, delay: Option<Duration>) {
        self.state.lock().statement_delay = delay;
    }

    pub fn statements(&self) -> Vec<StatementRecord> {
        self.state.lock().log.clone()
    }

    pub fn statement_count(&self) -> usize {
        self.state.lock().log.len()
    }

    pub fn clear_statements(&self) {
        self.state.lock().log.clear();
    }

    pub fn connections_opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn connections_closed(&self) -> usize {
        self.state.lock().closed
    }

    async fn run(
        &self,
        conn: &mut MemoryConnection,
        sql: &str,
        params: &[String],
    ) -> DatabaseResult<Outcome> {
        let delay = {
            let mut state = self.state.lock();
            state.log.push(StatementRecord {
                connection_id: conn.id,
                database: conn.database.clone(),
                sql: sql.to_string(),
                params: params.to_vec(),
            });
            state.statement_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let sql = normalize(sql);
        if let Some(scripted) = state.scripted.get(sql) {
            return match scripted.clone() {
                Scripted::Rows(rows) => Ok(Outcome::Rows(rows)),
                Scripted::Mutation(summary) => Ok(Outcome::Mutation(summary)),
                Scripted::Error(message) => Err(DatabaseError::Server(message)),
            };
        }
        state.apply(conn, sql, params)
    }
}

impl ServerState {
    fn apply(
        &mut self,
        conn: &mut MemoryConnection,
        sql: &str,
        params: &[String],
    ) -> DatabaseResult<Outcome> {
        if sql.eq_ignore_ascii_case("SHOW DATABASES") {
            let rows = self
                .databases
                .iter()
                .map(|db| single("Database", Value::String(db.name.clone())))
                .collect();
            return Ok(Outcome::Rows(rows));
        }

        if sql.eq_ignore_ascii_case("SELECT DATABASE()") {
            let current = conn.database.clone().map(Value::String).unwrap_or(Value::Null);
            return Ok(Outcome::Rows(vec![single("DATABASE()", current)]));
        }

        if let Some(rest) = strip_keyword(sql, "SHOW TABLES FROM ") {
            let (name, _) = read_identifier(rest).ok_or_else(|| syntax_error(sql))?;
            return self.show_tables(&name);
        }

        if sql.eq_ignore_ascii_case("SHOW TABLES") {
            let name = conn.database.clone().ok_or_else(no_database)?;
            return self.show_tables(&name);
        }

        if let Some(rest) = strip_keyword(sql, "USE ") {
            let (name, _) = read_identifier(rest).ok_or_else(|| syntax_error(sql))?;
            if find_database(&self.databases, &name).is_none() {
                return Err(unknown_database(&name));
            }
            conn.database = Some(name);
            return Ok(Outcome::Mutation(MutationSummary::default()));
        }

        if let Some(rest) = strip_keyword(sql, "CREATE DATABASE IF NOT EXISTS ") {
            let (name, _) = read_identifier(rest).ok_or_else(|| syntax_error(sql))?;
            let created = find_database(&self.databases, &name).is_none();
            if created {
                self.databases.push(MemoryDatabase {
                    name,
                    tables: Vec::new(),
                });
            }
            return Ok(Outcome::Mutation(MutationSummary {
                affected_rows: u64::from(created),
                ..Default::default()
            }));
        }

        if let Some(rest) = strip_keyword(sql, "CREATE TABLE IF NOT EXISTS ") {
            return self.create_table(conn, sql, rest);
        }

        if let Some(rest) = strip_keyword(sql, "INSERT INTO ") {
            return self.insert(conn, sql, rest, params);
        }

        if let Some(rest) = strip_keyword(sql, "SELECT ") {
            return self.select(conn, sql, rest, params);
        }

        Err(syntax_error(sql))
    }

    fn show_tables(&self, database: &str) -> DatabaseResult<Outcome> {
        let db = find_database(&self.databases, database).ok_or_else(|| unknown_database(database))?;
        let column = format!("Tables_in_{}", db.name);
        let rows = db
            .tables
            .iter()
            .map(|t| single(&column, Value::String(t.name.clone())))
            .collect();
        Ok(Outcome::Rows(rows))
    }

    fn table(&self, database: &str, table: &str) -> DatabaseResult<&MemoryTable> {
        find_database(&self.databases, database)
            .and_then(|db| db.tables.iter().find(|t| t.name == table))
            .ok_or_else(|| missing_table(database, table))
    }

    fn table_mut(&mut self, database: &str, table: &str) -> DatabaseResult<&mut MemoryTable> {
        find_database_mut(&mut self.databases, database)
            .and_then(|db| db.tables.iter_mut().find(|t| t.name == table))
            .ok_or_else(|| missing_table(database, table))
    }

    fn select(
        &self,
        conn: &MemoryConnection,
        sql: &str,
        rest: &str,
        params: &[String],
    ) -> DatabaseResult<Outcome> {
        if let Ok(n) = rest.trim().parse::<i64>() {
            return Ok(Outcome::Rows(vec![single(rest.trim(), Value::from(n))]));
        }
        let from = rest
            .to_ascii_lowercase()
            .find(" from ")
            .ok_or_else(|| syntax_error(sql))?;
        let projection = &rest[..from];
        let (database, table, mut tail) =
            read_table_ref(&rest[from + " from ".len()..], conn).ok_or_else(|| syntax_error(sql))?;
        let database = database.ok_or_else(no_database)?;
        let source = self.table(&database, &table)?;

        let mut filter: Option<(usize, String)> = None;
        tail = tail.trim();
        if let Some(cond) = strip_keyword(tail, "WHERE ") {
            let (column, after) = read_identifier(cond).ok_or_else(|| syntax_error(sql))?;
            let after = after
                .trim_start()
                .strip_prefix('=')
                .map(str::trim_start)
                .and_then(|s| s.strip_prefix('?'))
                .ok_or_else(|| syntax_error(sql))?;
            let idx = source.column_index(&column)?;
            let value = params.first().cloned().ok_or_else(|| syntax_error(sql))?;
            filter = Some((idx, value));
            tail = after.trim();
        }

        let mut limit = usize::MAX;
        if let Some(n) = strip_keyword(tail, "LIMIT ") {
            limit = n.trim().parse().map_err(|_| syntax_error(sql))?;
            tail = "";
        }
        if !tail.is_empty() {
            return Err(syntax_error(sql));
        }

        let projection: Vec<&str> = projection.split(',').map(str::trim).collect();
        let mut rows = Vec::new();
        for values in &source.rows {
            if rows.len() >= limit {
                break;
            }
            if let Some((idx, expected)) = &filter {
                if !matches_param(values.get(*idx), expected) {
                    continue;
                }
            }
            rows.push(source.project(values, &projection)?);
        }
        Ok(Outcome::Rows(rows))
    }

    fn insert(
        &mut self,
        conn: &MemoryConnection,
        sql: &str,
        rest: &str,
        params: &[String],
    ) -> DatabaseResult<Outcome> {
        let (database, table, tail) = read_table_ref(rest, conn).ok_or_else(|| syntax_error(sql))?;
        let database = database.ok_or_else(no_database)?;
        let (columns, tail) = read_parenthesized(tail.trim_start()).ok_or_else(|| syntax_error(sql))?;
        let tail = strip_keyword(tail.trim_start(), "VALUES").ok_or_else(|| syntax_error(sql))?;
        let (values, _) = read_parenthesized(tail.trim_start()).ok_or_else(|| syntax_error(sql))?;

        let columns: Vec<String> = columns
            .split(',')
            .map(|c| read_identifier(c.trim()).map(|(name, _)| name))
            .collect::<Option<_>>()
            .ok_or_else(|| syntax_error(sql))?;
        let mut params = params.iter();
        let values: Vec<Value> = values
            .split(',')
            .map(|raw| parse_literal(raw.trim(), &mut params))
            .collect::<Option<_>>()
            .ok_or_else(|| syntax_error(sql))?;
        if columns.len() != values.len() {
            return Err(DatabaseError::Server(
                "Column count doesn't match value count at row 1".to_string(),
            ));
        }

        let target = self.table_mut(&database, &table)?;
        let mut row = vec![Value::Null; target.columns.len()];
        for (column, value) in columns.iter().zip(values) {
            let idx = target.column_index(column)?;
            row[idx] = value;
        }

        let mut insert_id = 0;
        for (idx, def) in target.columns.iter().enumerate() {
            if def.auto_increment && row[idx].is_null() {
                row[idx] = Value::from(target.next_auto);
                insert_id = target.next_auto;
                target.next_auto += 1;
            }
            if def.unique
                && target
                    .rows
                    .iter()
                    .any(|existing| existing.get(idx) == Some(&row[idx]))
            {
                return Err(DatabaseError::Duplicate(format!(
                    "Duplicate entry '{}' for key '{}.{}'",
                    display_value(&row[idx]),
                    target.name,
                    def.name
                )));
            }
        }
        target.rows.push(row);

        Ok(Outcome::Mutation(MutationSummary {
            affected_rows: 1,
            insert_id,
            info: None,
        }))
    }

    fn create_table(&mut self, conn: &MemoryConnection, sql: &str, rest: &str) -> DatabaseResult<Outcome> {
        let (database, table, tail) = read_table_ref(rest, conn).ok_or_else(|| syntax_error(sql))?;
        let database = database.ok_or_else(no_database)?;
        let (body, _) = read_parenthesized(tail.trim_start()).ok_or_else(|| syntax_error(sql))?;

        let db = find_database_mut(&mut self.databases, &database)
            .ok_or_else(|| unknown_database(&database))?;
        if db.tables.iter().any(|t| t.name == table) {
            return Ok(Outcome::Mutation(MutationSummary::default()));
        }

        let mut columns = Vec::new();
        for def in split_top_level(body) {
            let def = def.trim();
            let upper = def.to_ascii_uppercase();
            if upper.starts_with("PRIMARY KEY") || upper.starts_with("UNIQUE") || upper.starts_with("KEY") {
                continue;
            }
            let (name, _) = read_identifier(def).ok_or_else(|| syntax_error(sql))?;
            columns.push(ColumnDef {
                name,
                unique: upper.contains("UNIQUE") || upper.contains("PRIMARY KEY"),
                auto_increment: upper.contains("AUTO_INCREMENT"),
            });
        }
        db.tables.push(MemoryTable {
            name: table,
            columns,
            rows: Vec::new(),
            next_auto: 1,
        });
        Ok(Outcome::Mutation(MutationSummary::default()))
    }
}

impl MemoryTable {
    fn column_index(&self, name: &str) -> DatabaseResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DatabaseError::Server(format!("Unknown column '{}' in 'field list'", name)))
    }

    fn project(&self, values: &[Value], projection: &[&str]) -> DatabaseResult<RowMap> {
        let mut row = RowMap::new();
        for item in projection {
            if *item == "*" {
                for (def, value) in self.columns.iter().zip(values) {
                    row.push(def.name.clone(), value.clone());
                }
            } else if let Ok(n) = item.parse::<i64>() {
                row.push(item.to_string(), Value::from(n));
            } else {
                let name = read_identifier(item).map(|(name, _)| name).unwrap_or_default();
                let idx = self.column_index(&name)?;
                row.push(name, values.get(idx).cloned().unwrap_or(Value::Null));
            }
        }
        Ok(row)
    }
}

/// Connector handing out [`MemoryConnection`]s.
#[derive(Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> DatabaseResult<MemoryConnection> {
        let mut state = self.server.state.lock();
        if state.refuse_connections {
            return Err(DatabaseError::Connection(
                "Can't connect to MySQL server on 'memory' (111)".to_string(),
            ));
        }
        state.next_connection_id += 1;
        state.opened += 1;
        Ok(MemoryConnection {
            id: state.next_connection_id,
            database: None,
            server: self.server.clone(),
        })
    }
}

/// One session against a [`MemoryServer`].
pub struct MemoryConnection {
    id: usize,
    database: Option<String>,
    server: MemoryServer,
}

impl MemoryConnection {
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl ServerConnection for MemoryConnection {
    async fn fetch(&mut self, sql: &str) -> DatabaseResult<Vec<RowMap>> {
        let server = self.server.clone();
        match server.run(self, sql, &[]).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Mutation(_) => Ok(Vec::new()),
        }
    }

    async fn fetch_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<Vec<RowMap>> {
        let server = self.server.clone();
        match server.run(self, sql, params).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Mutation(_) => Ok(Vec::new()),
        }
    }

    async fn execute_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<u64> {
        let server = self.server.clone();
        match server.run(self, sql, params).await? {
            Outcome::Rows(_) => Ok(0),
            Outcome::Mutation(summary) => Ok(summary.affected_rows),
        }
    }

    async fn execute_raw(&mut self, sql: &str) -> DatabaseResult<QueryResult> {
        let server = self.server.clone();
        match server.run(self, sql, &[]).await? {
            Outcome::Rows(rows) => Ok(QueryResult::Rows(rows)),
            Outcome::Mutation(summary) => Ok(QueryResult::Mutation(summary)),
        }
    }

    async fn use_database(&mut self, database: &Identifier) -> DatabaseResult<()> {
        let server = self.server.clone();
        server
            .run(self, &format!("USE {}", database.quoted()), &[])
            .await?;
        Ok(())
    }

    async fn ping(&mut self) -> DatabaseResult<()> {
        Ok(())
    }

    async fn close(self) -> DatabaseResult<()> {
        self.server.state.lock().closed += 1;
        Ok(())
    }
}

fn find_database<'a>(databases: &'a [MemoryDatabase], name: &str) -> Option<&'a MemoryDatabase> {
    databases.iter().find(|db| db.name == name)
}

fn find_database_mut<'a>(
    databases: &'a mut [MemoryDatabase],
    name: &str,
) -> Option<&'a mut MemoryDatabase> {
    databases.iter_mut().find(|db| db.name == name)
}

fn normalize(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

fn strip_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    sql.get(..keyword.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
        .map(|_| &sql[keyword.len()..])
}

/// A quoted or bare identifier at the start of `input`.
fn read_identifier(input: &str) -> Option<(String, &str)> {
    if input.starts_with('`') {
        return unquote_identifier(input);
    }
    let end = input
        .find(|c: char| c.is_whitespace() || matches!(c, '.' | '(' | ')' | ',' | '='))
        .unwrap_or(input.len());
    (end > 0).then(|| (input[..end].to_string(), &input[end..]))
}

/// `db.table` or `table`, resolving the latter against the session database.
fn read_table_ref<'a>(
    input: &'a str,
    conn: &MemoryConnection,
) -> Option<(Option<String>, String, &'a str)> {
    let (first, rest) = read_identifier(input.trim_start())?;
    match rest.strip_prefix('.') {
        Some(rest) => {
            let (table, rest) = read_identifier(rest)?;
            Some((Some(first), table, rest))
        }
        None => Some((conn.database.clone(), first, rest)),
    }
}

fn read_parenthesized(input: &str) -> Option<(&str, &str)> {
    let inner = input.strip_prefix('(')?;
    let mut depth = 1usize;
    let mut quoted = false;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    return Some((&inner[..idx], &inner[idx + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_literal<'a>(raw: &str, params: &mut impl Iterator<Item = &'a String>) -> Option<Value> {
    if raw == "?" {
        return params.next().map(|p| Value::String(p.clone()));
    }
    if raw.eq_ignore_ascii_case("NULL") {
        return Some(Value::Null);
    }
    if let Some(text) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Some(Value::String(text.replace("''", "'")));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::from(n));
    }
    raw.parse::<f64>().ok().map(Value::from)
}

fn matches_param(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn single(column: &str, value: Value) -> RowMap {
    let mut row = RowMap::new();
    row.push(column, value);
    row
}

fn syntax_error(sql: &str) -> DatabaseError {
    let near: String = sql.chars().take(80).collect();
    DatabaseError::Server(format!(
        "You have an error in your SQL syntax; check the manual that corresponds to your MySQL server version for the right syntax to use near '{}' at line 1",
        near
    ))
}

fn no_database() -> DatabaseError {
    DatabaseError::Server("No database selected".to_string())
}

fn unknown_database(name: &str) -> DatabaseError {
    DatabaseError::Server(format!("Unknown database '{}'", name))
}

fn missing_table(database: &str, table: &str) -> DatabaseError {
    DatabaseError::Server(format!("Table '{}.{}' doesn't exist", database, table))
}
