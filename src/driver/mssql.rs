use std::collections::VecDeque;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use tiberius::{AuthMethod, Client, Config, Query, QueryItem, Row};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::{Driver, NativeResult};
use crate::error::{NativeError, NativeErrors, PeachySqlError, SqlException};
use crate::options::Options;
use crate::translation::words::{Word, main_verb, statement_words};
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::SqlValue;

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Connection settings for [`MssqlDriver::connect`].
#[derive(Debug, Clone)]
pub struct MssqlConnectOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub trust_cert: bool,
}

impl MssqlConnectOptions {
    #[must_use]
    pub fn builder(
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> MssqlConnectOptionsBuilder {
        MssqlConnectOptionsBuilder {
            opts: Self {
                server: server.into(),
                database: database.into(),
                user: user.into(),
                password: password.into(),
                port: None,
                instance_name: None,
                trust_cert: false,
            },
        }
    }

    fn tiberius_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.server);
        config.database(&self.database);
        config.port(self.port.unwrap_or(1433));
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if let Some(instance) = &self.instance_name {
            config.instance_name(instance);
        }
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }
}

/// Fluent builder for [`MssqlConnectOptions`].
#[derive(Debug, Clone)]
pub struct MssqlConnectOptionsBuilder {
    opts: MssqlConnectOptions,
}

impl MssqlConnectOptionsBuilder {
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.opts.instance_name = Some(instance_name.into());
        self
    }

    /// Accept the server certificate without validation (development servers).
    #[must_use]
    pub fn trust_cert(mut self, trust: bool) -> Self {
        self.opts.trust_cert = trust;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlConnectOptions {
        self.opts
    }
}

/// [`Driver`] over a tiberius client.
///
/// tiberius is async; the driver owns a current-thread runtime and blocks on each call.
/// `?` placeholders are rewritten to `@P1..@Pn` before the statement is sent. With
/// `multiple_row_sets`, rows come from the first result set that has columns; otherwise
/// from the first result set only.
pub struct MssqlDriver {
    runtime: Runtime,
    client: MssqlClient,
    multiple_row_sets: bool,
}

impl std::fmt::Debug for MssqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlDriver").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MssqlHandle {
    sql: String,
    columns: Option<Arc<Vec<String>>>,
    rows: VecDeque<Vec<SqlValue>>,
    affected: i64,
}

impl MssqlDriver {
    /// Open a connection with `opts`.
    ///
    /// # Errors
    /// Returns `PeachySqlError::Config` if the runtime cannot start or the server address
    /// does not resolve, and `PeachySqlError::Sql` if the connection fails.
    pub fn connect(opts: &MssqlConnectOptions) -> Result<Self, PeachySqlError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PeachySqlError::Config(format!("Failed to start runtime: {e}")))?;

        let port = opts.port.unwrap_or(1433);
        let addr = (opts.server.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| {
                PeachySqlError::Config(format!("Failed to resolve server address: {e}"))
            })?
            .next()
            .ok_or_else(|| {
                PeachySqlError::Config(format!("No valid address found for {}", opts.server))
            })?;

        let config = opts.tiberius_config();
        let client = runtime
            .block_on(async move {
                let tcp = TcpStream::connect(addr).await.map_err(|e| {
                    NativeErrors::from(NativeError::new(format!("TCP connection error: {e}")))
                })?;
                tcp.set_nodelay(true).map_err(|e| {
                    NativeErrors::from(NativeError::new(format!("TCP connection error: {e}")))
                })?;
                Client::connect(config, tcp.compat_write())
                    .await
                    .map_err(NativeErrors::from)
            })
            .map_err(|errors| {
                PeachySqlError::Sql(SqlException::from_native(
                    "Failed to connect",
                    &errors,
                    "",
                    Vec::new(),
                ))
            })?;

        debug!(server = %opts.server, database = %opts.database, "connected to SQL Server");
        Ok(Self {
            runtime,
            client,
            multiple_row_sets: false,
        })
    }

    pub fn client_mut(&mut self) -> &mut MssqlClient {
        &mut self.client
    }

    fn simple(&mut self, sql: &str) -> NativeResult<()> {
        let client = &mut self.client;
        self.runtime.block_on(async {
            client.execute(sql, &[]).await?;
            Ok(())
        })
    }
}

impl From<tiberius::error::Error> for NativeErrors {
    fn from(err: tiberius::error::Error) -> Self {
        let native = match &err {
            tiberius::error::Error::Server(token) => {
                NativeError::new(token.message()).with_code(i64::from(token.code()))
            }
            other => NativeError::new(other.to_string()),
        };
        NativeErrors(vec![native])
    }
}

/// Whether SQL Server will answer `sql` with rows rather than done counts.
fn returns_rows(sql: &str) -> bool {
    statement_words(sql)
        .iter()
        .any(|words| statement_returns_rows(words))
}

fn statement_returns_rows(words: &[Word]) -> bool {
    match main_verb(words) {
        Some("SELECT" | "EXEC" | "EXECUTE" | "VALUES") => true,
        Some("INSERT" | "UPDATE" | "DELETE" | "MERGE") => outputs_to_client(words),
        _ => false,
    }
}

/// `OUTPUT` without a following `INTO` streams the changed rows back.
fn outputs_to_client(words: &[Word]) -> bool {
    words
        .iter()
        .position(|w| w.text == "OUTPUT")
        .is_some_and(|at| !words[at + 1..].iter().any(|w| w.text == "INTO"))
}

/// Whether a result set announced while none is being read should be the one read.
fn reads_result_set(column_count: usize, multiple_row_sets: bool) -> bool {
    column_count > 0 || !multiple_row_sets
}

fn bind_query_params<'a>(sql: &'a str, params: &[SqlValue]) -> Query<'a> {
    let mut query = Query::new(translate_placeholders(sql, PlaceholderStyle::AtP));
    for param in params {
        match param {
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Timestamp(dt) => query.bind(*dt),
            SqlValue::Json(json) => query.bind(json.to_string()),
            SqlValue::Binary(bytes) => query.bind(bytes.clone()),
            SqlValue::Null => query.bind(Option::<String>::None),
        }
    }
    query
}

fn extract_value(row: &Row, idx: usize) -> SqlValue {
    if let Ok(Some(val)) = row.try_get::<i32, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i64, _>(idx) {
        return SqlValue::Int(val);
    }
    if let Ok(Some(val)) = row.try_get::<i16, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<u8, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<f32, _>(idx) {
        return SqlValue::Float(f64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<f64, _>(idx) {
        return SqlValue::Float(val);
    }
    if let Ok(Some(val)) = row.try_get::<bool, _>(idx) {
        return SqlValue::Bool(val);
    }
    if let Ok(Some(val)) = row.try_get::<NaiveDateTime, _>(idx) {
        return SqlValue::Timestamp(val);
    }
    if let Ok(Some(val)) = row.try_get::<&str, _>(idx) {
        return SqlValue::Text(val.to_string());
    }
    if let Ok(Some(val)) = row.try_get::<&[u8], _>(idx) {
        return SqlValue::Binary(val.to_vec());
    }
    SqlValue::Null
}

impl Driver for MssqlDriver {
    type Handle = MssqlHandle;

    fn configure(&mut self, options: &Options) {
        self.multiple_row_sets = options.multiple_row_sets();
    }

    fn prepare(&mut self, sql: &str) -> NativeResult<MssqlHandle> {
        // tiberius prepares through sp_executesql at execution time.
        Ok(MssqlHandle {
            sql: sql.to_string(),
            columns: None,
            rows: VecDeque::new(),
            affected: 0,
        })
    }

    fn bind_and_execute(
        &mut self,
        handle: &mut MssqlHandle,
        params: &[SqlValue],
    ) -> NativeResult<()> {
        let query = bind_query_params(&handle.sql, params);
        let client = &mut self.client;

        if returns_rows(&handle.sql) {
            let multiple_row_sets = self.multiple_row_sets;
            let (names, rows) = self.runtime.block_on(async {
                let mut stream = query.query(client).await?;
                let mut reading: Option<(usize, Vec<String>)> = None;
                let mut rows = VecDeque::new();
                while let Some(item) = stream.try_next().await? {
                    match item {
                        QueryItem::Metadata(meta) => {
                            if reading.is_none()
                                && reads_result_set(meta.columns().len(), multiple_row_sets)
                            {
                                let names = meta.columns().iter().map(|c| c.name().to_string());
                                reading = Some((meta.result_index(), names.collect()));
                            }
                        }
                        QueryItem::Row(row) => {
                            if reading.as_ref().is_some_and(|(idx, _)| *idx == row.result_index()) {
                                rows.push_back(
                                    (0..row.len()).map(|i| extract_value(&row, i)).collect(),
                                );
                            }
                        }
                    }
                }
                let names = reading.map(|(_, names)| names).filter(|n| !n.is_empty());
                Ok::<_, NativeErrors>((names, rows))
            })?;
            handle.affected = i64::try_from(rows.len()).unwrap_or(i64::MAX);
            handle.columns = names.map(Arc::new);
            handle.rows = rows;
        } else {
            let result = self
                .runtime
                .block_on(async { query.execute(client).await })?;
            let total: u64 = result.rows_affected().iter().sum();
            handle.affected = i64::try_from(total).unwrap_or(i64::MAX);
            handle.columns = None;
        }
        Ok(())
    }

    fn column_names(&self, handle: &MssqlHandle) -> Option<Arc<Vec<String>>> {
        handle.columns.clone()
    }

    fn rows_affected(&self, handle: &MssqlHandle) -> i64 {
        handle.affected
    }

    fn last_insert_id(&self, _handle: &MssqlHandle) -> Option<i64> {
        None
    }

    fn fetch_row(&mut self, handle: &mut MssqlHandle) -> NativeResult<Option<Vec<SqlValue>>> {
        Ok(handle.rows.pop_front())
    }

    fn close_statement(&mut self, handle: MssqlHandle) -> NativeResult<()> {
        drop(handle);
        Ok(())
    }

    fn begin_transaction(&mut self) -> NativeResult<()> {
        self.simple("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.simple("COMMIT TRANSACTION")
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.simple("ROLLBACK TRANSACTION")
    }
}
