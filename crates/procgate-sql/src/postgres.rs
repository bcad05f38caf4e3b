use crate::executor::{ProcedureCall, ProcedureExecutor, ResolvedConnection};
use async_trait::async_trait;
use procgate_core::error::GatewayError;
use procgate_core::types::RawRow;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::warn;

/// Runs procedures as Postgres functions, one connection per call.
///
/// Each call costs two round trips: a prepare that learns the argument types
/// the server infers, then the execution itself.
#[derive(Debug, Clone)]
pub struct PgProcedureExecutor {
    connect_timeout: Duration,
}

impl PgProcedureExecutor {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ProcedureExecutor for PgProcedureExecutor {
    async fn execute(
        &self,
        connection: &ResolvedConnection,
        call: &ProcedureCall,
    ) -> Result<Vec<RawRow>, GatewayError> {
        let mut config = Config::from_str(connection.connection_string()).map_err(|err| {
            GatewayError::Configuration(format!(
                "invalid connection string {}: {err}",
                connection.name()
            ))
        })?;
        config.connect_timeout(self.connect_timeout);
        let (client, driver) = config.connect(NoTls).await.map_err(execution)?;
        let driver = tokio::spawn(driver);

        let result = run_call(&client, call).await;

        // Dropping the last client handle terminates the session; wait for it
        // so the connection is closed before the response goes out.
        drop(client);
        match driver.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("postgres connection {} closed with error: {err}", connection.name()),
            Err(err) => warn!("postgres connection task for {} failed: {err}", connection.name()),
        }
        result
    }
}

async fn run_call(client: &Client, call: &ProcedureCall) -> Result<Vec<RawRow>, GatewayError> {
    let target = quote_procedure(&call.procedure)?;
    let names = call
        .parameters
        .keys()
        .map(|name| quote_parameter(name))
        .collect::<Result<Vec<_>, _>>()?;

    let probe = client
        .prepare(&probe_sql(&target, &names))
        .await
        .map_err(execution)?;
    if probe.params().len() != names.len() {
        return Err(GatewayError::Execution(format!(
            "procedure {} expects {} bound parameters, got {}",
            call.procedure,
            probe.params().len(),
            names.len()
        )));
    }

    let sql = call_sql(&target, &names, probe.params());
    let values: Vec<&(dyn ToSql + Sync)> = call
        .parameters
        .values()
        .map(|value| value as &(dyn ToSql + Sync))
        .collect();
    let rows = client.query(&sql, &values).await.map_err(execution)?;
    rows.iter().map(decode_row).collect()
}

/// Untyped placeholders let the server infer each argument type from the
/// function signature.
pub(crate) fn probe_sql(target: &str, names: &[String]) -> String {
    let args = names
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("{name} => ${}", idx + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT * FROM {target}({args})")
}

/// Every value travels as text and is cast server-side to the inferred type.
/// The call sits in a subquery so scalar, `SETOF <scalar>` and `void`
/// functions still yield a record for `row_to_json`.
pub(crate) fn call_sql(target: &str, names: &[String], types: &[Type]) -> String {
    let args = names
        .iter()
        .zip(types)
        .enumerate()
        .map(|(idx, (name, ty))| format!("{name} => ${}::text::{}", idx + 1, type_name(ty)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT row_to_json(r)::text FROM (SELECT * FROM {target}({args})) AS r")
}

fn type_name(ty: &Type) -> String {
    format!("{}.{}", quote_ident(ty.schema()), quote_ident(ty.name()))
}

fn decode_row(row: &Row) -> Result<RawRow, GatewayError> {
    let text: Option<String> = row.try_get(0).map_err(execution)?;
    match text {
        Some(text) => decode_record(&text),
        None => Ok(Map::new()),
    }
}

/// Numbers keep their database text (`arbitrary_precision`), so `numeric`
/// values are not rounded through f64.
pub(crate) fn decode_record(text: &str) -> Result<RawRow, GatewayError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GatewayError::Execution(format!(
            "procedure row is not a record: {other}"
        ))),
        Err(err) => Err(GatewayError::Execution(format!("undecodable row: {err}"))),
    }
}

/// Quotes each dotted part of a procedure name, e.g. `dbo.GetUsers` ->
/// `"dbo"."getusers"`.
pub fn quote_procedure(name: &str) -> Result<String, GatewayError> {
    let parts = name
        .split('.')
        .map(fold_identifier)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("."))
}

pub fn quote_parameter(name: &str) -> Result<String, GatewayError> {
    fold_identifier(name.strip_prefix('@').unwrap_or(name))
}

// Unquoted parts fold to lower case like bare SQL identifiers; parts written
// in double quotes keep their case.
fn fold_identifier(part: &str) -> Result<String, GatewayError> {
    let part = part.trim();
    let folded = if part.len() >= 2 && part.starts_with('"') && part.ends_with('"') {
        part[1..part.len() - 1].replace("\"\"", "\"")
    } else {
        part.to_ascii_lowercase()
    };
    if folded.is_empty() {
        return Err(GatewayError::Execution(format!("invalid identifier {part:?}")));
    }
    Ok(quote_ident(&folded))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn execution(err: tokio_postgres::Error) -> GatewayError {
    GatewayError::Execution(err.to_string())
}
