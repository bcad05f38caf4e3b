use crate::auth::CredentialGate;
use crate::config::Config;
use crate::connection::ConnectionResolver;
use procgate_core::error::GatewayError;
use procgate_core::types::{InvocationRequest, ResultSet};
use procgate_sql::executor::{ProcedureCall, ProcedureExecutor};
use procgate_sql::normalizer::{normalize_rows, NormalizeOptions};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestHeaders<'a> {
    pub authorization: Option<&'a str>,
    pub application_name: Option<&'a str>,
}

/// The per-request pipeline: gate, resolve, guard and bind, execute, normalize.
///
/// Holds no per-request state; one instance serves all requests concurrently.
#[derive(Clone)]
pub struct Gateway {
    gate: CredentialGate,
    resolver: ConnectionResolver,
    executor: Arc<dyn ProcedureExecutor>,
    normalize: NormalizeOptions,
}

impl Gateway {
    pub fn new(
        gate: CredentialGate,
        resolver: ConnectionResolver,
        executor: Arc<dyn ProcedureExecutor>,
        normalize: NormalizeOptions,
    ) -> Self {
        Self {
            gate,
            resolver,
            executor,
            normalize,
        }
    }

    pub fn from_config(config: &Config, executor: Arc<dyn ProcedureExecutor>) -> Self {
        Self::new(
            CredentialGate::new(&config.security),
            ConnectionResolver::new(&config.connection_strings),
            executor,
            NormalizeOptions::from(&config.normalizer),
        )
    }

    pub async fn invoke(&self, headers: &RequestHeaders<'_>, body: &Value) -> Result<ResultSet, GatewayError> {
        self.gate.check(headers.authorization)?;
        let connection = self.resolver.resolve(headers.application_name)?;
        let request = InvocationRequest::from_body(body)?;
        let call = ProcedureCall::from_request(&request)?;
        let rows = self.executor.execute(&connection, &call).await?;
        normalize_rows(rows, &self.normalize)
    }
}
