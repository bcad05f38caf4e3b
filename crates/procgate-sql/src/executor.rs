use crate::guard::{bind_parameters, guard_procedure_name};
use async_trait::async_trait;
use procgate_core::error::GatewayError;
use procgate_core::types::{InvocationRequest, ParameterMap, RawRow};
use std::fmt;

/// A connection string picked for one request. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    name: String,
    connection_string: String,
}

impl ResolvedConnection {
    pub fn new(name: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_string: connection_string.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl fmt::Debug for ResolvedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConnection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A guarded procedure name with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureCall {
    pub procedure: String,
    pub parameters: ParameterMap,
}

impl ProcedureCall {
    pub fn from_request(request: &InvocationRequest) -> Result<Self, GatewayError> {
        let procedure = guard_procedure_name(request.procedure_name.as_deref())?;
        Ok(Self {
            procedure: procedure.to_string(),
            parameters: bind_parameters(&request.parameters),
        })
    }
}

#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    /// Runs `call` as a stored procedure and returns its rows in database order.
    ///
    /// The connection is opened and released inside this call.
    async fn execute(
        &self,
        connection: &ResolvedConnection,
        call: &ProcedureCall,
    ) -> Result<Vec<RawRow>, GatewayError>;
}
