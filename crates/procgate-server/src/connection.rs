use crate::config::DEFAULT_CONNECTION;
use procgate_core::error::GatewayError;
use procgate_sql::executor::ResolvedConnection;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only registry of named connection strings, shared by all requests.
#[derive(Clone)]
pub struct ConnectionResolver {
    // lower-cased name -> (registered name, connection string)
    registry: Arc<HashMap<String, (String, String)>>,
}

impl ConnectionResolver {
    pub fn new(connection_strings: &HashMap<String, String>) -> Self {
        let registry = connection_strings
            .iter()
            .map(|(name, value)| (name.to_lowercase(), (name.clone(), value.clone())))
            .collect();
        Self {
            registry: Arc::new(registry),
        }
    }

    /// `Reporting` selects `ReportingConnection`; no name selects the default.
    /// Names match case-insensitively. Reachability is not checked here.
    pub fn resolve(&self, application_name: Option<&str>) -> Result<ResolvedConnection, GatewayError> {
        let wanted = match application_name {
            Some(app) if !app.is_empty() => format!("{app}Connection"),
            _ => DEFAULT_CONNECTION.to_string(),
        };
        let (name, connection_string) = self
            .registry
            .get(&wanted.to_lowercase())
            .ok_or_else(|| {
                GatewayError::Configuration(format!("connection string {wanted} is not registered"))
            })?;
        Ok(ResolvedConnection::new(name.clone(), connection_string.clone()))
    }
}
