use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("procedure rejected: {0}")]
    InjectionRejected(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("unsupported api version: {0}")]
    UnsupportedVersion(String),
}

impl GatewayError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated => "unauthenticated",
            GatewayError::InjectionRejected(_) => "injection_rejected",
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Execution(_) => "execution",
            GatewayError::MalformedRequest(_) => "malformed_request",
            GatewayError::UnsupportedVersion(_) => "unsupported_version",
        }
    }
}
