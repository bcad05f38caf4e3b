use crate::config::SecurityConfig;
use procgate_core::error::GatewayError;

/// Shared-secret check on the `Authorization` header.
///
/// This is a plain case-insensitive equality test against one configured
/// secret: no signature, no expiry, no per-client scope.
#[derive(Clone)]
pub struct CredentialGate {
    secret: String,
}

impl CredentialGate {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            secret: config.shared_secret.clone(),
        }
    }

    /// Takes the token after the first space of `<scheme> <secret>`.
    pub fn check(&self, authorization: Option<&str>) -> Result<(), GatewayError> {
        let token = authorization
            .and_then(|header| header.split(' ').nth(1))
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::Unauthenticated)?;
        let matches = token
            .chars()
            .flat_map(char::to_uppercase)
            .eq(self.secret.chars().flat_map(char::to_uppercase));
        if matches {
            Ok(())
        } else {
            Err(GatewayError::Unauthenticated)
        }
    }
}
