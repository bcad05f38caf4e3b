use procgate_core::error::GatewayError;
use procgate_core::types::ParameterMap;
use serde_json::{Map, Value};

/// Substrings that reject a procedure name outright.
///
/// Matching is case-sensitive and purely textual, so `select` or `S E L E C T`
/// pass. Identifiers are quoted by the executor regardless; this list only
/// keeps the historical rejection behaviour.
pub const DENYLIST: [&str; 9] = [
    ";", "SELECT", "DROP", "ALTER", "CREATE", "UPDATE", "DELETE", "INSERT", "EXEC",
];

pub fn guard_procedure_name(name: Option<&str>) -> Result<&str, GatewayError> {
    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(GatewayError::InjectionRejected(
                "procedure name is empty".into(),
            ))
        }
    };
    if let Some(token) = DENYLIST.iter().find(|token| name.contains(*token)) {
        return Err(GatewayError::InjectionRejected(format!(
            "procedure name contains forbidden token {token:?}"
        )));
    }
    Ok(name)
}

/// Binds every request parameter as text, whatever its JSON type was.
pub fn bind_parameters(parameters: &Map<String, Value>) -> ParameterMap {
    parameters
        .iter()
        .map(|(name, value)| (name.clone(), stringify(value)))
        .collect()
}

pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
