use crate::error::GatewayError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Column name to value, in the order the database returned the columns.
pub type RawRow = Map<String, Value>;
pub type ResultRow = Map<String, Value>;
pub type ResultSet = Vec<ResultRow>;

/// Bound parameter values, already coerced to text.
pub type ParameterMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub procedure_name: Option<String>,
    pub parameters: Map<String, Value>,
}

impl InvocationRequest {
    pub fn from_body(body: &Value) -> Result<Self, GatewayError> {
        let object = body
            .as_object()
            .ok_or_else(|| GatewayError::MalformedRequest("body must be a JSON object".into()))?;
        let procedure_name = object
            .get("sqlCommand")
            .and_then(Value::as_str)
            .map(str::to_string);
        let parameters = match object.get("parameters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(GatewayError::MalformedRequest(
                    "parameters must be a JSON object".into(),
                ))
            }
        };
        Ok(Self {
            procedure_name,
            parameters,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum GatewayResponse {
    Success {
        ok: bool,
        version: String,
        results: ResultSet,
    },
    Failure {
        ok: bool,
        error: String,
        data: Value,
    },
    Probe {
        ok: bool,
        version: String,
    },
}

impl GatewayResponse {
    pub fn success(version: String, results: ResultSet) -> Self {
        GatewayResponse::Success {
            ok: true,
            version,
            results,
        }
    }

    pub fn failure(error: &GatewayError, data: Value) -> Self {
        GatewayResponse::Failure {
            ok: false,
            error: error.to_string(),
            data,
        }
    }

    pub fn probe(version: String) -> Self {
        GatewayResponse::Probe { ok: true, version }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            GatewayResponse::Success { ok, .. }
            | GatewayResponse::Failure { ok, .. }
            | GatewayResponse::Probe { ok, .. } => *ok,
        }
    }
}
