use procgate_core::error::GatewayError;
use procgate_core::types::{RawRow, ResultRow, ResultSet};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub expand_nested: bool,
    pub max_depth: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            expand_nested: true,
            max_depth: 64,
        }
    }
}

pub fn normalize_rows(rows: Vec<RawRow>, options: &NormalizeOptions) -> Result<ResultSet, GatewayError> {
    rows.into_iter()
        .map(|row| normalize_row(row, options))
        .collect()
}

pub fn normalize_row(row: RawRow, options: &NormalizeOptions) -> Result<ResultRow, GatewayError> {
    let mut normalized = Map::with_capacity(row.len());
    for (column, value) in row {
        let value = match value {
            Value::String(text) if looks_like_json(&text) => expand_text(&column, &text, options, 1)?,
            nested @ (Value::Object(_) | Value::Array(_)) if options.expand_nested => {
                expand_nested(&column, nested, options, 1)?
            }
            other => other,
        };
        normalized.insert(to_camel_case(&column), value);
    }
    Ok(normalized)
}

/// Prefix check only; the parse that follows decides.
pub fn looks_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with("[{")
}

fn expand_text(
    column: &str,
    text: &str,
    options: &NormalizeOptions,
    depth: usize,
) -> Result<Value, GatewayError> {
    let parsed: Value = serde_json::from_str(text).map_err(|err| {
        GatewayError::Execution(format!("column {column} holds invalid JSON: {err}"))
    })?;
    if options.expand_nested {
        expand_nested(column, parsed, options, depth)
    } else {
        Ok(parsed)
    }
}

fn expand_nested(
    column: &str,
    value: Value,
    options: &NormalizeOptions,
    depth: usize,
) -> Result<Value, GatewayError> {
    if depth > options.max_depth {
        return Err(GatewayError::Execution(format!(
            "column {column} nests JSON deeper than {} levels",
            options.max_depth
        )));
    }
    match value {
        Value::Object(map) => {
            let mut expanded = Map::with_capacity(map.len());
            for (key, value) in map {
                expanded.insert(key, expand_nested(column, value, options, depth + 1)?);
            }
            Ok(Value::Object(expanded))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| expand_nested(column, item, options, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        // Below the top level a string that fails to parse stays a string.
        Value::String(text) if looks_like_json(&text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => expand_nested(column, parsed, options, depth + 1),
            Err(_) => Ok(Value::String(text)),
        },
        other => Ok(other),
    }
}

/// Lower-cases the leading run of upper-case letters, keeping the last one of
/// a run upper-case when it starts the next word (`IDValue` -> `idValue`).
pub fn to_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    match chars.first() {
        Some(first) if first.is_uppercase() => {}
        _ => return name.to_string(),
    }

    let mut lowered = 0;
    for idx in 0..chars.len() {
        if idx == 1 && !chars[idx].is_uppercase() {
            break;
        }
        let next = chars.get(idx + 1);
        if idx > 0 {
            if let Some(next) = next {
                if !next.is_uppercase() {
                    if next.is_whitespace() {
                        lowered = idx + 1;
                    }
                    break;
                }
            }
        }
        lowered = idx + 1;
    }

    let mut out = String::with_capacity(name.len());
    for c in &chars[..lowered] {
        out.extend(c.to_lowercase());
    }
    out.extend(&chars[lowered..]);
    out
}
