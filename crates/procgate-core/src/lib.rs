pub mod error;
pub mod types;
pub mod version;

pub use error::GatewayError;
pub use types::{GatewayResponse, InvocationRequest, ParameterMap, RawRow, ResultRow, ResultSet};
pub use version::ApiVersion;
