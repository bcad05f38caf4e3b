pub mod executor;
pub mod guard;
pub mod normalizer;
pub mod postgres;

pub use executor::{ProcedureCall, ProcedureExecutor, ResolvedConnection};
pub use guard::{bind_parameters, guard_procedure_name};
pub use normalizer::{normalize_rows, to_camel_case, NormalizeOptions};
pub use postgres::PgProcedureExecutor;
