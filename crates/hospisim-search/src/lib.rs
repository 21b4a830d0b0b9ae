//! Query engine for clinical service stores.
//!
//! A flat set of named search parameters is compiled against a
//! [`PredicateRegistry`] into a [`SearchQuery`]: a conjunction of typed predicates
//! plus a page window. Predicates evaluate in memory ([`Predicate::matches`]) and
//! render to PostgreSQL ([`sql`]).

pub mod error;
pub mod parameters;
pub mod query;
pub mod registry;
pub mod sql;

pub use error::SearchError;
pub use parameters::{FieldPath, MatchKind, SearchParamDef, SearchParamType};
pub use query::{Page, Predicate, SearchQuery, SearchRequest, SearchSettings};
pub use registry::PredicateRegistry;
pub use sql::{SqlBind, SqlFilter};
