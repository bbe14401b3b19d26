//! Method-provenance queries.
//!
//! Given parameter names, metric names and candidate tool names, [`build`]
//! produces a typed [`SelectQuery`] that finds every method instance exposing
//! those quantities, and [`execute`] runs it against a loaded
//! [`ProvenanceGraph`](provcheck_graph::ProvenanceGraph), returning a
//! [`ResultTable`] of normalized values.
//!
//! ```text
//! QuerySpec --build--> Query { SelectQuery, VariableMap }
//!                        |            |
//!                    to_sparql()   execute_with(engine, graph)
//!                        v            v
//!                   SPARQL text   ResultTable (sorted by first parameter)
//! ```

mod builder;
mod engine;
mod error;
mod execute;
mod ident;
mod ir;
mod spec;
mod table;
pub mod vocab;

pub use builder::{build, Query};
pub use engine::{Binding, InMemoryEngine, QueryEngine};
pub use error::QueryError;
pub use execute::{execute, execute_with};
pub use ident::{sanitize_identifier, Role, VariableBinding, VariableMap, TOOL_NAME_VAR};
pub use ir::{check_iri, Expression, GraphPattern, PatternTerm, SelectQuery, TriplePattern};
pub use spec::QuerySpec;
pub use table::{MethodRecord, NamedValue, ResultTable, Value};
