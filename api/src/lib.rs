//! Common data structures for RDF text syntax readers and writers.
//!
//! This crate defines the pieces shared by every syntax implementation:
//!
//! * [`Node`](model::Node), the immutable value for IRIs, CURIEs,
//!   literals, blank nodes and variables, and [`Statement`](model::Statement).
//! * [`Status`](status::Status) and [`Error`](status::Error), the closed
//!   set of outcome codes.
//! * [`Sink`](sink::Sink), the event interface readers drive and writers
//!   implement.
//! * [`Env`](env::Env), the base IRI and prefix environment that expands
//!   CURIEs and qualifies IRIs.
//! * [`World`](world::World), the lifecycle root owning interned
//!   vocabulary nodes, the blank node id counter and the error sink.
//! * [`uri`], resolution and relativization per RFC 3986.
//!
//! ```
//! use tern_api::{Env, Node};
//!
//! let mut env = Env::new(None);
//! env.set_prefix_from_strings("schema", "http://schema.org/")?;
//!
//! let expanded = env.expand(&Node::curie("schema:Person")).unwrap();
//! assert_eq!(expanded.string(), "http://schema.org/Person");
//!
//! let qualified = env.qualify(&expanded).unwrap();
//! assert_eq!(qualified.string(), "schema:Person");
//! # Ok::<_, tern_api::Status>(())
//! ```

pub mod env;
pub mod model;
pub mod sink;
pub mod status;
pub mod text;
pub mod uri;
pub mod world;

pub use crate::env::Env;
pub use crate::model::{
    Cursor, Node, NodeFlags, NodeKind, Statement, StatementFlags, NS_RDF, NS_XSD,
};
pub use crate::sink::Sink;
pub use crate::status::{Error, Status};
pub use crate::world::World;
