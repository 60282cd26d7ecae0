//! Streaming reader and writer for the Turtle family of RDF text
//! syntaxes: [Turtle](https://www.w3.org/TR/turtle/),
//! [TriG](https://www.w3.org/TR/trig/),
//! [N-Triples](https://www.w3.org/TR/n-triples/) and
//! [N-Quads](https://www.w3.org/TR/n-quads/).
//!
//! The [`Reader`] is a recursive descent parser over a paged
//! [`ByteSource`] that emits statements to a [`Sink`](tern_api::Sink) as
//! it goes. It can read whole documents, or pull one chunk (a directive
//! or a statement group) at a time from a source that may momentarily
//! run dry, like a socket; see [`Reader::read_chunk`].
//!
//! The [`Writer`] implements the sink interface and formats the
//! statements back out, so reading into a writer transcribes between the
//! syntaxes:
//!
//! ```
//! use tern_api::{Env, World};
//! use tern_turtle::{ByteSource, Reader, Syntax, Writer};
//!
//! let doc = b"@prefix eg: <http://example.org/> .\neg:s eg:p eg:o1 , eg:o2 .\n";
//!
//! let world = World::new();
//! let writer = Writer::new(&world, Syntax::NTriples, Env::new(None), Vec::new());
//! let mut reader = Reader::new(&world, Syntax::Turtle, ByteSource::from_bytes(doc), writer);
//! reader.read_document()?;
//!
//! let out = reader.into_sink().finish()?;
//! assert_eq!(
//!     String::from_utf8_lossy(&out),
//!     "<http://example.org/s> <http://example.org/p> <http://example.org/o1> .\n\
//!      <http://example.org/s> <http://example.org/p> <http://example.org/o2> .\n"
//! );
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod formatter;
mod reader;
mod utils;

pub use crate::formatter::Writer;
pub use crate::reader::{Chunk, Reader, Syntax};
pub use crate::utils::ByteSource;
