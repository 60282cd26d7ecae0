//! The RDF node and statement data model.

use crate::status::Status;
use crate::text;
use crate::uri;
use bitflags::bitflags;
use oxilangtag::LanguageTag;

/// The RDF namespace.
pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// The XML Schema datatypes namespace.
pub const NS_XSD: &str = "http://www.w3.org/2001/XMLSchema#";

bitflags! {
    /// Properties of a node's string, computed once at construction.
    pub struct NodeFlags: u32 {
        const HAS_NEWLINE = 1;
        const HAS_QUOTE = 1 << 1;
        const HAS_ESCAPE = 1 << 2;
    }
}

bitflags! {
    /// Abbreviation structure of an emitted statement.
    pub struct StatementFlags: u32 {
        /// The subject is an empty anonymous node (`[]`).
        const EMPTY_S = 1;
        /// The object is an empty anonymous node (`[]`).
        const EMPTY_O = 1 << 1;
        /// The subject is an inline anonymous node with properties.
        const ANON_S = 1 << 2;
        /// The object is an inline anonymous node whose properties follow,
        /// terminated by an `end` event.
        const ANON_O = 1 << 3;
        /// The subject is the head of a collection.
        const LIST_S = 1 << 4;
        /// The object is the head of a collection.
        const LIST_O = 1 << 5;
    }
}

/// The kind of an abstract RDF node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An IRI (possibly relative).
    Iri,
    /// A compact `prefix:suffix` IRI that an environment expands.
    Curie,
    /// A literal, optionally carrying a datatype or language tag.
    Literal,
    /// A blank node identifier, scoped to a document.
    Blank,
    /// A named query variable.
    Variable,
}

/// The literal's attachment: a datatype or a language tag, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralMeta {
    Plain,
    /// A literal node holding a tag like `en` or `en-ca`.
    Language(Box<Node>),
    /// An IRI node naming the datatype.
    Datatype(Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Repr {
    Iri,
    Curie,
    Blank,
    Variable,
    Literal(LiteralMeta),
}

/// An immutable RDF node: a kind, a UTF-8 string, and flags describing
/// the string. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    string: String,
    flags: NodeFlags,
    repr: Repr,
}

impl Node {
    fn make(string: String, repr: Repr) -> Node {
        let flags = text::string_flags(&string);
        Node { string, flags, repr }
    }

    /// Creates a plain literal with no datatype or language.
    pub fn literal(value: impl Into<String>) -> Node {
        Node::make(value.into(), Repr::Literal(LiteralMeta::Plain))
    }

    /// Creates a plain literal from at most `max_len` leading bytes of
    /// `value`, clamped back to a character boundary.
    pub fn literal_prefix(value: &str, max_len: usize) -> Node {
        let mut end = max_len.min(value.len());
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Node::literal(&value[..end])
    }

    /// Creates a literal with a language tag, or a plain literal when
    /// `language` is None. Returns None when the tag is not well-formed
    /// BCP 47.
    pub fn plain_literal(value: &str, language: Option<&str>) -> Option<Node> {
        match language {
            None => Some(Node::literal(value)),
            Some(tag) => {
                LanguageTag::parse(tag).ok()?;
                let tag = Node::literal(tag);
                Some(Node::make(
                    value.to_string(),
                    Repr::Literal(LiteralMeta::Language(Box::new(tag))),
                ))
            }
        }
    }

    /// Creates a literal with a datatype, or a plain literal when
    /// `datatype` is None. Returns None when the datatype is not an IRI
    /// node.
    pub fn typed_literal(value: &str, datatype: Option<&Node>) -> Option<Node> {
        match datatype {
            None => Some(Node::literal(value)),
            Some(datatype) if datatype.kind() == NodeKind::Iri => Some(Node::make(
                value.to_string(),
                Repr::Literal(LiteralMeta::Datatype(Box::new(datatype.clone()))),
            )),
            Some(_) => None,
        }
    }

    /// The general literal constructor: at most one of `datatype` and
    /// `language` may be given.
    pub fn literal_with(
        value: &str,
        datatype: Option<&Node>,
        language: Option<&str>,
    ) -> Option<Node> {
        match (datatype, language) {
            (Some(_), Some(_)) => None,
            (Some(_), None) => Node::typed_literal(value, datatype),
            _ => Node::plain_literal(value, language),
        }
    }

    /// Creates an IRI node. The string is not validated; resolution and
    /// qualification treat nodes without a scheme as relative references.
    pub fn iri(value: impl Into<String>) -> Node {
        Node::make(value.into(), Repr::Iri)
    }

    /// Creates an IRI node for `value` resolved against `base`. An empty
    /// `value` yields a copy of `base`. Returns None when `base` is not
    /// an absolute IRI node.
    pub fn resolved_iri(value: &str, base: &Node) -> Option<Node> {
        if base.kind() != NodeKind::Iri {
            return None;
        }
        if value.is_empty() {
            return if uri::Uri::parse(base.string()).is_absolute() {
                Some(base.clone())
            } else {
                None
            };
        }
        uri::resolve(value, base.string()).map(Node::iri)
    }

    /// Creates an IRI node for `value` written relative to `base`, not
    /// escaping above `root`'s directory when one is given. Returns None
    /// when `base` is not an IRI node.
    pub fn relative_iri(value: &str, base: &Node, root: Option<&Node>) -> Option<Node> {
        if base.kind() != NodeKind::Iri {
            return None;
        }
        if let Some(root) = root {
            if root.kind() != NodeKind::Iri {
                return None;
            }
        }
        Some(Node::iri(uri::relative(
            value,
            base.string(),
            root.map(Node::string),
        )))
    }

    /// Resolves this IRI node against an absolute IRI `base`. Returns
    /// None when either node is not an IRI or `base` is not absolute.
    pub fn resolve(&self, base: &Node) -> Option<Node> {
        if self.kind() != NodeKind::Iri || base.kind() != NodeKind::Iri {
            return None;
        }
        uri::resolve(&self.string, base.string()).map(Node::iri)
    }

    /// Creates a CURIE node from a `prefix:suffix` string.
    pub fn curie(value: impl Into<String>) -> Node {
        Node::make(value.into(), Repr::Curie)
    }

    /// Creates a blank node from an identifier (without a `_:` sigil).
    pub fn blank(value: impl Into<String>) -> Node {
        Node::make(value.into(), Repr::Blank)
    }

    /// Creates a variable node from a name (without a `?` sigil).
    pub fn variable(value: impl Into<String>) -> Node {
        Node::make(value.into(), Repr::Variable)
    }

    /// Creates an `xsd:integer` literal, or one with the given datatype.
    /// Returns None when `datatype` is not an IRI node.
    pub fn integer(value: i64, datatype: Option<&Node>) -> Option<Node> {
        let datatype = default_datatype(datatype, "integer")?;
        Node::typed_literal(&value.to_string(), Some(&datatype))
    }

    /// Creates an `xsd:decimal` literal with at most `frac_digits`
    /// fractional digits. Returns None for NaN or infinite values, which
    /// have no decimal form.
    pub fn decimal(value: f64, frac_digits: u32, datatype: Option<&Node>) -> Option<Node> {
        let datatype = default_datatype(datatype, "decimal")?;
        let string = text::format_decimal(value, frac_digits)?;
        Node::typed_literal(&string, Some(&datatype))
    }

    /// Creates an `xsd:boolean` literal.
    pub fn boolean(value: bool) -> Node {
        Node::make(
            if value { "true" } else { "false" }.to_string(),
            Repr::Literal(LiteralMeta::Datatype(Box::new(Node::iri(format!(
                "{}boolean",
                NS_XSD
            ))))),
        )
    }

    /// Creates an `xsd:base64Binary` literal encoding `data`, optionally
    /// wrapped at 76 columns. Returns None for empty input.
    pub fn blob(data: &[u8], wrap_lines: bool, datatype: Option<&Node>) -> Option<Node> {
        if data.is_empty() {
            return None;
        }
        let datatype = default_datatype(datatype, "base64Binary")?;
        Node::typed_literal(&text::encode_base64(data, wrap_lines), Some(&datatype))
    }

    /// Creates an IRI node for a local filesystem path.
    pub fn file_uri(path: &str, hostname: Option<&str>) -> Node {
        Node::iri(uri::file_uri(path, hostname))
    }

    pub fn kind(&self) -> NodeKind {
        match &self.repr {
            Repr::Iri => NodeKind::Iri,
            Repr::Curie => NodeKind::Curie,
            Repr::Blank => NodeKind::Blank,
            Repr::Variable => NodeKind::Variable,
            Repr::Literal(_) => NodeKind::Literal,
        }
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    /// The length of the node's string in bytes.
    pub fn len(&self) -> usize {
        self.string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.string.is_empty()
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// The datatype of a typed literal.
    pub fn datatype(&self) -> Option<&Node> {
        match &self.repr {
            Repr::Literal(LiteralMeta::Datatype(datatype)) => Some(datatype),
            _ => None,
        }
    }

    /// The language tag node of a language tagged literal.
    pub fn language(&self) -> Option<&Node> {
        match &self.repr {
            Repr::Literal(LiteralMeta::Language(language)) => Some(language),
            _ => None,
        }
    }
}

fn default_datatype(datatype: Option<&Node>, xsd_name: &str) -> Option<Node> {
    match datatype {
        Some(node) if node.kind() == NodeKind::Iri => Some(node.clone()),
        Some(_) => None,
        None => Some(Node::iri(format!("{}{}", NS_XSD, xsd_name))),
    }
}

/// The origin of a statement or error within a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// The name of the source, usually a file IRI node.
    pub file: Node,
    /// Line number, 1-based.
    pub line: u32,
    /// Column number, 1-based.
    pub col: u32,
}

/// A statement: a triple, or a quad when `graph` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub graph: Option<Node>,
    pub cursor: Option<Cursor>,
}

impl Statement {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Statement {
        Statement {
            subject,
            predicate,
            object,
            graph: None,
            cursor: None,
        }
    }

    /// Checks the node kind constraints: the subject must be an IRI or
    /// blank node, the predicate an IRI, and the graph (if any) an IRI
    /// or blank node.
    pub fn check(&self) -> Result<(), Status> {
        match self.subject.kind() {
            NodeKind::Iri | NodeKind::Blank => {}
            _ => return Err(Status::BadArg),
        }
        if self.predicate.kind() != NodeKind::Iri {
            return Err(Status::BadArg);
        }
        if let Some(graph) = &self.graph {
            match graph.kind() {
                NodeKind::Iri | NodeKind::Blank => {}
                _ => return Err(Status::BadArg),
            }
        }
        Ok(())
    }
}
