//! The lexical environment: a base IRI and a prefix table.

use crate::model::{Node, NodeKind};
use crate::sink::Sink;
use crate::status::Status;
use crate::uri::Uri;

/// An environment mapping prefixes to IRIs, with an optional base IRI.
///
/// The table keeps insertion order so prefixes are written back out
/// deterministically; setting an existing prefix overwrites it in place.
#[derive(Debug, Clone, Default)]
pub struct Env {
    base: Option<Node>,
    prefixes: Vec<(Node, Node)>,
}

impl Env {
    pub fn new(base: Option<&Node>) -> Env {
        let mut env = Env::default();
        if let Some(base) = base {
            let _ = env.set_base_uri(base);
        }
        env
    }

    /// The current base IRI, if one is set.
    pub fn base_uri(&self) -> Option<&Node> {
        self.base.as_ref()
    }

    /// Sets the base IRI. Fails with `BadArg` unless `uri` is a
    /// non-empty absolute IRI node.
    pub fn set_base_uri(&mut self, uri: &Node) -> Result<(), Status> {
        if uri.kind() != NodeKind::Iri
            || uri.is_empty()
            || !Uri::parse(uri.string()).is_absolute()
        {
            return Err(Status::BadArg);
        }
        self.base = Some(uri.clone());
        Ok(())
    }

    /// Binds `name` to `uri`, which must be an IRI node. An existing
    /// binding for the same name is replaced without changing its
    /// position.
    pub fn set_prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
        if uri.kind() != NodeKind::Iri {
            return Err(Status::BadArg);
        }
        match self
            .prefixes
            .iter_mut()
            .find(|(n, _)| n.string() == name.string())
        {
            Some(entry) => entry.1 = uri.clone(),
            None => self.prefixes.push((name.clone(), uri.clone())),
        }
        Ok(())
    }

    /// `set_prefix` over raw strings.
    pub fn set_prefix_from_strings(&mut self, name: &str, uri: &str) -> Result<(), Status> {
        self.set_prefix(&Node::literal(name), &Node::iri(uri))
    }

    /// Expands `node` to an IRI node: a CURIE through the prefix table,
    /// an IRI by resolution against the base. Returns None for any other
    /// node kind, an unknown prefix, or a missing base.
    pub fn expand(&self, node: &Node) -> Option<Node> {
        match node.kind() {
            NodeKind::Curie => {
                let (prefix, suffix) = split_curie(node.string());
                let uri = self.find(prefix)?;
                Some(Node::iri(format!("{}{}", uri.string(), suffix)))
            }
            NodeKind::Iri => node.resolve(self.base.as_ref()?),
            _ => None,
        }
    }

    /// Qualifies `iri` into a CURIE using the longest prefix whose IRI is
    /// a prefix of it, or returns None when no prefix matches.
    pub fn qualify(&self, iri: &Node) -> Option<Node> {
        if iri.kind() != NodeKind::Iri {
            return None;
        }
        let mut best: Option<&(Node, Node)> = None;
        for entry in &self.prefixes {
            let len = entry.1.len();
            if len > 0
                && iri.string().starts_with(entry.1.string())
                && best.map_or(true, |(_, uri)| len > uri.len())
            {
                best = Some(entry);
            }
        }
        let (name, uri) = best?;
        Some(Node::curie(format!(
            "{}:{}",
            name.string(),
            &iri.string()[uri.len()..]
        )))
    }

    /// Writes every prefix binding to `sink`, in insertion order.
    pub fn write_prefixes<S: Sink>(&self, sink: &mut S) -> Result<(), Status> {
        for (name, uri) in &self.prefixes {
            sink.prefix(name, uri)?;
        }
        Ok(())
    }

    fn find(&self, prefix: &str) -> Option<&Node> {
        self.prefixes
            .iter()
            .find(|(n, _)| n.string() == prefix)
            .map(|(_, uri)| uri)
    }
}

impl PartialEq for Env {
    /// Environments are equal when their bases are equal and their
    /// prefix tables bind the same pairs, in any order.
    fn eq(&self, other: &Env) -> bool {
        self.base == other.base
            && self.prefixes.len() == other.prefixes.len()
            && self
                .prefixes
                .iter()
                .all(|entry| other.prefixes.contains(entry))
    }
}

fn split_curie(s: &str) -> (&str, &str) {
    match s.find(':') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}
