//! The world: interned vocabulary nodes, blank node ids, and the error
//! sink.

use crate::model::{Node, NS_RDF, NS_XSD};
use crate::status::{Error, Status};
use std::cell::{Cell, RefCell};
use std::fmt;

/// The lifecycle root shared by the readers and writers of one stream
/// processing setup.
///
/// A world is strictly single-threaded: interior mutability stands in for
/// the mutable process-wide state of the design, and the type is neither
/// `Send` nor `Sync`. Create it first, drop it last.
pub struct World {
    rdf_first: Node,
    rdf_nil: Node,
    rdf_rest: Node,
    rdf_type: Node,
    xsd_boolean: Node,
    xsd_decimal: Node,
    xsd_integer: Node,
    next_blank_id: Cell<u32>,
    error_sink: RefCell<Option<Box<dyn FnMut(&Error)>>>,
}

impl World {
    pub fn new() -> World {
        World {
            rdf_first: Node::iri(format!("{}first", NS_RDF)),
            rdf_nil: Node::iri(format!("{}nil", NS_RDF)),
            rdf_rest: Node::iri(format!("{}rest", NS_RDF)),
            rdf_type: Node::iri(format!("{}type", NS_RDF)),
            xsd_boolean: Node::iri(format!("{}boolean", NS_XSD)),
            xsd_decimal: Node::iri(format!("{}decimal", NS_XSD)),
            xsd_integer: Node::iri(format!("{}integer", NS_XSD)),
            next_blank_id: Cell::new(0),
            error_sink: RefCell::new(None),
        }
    }

    pub fn rdf_first(&self) -> &Node {
        &self.rdf_first
    }

    pub fn rdf_nil(&self) -> &Node {
        &self.rdf_nil
    }

    pub fn rdf_rest(&self) -> &Node {
        &self.rdf_rest
    }

    pub fn rdf_type(&self) -> &Node {
        &self.rdf_type
    }

    pub fn xsd_boolean(&self) -> &Node {
        &self.xsd_boolean
    }

    pub fn xsd_decimal(&self) -> &Node {
        &self.xsd_decimal
    }

    pub fn xsd_integer(&self) -> &Node {
        &self.xsd_integer
    }

    /// Returns a fresh blank node `b1`, `b2`, … The id is at most the
    /// letter plus ten decimal digits.
    pub fn blank(&self) -> Node {
        let n = self.next_blank_id.get().wrapping_add(1);
        self.next_blank_id.set(n);
        Node::blank(format!("b{}", n))
    }

    /// The number of blank ids handed out so far.
    pub fn blank_count(&self) -> u32 {
        self.next_blank_id.get()
    }

    /// Installs `sink` as the destination for reported errors, replacing
    /// the default stderr printer.
    pub fn set_error_sink(&self, sink: impl FnMut(&Error) + 'static) {
        *self.error_sink.borrow_mut() = Some(Box::new(sink));
    }

    /// Reports `error` to the installed sink, or prints it to stderr with
    /// a `file:line:col:` prefix when it has a cursor. Returns the
    /// error's status so reporting can be a tail expression.
    pub fn error(&self, error: &Error) -> Status {
        if let Some(sink) = self.error_sink.borrow_mut().as_mut() {
            sink(error);
        } else {
            eprintln!("error: {}", error);
        }
        error.status
    }
}

impl Default for World {
    fn default() -> World {
        World::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("next_blank_id", &self.next_blank_id.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_interned_nodes() {
        let world = World::new();
        assert_eq!(
            world.rdf_type().string(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#type"
        );
        assert_eq!(
            world.xsd_integer().string(),
            "http://www.w3.org/2001/XMLSchema#integer"
        );
    }

    #[test]
    fn test_get_blank() {
        let world = World::new();
        for i in 0..32u32 {
            let blank = world.blank();
            assert_eq!(blank.string(), format!("b{}", i + 1));
        }
        assert_eq!(world.blank_count(), 32);
    }

    #[test]
    fn test_error_sink() {
        let world = World::new();
        let seen: Rc<RefCell<Vec<Status>>> = Rc::default();
        let sink_seen = Rc::clone(&seen);
        world.set_error_sink(move |e| sink_seen.borrow_mut().push(e.status));

        let st = world.error(&Error::new(Status::BadSyntax, "so bad"));
        assert_eq!(st, Status::BadSyntax);
        assert_eq!(*seen.borrow(), vec![Status::BadSyntax]);
    }
}
