//! The event interface between readers and writers.

use crate::model::{Node, Statement, StatementFlags};
use crate::status::Status;

/// A consumer of reader events.
///
/// Every handler defaults to a no-op, so implementations override only
/// the events they observe. Nodes are borrowed for the duration of the
/// call; a sink that retains them must copy. Returning an error status
/// aborts the read that is driving the sink.
pub trait Sink {
    /// Called when the base IRI changes.
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        let _ = uri;
        Ok(())
    }

    /// Called for each prefix binding.
    fn prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
        let _ = (name, uri);
        Ok(())
    }

    /// Called for each statement.
    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        let _ = (flags, statement);
        Ok(())
    }

    /// Called when the inline property list of the anonymous node `node`
    /// ends, after an `ANON_O` statement introduced it.
    fn end(&mut self, node: &Node) -> Result<(), Status> {
        let _ = node;
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        (**self).base(uri)
    }

    fn prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
        (**self).prefix(name, uri)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        (**self).statement(flags, statement)
    }

    fn end(&mut self, node: &Node) -> Result<(), Status> {
        (**self).end(node)
    }
}
