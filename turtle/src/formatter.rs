//! Writing statement streams back out as text.

use crate::reader::Syntax;
use std::io::Write;
use tern_api::{Env, Node, NodeFlags, NodeKind, Sink, Statement, StatementFlags, Status, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Subject,
    Predicate,
    Object,
    Graph,
}

/// A [`Sink`] that formats statements as Turtle, TriG, N-Triples or
/// N-Quads on a byte stream.
///
/// In the terse syntaxes the writer groups consecutive statements that
/// share a subject or predicate with `;` and `,`, opens `[` for `ANON_O`
/// statements (closed by the matching `end` event), writes directives for
/// base and prefix events, and qualifies IRIs through its environment.
/// The line based syntaxes get one plain statement per line; prefix and
/// base events only update the environment there, since the syntaxes
/// cannot express them.
///
/// ```
/// use tern_api::{Node, Sink, Statement, StatementFlags, Env, World};
/// use tern_turtle::{Syntax, Writer};
///
/// let world = World::new();
/// let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(None), Vec::new());
/// writer.set_prefix(&Node::literal("eg"), &Node::iri("http://example.org/"))?;
///
/// let statement = Statement::new(
///     Node::iri("http://example.org/s"),
///     Node::iri("http://example.org/p"),
///     Node::literal("hello"),
/// );
/// writer.statement(StatementFlags::empty(), &statement)?;
///
/// let out = writer.finish()?;
/// assert_eq!(
///     String::from_utf8_lossy(&out),
///     "@prefix eg: <http://example.org/> .\neg:s eg:p \"hello\" .\n"
/// );
/// # Ok::<_, tern_api::Status>(())
/// ```
pub struct Writer<'w, W: Write> {
    world: &'w World,
    syntax: Syntax,
    env: Env,
    write: W,
    graph: Option<Node>,
    subject: Option<Node>,
    predicate: Option<Node>,
    anon_stack: Vec<(Option<Node>, Option<Node>)>,
    chop: Option<String>,
}

impl<'w, W: Write> Writer<'w, W> {
    pub fn new(world: &'w World, syntax: Syntax, env: Env, write: W) -> Self {
        Writer {
            world,
            syntax,
            env,
            write,
            graph: None,
            subject: None,
            predicate: None,
            anon_stack: Vec::new(),
            chop: None,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Strips `prefix` from blank node ids on output, undoing what a
    /// reader's blank prefix added.
    pub fn chop_blank_prefix(&mut self, prefix: Option<&str>) {
        self.chop = match prefix {
            Some(p) if !p.is_empty() => Some(p.to_string()),
            _ => None,
        };
    }

    /// Writes a base directive, as the `base` sink event does.
    pub fn set_base_uri(&mut self, uri: &Node) -> Result<(), Status> {
        self.base(uri)
    }

    /// Writes a prefix directive, as the `prefix` sink event does.
    pub fn set_prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
        self.prefix(name, uri)
    }

    /// Closes any open statement and graph and returns the stream.
    pub fn finish(mut self) -> Result<W, Status> {
        self.terminate()?;
        if self.syntax == Syntax::TriG && self.graph.take().is_some() {
            self.w("}\n")?;
        }
        Ok(self.write)
    }

    fn w(&mut self, s: &str) -> Result<(), Status> {
        self.write
            .write_all(s.as_bytes())
            .map_err(|_| Status::BadStream)
    }

    /// Closes open anonymous nodes and the open statement.
    fn terminate(&mut self) -> Result<(), Status> {
        while self.anon_stack.pop().is_some() {
            self.w(" ]")?;
        }
        self.predicate = None;
        if self.subject.take().is_some() {
            self.w(" .\n")?;
        }
        Ok(())
    }

    fn write_statement(&mut self, flags: StatementFlags, st: &Statement) -> Result<(), Status> {
        st.check()?;
        if self.syntax.line_based() {
            return self.write_line_statement(st);
        }

        if self.syntax == Syntax::TriG && st.graph != self.graph {
            self.terminate()?;
            if self.graph.is_some() {
                self.w("}\n")?;
            }
            self.graph = st.graph.clone();
            if let Some(graph) = &st.graph {
                self.write_node(graph, Field::Graph)?;
                self.w(" {\n")?;
            }
        }

        if self.subject.as_ref() == Some(&st.subject) {
            if self.predicate.as_ref() == Some(&st.predicate) {
                self.w(" ,")?;
            } else if self.predicate.is_none() {
                // First statement inside an open '['
                self.w(" ")?;
                self.write_node(&st.predicate, Field::Predicate)?;
            } else {
                self.w(" ;")?;
                self.write_indent()?;
                self.write_node(&st.predicate, Field::Predicate)?;
            }
        } else {
            self.terminate()?;
            if self.syntax == Syntax::TriG && self.graph.is_some() {
                self.w("\t")?;
            }
            self.write_node(&st.subject, Field::Subject)?;
            self.w(" ")?;
            self.write_node(&st.predicate, Field::Predicate)?;
        }
        self.subject = Some(st.subject.clone());
        self.predicate = Some(st.predicate.clone());

        self.w(" ")?;
        if flags.contains(StatementFlags::ANON_O) {
            self.w("[")?;
            self.anon_stack.push((self.subject.take(), self.predicate.take()));
            self.subject = Some(st.object.clone());
            self.predicate = None;
        } else if flags.contains(StatementFlags::EMPTY_O) {
            self.w("[]")?;
        } else {
            self.write_node(&st.object, Field::Object)?;
        }
        Ok(())
    }

    fn write_indent(&mut self) -> Result<(), Status> {
        self.w("\n")?;
        let graph = (self.syntax == Syntax::TriG && self.graph.is_some()) as usize;
        for _ in 0..1 + graph + self.anon_stack.len() {
            self.w("\t")?;
        }
        Ok(())
    }

    fn write_line_statement(&mut self, st: &Statement) -> Result<(), Status> {
        self.write_node(&st.subject, Field::Subject)?;
        self.w(" ")?;
        self.write_node(&st.predicate, Field::Predicate)?;
        self.w(" ")?;
        self.write_node(&st.object, Field::Object)?;
        if self.syntax == Syntax::NQuads {
            if let Some(graph) = &st.graph {
                self.w(" ")?;
                self.write_node(graph, Field::Graph)?;
            }
        }
        self.w(" .\n")
    }

    fn write_node(&mut self, node: &Node, field: Field) -> Result<(), Status> {
        match node.kind() {
            NodeKind::Iri => {
                if !self.syntax.line_based() {
                    if field == Field::Predicate && node == self.world.rdf_type() {
                        return self.w("a");
                    }
                    if let Some(curie) = self.env.qualify(node) {
                        if is_safe_curie(curie.string()) {
                            return self.w(curie.string());
                        }
                    }
                }
                self.w("<")?;
                self.write_iri_text(node.string())?;
                self.w(">")
            }
            NodeKind::Curie => {
                if self.syntax.line_based() {
                    // The line syntaxes have no prefixes to lean on
                    match self.env.expand(node) {
                        Some(iri) => {
                            self.w("<")?;
                            self.write_iri_text(iri.string())?;
                            self.w(">")
                        }
                        None => Err(Status::BadCurie),
                    }
                } else {
                    self.w(node.string())
                }
            }
            NodeKind::Blank => {
                let id = node.string();
                let id = match &self.chop {
                    Some(prefix) => match id.strip_prefix(prefix.as_str()) {
                        Some(stripped) if !stripped.is_empty() => stripped,
                        _ => id,
                    },
                    None => id,
                };
                self.w("_:")?;
                self.w(id)
            }
            NodeKind::Variable => {
                self.w("?")?;
                self.w(node.string())
            }
            NodeKind::Literal => self.write_literal(node),
        }
    }

    fn write_literal(&mut self, node: &Node) -> Result<(), Status> {
        if !self.syntax.line_based() {
            if let Some(datatype) = node.datatype() {
                let value = node.string();
                let bare = if datatype == self.world.xsd_boolean() {
                    is_turtle_boolean(value)
                } else if datatype == self.world.xsd_integer() {
                    is_turtle_integer(value)
                } else if datatype == self.world.xsd_decimal() {
                    is_turtle_decimal(value)
                } else if datatype.string() == "http://www.w3.org/2001/XMLSchema#double" {
                    is_turtle_double(value)
                } else {
                    false
                };
                if bare {
                    return self.w(value);
                }
            }
        }

        let value = node.string();
        let long = !self.syntax.line_based()
            && node.flags().contains(NodeFlags::HAS_NEWLINE)
            && !value.contains("\"\"\"")
            && !value.ends_with('"');
        if long {
            self.w("\"\"\"")?;
            let escaped = value.replace('\\', "\\\\");
            self.w(&escaped)?;
            self.w("\"\"\"")?;
        } else {
            self.w("\"")?;
            let mut escaped = String::with_capacity(value.len());
            for c in value.chars() {
                match c {
                    '"' => escaped.push_str("\\\""),
                    '\\' => escaped.push_str("\\\\"),
                    '\n' => escaped.push_str("\\n"),
                    '\r' => escaped.push_str("\\r"),
                    '\t' => escaped.push_str("\\t"),
                    c if (c as u32) < 0x20 => {
                        escaped.push_str(&format!("\\u{:04X}", c as u32));
                    }
                    c => escaped.push(c),
                }
            }
            self.w(&escaped)?;
            self.w("\"")?;
        }

        if let Some(language) = node.language() {
            self.w("@")?;
            self.w(language.string())?;
        } else if let Some(datatype) = node.datatype() {
            self.w("^^")?;
            self.write_node(datatype, Field::Object)?;
        }
        Ok(())
    }

    fn write_iri_text(&mut self, iri: &str) -> Result<(), Status> {
        let mut escaped = String::with_capacity(iri.len());
        for b in iri.bytes() {
            match b {
                b'<' | b'>' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`' | b'\\' => {
                    escaped.push_str(&format!("%{:02X}", b));
                }
                b if b <= b' ' => escaped.push_str(&format!("%{:02X}", b)),
                b => escaped.push(b as char),
            }
        }
        self.w(&escaped)
    }
}

impl<'w, W: Write> Sink for Writer<'w, W> {
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        self.env.set_base_uri(uri)?;
        if !self.syntax.line_based() {
            self.terminate()?;
            self.w("@base <")?;
            self.write_iri_text(uri.string())?;
            self.w("> .\n")?;
        }
        Ok(())
    }

    fn prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
        self.env.set_prefix(name, uri)?;
        if !self.syntax.line_based() {
            self.terminate()?;
            self.w("@prefix ")?;
            self.w(name.string())?;
            self.w(": <")?;
            self.write_iri_text(uri.string())?;
            self.w("> .\n")?;
        }
        Ok(())
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        self.write_statement(flags, statement)
    }

    fn end(&mut self, node: &Node) -> Result<(), Status> {
        let _ = node;
        match self.anon_stack.pop() {
            Some((subject, predicate)) => {
                self.w(" ]")?;
                self.subject = subject;
                self.predicate = predicate;
                Ok(())
            }
            None => Err(Status::BadArg),
        }
    }
}

fn is_safe_curie(curie: &str) -> bool {
    !curie.ends_with('.')
        && curie.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':') || b >= 0x80
        })
}

fn is_turtle_boolean(value: &str) -> bool {
    matches!(value, "true" | "false")
}

fn is_turtle_integer(value: &str) -> bool {
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

fn is_turtle_decimal(value: &str) -> bool {
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    while value.first().map_or(false, u8::is_ascii_digit) {
        value = &value[1..];
    }
    let value = match value.strip_prefix(b".") {
        Some(v) => v,
        None => return false,
    };
    !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

fn is_turtle_double(value: &str) -> bool {
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    let mut with_digits = false;
    while value.first().map_or(false, u8::is_ascii_digit) {
        value = &value[1..];
        with_digits = true;
    }
    if let Some(v) = value.strip_prefix(b".") {
        value = v;
        while value.first().map_or(false, u8::is_ascii_digit) {
            value = &value[1..];
            with_digits = true;
        }
    }
    let value = match value.strip_prefix(b"e").or_else(|| value.strip_prefix(b"E")) {
        Some(v) => v,
        None => return false,
    };
    let value = match value.strip_prefix(b"+").or_else(|| value.strip_prefix(b"-")) {
        Some(v) => v,
        None => value,
    };
    with_digits && !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_env() -> Env {
        let mut env = Env::new(None);
        env.set_prefix_from_strings("eg", "http://example.org/")
            .unwrap();
        env
    }

    #[test]
    fn test_write_base_directive() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(None), Vec::new());
        writer
            .set_base_uri(&Node::iri("http://example.org/base"))
            .unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "@base <http://example.org/base> .\n"
        );
    }

    #[test]
    fn test_rejects_invalid_events() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(None), Vec::new());
        let lit = Node::literal("hello");

        assert_eq!(writer.set_base_uri(&lit), Err(Status::BadArg));
        assert_eq!(writer.set_prefix(&lit, &lit), Err(Status::BadArg));
        assert_eq!(writer.end(&lit), Err(Status::BadArg));

        let s = Node::iri("http://example.org/s");
        let p = Node::iri("http://example.org/p");
        let o = Node::literal("o");
        let junk = [
            Statement::new(s.clone(), o.clone(), o.clone()),
            Statement::new(o.clone(), p.clone(), o.clone()),
        ];
        for statement in &junk {
            assert_eq!(
                writer.statement(StatementFlags::empty(), statement),
                Err(Status::BadArg)
            );
        }

        // Nothing was written by the failed events
        let out = writer.finish().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_turtle_grouping() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, example_env(), Vec::new());

        let s = Node::iri("http://example.org/s");
        let p = Node::iri("http://example.org/p");
        let p2 = Node::iri("http://example.org/p2");
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(s.clone(), p.clone(), Node::literal("hello")),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(s.clone(), p.clone(), Node::iri("http://example.org/o")),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(s, p2, Node::boolean(true)),
            )
            .unwrap();

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "eg:s eg:p \"hello\" , eg:o ;\n\teg:p2 true .\n"
        );
    }

    #[test]
    fn test_type_abbreviation_and_numbers() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, example_env(), Vec::new());

        let s = Node::iri("http://example.org/s");
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    s.clone(),
                    world.rdf_type().clone(),
                    Node::iri("http://example.org/T"),
                ),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    s.clone(),
                    Node::iri("http://example.org/n"),
                    Node::integer(-23, None).unwrap(),
                ),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    s,
                    Node::iri("http://example.org/d"),
                    Node::decimal(2.05, 8, None).unwrap(),
                ),
            )
            .unwrap();

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "eg:s a eg:T ;\n\teg:n -23 ;\n\teg:d 2.05 .\n"
        );
    }

    #[test]
    fn test_anonymous_object() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, example_env(), Vec::new());

        let s = Node::iri("http://example.org/s");
        let p = Node::iri("http://example.org/p");
        let anon = Node::blank("b1");
        writer
            .statement(
                StatementFlags::ANON_O,
                &Statement::new(s, p, anon.clone()),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    anon.clone(),
                    Node::iri("http://example.org/q"),
                    Node::literal("inner"),
                ),
            )
            .unwrap();
        writer.end(&anon).unwrap();

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "eg:s eg:p [ eg:q \"inner\" ] .\n"
        );
    }

    #[test]
    fn test_trig_graph_blocks() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::TriG, Env::new(None), Vec::new());

        let mut quad = Statement::new(
            Node::iri("http://example.org/s"),
            Node::iri("http://example.org/p"),
            Node::iri("http://example.org/o"),
        );
        quad.graph = Some(Node::iri("http://example.org/g"));
        writer.statement(StatementFlags::empty(), &quad).unwrap();

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "<http://example.org/g> {\n\t<http://example.org/s> <http://example.org/p> <http://example.org/o> .\n}\n"
        );
    }

    #[test]
    fn test_ntriples_output() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::NTriples, Env::new(None), Vec::new());

        // Directives update the environment but write nothing
        writer
            .set_prefix(&Node::literal("eg"), &Node::iri("http://example.org/"))
            .unwrap();

        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::blank("b"),
                    Node::iri("http://example.org/p"),
                    Node::literal("hi\n\"there\""),
                ),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::iri("http://example.org/s"),
                    Node::iri("http://example.org/p"),
                    Node::integer(42, None).unwrap(),
                ),
            )
            .unwrap();
        // A CURIE object is expanded through the environment
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::iri("http://example.org/s"),
                    Node::iri("http://example.org/p"),
                    Node::curie("eg:o"),
                ),
            )
            .unwrap();

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "_:b <http://example.org/p> \"hi\\n\\\"there\\\"\" .\n\
             <http://example.org/s> <http://example.org/p> \"42\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n\
             <http://example.org/s> <http://example.org/p> <http://example.org/o> .\n"
        );
    }

    #[test]
    fn test_unknown_curie_fails_in_ntriples() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::NTriples, Env::new(None), Vec::new());
        let result = writer.statement(
            StatementFlags::empty(),
            &Statement::new(
                Node::iri("http://example.org/s"),
                Node::iri("http://example.org/p"),
                Node::curie("hm:what"),
            ),
        );
        assert_eq!(result, Err(Status::BadCurie));
    }

    #[test]
    fn test_chop_blank_prefix() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::NTriples, Env::new(None), Vec::new());
        writer.chop_blank_prefix(Some("tmp"));
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::blank("tmpb1"),
                    Node::iri("http://example.org/p"),
                    Node::blank("other"),
                ),
            )
            .unwrap();
        writer.chop_blank_prefix(None);

        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "_:b1 <http://example.org/p> _:other .\n"
        );
    }

    #[test]
    fn test_long_string() {
        let world = World::new();
        let mut writer = Writer::new(&world, Syntax::Turtle, example_env(), Vec::new());
        writer
            .statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::iri("http://example.org/s"),
                    Node::iri("http://example.org/p"),
                    Node::literal("two\nlines"),
                ),
            )
            .unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "eg:s eg:p \"\"\"two\nlines\"\"\" .\n"
        );
    }
}
