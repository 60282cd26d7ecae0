//! Streaming reader for the Turtle family of RDF syntaxes.

use crate::utils::{ByteSource, Stack};
use oxilangtag::LanguageTag;
use std::io::Read;
use tern_api::{Env, Error, Node, Sink, Statement, StatementFlags, Status, World, NS_XSD};

/// Maximum nesting of collections and anonymous property lists.
const MAX_DEPTH: usize = 512;

/// The concrete syntaxes the reader recognizes. Selection is explicit at
/// construction; there is no sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    NTriples,
    Turtle,
    NQuads,
    TriG,
}

impl Syntax {
    /// The line oriented syntaxes, without abbreviations or directives.
    pub fn line_based(self) -> bool {
        matches!(self, Syntax::NTriples | Syntax::NQuads)
    }

    /// The syntaxes with a graph term or graph blocks.
    pub fn supports_graphs(self) -> bool {
        matches!(self, Syntax::NQuads | Syntax::TriG)
    }
}

/// The result of a single [`Reader::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// One top-level production was consumed and its statements emitted.
    Parsed,
    /// No input is available right now: the source hit a soft end of
    /// input or a `\0` terminator byte. The reader keeps its state and a
    /// later call may succeed.
    Pending,
}

type Parse<T> = Result<T, Status>;

enum Lead {
    /// A prefixed name, and whether it swallowed a trailing terminator
    /// dot.
    Curie(Node, bool),
    /// A bare word such as `a`, `true` or a directive keyword.
    Word(String, bool),
}

enum NameEnd {
    /// Stopped at a `:` (not consumed).
    Colon,
    /// Stopped at a character that cannot continue the name.
    Stop,
    /// Consumed a `.` that turned out to terminate the statement.
    Dot,
}

enum SubjectStart {
    Term {
        node: Node,
        /// False after `[ ... ]` with properties, which may stand alone.
        po_required: bool,
        ate_dot: bool,
        /// True for terms that could label a TriG graph block.
        simple: bool,
    },
    Keyword(String),
}

/// A streaming reader: a recursive descent parser with a single byte of
/// lookahead, pulling from a [`ByteSource`] and emitting statements to a
/// [`Sink`].
///
/// The reader keeps its own environment, updated by the `@prefix` and
/// `@base` directives it reads: IRI references are resolved against the
/// in-scope base and prefixed names are expanded through the prefix
/// table before a statement is built, so emitted terms are always IRIs,
/// blank nodes and literals.
///
/// The reader can be driven one document at a time with
/// [`read_document`](Reader::read_document), or cooperatively with
/// [`read_chunk`](Reader::read_chunk), which consumes exactly one
/// directive or statement group and returns at every statement boundary.
///
/// ```
/// use tern_api::{Sink, Statement, StatementFlags, Status, World};
/// use tern_turtle::{ByteSource, Reader, Syntax};
///
/// let file = b"@prefix schema: <http://schema.org/> .
/// <foo> a schema:Person ;
///     schema:name \"Foo\" .
/// <bar> a schema:Person ;
///     schema:name \"Bar\" .";
///
/// #[derive(Default)]
/// struct TypeCount(usize);
///
/// impl Sink for TypeCount {
///     fn statement(&mut self, _: StatementFlags, s: &Statement) -> Result<(), Status> {
///         if s.predicate.string().ends_with("#type") {
///             self.0 += 1;
///         }
///         Ok(())
///     }
/// }
///
/// let world = World::new();
/// let mut reader = Reader::new(
///     &world,
///     Syntax::Turtle,
///     ByteSource::from_bytes(file),
///     TypeCount::default(),
/// );
/// reader.read_document()?;
/// assert_eq!(reader.sink().0, 2);
/// # Ok::<_, tern_api::Error>(())
/// ```
pub struct Reader<'w, R: Read, S: Sink> {
    world: &'w World,
    syntax: Syntax,
    source: ByteSource<R>,
    sink: S,
    stack: Stack,
    env: Env,
    graph: Option<Node>,
    bprefix: Option<String>,
    depth: usize,
    latched: Option<Status>,
    last_error: Option<Error>,
    progress: bool,
}

impl<'w, R: Read, S: Sink> Reader<'w, R, S> {
    pub fn new(world: &'w World, syntax: Syntax, source: ByteSource<R>, sink: S) -> Self {
        Reader {
            world,
            syntax,
            source,
            sink,
            stack: Stack::default(),
            env: Env::new(None),
            graph: None,
            bprefix: None,
            depth: 0,
            latched: None,
            last_error: None,
            progress: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The prefixes and base considered at the current point of the
    /// parse. Empty at the start, it grows as directives are read.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Strips `prefix` from document blank node ids before emission, so
    /// ids from separately read documents do not collide. A stripped id
    /// that falls into the generated `b<n>` space is kept unstripped and
    /// reported as `IdClash`.
    pub fn add_blank_prefix(&mut self, prefix: Option<&str>) {
        self.bprefix = match prefix {
            Some(p) if !p.is_empty() => Some(p.to_string()),
            _ => None,
        };
    }

    /// Reads one top-level production: a directive, or one statement
    /// group with every statement it expands to.
    ///
    /// Returns [`Chunk::Pending`] when no input is available right now
    /// (soft end of input, or a `\0` terminator byte, consumed one per
    /// call). Syntax errors are reported to the world's error sink and
    /// the reader recovers to the next statement boundary, so the caller
    /// may keep reading; stream errors latch and end the session.
    pub fn read_chunk(&mut self) -> Result<Chunk, Error> {
        if let Some(status) = self.latched {
            return Err(Error::new(status, status.message()));
        }
        self.progress = false;
        self.last_error = None;
        let height = self.stack.height();
        let result = self.read_chunk_inner();
        self.stack.truncate(height);
        match result {
            Ok(chunk) => Ok(chunk),
            Err(Status::Failure) => Ok(Chunk::Pending),
            Err(status) => {
                if matches!(
                    status,
                    Status::BadStream | Status::Internal | Status::Overflow
                ) {
                    self.latched = Some(status);
                } else {
                    self.skip_to_statement_end();
                }
                Err(self
                    .last_error
                    .take()
                    .unwrap_or_else(|| Error::new(status, status.message())))
            }
        }
    }

    /// Reads chunks up to the end of input. The first soft end of input
    /// ends the document; hitting it inside a statement is a syntax
    /// error. Recoverable errors are reported, skipped, and the first one
    /// is returned once the document is done.
    pub fn read_document(&mut self) -> Result<(), Error> {
        let mut first_error: Option<Error> = None;
        loop {
            match self.read_chunk() {
                Ok(Chunk::Parsed) => {}
                Ok(Chunk::Pending) => {
                    if self.progress {
                        let error = Error::new(Status::BadSyntax, "unexpected end of input")
                            .with_cursor(self.source.cursor());
                        self.world.error(&error);
                        return Err(error);
                    }
                    if self.source.peek().is_none() {
                        break;
                    }
                }
                Err(error) => {
                    if self.latched.is_some() {
                        return Err(error);
                    }
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn read_chunk_inner(&mut self) -> Parse<Chunk> {
        loop {
            match self.source.fill()? {
                0 => {
                    self.source.advance()?;
                    return Err(Status::Failure);
                }
                b' ' | b'\t' | b'\r' | b'\n' => self.source.advance()?,
                b'#' => self.skip_comment()?,
                _ => break,
            }
        }
        self.progress = true;
        self.depth = 0;
        self.graph = None;
        if self.syntax.line_based() {
            self.read_line_statement()?;
        } else {
            self.read_n3_statement()?;
        }
        Ok(Chunk::Parsed)
    }

    // Lexical layer

    fn eat(&mut self) -> Parse<u8> {
        let b = self.source.fill()?;
        self.source.advance()?;
        Ok(b)
    }

    fn eat_check(&mut self, expected: u8) -> Parse<u8> {
        let b = self.source.fill()?;
        if b != expected {
            return self.err(
                Status::BadSyntax,
                format!("expected '{}', not '{}'", expected as char, b as char),
            );
        }
        self.eat()
    }

    fn err<T>(&mut self, status: Status, message: impl Into<String>) -> Parse<T> {
        let error = Error::new(status, message).with_cursor(self.source.cursor());
        self.world.error(&error);
        self.last_error = Some(error);
        Err(status)
    }

    fn skip_ws(&mut self) -> Parse<()> {
        loop {
            match self.source.fill()? {
                b' ' | b'\t' | b'\r' | b'\n' => self.source.advance()?,
                b'#' => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Parse<()> {
        loop {
            let b = self.eat()?;
            if b == b'\n' {
                return Ok(());
            }
        }
    }

    fn skip_to_statement_end(&mut self) {
        loop {
            let b = match self.source.fill() {
                Ok(b) => b,
                Err(_) => return,
            };
            if self.source.advance().is_err() {
                return;
            }
            if b == if self.syntax.line_based() { b'\n' } else { b'.' } {
                return;
            }
        }
    }

    fn string_at(&self, span: (usize, usize)) -> String {
        String::from_utf8_lossy(self.stack.bytes(span)).into_owned()
    }

    fn push_char(&mut self, frame: usize, c: char) {
        let mut buf = [0u8; 4];
        self.stack.push_bytes(frame, c.encode_utf8(&mut buf).as_bytes());
    }

    /// Reads one character, replacing invalid UTF-8 with U+FFFD.
    fn read_utf8_char(&mut self, frame: usize, first: u8) -> Parse<()> {
        let size = match first {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                self.eat()?;
                self.push_char(frame, '\u{FFFD}');
                return Ok(());
            }
        };
        let mut buf = [0u8; 4];
        buf[0] = first;
        self.eat()?;
        for slot in buf.iter_mut().take(size).skip(1) {
            let b = self.source.fill()?;
            if b & 0xC0 != 0x80 {
                self.push_char(frame, '\u{FFFD}');
                return Ok(());
            }
            *slot = b;
            self.eat()?;
        }
        if std::str::from_utf8(&buf[..size]).is_ok() {
            self.stack.push_bytes(frame, &buf[..size]);
        } else {
            self.push_char(frame, '\u{FFFD}');
        }
        Ok(())
    }

    fn read_hex_escape(&mut self, digits: u32) -> Parse<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let b = self.source.fill()?;
            let digit = match (b as char).to_digit(16) {
                Some(d) => d,
                None => return self.err(Status::BadSyntax, "invalid hex digit in escape"),
            };
            self.eat()?;
            code = code * 16 + digit;
        }
        match std::char::from_u32(code) {
            Some(c) => Ok(c),
            None => self.err(Status::BadSyntax, "escape is not a character"),
        }
    }

    // Terminals

    fn read_iriref(&mut self) -> Parse<Node> {
        self.eat_check(b'<')?;
        let frame = self.stack.open_frame();
        loop {
            let b = self.source.fill()?;
            match b {
                b'>' => {
                    self.eat()?;
                    break;
                }
                b'\\' => {
                    self.eat()?;
                    let c = match self.source.fill()? {
                        b'u' => {
                            self.eat()?;
                            self.read_hex_escape(4)?
                        }
                        b'U' => {
                            self.eat()?;
                            self.read_hex_escape(8)?
                        }
                        _ => return self.err(Status::BadSyntax, "invalid IRI escape"),
                    };
                    self.push_char(frame, c);
                }
                b'<' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`' => {
                    return self.err(Status::BadSyntax, "invalid IRI character")
                }
                b if b <= b' ' => return self.err(Status::BadSyntax, "invalid IRI character"),
                b if b < 0x80 => {
                    self.eat()?;
                    self.stack.push_byte(frame, b);
                }
                b => self.read_utf8_char(frame, b)?,
            }
        }
        let span = self.stack.close_frame(frame);
        let text = self.string_at(span);
        Ok(match self.env.base_uri() {
            Some(base) => Node::resolved_iri(&text, base).unwrap_or_else(|| Node::iri(text)),
            None => Node::iri(text),
        })
    }

    /// Expands a prefixed name through the environment; an unbound
    /// prefix is an error.
    fn expand_curie(&mut self, node: Node) -> Parse<Node> {
        match self.env.expand(&node) {
            Some(iri) => Ok(iri),
            None => self.err(
                Status::BadCurie,
                format!("undefined prefix in \"{}\"", node.string()),
            ),
        }
    }

    /// Reads the prefix part of a name, stopping before a `:`. A bare
    /// run of name characters ends with `Stop`, or `Dot` when its
    /// trailing `.` was really the statement terminator.
    fn read_prefix_part(&mut self, frame: usize) -> Parse<NameEnd> {
        loop {
            let b = self.source.fill()?;
            match b {
                b':' => return Ok(NameEnd::Colon),
                b'.' => {
                    self.eat()?;
                    let next = self.source.fill()?;
                    if is_pn_chars(next) || next == b':' {
                        self.stack.push_byte(frame, b'.');
                    } else {
                        return Ok(NameEnd::Dot);
                    }
                }
                b if is_pn_chars(b) && b < 0x80 => {
                    self.eat()?;
                    self.stack.push_byte(frame, b);
                }
                b if b >= 0x80 => self.read_utf8_char(frame, b)?,
                _ => return Ok(NameEnd::Stop),
            }
        }
    }

    /// The local part of a prefixed name, after the `:`.
    fn read_local_part(&mut self, frame: usize) -> Parse<bool> {
        loop {
            let b = self.source.fill()?;
            match b {
                b'.' => {
                    self.eat()?;
                    let next = self.source.fill()?;
                    if is_local_chars(next) {
                        self.stack.push_byte(frame, b'.');
                    } else {
                        return Ok(true);
                    }
                }
                b'%' => {
                    self.eat()?;
                    self.stack.push_byte(frame, b'%');
                    for _ in 0..2 {
                        let h = self.source.fill()?;
                        if !h.is_ascii_hexdigit() {
                            return self.err(Status::BadSyntax, "invalid percent escape");
                        }
                        self.eat()?;
                        self.stack.push_byte(frame, h);
                    }
                }
                b'\\' => {
                    self.eat()?;
                    let e = self.source.fill()?;
                    if !is_local_escape(e) {
                        return self.err(Status::BadSyntax, "invalid name escape");
                    }
                    self.eat()?;
                    self.stack.push_byte(frame, e);
                }
                b if is_local_chars(b) && b < 0x80 => {
                    self.eat()?;
                    self.stack.push_byte(frame, b);
                }
                b if b >= 0x80 => self.read_utf8_char(frame, b)?,
                _ => return Ok(false),
            }
        }
    }

    /// Reads a prefixed name, or a bare keyword when no `:` follows the
    /// leading word.
    fn read_lead_token(&mut self) -> Parse<Lead> {
        let frame = self.stack.open_frame();
        match self.read_prefix_part(frame)? {
            NameEnd::Colon => {
                self.eat()?;
                self.stack.push_byte(frame, b':');
                let ate_dot = self.read_local_part(frame)?;
                let span = self.stack.close_frame(frame);
                Ok(Lead::Curie(Node::curie(self.string_at(span)), ate_dot))
            }
            NameEnd::Stop => {
                let span = self.stack.close_frame(frame);
                Ok(Lead::Word(self.string_at(span), false))
            }
            NameEnd::Dot => {
                let span = self.stack.close_frame(frame);
                Ok(Lead::Word(self.string_at(span), true))
            }
        }
    }

    fn read_blank_node(&mut self) -> Parse<(Node, bool)> {
        self.eat_check(b'_')?;
        self.eat_check(b':')?;
        let frame = self.stack.open_frame();
        let ate_dot = self.read_label_part(frame)?;
        let span = self.stack.close_frame(frame);
        let id = self.string_at(span);
        if id.is_empty() {
            return self.err(Status::BadSyntax, "expected blank node label");
        }
        Ok((self.finish_blank(&id), ate_dot))
    }

    fn read_label_part(&mut self, frame: usize) -> Parse<bool> {
        loop {
            let b = self.source.fill()?;
            match b {
                b'.' => {
                    self.eat()?;
                    let next = self.source.fill()?;
                    if is_pn_chars(next) {
                        self.stack.push_byte(frame, b'.');
                    } else {
                        return Ok(true);
                    }
                }
                b if is_pn_chars(b) && b < 0x80 => {
                    self.eat()?;
                    self.stack.push_byte(frame, b);
                }
                b if b >= 0x80 => self.read_utf8_char(frame, b)?,
                _ => return Ok(false),
            }
        }
    }

    fn finish_blank(&mut self, id: &str) -> Node {
        if let Some(prefix) = &self.bprefix {
            if let Some(stripped) = id.strip_prefix(prefix.as_str()) {
                if !stripped.is_empty() {
                    if is_generated_id(stripped) {
                        let error = Error::new(
                            Status::IdClash,
                            format!("blank id '{}' clashes with generated ids", stripped),
                        )
                        .with_cursor(self.source.cursor());
                        self.world.error(&error);
                        return Node::blank(id);
                    }
                    return Node::blank(stripped);
                }
            }
        }
        Node::blank(id)
    }

    fn read_langtag(&mut self) -> Parse<String> {
        let first = self.source.fill()?;
        if !first.is_ascii_alphabetic() {
            return self.err(Status::BadSyntax, "expected language tag");
        }
        let frame = self.stack.open_frame();
        loop {
            let b = self.source.fill()?;
            if b.is_ascii_alphanumeric() || b == b'-' {
                self.eat()?;
                self.stack.push_byte(frame, b);
            } else {
                break;
            }
        }
        let span = self.stack.close_frame(frame);
        let tag = self.string_at(span);
        if LanguageTag::parse(tag.as_str()).is_err() {
            return self.err(Status::BadSyntax, "invalid language tag");
        }
        Ok(tag)
    }

    fn read_literal(&mut self) -> Parse<(Node, bool)> {
        let quote = self.eat()?;
        let frame = self.stack.open_frame();
        let mut long = false;
        if self.source.fill()? == quote {
            self.eat()?;
            if !self.syntax.line_based() && self.source.fill()? == quote {
                self.eat()?;
                long = true;
            } else {
                // The empty string
                let span = self.stack.close_frame(frame);
                return self.read_literal_suffix(span);
            }
        }
        loop {
            let b = self.source.fill()?;
            if b == quote {
                self.eat()?;
                if !long {
                    break;
                }
                let mut quotes = 1;
                while quotes < 3 && self.source.fill()? == quote {
                    self.eat()?;
                    quotes += 1;
                }
                if quotes == 3 {
                    break;
                }
                for _ in 0..quotes {
                    self.stack.push_byte(frame, quote);
                }
                continue;
            }
            match b {
                b'\\' => {
                    self.eat()?;
                    self.read_string_escape(frame)?;
                }
                b'\n' | b'\r' if !long => {
                    return self.err(Status::BadSyntax, "line end in short string")
                }
                _ if b < 0x80 => {
                    self.eat()?;
                    self.stack.push_byte(frame, b);
                }
                _ => self.read_utf8_char(frame, b)?,
            }
        }
        let span = self.stack.close_frame(frame);
        self.read_literal_suffix(span)
    }

    fn read_string_escape(&mut self, frame: usize) -> Parse<()> {
        let b = self.source.fill()?;
        let c = match b {
            b'b' => '\u{8}',
            b't' => '\t',
            b'n' => '\n',
            b'r' => '\r',
            b'f' => '\u{C}',
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'u' => {
                self.eat()?;
                let c = self.read_hex_escape(4)?;
                self.push_char(frame, c);
                return Ok(());
            }
            b'U' => {
                self.eat()?;
                let c = self.read_hex_escape(8)?;
                self.push_char(frame, c);
                return Ok(());
            }
            _ => return self.err(Status::BadSyntax, "invalid escape character"),
        };
        self.eat()?;
        self.push_char(frame, c);
        Ok(())
    }

    fn read_literal_suffix(&mut self, span: (usize, usize)) -> Parse<(Node, bool)> {
        match self.source.fill()? {
            b'@' => {
                self.eat()?;
                let tag = self.read_langtag()?;
                let value = self.string_at(span);
                match Node::plain_literal(&value, Some(&tag)) {
                    Some(node) => Ok((node, false)),
                    None => self.err(Status::BadSyntax, "invalid language tag"),
                }
            }
            b'^' => {
                self.eat()?;
                self.eat_check(b'^')?;
                let (datatype, ate_dot) = match self.source.fill()? {
                    b'<' => (self.read_iriref()?, false),
                    _ if !self.syntax.line_based() => match self.read_lead_token()? {
                        Lead::Curie(node, ate_dot) => (self.expand_curie(node)?, ate_dot),
                        Lead::Word(..) => return self.err(Status::BadSyntax, "expected datatype"),
                    },
                    _ => return self.err(Status::BadSyntax, "expected datatype IRI"),
                };
                let value = self.string_at(span);
                match Node::typed_literal(&value, Some(&datatype)) {
                    Some(node) => Ok((node, ate_dot)),
                    None => self.err(Status::BadArg, "invalid datatype"),
                }
            }
            _ => Ok((Node::literal(self.string_at(span)), false)),
        }
    }

    fn read_number(&mut self) -> Parse<(Node, bool)> {
        let frame = self.stack.open_frame();
        let mut b = self.source.fill()?;
        if b == b'+' || b == b'-' {
            self.stack.push_byte(frame, b);
            self.eat()?;
            b = self.source.fill()?;
        }
        let mut has_digits = false;
        while b.is_ascii_digit() {
            self.stack.push_byte(frame, b);
            self.eat()?;
            has_digits = true;
            b = self.source.fill()?;
        }

        let mut decimal = false;
        let mut ate_dot = false;
        if b == b'.' {
            self.eat()?;
            b = self.source.fill()?;
            if b.is_ascii_digit() {
                decimal = true;
                self.stack.push_byte(frame, b'.');
                while b.is_ascii_digit() {
                    self.stack.push_byte(frame, b);
                    self.eat()?;
                    has_digits = true;
                    b = self.source.fill()?;
                }
            } else {
                ate_dot = true;
            }
        }
        if !has_digits {
            return self.err(Status::BadSyntax, "expected digit");
        }

        let mut double = false;
        if !ate_dot && (b == b'e' || b == b'E') {
            double = true;
            self.stack.push_byte(frame, b);
            self.eat()?;
            let mut e = self.source.fill()?;
            if e == b'+' || e == b'-' {
                self.stack.push_byte(frame, e);
                self.eat()?;
                e = self.source.fill()?;
            }
            if !e.is_ascii_digit() {
                return self.err(Status::BadSyntax, "expected exponent digit");
            }
            while e.is_ascii_digit() {
                self.stack.push_byte(frame, e);
                self.eat()?;
                e = self.source.fill()?;
            }
        }

        let span = self.stack.close_frame(frame);
        let value = self.string_at(span);
        let datatype = if double {
            Node::iri(format!("{}double", NS_XSD))
        } else if decimal {
            self.world.xsd_decimal().clone()
        } else {
            self.world.xsd_integer().clone()
        };
        match Node::typed_literal(&value, Some(&datatype)) {
            Some(node) => Ok((node, ate_dot)),
            None => self.err(Status::Internal, "bad numeric datatype"),
        }
    }

    // Grammar

    fn emit(
        &mut self,
        flags: &mut StatementFlags,
        subject: &Node,
        predicate: &Node,
        object: Node,
    ) -> Parse<()> {
        let statement = Statement {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object,
            graph: self.graph.clone(),
            cursor: self.source.cursor(),
        };
        let emitted = *flags;
        *flags = StatementFlags::empty();
        match self.sink.statement(emitted, &statement) {
            Ok(()) => Ok(()),
            Err(status) => self.err(status, "statement rejected by sink"),
        }
    }

    fn end(&mut self, node: &Node) -> Parse<()> {
        match self.sink.end(node) {
            Ok(()) => Ok(()),
            Err(status) => self.err(status, "end rejected by sink"),
        }
    }

    fn read_n3_statement(&mut self) -> Parse<()> {
        match self.source.fill()? {
            b'@' => self.read_at_directive(),
            b'{' if self.syntax == Syntax::TriG => {
                self.eat()?;
                self.read_graph_body(None)
            }
            _ => self.read_triples_statement(),
        }
    }

    fn read_triples_statement(&mut self) -> Parse<()> {
        let mut flags = StatementFlags::empty();
        let start = match self.read_subject(&mut flags)? {
            SubjectStart::Keyword(word) => return self.read_keyword_directive(&word),
            SubjectStart::Term {
                node,
                po_required,
                ate_dot,
                simple,
            } => {
                if ate_dot {
                    return self.err(Status::BadSyntax, "unexpected '.'");
                }
                (node, po_required, simple)
            }
        };
        let (subject, po_required, simple) = start;

        if self.syntax == Syntax::TriG && simple {
            self.skip_ws()?;
            if self.source.fill()? == b'{' {
                self.eat()?;
                return self.read_graph_body(Some(subject));
            }
        }

        let ate_dot = self.read_po_list(&subject, &mut flags, po_required)?;
        if !ate_dot {
            self.skip_ws()?;
            self.eat_check(b'.')?;
        }
        Ok(())
    }

    fn read_subject(&mut self, flags: &mut StatementFlags) -> Parse<SubjectStart> {
        Ok(match self.source.fill()? {
            b'<' => SubjectStart::Term {
                node: self.read_iriref()?,
                po_required: true,
                ate_dot: false,
                simple: true,
            },
            b'_' => {
                let (node, ate_dot) = self.read_blank_node()?;
                SubjectStart::Term {
                    node,
                    po_required: true,
                    ate_dot,
                    simple: true,
                }
            }
            b'(' => SubjectStart::Term {
                node: self.read_collection_subject(flags)?,
                po_required: true,
                ate_dot: false,
                simple: false,
            },
            b'[' => {
                let (node, had_props) = self.read_anon_subject(flags)?;
                SubjectStart::Term {
                    node,
                    po_required: !had_props,
                    ate_dot: false,
                    simple: false,
                }
            }
            _ => match self.read_lead_token()? {
                Lead::Curie(node, ate_dot) => SubjectStart::Term {
                    node: self.expand_curie(node)?,
                    po_required: true,
                    ate_dot,
                    simple: true,
                },
                Lead::Word(word, _) => SubjectStart::Keyword(word),
            },
        })
    }

    fn read_keyword_directive(&mut self, word: &str) -> Parse<()> {
        match word {
            // The SPARQL style directives take no terminating '.'
            "PREFIX" => self.read_prefix_directive(),
            "BASE" => self.read_base_directive(),
            "GRAPH" if self.syntax == Syntax::TriG => {
                self.skip_ws()?;
                let mut flags = StatementFlags::empty();
                let label = match self.read_subject(&mut flags)? {
                    SubjectStart::Term { node, simple, .. } if simple => node,
                    _ => return self.err(Status::BadSyntax, "expected graph label"),
                };
                self.skip_ws()?;
                self.eat_check(b'{')?;
                self.read_graph_body(Some(label))
            }
            _ => self.err(Status::BadSyntax, format!("unexpected \"{}\"", word)),
        }
    }

    fn read_at_directive(&mut self) -> Parse<()> {
        self.eat_check(b'@')?;
        let frame = self.stack.open_frame();
        loop {
            let b = self.source.fill()?;
            if b.is_ascii_lowercase() {
                self.eat()?;
                self.stack.push_byte(frame, b);
            } else {
                break;
            }
        }
        let span = self.stack.close_frame(frame);
        let word = self.string_at(span);
        match word.as_str() {
            "prefix" => self.read_prefix_directive()?,
            "base" => self.read_base_directive()?,
            _ => return self.err(Status::BadSyntax, "invalid directive"),
        }
        self.skip_ws()?;
        self.eat_check(b'.')?;
        Ok(())
    }

    fn read_prefix_directive(&mut self) -> Parse<()> {
        self.skip_ws()?;
        let frame = self.stack.open_frame();
        match self.read_prefix_part(frame)? {
            NameEnd::Colon => {}
            _ => return self.err(Status::BadSyntax, "expected ':'"),
        }
        let span = self.stack.close_frame(frame);
        self.eat()?;
        let name = Node::literal(self.string_at(span));
        self.skip_ws()?;
        let uri = self.read_iriref()?;
        if self.env.set_prefix(&name, &uri).is_err() {
            return self.err(Status::BadArg, "invalid prefix binding");
        }
        match self.sink.prefix(&name, &uri) {
            Ok(()) => Ok(()),
            Err(status) => self.err(status, "prefix rejected by sink"),
        }
    }

    fn read_base_directive(&mut self) -> Parse<()> {
        self.skip_ws()?;
        let uri = self.read_iriref()?;
        if self.env.set_base_uri(&uri).is_err() {
            return self.err(Status::BadIri, "base IRI is not absolute");
        }
        match self.sink.base(&uri) {
            Ok(()) => Ok(()),
            Err(status) => self.err(status, "base rejected by sink"),
        }
    }

    fn read_graph_body(&mut self, label: Option<Node>) -> Parse<()> {
        self.graph = label;
        let result = self.read_graph_statements();
        self.graph = None;
        result
    }

    fn read_graph_statements(&mut self) -> Parse<()> {
        loop {
            self.skip_ws()?;
            if self.source.fill()? == b'}' {
                self.eat()?;
                return Ok(());
            }
            let mut flags = StatementFlags::empty();
            let (subject, po_required) = match self.read_subject(&mut flags)? {
                SubjectStart::Term { ate_dot: true, .. } => {
                    return self.err(Status::BadSyntax, "unexpected '.'")
                }
                SubjectStart::Term {
                    node, po_required, ..
                } => (node, po_required),
                SubjectStart::Keyword(_) => {
                    return self.err(Status::BadSyntax, "expected subject")
                }
            };
            let ate_dot = self.read_po_list(&subject, &mut flags, po_required)?;
            if !ate_dot {
                self.skip_ws()?;
                match self.source.fill()? {
                    b'.' => {
                        self.eat()?;
                    }
                    b'}' => {}
                    _ => return self.err(Status::BadSyntax, "expected '.' or '}'"),
                }
            }
        }
    }

    fn read_po_list(
        &mut self,
        subject: &Node,
        flags: &mut StatementFlags,
        required: bool,
    ) -> Parse<bool> {
        self.skip_ws()?;
        if !required && matches!(self.source.fill()?, b'.' | b'}') {
            return Ok(false);
        }
        loop {
            let predicate = self.read_verb()?;
            self.skip_ws()?;
            let ate_dot = self.read_object_list(subject, &predicate, flags)?;
            if ate_dot {
                return Ok(true);
            }
            self.skip_ws()?;
            if self.source.fill()? != b';' {
                return Ok(false);
            }
            while self.source.fill()? == b';' {
                self.eat()?;
                self.skip_ws()?;
            }
            // A dangling ';' may close the list
            if matches!(self.source.fill()?, b'.' | b']' | b'}') {
                return Ok(false);
            }
        }
    }

    fn read_verb(&mut self) -> Parse<Node> {
        match self.source.fill()? {
            b'<' => self.read_iriref(),
            _ => match self.read_lead_token()? {
                Lead::Curie(node, false) => self.expand_curie(node),
                Lead::Curie(_, true) => self.err(Status::BadSyntax, "unexpected '.'"),
                Lead::Word(ref word, false) if word == "a" => Ok(self.world.rdf_type().clone()),
                Lead::Word(..) => self.err(Status::BadSyntax, "expected predicate"),
            },
        }
    }

    fn read_object_list(
        &mut self,
        subject: &Node,
        predicate: &Node,
        flags: &mut StatementFlags,
    ) -> Parse<bool> {
        loop {
            let ate_dot = self.read_object(subject, predicate, flags)?;
            if ate_dot {
                return Ok(true);
            }
            self.skip_ws()?;
            if self.source.fill()? != b',' {
                return Ok(false);
            }
            self.eat()?;
            self.skip_ws()?;
        }
    }

    fn read_object(
        &mut self,
        subject: &Node,
        predicate: &Node,
        flags: &mut StatementFlags,
    ) -> Parse<bool> {
        let b = self.source.fill()?;
        match b {
            b'<' => {
                let node = self.read_iriref()?;
                self.emit(flags, subject, predicate, node)?;
                Ok(false)
            }
            b'_' => {
                let (node, ate_dot) = self.read_blank_node()?;
                self.emit(flags, subject, predicate, node)?;
                Ok(ate_dot)
            }
            b'"' => {
                let (node, ate_dot) = self.read_literal()?;
                self.emit(flags, subject, predicate, node)?;
                Ok(ate_dot)
            }
            b'\'' if !self.syntax.line_based() => {
                let (node, ate_dot) = self.read_literal()?;
                self.emit(flags, subject, predicate, node)?;
                Ok(ate_dot)
            }
            b'(' if !self.syntax.line_based() => {
                self.read_collection_object(subject, predicate, flags)?;
                Ok(false)
            }
            b'[' if !self.syntax.line_based() => {
                self.read_anon_object(subject, predicate, flags)?;
                Ok(false)
            }
            b'0'..=b'9' | b'+' | b'-' | b'.' if !self.syntax.line_based() => {
                let (node, ate_dot) = self.read_number()?;
                self.emit(flags, subject, predicate, node)?;
                Ok(ate_dot)
            }
            _ if !self.syntax.line_based() => match self.read_lead_token()? {
                Lead::Curie(node, ate_dot) => {
                    let node = self.expand_curie(node)?;
                    self.emit(flags, subject, predicate, node)?;
                    Ok(ate_dot)
                }
                Lead::Word(ref word, ate_dot) if word == "true" || word == "false" => {
                    let node = Node::boolean(word == "true");
                    self.emit(flags, subject, predicate, node)?;
                    Ok(ate_dot)
                }
                Lead::Word(..) => self.err(Status::BadSyntax, "expected object"),
            },
            _ => self.err(Status::BadSyntax, "expected object"),
        }
    }

    fn enter(&mut self) -> Parse<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.err(Status::Overflow, "too much nesting");
        }
        Ok(())
    }

    fn read_collection_subject(&mut self, flags: &mut StatementFlags) -> Parse<Node> {
        self.enter()?;
        self.eat_check(b'(')?;
        self.skip_ws()?;
        if self.source.fill()? == b')' {
            self.eat()?;
            self.depth -= 1;
            return Ok(self.world.rdf_nil().clone());
        }
        let head = self.world.blank();
        *flags |= StatementFlags::LIST_S;
        self.read_collection_tail(head.clone())?;
        self.depth -= 1;
        Ok(head)
    }

    fn read_collection_object(
        &mut self,
        subject: &Node,
        predicate: &Node,
        flags: &mut StatementFlags,
    ) -> Parse<()> {
        self.enter()?;
        self.eat_check(b'(')?;
        self.skip_ws()?;
        if self.source.fill()? == b')' {
            self.eat()?;
            self.depth -= 1;
            let nil = self.world.rdf_nil().clone();
            return self.emit(flags, subject, predicate, nil);
        }
        let head = self.world.blank();
        *flags |= StatementFlags::LIST_O;
        self.emit(flags, subject, predicate, head.clone())?;
        self.read_collection_tail(head)?;
        self.depth -= 1;
        Ok(())
    }

    /// Emits the `rdf:first`/`rdf:rest` chain for the elements of a
    /// collection whose head blank node is already emitted.
    fn read_collection_tail(&mut self, head: Node) -> Parse<()> {
        let first = self.world.rdf_first().clone();
        let rest = self.world.rdf_rest().clone();
        let nil = self.world.rdf_nil().clone();
        let mut node = head;
        loop {
            let mut flags = StatementFlags::empty();
            let ate_dot = self.read_object(&node, &first, &mut flags)?;
            if ate_dot {
                return self.err(Status::BadSyntax, "unexpected '.' in collection");
            }
            self.skip_ws()?;
            let mut flags = StatementFlags::empty();
            if self.source.fill()? == b')' {
                self.eat()?;
                return self.emit(&mut flags, &node, &rest, nil);
            }
            let next = self.world.blank();
            self.emit(&mut flags, &node, &rest, next.clone())?;
            node = next;
        }
    }

    fn read_anon_subject(&mut self, flags: &mut StatementFlags) -> Parse<(Node, bool)> {
        self.enter()?;
        self.eat_check(b'[')?;
        self.skip_ws()?;
        let node = self.world.blank();
        if self.source.fill()? == b']' {
            self.eat()?;
            self.depth -= 1;
            *flags |= StatementFlags::EMPTY_S;
            return Ok((node, false));
        }
        *flags |= StatementFlags::ANON_S;
        let mut inner = StatementFlags::empty();
        let ate_dot = self.read_po_list(&node, &mut inner, true)?;
        if ate_dot {
            return self.err(Status::BadSyntax, "unexpected '.' in property list");
        }
        self.skip_ws()?;
        self.eat_check(b']')?;
        self.depth -= 1;
        Ok((node, true))
    }

    fn read_anon_object(
        &mut self,
        subject: &Node,
        predicate: &Node,
        flags: &mut StatementFlags,
    ) -> Parse<()> {
        self.enter()?;
        self.eat_check(b'[')?;
        self.skip_ws()?;
        let node = self.world.blank();
        if self.source.fill()? == b']' {
            self.eat()?;
            self.depth -= 1;
            *flags |= StatementFlags::EMPTY_O;
            return self.emit(flags, subject, predicate, node);
        }
        *flags |= StatementFlags::ANON_O;
        self.emit(flags, subject, predicate, node.clone())?;
        let mut inner = StatementFlags::empty();
        let ate_dot = self.read_po_list(&node, &mut inner, true)?;
        if ate_dot {
            return self.err(Status::BadSyntax, "unexpected '.' in property list");
        }
        self.skip_ws()?;
        self.eat_check(b']')?;
        self.depth -= 1;
        self.end(&node)
    }

    // N-Triples and N-Quads

    fn read_line_statement(&mut self) -> Parse<()> {
        let mut flags = StatementFlags::empty();
        let subject = match self.source.fill()? {
            b'<' => self.read_iriref()?,
            b'_' => self.read_blank_node()?.0,
            _ => return self.err(Status::BadSyntax, "expected subject"),
        };
        self.skip_ws()?;
        let predicate = match self.source.fill()? {
            b'<' => self.read_iriref()?,
            _ => return self.err(Status::BadSyntax, "expected predicate IRI"),
        };
        self.skip_ws()?;
        let (object, ate_dot) = match self.source.fill()? {
            b'<' => (self.read_iriref()?, false),
            b'_' => self.read_blank_node()?,
            b'"' => self.read_literal()?,
            _ => return self.err(Status::BadSyntax, "expected object"),
        };

        let mut graph = None;
        if !ate_dot {
            self.skip_ws()?;
            if self.syntax == Syntax::NQuads && self.source.fill()? != b'.' {
                graph = Some(match self.source.fill()? {
                    b'<' => self.read_iriref()?,
                    b'_' => self.read_blank_node()?.0,
                    _ => return self.err(Status::BadSyntax, "expected graph term"),
                });
                self.skip_ws()?;
            }
            self.eat_check(b'.')?;
        }

        self.graph = graph;
        let result = self.emit(&mut flags, &subject, &predicate, object);
        self.graph = None;
        result
    }
}

fn is_pn_chars(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80
}

fn is_local_chars(b: u8) -> bool {
    is_pn_chars(b) || b == b':'
}

fn is_local_escape(b: u8) -> bool {
    matches!(
        b,
        b'_' | b'~'
            | b'.'
            | b'-'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b'/'
            | b'?'
            | b'#'
            | b'@'
            | b'%'
    )
}

fn is_generated_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() > 1 && bytes[0] == b'b' && bytes[1..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;
    use tern_api::NodeKind;

    #[derive(Default)]
    struct Capture {
        statements: Vec<(StatementFlags, Statement)>,
        prefixes: Vec<(Node, Node)>,
        bases: Vec<Node>,
        ends: Vec<Node>,
    }

    impl Sink for Capture {
        fn base(&mut self, uri: &Node) -> Result<(), Status> {
            self.bases.push(uri.clone());
            Ok(())
        }
        fn prefix(&mut self, name: &Node, uri: &Node) -> Result<(), Status> {
            self.prefixes.push((name.clone(), uri.clone()));
            Ok(())
        }
        fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
            self.statements.push((flags, statement.clone()));
            Ok(())
        }
        fn end(&mut self, node: &Node) -> Result<(), Status> {
            self.ends.push(node.clone());
            Ok(())
        }
    }

    fn read_all(world: &World, syntax: Syntax, doc: &str) -> Capture {
        let mut reader = Reader::new(
            world,
            syntax,
            ByteSource::from_bytes(doc.as_bytes()),
            Capture::default(),
        );
        reader.read_document().unwrap();
        reader.into_sink()
    }

    #[test]
    fn test_read_document() {
        let world = World::new();
        let doc = "\
@prefix eg: <http://example.org/> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@base <http://example.org/base/> .
eg:s1 eg:p1 eg:o1 ;
      eg:p2 \"lit\"@en , \"typed\"^^eg:Type .
eg:s2 a eg:Class .
eg:s2 rdf:type eg:Class .
<rel> eg:p3 ( 1 2.5 6.02e23 true ) .
eg:s3 eg:p4 [ eg:p5 eg:o5 ] .
[] eg:p6 \"x\" .
_:b1 eg:p7 _:b2 . # trailing comment
";
        let sink = read_all(&world, Syntax::Turtle, doc);
        assert_eq!(sink.statements.len(), 18);
        assert_eq!(sink.prefixes.len(), 2);
        assert_eq!(sink.bases.len(), 1);
        assert_eq!(sink.ends.len(), 1);

        assert_eq!(sink.prefixes[0].0.string(), "eg");
        assert_eq!(sink.prefixes[0].1.string(), "http://example.org/");
        assert_eq!(sink.bases[0].string(), "http://example.org/base/");

        // Prefixed names are expanded before statements are built
        let first = &sink.statements[0].1;
        assert_eq!(first.subject.kind(), NodeKind::Iri);
        assert_eq!(first.subject.string(), "http://example.org/s1");
        assert_eq!(first.predicate.string(), "http://example.org/p1");
        assert_eq!(first.object.string(), "http://example.org/o1");
        assert_eq!(
            sink.statements[2].1.object.datatype().map(Node::string),
            Some("http://example.org/Type")
        );

        // The 'a' keyword and a written-out rdf:type CURIE both come out
        // as the interned rdf:type IRI
        assert_eq!(sink.statements[3].1.predicate, *world.rdf_type());
        assert_eq!(sink.statements[4].1.predicate, *world.rdf_type());

        // A relative reference resolves against the base in scope
        assert_eq!(
            sink.statements[5].1.subject.string(),
            "http://example.org/base/rel"
        );
    }

    #[test]
    fn test_base_resolution() {
        let world = World::new();
        let doc = "@base <http://example.org/a/b/> .\n<c> <d> <../e> .\n<> <d> <c> .\n";
        let sink = read_all(&world, Syntax::Turtle, doc);

        let first = &sink.statements[0].1;
        assert_eq!(first.subject.string(), "http://example.org/a/b/c");
        assert_eq!(first.predicate.string(), "http://example.org/a/b/d");
        assert_eq!(first.object.string(), "http://example.org/a/e");

        // An empty reference is the base itself
        assert_eq!(
            sink.statements[1].1.subject.string(),
            "http://example.org/a/b/"
        );
    }

    #[test]
    fn test_undefined_prefix() {
        let world = World::new();
        world.set_error_sink(|_| {});
        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::from_bytes(b"hm:what <http://example.org/p> <http://example.org/o> .\n"),
            Capture::default(),
        );
        let error = reader.read_chunk().unwrap_err();
        assert_eq!(error.status, Status::BadCurie);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert!(reader.sink().statements.is_empty());
    }

    #[test]
    fn test_literals() {
        let world = World::new();
        let doc = "\
<s> <p> \"plain\" , 'single' , \"tab\\tquote\\\"\" , \"\\u0041\\U0001F600\" ,
    \"\"\"long\n\"quoted\"\nstring\"\"\" , \"tagged\"@en-ca , \"typed\"^^<urn:Type> .
";
        let sink = read_all(&world, Syntax::Turtle, doc);
        let objects: Vec<&Node> = sink.statements.iter().map(|(_, s)| &s.object).collect();
        assert_eq!(objects.len(), 7);
        assert_eq!(objects[0].string(), "plain");
        assert_eq!(objects[1].string(), "single");
        assert_eq!(objects[2].string(), "tab\tquote\"");
        assert_eq!(objects[3].string(), "A\u{1F600}");
        assert_eq!(objects[4].string(), "long\n\"quoted\"\nstring");
        assert_eq!(objects[5].language().map(Node::string), Some("en-ca"));
        assert_eq!(objects[6].datatype().map(Node::string), Some("urn:Type"));
    }

    #[test]
    fn test_numbers() {
        let world = World::new();
        let doc = "<s> <p> 42 , -7 , 3.14 , 6.02e23 , .5 , true , false .\n";
        let sink = read_all(&world, Syntax::Turtle, doc);
        let datatypes: Vec<&str> = sink
            .statements
            .iter()
            .map(|(_, s)| s.object.datatype().map(Node::string).unwrap_or(""))
            .collect();
        assert_eq!(
            datatypes,
            vec![
                "http://www.w3.org/2001/XMLSchema#integer",
                "http://www.w3.org/2001/XMLSchema#integer",
                "http://www.w3.org/2001/XMLSchema#decimal",
                "http://www.w3.org/2001/XMLSchema#double",
                "http://www.w3.org/2001/XMLSchema#decimal",
                "http://www.w3.org/2001/XMLSchema#boolean",
                "http://www.w3.org/2001/XMLSchema#boolean",
            ]
        );
        assert_eq!(sink.statements[4].1.object.string(), ".5");
    }

    #[test]
    fn test_number_before_terminator() {
        let world = World::new();
        let sink = read_all(&world, Syntax::Turtle, "<s> <p> 42.\n");
        assert_eq!(sink.statements.len(), 1);
        assert_eq!(sink.statements[0].1.object.string(), "42");
    }

    #[test]
    fn test_collection_expansion() {
        let world = World::new();
        let sink = read_all(&world, Syntax::Turtle, "<s> <p> (<a> <b>) .\n");
        // head, first a, rest next, first b, rest nil
        assert_eq!(sink.statements.len(), 5);
        assert!(sink.statements[0].0.contains(StatementFlags::LIST_O));
        assert_eq!(sink.statements[1].1.predicate, *world.rdf_first());
        assert_eq!(sink.statements[2].1.predicate, *world.rdf_rest());
        assert_eq!(sink.statements[4].1.object, *world.rdf_nil());

        let empty = read_all(&world, Syntax::Turtle, "<s> <p> () .\n");
        assert_eq!(empty.statements.len(), 1);
        assert_eq!(empty.statements[0].1.object, *world.rdf_nil());
    }

    #[test]
    fn test_anon_object() {
        let world = World::new();
        let sink = read_all(&world, Syntax::Turtle, "<s> <p> [ <q> <o> ; <q2> <o2> ] .\n");
        assert_eq!(sink.statements.len(), 3);
        assert!(sink.statements[0].0.contains(StatementFlags::ANON_O));
        let anon = &sink.statements[0].1.object;
        assert_eq!(anon.kind(), NodeKind::Blank);
        assert_eq!(&sink.statements[1].1.subject, anon);
        assert_eq!(sink.ends.len(), 1);
        assert_eq!(&sink.ends[0], anon);

        let empty = read_all(&world, Syntax::Turtle, "<s> <p> [] .\n");
        assert!(empty.statements[0].0.contains(StatementFlags::EMPTY_O));
        assert!(empty.ends.is_empty());
    }

    #[test]
    fn test_anon_subject() {
        let world = World::new();
        let sink = read_all(&world, Syntax::Turtle, "[ <p> <o> ] <p2> <o2> .\n");
        assert_eq!(sink.statements.len(), 2);
        assert_eq!(sink.statements[1].1.subject, sink.statements[0].1.subject);

        // An anonymous subject with properties may stand alone
        let alone = read_all(&world, Syntax::Turtle, "[ <p> <o> ] .\n");
        assert_eq!(alone.statements.len(), 1);
    }

    #[test]
    fn test_sparql_directives() {
        let world = World::new();
        let doc = "PREFIX eg: <http://example.org/>\nBASE <http://example.org/>\neg:s eg:p eg:o .\n";
        let sink = read_all(&world, Syntax::Turtle, doc);
        assert_eq!(sink.prefixes.len(), 1);
        assert_eq!(sink.bases.len(), 1);
        assert_eq!(sink.statements.len(), 1);
    }

    #[test]
    fn test_lowercase_sparql_directive_is_an_error() {
        let world = World::new();
        world.set_error_sink(|_| {});
        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::from_bytes(b"prefix eg: <http://example.org/>\n"),
            Capture::default(),
        );
        assert!(reader.read_document().is_err());
    }

    #[test]
    fn test_trig_graphs() {
        let world = World::new();
        let doc = "<g> { <s> <p> <o> . <s2> <p2> <o2> }\n{ <s3> <p3> <o3> . }\n";
        let sink = read_all(&world, Syntax::TriG, doc);
        assert_eq!(sink.statements.len(), 3);
        assert_eq!(
            sink.statements[0].1.graph.as_ref().map(Node::string),
            Some("g")
        );
        assert_eq!(
            sink.statements[1].1.graph.as_ref().map(Node::string),
            Some("g")
        );
        assert_eq!(sink.statements[2].1.graph, None);
    }

    #[test]
    fn test_nquads() {
        let world = World::new();
        let doc = "<s> <p> \"o\"@en <g> .\n_:s <p> <o> .\n";
        let sink = read_all(&world, Syntax::NQuads, doc);
        assert_eq!(sink.statements.len(), 2);
        assert_eq!(
            sink.statements[0].1.graph.as_ref().map(Node::string),
            Some("g")
        );
        assert_eq!(sink.statements[1].1.graph, None);
        assert_eq!(sink.statements[1].1.subject.kind(), NodeKind::Blank);
    }

    #[test]
    fn test_read_chunks_with_null_terminators() {
        let world = World::new();
        let mut doc = Vec::new();
        doc.extend_from_slice(b"@prefix eg: <http://example.org/> .\n");
        doc.extend_from_slice(b"eg:s eg:p eg:o1 .\n");
        doc.push(0);
        doc.extend_from_slice(b"eg:s eg:p eg:o2 .\n");
        doc.push(0);

        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::new(&doc[..], None, 1),
            Capture::default(),
        );

        // Prefix
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.sink().statements.len(), 0);
        // First statement
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.sink().statements.len(), 1);
        // Terminator
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.sink().statements.len(), 1);
        // Second statement
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.sink().statements.len(), 2);
        // Terminator, then end of input
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.sink().statements.len(), 2);
    }

    /// Runs dry twice between the two statements, then resumes, the way
    /// a socket does.
    struct SocketRead {
        pos: usize,
        stalls: usize,
    }

    const SOCKET_DATA: &[u8] = b"_:s1 <http://example.org/p> _:o1 .\n\
                                 _:s2 <http://example.org/p> _:o2 .\n";

    impl io::Read for SocketRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= SOCKET_DATA.len() {
                return Ok(0);
            }
            if self.pos == 35 && self.stalls < 2 {
                self.stalls += 1;
                return Ok(0);
            }
            buf[0] = SOCKET_DATA[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_soft_eof_between_statements() {
        let world = World::new();
        let source = ByteSource::new(SocketRead { pos: 0, stalls: 0 }, None, 1);
        let mut reader = Reader::new(&world, Syntax::Turtle, source, Capture::default());

        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.sink().statements.len(), 2);
        assert_eq!(reader.sink().statements[0].1.subject.string(), "s1");
        assert_eq!(reader.sink().statements[1].1.subject.string(), "s2");
    }

    #[test]
    fn test_eof_then_no_more_chunks() {
        let world = World::new();
        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::new(&b"_:s <http://example.org/p> _:o .\n"[..], None, 4096),
            Capture::default(),
        );
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
    }

    #[test]
    fn test_error_recovery() {
        let world = World::new();
        let errors: Rc<RefCell<Vec<Status>>> = Rc::default();
        let sink_errors = Rc::clone(&errors);
        world.set_error_sink(move |e| sink_errors.borrow_mut().push(e.status));

        let doc = b"<s> <p> ??? .\n<s> <p> <o> .\n";
        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::from_bytes(doc),
            Capture::default(),
        );

        let error = reader.read_chunk().unwrap_err();
        assert_eq!(error.status, Status::BadSyntax);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Parsed);
        assert_eq!(reader.read_chunk().unwrap(), Chunk::Pending);
        assert_eq!(reader.sink().statements.len(), 1);
        assert_eq!(*errors.borrow(), vec![Status::BadSyntax]);

        // read_document recovers too, and reports the first error
        let world2 = World::new();
        world2.set_error_sink(|_| {});
        let mut reader = Reader::new(
            &world2,
            Syntax::Turtle,
            ByteSource::from_bytes(doc),
            Capture::default(),
        );
        let error = reader.read_document().unwrap_err();
        assert_eq!(error.status, Status::BadSyntax);
        assert_eq!(reader.sink().statements.len(), 1);
    }

    #[test]
    fn test_blank_prefix_chop() {
        let world = World::new();
        let errors: Rc<RefCell<Vec<Status>>> = Rc::default();
        let sink_errors = Rc::clone(&errors);
        world.set_error_sink(move |e| sink_errors.borrow_mut().push(e.status));

        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::from_bytes(b"_:tmpfoo <http://example.org/p> _:tmpb7 .\n"),
            Capture::default(),
        );
        reader.add_blank_prefix(Some("tmp"));
        reader.read_document().unwrap();

        let sink = reader.into_sink();
        assert_eq!(sink.statements[0].1.subject.string(), "foo");
        // 'b7' would collide with generated ids, so the original is kept
        assert_eq!(sink.statements[0].1.object.string(), "tmpb7");
        assert_eq!(*errors.borrow(), vec![Status::IdClash]);
    }

    #[test]
    fn test_statements_count_is_chunking_independent() {
        let world = World::new();
        let doc = "@prefix eg: <http://example.org/> .\n\
                   eg:s eg:p eg:o , [ eg:q ( 1 2 ) ] .\n\
                   eg:s2 a eg:T .\n";
        let by_document = read_all(&world, Syntax::Turtle, doc);

        for page_size in &[1usize, 2, 3, 7, 4096] {
            let mut reader = Reader::new(
                &world,
                Syntax::Turtle,
                ByteSource::new(doc.as_bytes(), None, *page_size),
                Capture::default(),
            );
            loop {
                match reader.read_chunk() {
                    Ok(Chunk::Parsed) => {}
                    Ok(Chunk::Pending) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!(
                reader.sink().statements.len(),
                by_document.statements.len(),
                "page size {}",
                page_size
            );
        }
    }

    #[test]
    fn test_latched_stream_error() {
        struct BrokenRead;
        impl io::Read for BrokenRead {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken"))
            }
        }

        let world = World::new();
        world.set_error_sink(|_| {});
        let mut reader = Reader::new(
            &world,
            Syntax::Turtle,
            ByteSource::new(BrokenRead, None, 1),
            Capture::default(),
        );
        assert_eq!(reader.read_chunk().unwrap_err().status, Status::BadStream);
        assert_eq!(reader.read_chunk().unwrap_err().status, Status::BadStream);
    }
}
