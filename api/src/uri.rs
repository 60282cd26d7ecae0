//! IRI parsing, resolution and relativization per
//! [RFC 3986](https://tools.ietf.org/html/rfc3986), plus `file://` IRI
//! construction and lenient parsing per
//! [RFC 8089](https://tools.ietf.org/html/rfc8089).

/// A parsed IRI reference, split into the five components of RFC 3986 §3.
///
/// Component slices borrow from the source string and exclude their
/// delimiters. Parsing never fails: anything unrecognized lands in the
/// path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uri<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> Uri<'a> {
    /// Splits `s` into components by prefix matching.
    pub fn parse(s: &'a str) -> Uri<'a> {
        let mut uri = Uri::default();
        let mut rest = s;

        if let Some(colon) = rest.find(':') {
            if is_scheme(&rest[..colon]) {
                uri.scheme = Some(&rest[..colon]);
                rest = &rest[colon + 1..];
            }
        }
        if let Some(r) = rest.strip_prefix("//") {
            let end = r
                .find(|c| c == '/' || c == '?' || c == '#')
                .unwrap_or_else(|| r.len());
            uri.authority = Some(&r[..end]);
            rest = &r[end..];
        }
        let end = rest
            .find(|c| c == '?' || c == '#')
            .unwrap_or_else(|| rest.len());
        uri.path = &rest[..end];
        rest = &rest[end..];
        if let Some(r) = rest.strip_prefix('?') {
            let end = r.find('#').unwrap_or_else(|| r.len());
            uri.query = Some(&r[..end]);
            rest = &r[end..];
        }
        if let Some(r) = rest.strip_prefix('#') {
            uri.fragment = Some(r);
        }
        uri
    }

    /// A reference is an IRI proper iff a scheme precedes a `:`.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }
}

fn is_scheme(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

/// Resolves `reference` against `base` per RFC 3986 §5.3, including
/// remove-dot-segments. Returns None when `base` has no scheme. A
/// reference that already has a scheme is returned verbatim.
pub fn resolve(reference: &str, base: &str) -> Option<String> {
    let b = Uri::parse(base);
    b.scheme?;
    let r = Uri::parse(reference);
    if r.scheme.is_some() {
        return Some(reference.to_string());
    }

    let authority;
    let path;
    let query;
    if r.authority.is_some() {
        authority = r.authority;
        path = remove_dot_segments(r.path);
        query = r.query;
    } else {
        authority = b.authority;
        if r.path.is_empty() {
            path = b.path.to_string();
            query = r.query.or(b.query);
        } else {
            query = r.query;
            if r.path.starts_with('/') {
                path = remove_dot_segments(r.path);
            } else {
                path = remove_dot_segments(&merge_paths(&b, r.path));
            }
        }
    }
    Some(recompose(b.scheme, authority, &path, query, r.fragment))
}

/// Writes `uri` relative to `base` when they share a scheme and authority,
/// emitting one `../` per base path segment below the common ancestor.
/// When `root` is given, `uri` must lie under `root`'s directory or it is
/// returned verbatim: the root is a floor relativization cannot escape.
pub fn relative(uri: &str, base: &str, root: Option<&str>) -> String {
    let u = Uri::parse(uri);
    let b = Uri::parse(base);
    if u.scheme.is_none() || u.scheme != b.scheme || u.authority != b.authority {
        return uri.to_string();
    }
    if let Some(root) = root {
        let r = Uri::parse(root);
        if r.scheme != u.scheme || r.authority != u.authority || !is_under(u.path, r.path) {
            return uri.to_string();
        }
    }

    // Index of the last '/' both paths share
    let mut last_slash = None;
    for (i, (a, c)) in u.path.bytes().zip(b.path.bytes()).enumerate() {
        if a != c {
            break;
        }
        if a == b'/' {
            last_slash = Some(i);
        }
    }
    let last_slash = match last_slash {
        Some(i) => i,
        None => return uri.to_string(),
    };

    let up = b.path[last_slash + 1..]
        .bytes()
        .filter(|b| *b == b'/')
        .count();
    let mut out = String::new();
    for _ in 0..up {
        out.push_str("../");
    }
    out.push_str(&u.path[last_slash + 1..]);
    if let Some(q) = u.query {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = u.fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

fn is_under(path: &str, root_path: &str) -> bool {
    match root_path.rfind('/') {
        Some(i) => path.starts_with(&root_path[..=i]),
        None => false,
    }
}

fn merge_paths(base: &Uri<'_>, ref_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{}", ref_path);
    }
    match base.path.rfind('/') {
        Some(i) => format!("{}{}", &base.path[..=i], ref_path),
        None => ref_path.to_string(),
    }
}

fn recompose(
    scheme: Option<&str>,
    authority: Option<&str>,
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(s) = scheme {
        out.push_str(s);
        out.push(':');
    }
    if let Some(a) = authority {
        out.push_str("//");
        out.push_str(a);
    }
    out.push_str(path);
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

/// RFC 3986 §5.2.4.
pub(crate) fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = if input.starts_with('/') { 1 } else { 0 };
            let end = input[start..]
                .find('/')
                .map(|i| i + start)
                .unwrap_or_else(|| input.len());
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(i) => output.truncate(i),
        None => output.clear(),
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

fn is_windows_path(path: &str) -> bool {
    let b = path.as_bytes();
    b.len() >= 2
        && b[0].is_ascii_alphabetic()
        && (b[1] == b':' || b[1] == b'|')
        && (b.len() == 2 || b[2] == b'/' || b[2] == b'\\')
}

// Unreserved and sub-delimiter characters, plus ':', '@' and '/'
fn is_path_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.'
                | b'_'
                | b'~'
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
                | b':'
                | b'@'
                | b'/'
        )
}

/// Builds a file IRI from a local path, percent-encoding everything
/// outside the path character set with uppercase hex digits, doubling
/// literal `%`, and normalizing `\` to `/`. A relative non-Windows path
/// without a hostname stays a relative reference.
pub fn file_uri(path: &str, hostname: Option<&str>) -> String {
    let windows = is_windows_path(path);
    let mut out = String::with_capacity(path.len() + 8);
    if hostname.is_some() || windows || path.starts_with('/') {
        out.push_str("file://");
        if let Some(host) = hostname {
            out.push_str(host);
        }
        if windows {
            out.push('/');
        }
    }
    for b in path.bytes() {
        if b == b'\\' {
            out.push('/');
        } else if b == b'%' {
            out.push_str("%%");
        } else if is_path_char(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Parses a (possibly relative) file IRI into a path and optional
/// hostname.
///
/// Percent decoding is lenient: `%%` decodes to `%`, and a `%` not
/// followed by two hex digits is dropped together with the two characters
/// after it, so `file:///foo/%0Xbar` parses to `/foo/bar`. Malformed
/// escapes are therefore silently lost; this mirrors what the builder
/// above emits and keeps parse/build round trips stable.
pub fn file_uri_parse(uri: &str) -> (String, Option<String>) {
    let mut rest = uri;
    let mut hostname = None;
    if let Some(r) = rest.strip_prefix("file://") {
        match r.find('/') {
            Some(0) => rest = r,
            Some(i) => {
                hostname = Some(r[..i].to_string());
                rest = &r[i..];
            }
            None => {
                if !r.is_empty() {
                    hostname = Some(r.to_string());
                }
                rest = "";
            }
        }
    }
    // "/C:/..." is a rooted Windows path; drop the leading slash
    if rest.starts_with('/') && is_windows_path(&rest[1..]) {
        rest = &rest[1..];
    }

    let bytes = rest.as_bytes();
    let mut path = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'%' {
                path.push(b'%');
                i += 2;
            } else if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit()
            {
                path.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            } else {
                // Junk escape: skipped along with both trailing characters
                i = (i + 3).min(bytes.len());
            }
        } else {
            path.push(bytes[i]);
            i += 1;
        }
    }
    (String::from_utf8_lossy(&path).into_owned(), hostname)
}
