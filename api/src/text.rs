//! Plain text utilities: flag scanning, numeric parsing and the base64
//! codec used by blob literals.

use crate::model::NodeFlags;

/// Scans `s` and returns the flags that characterize it.
///
/// `HAS_ESCAPE` marks backslashes and control characters other than
/// newline, which `HAS_NEWLINE` covers.
pub fn string_flags(s: &str) -> NodeFlags {
    let mut flags = NodeFlags::empty();
    for b in s.bytes() {
        match b {
            b'\n' => flags |= NodeFlags::HAS_NEWLINE,
            b'"' => flags |= NodeFlags::HAS_QUOTE,
            b'\\' => flags |= NodeFlags::HAS_ESCAPE,
            b if b < 0x20 => flags |= NodeFlags::HAS_ESCAPE,
            _ => {}
        }
    }
    flags
}

/// Parses a double from the start of `s`, returning the value and the
/// number of bytes consumed.
///
/// Recognizes the XSD double lexical space plus the `NaN`, `INF` and
/// `-INF` keywords, after optional leading whitespace. When nothing
/// parses, returns `(0.0, 0)`.
pub fn parse_double(s: &str) -> (f64, usize) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }

    let mut sign = 1.0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        if bytes[i] == b'-' {
            sign = -1.0;
        }
        i += 1;
    }

    if s[i..].starts_with("NaN") {
        return (f64::NAN, i + 3);
    }
    if s[i..].starts_with("INF") {
        return (sign * f64::INFINITY, i + 3);
    }

    let mut value = 0.0f64;
    let mut n_digits = 0usize;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value * 10.0 + f64::from(bytes[i] - b'0');
        n_digits += 1;
        i += 1;
    }

    let mut exponent = 0i32;
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            value = value * 10.0 + f64::from(bytes[j] - b'0');
            exponent -= 1;
            n_digits += 1;
            j += 1;
        }
        if j > i + 1 {
            i = j;
        }
    }

    if n_digits == 0 {
        return (0.0, 0);
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        let mut exp_sign = 1i32;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            if bytes[j] == b'-' {
                exp_sign = -1;
            }
            j += 1;
        }
        let digits_start = j;
        let mut exp = 0i32;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            exp = exp
                .saturating_mul(10)
                .saturating_add(i32::from(bytes[j] - b'0'));
            j += 1;
        }
        if j > digits_start {
            exponent = exponent.saturating_add(exp_sign.saturating_mul(exp));
            i = j;
        }
    }

    let value = sign * value;
    let value = if exponent > 0 {
        value * 10f64.powi(exponent)
    } else if exponent < 0 {
        value / 10f64.powi(-exponent)
    } else {
        value
    };
    (value, i)
}

/// Formats `value` with at most `frac_digits` fractional digits, trimming
/// trailing zeros but always keeping one digit after the point. Returns
/// None for NaN and infinities, which have no decimal form.
pub fn format_decimal(value: f64, frac_digits: u32) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let abs = value.abs();
    let mut int_part = abs.floor();
    let scale = 10f64.powi(frac_digits as i32);
    let mut frac = ((abs - int_part) * scale).round();
    if frac >= scale {
        int_part += 1.0;
        frac = 0.0;
    }

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&format!("{:.0}", int_part));
    out.push('.');
    if frac == 0.0 {
        out.push('0');
    } else {
        let digits = format!("{:0>width$}", frac as u64, width = frac_digits as usize);
        out.push_str(digits.trim_end_matches('0'));
    }
    Some(out)
}

/// Encodes `data` as base64, optionally wrapping lines at the 76 columns
/// of canonical `xsd:base64Binary`.
pub fn encode_base64(data: &[u8], wrap_lines: bool) -> String {
    let encoded = base64::encode(data);
    if !wrap_lines {
        return encoded;
    }
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 + 1);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % 76 == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

/// Decodes base64 `text`, ignoring embedded whitespace such as the line
/// breaks a wrapping encoder inserts.
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let stripped: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::decode(&stripped).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_parses(s: &str, expected: f64) {
        let (value, end) = parse_double(s);
        assert_eq!(value, expected, "parsing {:?}", s);
        assert_eq!(end, s.len(), "end of {:?}", s);
    }

    #[test]
    fn test_parse_double() {
        assert_parses("02e18", 2.0e18);
        assert_parses("-5e019", -5e19);
        assert_parses("+8e20", 8e20);
        assert_parses("2E+24", 2e24);
        assert_parses("-5E-5", -5e-5);
        assert_parses("8E0", 8e0);
        assert_parses("9e-0", 9e0);
        assert_parses(" 2e+0", 2e0);
        assert_parses("3.14", 3.14);
        assert_parses("-16.00001", -16.00001);

        let (value, end) = parse_double("NaN");
        assert!(value.is_nan());
        assert_eq!(end, 3);

        let (value, end) = parse_double("INF");
        assert_eq!(value, f64::INFINITY);
        assert_eq!(end, 3);

        let (value, end) = parse_double("-INF");
        assert_eq!(value, f64::NEG_INFINITY);
        assert_eq!(end, 4);

        assert_eq!(parse_double("moo"), (0.0, 0));
    }

    #[test]
    fn test_parse_double_partial() {
        let (value, end) = parse_double("42 .");
        assert_eq!(value, 42.0);
        assert_eq!(end, 2);

        // A dangling exponent marker is not consumed
        let (value, end) = parse_double("8e");
        assert_eq!(value, 8.0);
        assert_eq!(end, 1);
    }

    #[test]
    fn test_format_decimal() {
        let cases: [(f64, &str); 8] = [
            (0.0, "0.0"),
            (9.0, "9.0"),
            (10.0, "10.0"),
            (0.01, "0.01"),
            (2.05, "2.05"),
            (-16.00001, "-16.00001"),
            (5.000000005, "5.00000001"),
            (0.0000000001, "0.0"),
        ];
        for (value, expected) in &cases {
            assert_eq!(format_decimal(*value, 8).as_deref(), Some(*expected));
        }
        assert_eq!(format_decimal(f64::NAN, 8), None);
        assert_eq!(format_decimal(f64::INFINITY, 8), None);
    }

    #[test]
    fn test_string_flags() {
        assert_eq!(string_flags("hello"), NodeFlags::empty());
        assert_eq!(string_flags("hello\""), NodeFlags::HAS_QUOTE);
        assert_eq!(
            string_flags("\"5\u{20AC}\"\n"),
            NodeFlags::HAS_QUOTE | NodeFlags::HAS_NEWLINE
        );
        assert_eq!(string_flags("a\\b"), NodeFlags::HAS_ESCAPE);
        assert_eq!(string_flags("a\tb"), NodeFlags::HAS_ESCAPE);
    }

    #[test]
    fn test_base64_round_trip() {
        let data: Vec<u8> = (0u16..256).map(|b| b as u8).collect();
        for wrap in &[false, true] {
            let encoded = encode_base64(&data, *wrap);
            assert_eq!(decode_base64(&encoded).as_deref(), Some(&data[..]));
        }
        let wrapped = encode_base64(&data, true);
        assert!(wrapped.lines().all(|line| line.len() <= 76));
    }
}
