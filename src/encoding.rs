//! Percent-encoding helpers for canonical URIs and query strings.
//!
//! SigV4 requires RFC 3986 strict encoding: everything other than the unreserved set
//! (`A-Z a-z 0-9 - . _ ~`) is escaped as uppercase `%XX`. Generic URI-component encoders leave
//! `! ' ( ) *` literal, so their output is passed through [`encode_rfc3986`] afterwards.

use {
    crate::{
        constants::{HEX_DIGITS_UPPER, MSG_ILLEGAL_HEX_CHAR, MSG_INCOMPLETE_TRAILING_ESCAPE},
        SignatureError,
    },
    percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC},
};

/// Characters a generic URI-component encoder leaves alone: the RFC 3986 unreserved set plus the
/// sub-delimiters `! ' ( ) *`.
const URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// Characters escaped in the path of a URL as typed by a user.
const URL_PATH_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`').add(b'{').add(b'}');

/// Characters escaped in the query of a URL as typed by a user.
const URL_QUERY_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'\'');

/// Convert a byte to uppercase hex representation.
#[inline(always)]
pub const fn u8_to_upper_hex(b: u8) -> [u8; 2] {
    [HEX_DIGITS_UPPER[((b >> 4) & 0xf) as usize], HEX_DIGITS_UPPER[(b & 0xf) as usize]]
}

/// Generic URI-component encoding over the UTF-8 bytes of `s`. This does *not* escape `! ' ( ) *`.
pub fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT_SET).to_string()
}

/// Re-encode the characters `! ' ( ) *` in an already percent-encoded string.
///
/// Existing `%XX` escapes, including `%` itself, are left untouched.
pub fn encode_rfc3986(encoded: &str) -> String {
    let mut result = String::with_capacity(encoded.len());
    for c in encoded.chars() {
        match c {
            '!' | '\'' | '(' | ')' | '*' => {
                let hex = u8_to_upper_hex(c as u8);
                result.push('%');
                result.push(hex[0] as char);
                result.push(hex[1] as char);
            }
            _ => result.push(c),
        }
    }
    result
}

/// RFC 3986 strict encoding of a single key, value, or path segment.
pub fn uri_encode(s: &str) -> String {
    encode_rfc3986(&encode_uri_component(s))
}

/// Encode a decoded path, keeping `/` separators literal.
///
/// The RFC 3986 fixup is not applied here; [`canonicalize_uri_path`][crate::canonical::canonicalize_uri_path]
/// applies it once regardless of the encoding mode.
pub fn encode_path(decoded: &str) -> String {
    encode_uri_component(decoded).replace("%2F", "/")
}

/// Escape the characters a browser would escape in a user-supplied URL before it is parsed.
///
/// Spaces, quotes, angle brackets and non-ASCII characters in the path and query become `%XX`
/// escapes; existing escapes are kept. Surrounding whitespace and any fragment are removed. The
/// scheme and authority are not touched.
pub fn encode_url(url: &str) -> String {
    let url = url.trim_matches(|c: char| c <= ' ');
    let url = url.split_once('#').map_or(url, |(before, _)| before);

    let authority_start = url.find("://").map_or(0, |i| i + 3);
    let path_start =
        url[authority_start..].find(|c: char| c == '/' || c == '?').map_or(url.len(), |i| authority_start + i);
    let (prefix, rest) = url.split_at(path_start);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut result = String::with_capacity(url.len());
    result.push_str(prefix);
    result.extend(utf8_percent_encode(path, URL_PATH_SET));
    if let Some(query) = query {
        result.push('?');
        result.extend(utf8_percent_encode(query, URL_QUERY_SET));
    }
    result
}

/// Strict percent-decoding of a URI component.
///
/// Every `%` must be followed by two hex digits, and the decoded bytes must be valid UTF-8.
pub fn decode_uri_component(s: &str) -> Result<String, SignatureError> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                // % encoding would go beyond end of string.
                return Err(SignatureError::InvalidURIPath(MSG_INCOMPLETE_TRAILING_ESCAPE.to_string()));
            }

            let hex_digits = &bytes[i + 1..i + 3];
            if !hex_digits.iter().all(u8::is_ascii_hexdigit) {
                return Err(SignatureError::InvalidURIPath(format!(
                    "{}{}{}",
                    MSG_ILLEGAL_HEX_CHAR, hex_digits[0] as char, hex_digits[1] as char
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    match percent_decode_str(s).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(e) => Err(SignatureError::InvalidURIPath(format!("Path does not decode to UTF-8: {}", e))),
    }
}
