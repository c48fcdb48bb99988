//! Canonicalization functionality for signature generation.
//!
//! This includes the URI path, query string and header canonicalization functions, as well as the
//! ability to assemble an AWS SigV4 canonical request from them. Every function here is pure; the
//! signer builds the header and query collections first and then canonicalizes them.

use {
    crate::{
        constants::*,
        crypto::sha256_hex,
        encoding::{decode_uri_component, encode_path, encode_rfc3986, uri_encode},
        query::QueryParams,
        SignatureError,
    },
    http::{
        header::{HeaderMap, HeaderValue},
        method::Method,
        uri::Uri,
    },
    lazy_static::lazy_static,
    log::trace,
    regex::Regex,
    std::{
        collections::{BTreeSet, HashSet},
        fmt::{Debug, Formatter, Result as FmtResult},
    },
};

lazy_static! {
    /// Whitespace run pattern for condensing header values. The class is spelled out so that
    /// U+0085 (NEL), which `\s` would match, is kept as a literal character.
    static ref MULTISPACE: Regex = Regex::new(
        r"[\t\n\x0B\x0C\r \x{a0}\x{1680}\x{2000}-\x{200a}\x{2028}\x{2029}\x{202f}\x{205f}\x{3000}\x{feff}]+"
    )
    .unwrap();
}

/// Whether `c` is header whitespace. Matches the `MULTISPACE` class.
fn is_header_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\x0B'
            | '\x0C'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Options that change how the path and query string are canonicalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonicalOptions {
    /// Apply the S3 rules: only the first occurrence of each query key is signed.
    pub s3: bool,

    /// Sign the decoded path as-is instead of percent-encoding it a second time.
    pub single_encode: bool,
}

/// A canonicalized request for AWS SigV4.
///
/// This is a transient value; it is created for a single signing operation and discarded.
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// The HTTP method for the request (e.g., "GET", "POST", etc.)
    method: String,

    /// The canonicalized path from the HTTP request. This is guaranteed to be ASCII unless
    /// `single_encode` was requested.
    canonical_path: String,

    /// The sorted, encoded `k=v&k=v` query string.
    canonical_query: String,

    /// One `name:value` line per signed header, joined with `\n` (no trailing newline).
    canonical_headers: String,

    /// The signed header names, sorted and joined with `;`.
    signed_headers: String,

    /// Lowercase hex SHA-256 of the body, or the value of `x-amz-content-sha256`.
    payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize a request.
    ///
    /// `signed_headers` must come from [`signable_header_names`] over the same `headers`; the
    /// synthetic `host` entry is filled from `uri`. `query` holds the request's query parameters,
    /// including any signing parameters already added in query mode.
    pub fn new(
        method: &Method,
        uri: &Uri,
        query: &QueryParams,
        headers: &HeaderMap<HeaderValue>,
        signed_headers: &[String],
        body: Option<&[u8]>,
        options: CanonicalOptions,
    ) -> Result<Self, SignatureError> {
        let canonical_path = canonicalize_uri_path(uri.path(), options.single_encode)?;
        let canonical_query = canonicalize_query(query, options.s3);
        let host = canonical_host(uri)?;

        let canonical_headers = signed_headers
            .iter()
            .map(|name| {
                let value = if name == HDR_HOST {
                    host.clone()
                } else {
                    canonical_header_value(headers, name).unwrap_or_default()
                };
                format!("{}:{}", name, value)
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Self {
            method: method.as_str().to_string(),
            canonical_path,
            canonical_query,
            canonical_headers,
            signed_headers: signed_headers.join(";"),
            payload_hash: payload_hash(headers, body),
        })
    }

    /// Retrieve the HTTP request method.
    #[inline(always)]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Retrieve the canonicalized URI path from the request.
    #[inline(always)]
    pub fn canonical_path(&self) -> &str {
        &self.canonical_path
    }

    /// Retrieve the canonical query string.
    #[inline(always)]
    pub fn canonical_query(&self) -> &str {
        &self.canonical_query
    }

    /// Retrieve the canonical headers block, without its trailing newline.
    #[inline(always)]
    pub fn canonical_headers(&self) -> &str {
        &self.canonical_headers
    }

    /// Retrieve the `;`-separated signed header names.
    #[inline(always)]
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// Retrieve the payload hash.
    #[inline(always)]
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Get the [canonical request to hash](https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html)
    /// for the request.
    pub fn canonical_request(&self) -> String {
        let result = format!(
            "{}\n{}\n{}\n{}\n\n{}\n{}",
            self.method,
            self.canonical_path,
            self.canonical_query,
            self.canonical_headers,
            self.signed_headers,
            self.payload_hash
        );

        trace!("Canonical request:\n{}", result);
        result
    }

    /// Get the lowercase hex SHA-256 hash of the canonical request.
    pub fn canonical_request_sha256_hex(&self) -> String {
        sha256_hex(self.canonical_request().as_bytes())
    }
}

impl Debug for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CanonicalRequest")
            .field("method", &self.method)
            .field("canonical_path", &self.canonical_path)
            .field("canonical_query", &self.canonical_query)
            .field("canonical_headers", &self.canonical_headers)
            .field("signed_headers", &self.signed_headers)
            .field("payload_hash", &self.payload_hash)
            .finish()
    }
}

/// Canonicalize the URI path.
///
/// The path is percent-decoded (reading `+` as a space) and, unless `single_encode` is set,
/// percent-encoded again with `/` kept literal. The `! ' ( ) *` characters are then escaped. A path
/// that decodes to nothing canonicalizes to the raw path.
pub fn canonicalize_uri_path(uri_path: &str, single_encode: bool) -> Result<String, SignatureError> {
    let mut path = decode_uri_component(uri_path)?.replace('+', " ");
    if path.is_empty() {
        path = uri_path.to_string();
    }

    if !single_encode {
        path = encode_path(&path);
    }

    Ok(encode_rfc3986(&path))
}

/// Canonicalize the query string.
///
/// Parameters with an empty name are dropped. With `s3` set, only the first occurrence of each name
/// is kept; later duplicates are silently ignored, as S3 itself does. Keys and values are RFC 3986
/// encoded, then sorted by key and by value on ties.
pub fn canonicalize_query(query: &QueryParams, s3: bool) -> String {
    let mut seen = HashSet::new();
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .filter(|(key, _)| !key.is_empty() && (!s3 || seen.insert(key.as_str())))
        .map(|(key, value)| (uri_encode(key), uri_encode(value)))
        .collect();

    pairs.sort_unstable();
    pairs.into_iter().map(|(key, value)| format!("{}={}", key, value)).collect::<Vec<_>>().join("&")
}

/// Returns the sorted header names to sign: `host` plus every header present in the request, less
/// the unsignable set unless `all_headers` is set.
pub fn signable_header_names(headers: &HeaderMap<HeaderValue>, all_headers: bool) -> Vec<String> {
    let mut names = BTreeSet::new();
    names.insert(HDR_HOST.to_string());

    for name in headers.keys() {
        let name = name.as_str().to_lowercase();
        if all_headers || !UNSIGNABLE_HEADERS.contains(&name.as_str()) {
            names.insert(name);
        }
    }

    names.into_iter().collect()
}

/// The value of a header as a client would read it back: every value trimmed, then joined with
/// `", "`. Returns `None` if the header is absent.
pub fn combined_header_value(headers: &HeaderMap<HeaderValue>, name: &str) -> Option<String> {
    let values: Vec<String> =
        headers.get_all(name).iter().map(|value| latin1_to_string(value.as_bytes()).trim_matches(is_header_whitespace).to_string()).collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// The canonical value of a header: the combined value with internal whitespace runs collapsed.
pub fn canonical_header_value(headers: &HeaderMap<HeaderValue>, name: &str) -> Option<String> {
    combined_header_value(headers, name).map(|value| normalize_header_value(&value))
}

/// Normalizes a header value by trimming whitespace and converting runs of whitespace to a single space.
pub fn normalize_header_value(value: &str) -> String {
    MULTISPACE.replace_all(value.trim_matches(is_header_whitespace), " ").into_owned()
}

/// Convert a Latin-1 slice of bytes to a UTF-8 string.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    let mut result = String::new();
    for b in bytes {
        result.push(*b as char);
    }
    result
}

/// The value signed for the synthetic `host` header: the URI host, plus the port when it is not the
/// default for the scheme.
pub fn canonical_host(uri: &Uri) -> Result<String, SignatureError> {
    let host = match uri.host() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return Err(SignatureError::UnsupportedInput(format!("URL must be absolute: {}", uri))),
    };

    let default_port = match uri.scheme_str() {
        Some("http") => Some(80),
        Some("https") => Some(443),
        _ => None,
    };

    match uri.port_u16() {
        Some(port) if Some(port) != default_port => Ok(format!("{}:{}", host, port)),
        _ => Ok(host),
    }
}

/// The payload hash: the `x-amz-content-sha256` header verbatim when present, otherwise the SHA-256
/// of the body (or of the empty string without one).
pub fn payload_hash(headers: &HeaderMap<HeaderValue>, body: Option<&[u8]>) -> String {
    match combined_header_value(headers, HDR_X_AMZ_CONTENT_SHA256) {
        Some(value) => value,
        None => match body {
            Some(body) => sha256_hex(body),
            None => SHA256_EMPTY.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{
            canonical_header_value, canonical_host, canonicalize_query, canonicalize_uri_path, latin1_to_string,
            normalize_header_value, payload_hash, signable_header_names, CanonicalOptions, CanonicalRequest,
        },
        crate::{QueryParams, SignatureError},
        http::{
            header::{HeaderMap, HeaderValue},
            method::Method,
            uri::Uri,
        },
    };

    #[test_log::test]
    fn canonicalize_uri_path_empty() {
        assert_eq!(canonicalize_uri_path("", false).unwrap(), "");
        assert_eq!(canonicalize_uri_path("/", false).unwrap(), "/");
    }

    #[test_log::test]
    fn canonicalize_path_encoding() {
        assert_eq!(canonicalize_uri_path("/a%20b/(c)!*'.txt", false).unwrap(), "/a%20b/%28c%29%21%2A%27.txt");
        assert_eq!(canonicalize_uri_path("/dir/file%20name.txt", false).unwrap(), "/dir/file%20name.txt");
        assert_eq!(canonicalize_uri_path("/dir/file%20name.txt", true).unwrap(), "/dir/file name.txt");
        assert_eq!(canonicalize_uri_path("/a+b", false).unwrap(), "/a%20b");
        assert_eq!(canonicalize_uri_path("/100%25", false).unwrap(), "/100%25");
        assert_eq!(canonicalize_uri_path("/caf%C3%A9", false).unwrap(), "/caf%C3%A9");
    }

    #[test_log::test]
    fn canonicalize_path_invalid() {
        let e = canonicalize_uri_path("/abc%ZZ", false).unwrap_err();
        assert!(matches!(e, SignatureError::InvalidURIPath(_)));
        assert_eq!(e.to_string(), "Illegal hex character in escape % pattern: %ZZ");

        let e = canonicalize_uri_path("/abc%2", false).unwrap_err();
        assert_eq!(e.to_string(), "Incomplete trailing escape % sequence");
    }

    #[test_log::test]
    fn canonicalize_query_dedupes_for_s3() {
        let q = QueryParams::parse("a=1&a=2&b=3");
        assert_eq!(canonicalize_query(&q, true), "a=1&b=3");
        assert_eq!(canonicalize_query(&q, false), "a=1&a=2&b=3");

        let q = QueryParams::parse("b=2&a=z&a=y");
        assert_eq!(canonicalize_query(&q, false), "a=y&a=z&b=2");
    }

    #[test_log::test]
    fn canonicalize_query_encoding() {
        let q = QueryParams::parse("a=1&a=2&b=3&=x&c=hello%20world&d=a+b");
        assert_eq!(canonicalize_query(&q, true), "a=1&b=3&c=hello%20world&d=a%20b");

        let q = QueryParams::parse("key=(it's)!*&slash=a/b&empty");
        assert_eq!(canonicalize_query(&q, true), "empty=&key=%28it%27s%29%21%2A&slash=a%2Fb");
        assert_eq!(canonicalize_query(&QueryParams::new(), true), "");
    }

    #[test_log::test]
    fn header_normalization() {
        assert_eq!(normalize_header_value("  a   b  "), "a b");
        assert_eq!(normalize_header_value("a\t\tb"), "a b");
        assert_eq!(normalize_header_value("ab"), "ab");
        assert_eq!(normalize_header_value("\u{a0}a\u{a0}\u{a0}b\u{3000}"), "a b");
        assert_eq!(normalize_header_value("\u{85}a\u{85}b\u{85}"), "\u{85}a\u{85}b\u{85}");

        let mut headers = HeaderMap::new();
        headers.append("x-amz-meta-a", HeaderValue::from_static("  one  "));
        headers.append("x-amz-meta-a", HeaderValue::from_static("two   three"));
        assert_eq!(canonical_header_value(&headers, "x-amz-meta-a").unwrap(), "one, two three");
        assert!(canonical_header_value(&headers, "x-amz-meta-b").is_none());

        // Latin-1 0x85 maps to U+0085 and is not whitespace.
        headers.insert("x-amz-meta-c", HeaderValue::from_bytes(b"\x85a\x85  b").unwrap());
        assert_eq!(canonical_header_value(&headers, "x-amz-meta-c").unwrap(), "\u{85}a\u{85} b");

        assert_eq!(latin1_to_string(b"caf\xe9"), "caf\u{e9}");
    }

    #[test_log::test]
    fn signable_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("user-agent", HeaderValue::from_static("test"));
        headers.insert("range", HeaderValue::from_static("bytes=0-9"));
        headers.insert("x-amz-date", HeaderValue::from_static("20230101T000000Z"));
        headers.insert("x-amz-meta-note", HeaderValue::from_static("x"));

        assert_eq!(signable_header_names(&headers, false), vec!["host", "x-amz-date", "x-amz-meta-note"]);
        assert_eq!(
            signable_header_names(&headers, true),
            vec!["content-type", "host", "range", "user-agent", "x-amz-date", "x-amz-meta-note"]
        );
        assert_eq!(signable_header_names(&HeaderMap::new(), false), vec!["host"]);
    }

    #[test_log::test]
    fn host_port_rules() {
        let uri = Uri::from_static("https://Bucket.s3.amazonaws.com/key");
        assert_eq!(canonical_host(&uri).unwrap(), "bucket.s3.amazonaws.com");

        let uri = Uri::from_static("https://localhost:443/key");
        assert_eq!(canonical_host(&uri).unwrap(), "localhost");

        let uri = Uri::from_static("http://localhost:9000/key");
        assert_eq!(canonical_host(&uri).unwrap(), "localhost:9000");

        let uri = Uri::from_static("https://localhost:80/key");
        assert_eq!(canonical_host(&uri).unwrap(), "localhost:80");

        let uri = Uri::from_static("/relative");
        assert!(matches!(canonical_host(&uri), Err(SignatureError::UnsupportedInput(_))));
    }

    #[test_log::test]
    fn payload_hash_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(payload_hash(&headers, None), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(
            payload_hash(&headers, Some(b"hello world")),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        headers.insert("x-amz-content-sha256", HeaderValue::from_static("UNSIGNED-PAYLOAD"));
        assert_eq!(payload_hash(&headers, Some(b"hello world")), "UNSIGNED-PAYLOAD");
    }

    #[test_log::test]
    fn canonical_request_layout() {
        let uri = Uri::from_static("https://bucket.s3.us-east-1.amazonaws.com/object.txt");
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-content-sha256", HeaderValue::from_static("UNSIGNED-PAYLOAD"));
        headers.insert("x-amz-date", HeaderValue::from_static("20230101T000000Z"));
        let signed = signable_header_names(&headers, false);

        let creq = CanonicalRequest::new(
            &Method::GET,
            &uri,
            &QueryParams::new(),
            &headers,
            &signed,
            None,
            CanonicalOptions {
                s3: true,
                single_encode: false,
            },
        )
        .unwrap();

        assert_eq!(creq.method(), "GET");
        assert_eq!(creq.canonical_path(), "/object.txt");
        assert_eq!(creq.canonical_query(), "");
        assert_eq!(creq.signed_headers(), "host;x-amz-content-sha256;x-amz-date");
        assert_eq!(creq.payload_hash(), "UNSIGNED-PAYLOAD");
        assert_eq!(
            creq.canonical_request(),
            "GET\n/object.txt\n\nhost:bucket.s3.us-east-1.amazonaws.com\nx-amz-content-sha256:UNSIGNED-PAYLOAD\n\
             x-amz-date:20230101T000000Z\n\nhost;x-amz-content-sha256;x-amz-date\nUNSIGNED-PAYLOAD"
        );
        assert_eq!(
            creq.canonical_request_sha256_hex(),
            "b3587f1c7d1099d87bff7a4e7151abae9b508c24bd071e2376255bcc4473db1f"
        );
        let _ = format!("{:?}", creq);
    }
}
