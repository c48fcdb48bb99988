//! AWS SigV4 request signing.
//!
//! [`AwsV4Signer`] signs a [`SigningRequest`] in one of two modes:
//!
//! * **Header mode** (the default): `X-Amz-Date` (and `X-Amz-Security-Token`, unless deferred) are
//!   set as headers and the signature is delivered in an `Authorization` header.
//! * **Query mode** (`sign_query`): the same values, plus `X-Amz-Algorithm`, `X-Amz-Credential`,
//!   `X-Amz-SignedHeaders` and, for S3, a default `X-Amz-Expires`, are set as query parameters and
//!   the signature is appended as `X-Amz-Signature`, producing a presigned URL.
//!
//! Signing is split into a pure [`prepare`][AwsV4Signer::prepare] step that builds the new header
//! and query collections together with the canonical request, and a final step that computes the
//! signature and emits the signed request.

use {
    crate::{
        canonical::{canonical_host, signable_header_names, CanonicalOptions, CanonicalRequest},
        constants::*,
        encoding::encode_url,
        query::QueryParams,
        KSecretKey, SignatureError, SigningKeyCache,
    },
    bytes::Bytes,
    chrono::{DateTime, NaiveDate, NaiveDateTime, Utc},
    derive_builder::Builder,
    http::{
        header::{HeaderMap, HeaderValue},
        method::Method,
        request::Request,
        uri::{PathAndQuery, Uri},
    },
    log::{debug, trace},
    std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        str::FromStr,
        sync::Arc,
    },
};

/// Signing parameters: credentials, scope and mode flags.
///
/// SignerConfig structs are immutable. Use [SignerConfigBuilder] to construct a new one.
#[derive(Builder, Clone)]
#[builder(build_fn(error = "SignatureError", validate = "Self::validate"))]
pub struct SignerConfig {
    /// The access key id placed in the credential.
    #[builder(setter(into))]
    access_key_id: String,

    /// The secret access key used to derive the signing key.
    #[builder(setter(into))]
    secret_access_key: String,

    /// Optional session token for temporary credentials.
    #[builder(setter(into, strip_option), default)]
    session_token: Option<String>,

    /// The service name. S3-specific rules apply when this is `s3`.
    #[builder(setter(into), default = "S3_SERVICE.to_string()")]
    service: String,

    /// The region name.
    #[builder(setter(into), default = "DEFAULT_REGION.to_string()")]
    region: String,

    /// Fixed signing time. When unset, the current time is used.
    #[builder(setter(strip_option), default)]
    datetime: Option<DateTime<Utc>>,

    /// Sign via query parameters (a presigned URL) instead of an `Authorization` header.
    #[builder(default)]
    sign_query: bool,

    /// Add the session token after signing so it is not part of the signed material.
    #[builder(default)]
    append_session_token: bool,

    /// Sign every header, including those normally excluded.
    #[builder(default)]
    all_headers: bool,

    /// Do not percent-encode the decoded path a second time.
    #[builder(default)]
    single_encode: bool,

    /// For S3, send `X-Amz-Content-Sha256: UNSIGNED-PAYLOAD` unless the caller supplied a hash.
    #[builder(default = "true")]
    unsigned_payload: bool,
}

impl SignerConfigBuilder {
    fn validate(&self) -> Result<(), SignatureError> {
        if self.access_key_id.as_deref() == Some("") {
            return Err(SignatureError::MissingAccessKeyId);
        }

        if self.secret_access_key.as_deref() == Some("") {
            return Err(SignatureError::MissingSecretAccessKey);
        }

        Ok(())
    }
}

impl SignerConfig {
    /// Create a [SignerConfigBuilder] to construct a [SignerConfig].
    #[inline(always)]
    pub fn builder() -> SignerConfigBuilder {
        SignerConfigBuilder::default()
    }

    /// Retrieve the access key id.
    #[inline(always)]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Retrieve the session token, if any.
    #[inline(always)]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Retrieve the service name.
    #[inline(always)]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Retrieve the region name.
    #[inline(always)]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Retrieve the fixed signing time, if any.
    #[inline(always)]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.datetime
    }

    /// Indicates whether query-mode signing is used.
    #[inline(always)]
    pub fn sign_query(&self) -> bool {
        self.sign_query
    }

    /// Indicates whether the session token is added after signing.
    #[inline(always)]
    pub fn append_session_token(&self) -> bool {
        self.append_session_token
    }

    /// Indicates whether every header is signed.
    #[inline(always)]
    pub fn all_headers(&self) -> bool {
        self.all_headers
    }

    /// Indicates whether the path is encoded only once.
    #[inline(always)]
    pub fn single_encode(&self) -> bool {
        self.single_encode
    }

    /// Indicates whether `UNSIGNED-PAYLOAD` is injected for S3.
    #[inline(always)]
    pub fn unsigned_payload(&self) -> bool {
        self.unsigned_payload
    }

    fn is_s3(&self) -> bool {
        self.service == S3_SERVICE
    }

    /// The session token, treating an empty token as absent.
    fn effective_session_token(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|token| !token.is_empty())
    }
}

impl Debug for SignerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SignerConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("service", &self.service)
            .field("region", &self.region)
            .field("datetime", &self.datetime)
            .field("sign_query", &self.sign_query)
            .field("append_session_token", &self.append_session_token)
            .field("all_headers", &self.all_headers)
            .field("single_encode", &self.single_encode)
            .field("unsigned_payload", &self.unsigned_payload)
            .finish()
    }
}

/// A request to be signed.
///
/// The method is optional; when unset it defaults to `POST` if a body is present and `GET` otherwise.
/// An empty body is treated as no body.
#[derive(Clone, Debug)]
pub struct SigningRequest {
    method: Option<Method>,
    uri: Uri,
    headers: HeaderMap<HeaderValue>,
    body: Option<Bytes>,
}

impl SigningRequest {
    /// Create a request for `uri` with no headers and no body.
    pub fn new(uri: Uri) -> Self {
        Self {
            method: None,
            uri,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parse `url` into a request. The URL must be absolute.
    ///
    /// Spaces and non-ASCII characters in the path or query are percent-encoded first, and any
    /// fragment is dropped, so `https://host/a b.txt` is signed as `https://host/a%20b.txt`.
    pub fn from_url(url: &str) -> Result<Self, SignatureError> {
        if url.is_empty() {
            return Err(SignatureError::MissingUrl);
        }

        let encoded = encode_url(url);
        let uri = Uri::from_str(&encoded)
            .map_err(|e| SignatureError::UnsupportedInput(format!("Invalid URL {}: {}", url, e)))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(SignatureError::UnsupportedInput(format!("URL must be absolute: {}", url)));
        }

        Ok(Self::new(uri))
    }

    /// Set an explicit method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Replace the headers.
    pub fn with_headers(mut self, headers: HeaderMap<HeaderValue>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body. An empty body is treated as no body.
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        let body = body.into();
        self.body = if body.is_empty() {
            None
        } else {
            Some(body)
        };
        self
    }

    /// The effective method.
    pub fn method(&self) -> Method {
        match &self.method {
            Some(method) => method.clone(),
            None if self.body.is_some() => Method::POST,
            None => Method::GET,
        }
    }

    /// The request URI.
    #[inline(always)]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request headers.
    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }

    /// Mutable access to the request headers.
    #[inline(always)]
    pub fn headers_mut(&mut self) -> &mut HeaderMap<HeaderValue> {
        &mut self.headers
    }

    /// The request body, if any.
    #[inline(always)]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

impl From<Uri> for SigningRequest {
    fn from(uri: Uri) -> Self {
        Self::new(uri)
    }
}

impl From<Request<Bytes>> for SigningRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.uri).with_method(parts.method).with_headers(parts.headers).with_body(body)
    }
}

/// The credential scope: `YYYYMMDD/region/service/aws4_request`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialScope {
    date: NaiveDate,
    region: String,
    service: String,
}

impl CredentialScope {
    /// Create a new credential scope.
    pub fn new<R: Into<String>, S: Into<String>>(date: NaiveDate, region: R, service: S) -> Self {
        Self {
            date,
            region: region.into(),
            service: service.into(),
        }
    }

    /// The scope date.
    #[inline(always)]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The scope region.
    #[inline(always)]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The scope service.
    #[inline(always)]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Display for CredentialScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}/{}/{}", self.date.format(ISO8601_DATE_FORMAT), self.region, self.service, AWS4_REQUEST)
    }
}

/// Parse a compact ISO 8601 timestamp (`YYYYMMDDTHHMMSSZ`).
pub fn parse_compact_timestamp(timestamp: &str) -> Result<DateTime<Utc>, SignatureError> {
    match NaiveDateTime::parse_from_str(timestamp, ISO8601_COMPACT_FORMAT) {
        Ok(dt) => Ok(dt.and_utc()),
        Err(e) => Err(SignatureError::InvalidConfiguration(format!("Invalid timestamp {}: {}", timestamp, e))),
    }
}

/// Format a timestamp in compact ISO 8601 form (`YYYYMMDDTHHMMSSZ`).
pub fn format_compact_timestamp(datetime: &DateTime<Utc>) -> String {
    datetime.format(ISO8601_COMPACT_FORMAT).to_string()
}

/// Build the string to sign from the timestamp, scope and hex hash of the canonical request.
pub fn string_to_sign(amz_date: &str, scope: &CredentialScope, canonical_request_sha256_hex: &str) -> String {
    let result = format!("{}\n{}\n{}\n{}", AWS4_HMAC_SHA256, amz_date, scope, canonical_request_sha256_hex);
    trace!("String to sign:\n{}", result);
    result
}

/// A request with its signing parameters in place, ready for the signature.
///
/// Produced by [`AwsV4Signer::prepare`]; nothing in the original [`SigningRequest`] is modified.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap<HeaderValue>,
    query: QueryParams,
    body: Option<Bytes>,
    amz_date: String,
    scope: CredentialScope,
    canonical: CanonicalRequest,
}

impl PreparedRequest {
    /// The request method.
    #[inline(always)]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The headers that will be sent, before `Authorization` is added.
    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }

    /// The query parameters that will be sent, before `X-Amz-Signature` is added.
    #[inline(always)]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// The signing timestamp in compact ISO 8601 form.
    #[inline(always)]
    pub fn amz_date(&self) -> &str {
        &self.amz_date
    }

    /// The credential scope.
    #[inline(always)]
    pub fn credential_scope(&self) -> &CredentialScope {
        &self.scope
    }

    /// The canonical request.
    #[inline(always)]
    pub fn canonical_request(&self) -> &CanonicalRequest {
        &self.canonical
    }

    /// The string to sign.
    pub fn string_to_sign(&self) -> String {
        string_to_sign(&self.amz_date, &self.scope, &self.canonical.canonical_request_sha256_hex())
    }
}

/// Signs requests with AWS SigV4.
///
/// Signing keys come from a [`SigningKeyCache`]. Signers built with [`AwsV4Signer::new`] get a
/// private cache; use [`AwsV4Signer::with_cache`] to share one between signers.
#[derive(Clone, Debug)]
pub struct AwsV4Signer {
    config: SignerConfig,
    secret_key: KSecretKey,
    cache: Arc<SigningKeyCache>,
}

impl AwsV4Signer {
    /// Create a signer with its own signing-key cache.
    pub fn new(config: SignerConfig) -> Result<Self, SignatureError> {
        Self::with_cache(config, Arc::new(SigningKeyCache::new()))
    }

    /// Create a signer that uses a shared signing-key cache.
    ///
    /// Empty credentials are rejected here, before any cryptographic work.
    pub fn with_cache(config: SignerConfig, cache: Arc<SigningKeyCache>) -> Result<Self, SignatureError> {
        if config.access_key_id.is_empty() {
            return Err(SignatureError::MissingAccessKeyId);
        }

        let secret_key = KSecretKey::from_str(&config.secret_access_key)?;

        Ok(Self {
            config,
            secret_key,
            cache,
        })
    }

    /// Retrieve the signer configuration.
    #[inline(always)]
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Retrieve the signing-key cache.
    #[inline(always)]
    pub fn cache(&self) -> &Arc<SigningKeyCache> {
        &self.cache
    }

    /// Sign a request at the configured time, or now if none is configured.
    pub fn sign<R: Into<SigningRequest>>(&self, request: R) -> Result<Request<Bytes>, SignatureError> {
        let datetime = self.config.datetime.unwrap_or_else(Utc::now);
        self.sign_at(request, &datetime)
    }

    /// Sign a request at the given time.
    pub fn sign_at<R: Into<SigningRequest>>(
        &self,
        request: R,
        datetime: &DateTime<Utc>,
    ) -> Result<Request<Bytes>, SignatureError> {
        let request = request.into();
        let prepared = self.prepare(&request, datetime)?;
        let signature = self.signature(&prepared);
        self.finish(prepared, &signature)
    }

    /// Build the headers, query parameters and canonical request for `request` without signing it.
    pub fn prepare(&self, request: &SigningRequest, datetime: &DateTime<Utc>) -> Result<PreparedRequest, SignatureError> {
        let config = &self.config;
        let uri = request.uri();
        canonical_host(uri)?;

        let method = request.method();
        let amz_date = format_compact_timestamp(datetime);
        let scope = CredentialScope::new(datetime.date_naive(), config.region.as_str(), config.service.as_str());
        let session_token = config.effective_session_token();

        debug!("Preparing {} {} for signing (query mode: {})", method, uri, config.sign_query);

        let mut headers = request.headers().clone();
        headers.remove(HDR_HOST);

        let mut query = QueryParams::parse(uri.query().unwrap_or(""));

        if config.unsigned_payload && config.is_s3() && !headers.contains_key(HDR_X_AMZ_CONTENT_SHA256) {
            headers.insert(HDR_X_AMZ_CONTENT_SHA256, HeaderValue::from_static(XACS_UNSIGNED_PAYLOAD));
        }

        if config.sign_query {
            query.set(QP_X_AMZ_DATE, amz_date.as_str());
            if let Some(token) = session_token {
                if !config.append_session_token {
                    query.set(QP_X_AMZ_SECURITY_TOKEN, token);
                }
            }
        } else {
            headers.insert(HDR_X_AMZ_DATE, header_value(&amz_date)?);
            if let Some(token) = session_token {
                if !config.append_session_token {
                    headers.insert(HDR_X_AMZ_SECURITY_TOKEN, header_value(token)?);
                }
            }
        }

        let signed_headers = signable_header_names(&headers, config.all_headers);

        if config.sign_query {
            if config.is_s3() && !query.has(QP_X_AMZ_EXPIRES) {
                query.set(QP_X_AMZ_EXPIRES, DEFAULT_PRESIGN_EXPIRES_SECS.to_string());
            }
            query.set(QP_X_AMZ_ALGORITHM, AWS4_HMAC_SHA256);
            query.set(QP_X_AMZ_CREDENTIAL, format!("{}/{}", config.access_key_id, scope));
            query.set(QP_X_AMZ_SIGNED_HEADERS, signed_headers.join(";"));
        }

        let canonical = CanonicalRequest::new(
            &method,
            uri,
            &query,
            &headers,
            &signed_headers,
            request.body().map(|body| body.as_ref()),
            CanonicalOptions {
                s3: config.is_s3(),
                single_encode: config.single_encode,
            },
        )?;

        Ok(PreparedRequest {
            method,
            uri: uri.clone(),
            headers,
            query,
            body: request.body().cloned(),
            amz_date,
            scope,
            canonical,
        })
    }

    /// Compute the hex signature for a prepared request.
    pub fn signature(&self, prepared: &PreparedRequest) -> String {
        let scope = &prepared.scope;
        let signing_key = self.cache.get_signing_key(&self.secret_key, scope.date(), scope.region(), scope.service());
        signing_key.sign(&prepared.string_to_sign())
    }

    /// Place the signature and emit the signed request.
    fn finish(&self, prepared: PreparedRequest, signature: &str) -> Result<Request<Bytes>, SignatureError> {
        let config = &self.config;
        let PreparedRequest {
            method,
            mut uri,
            mut headers,
            mut query,
            body,
            scope,
            canonical,
            ..
        } = prepared;

        if config.sign_query {
            query.set(QP_X_AMZ_SIGNATURE, signature);
            if let Some(token) = config.effective_session_token() {
                if config.append_session_token {
                    query.set(QP_X_AMZ_SECURITY_TOKEN, token);
                }
            }
            uri = replace_query(&uri, &query)?;
        } else {
            let authorization = format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                AWS4_HMAC_SHA256,
                config.access_key_id,
                scope,
                canonical.signed_headers(),
                signature
            );
            headers.insert(HDR_AUTHORIZATION, header_value(&authorization)?);
        }

        debug!("Signed {} {} with signed headers {}", method, uri, canonical.signed_headers());

        let mut request = Request::new(body.unwrap_or_default());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Convert a string into a header value, rejecting control characters.
fn header_value(value: &str) -> Result<HeaderValue, SignatureError> {
    HeaderValue::from_str(value)
        .map_err(|_| SignatureError::MalformedHeader(format!("Header value contains invalid characters: {:?}", value)))
}

/// Replace the query string of `uri` with the form-urlencoded serialization of `query`.
fn replace_query(uri: &Uri, query: &QueryParams) -> Result<Uri, SignatureError> {
    let query_string = query.to_query_string();
    let path_and_query = if query_string.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query_string)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::from_str(&path_and_query).map_err(|e| SignatureError::MalformedQueryString(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| SignatureError::MalformedQueryString(e.to_string()))
}
