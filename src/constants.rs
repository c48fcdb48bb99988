//! Common constants used throughout the crate.
//!
//! This was consolidated here so the signer, canonicalizer, and proxy agree on spelling. If a value
//! is spelled incorrectly, at least it can be fixed in one spot.
//!
//! Tests that are testing the content of an error code, header, or message should not use these
//! constants; they should use hard-coded strings so the tests are also testing for misspellings.
//!
//! Please keep this file organized alphabetically. (This can be a bit hard with comments, etc.)

/// Prefix prepended to the secret access key to form `kSecret`.
pub(crate) const AWS4: &str = "AWS4";

/// Algorithm for AWS SigV4
pub(crate) const AWS4_HMAC_SHA256: &str = "AWS4-HMAC-SHA256";

/// String included at the end of the AWS SigV4 credential scope
pub(crate) const AWS4_REQUEST: &str = "aws4_request";

/// CORS preflight: allowed request headers.
pub(crate) const CORS_ALLOW_HEADERS: &str = "Content-Type,Authorization";

/// CORS preflight: allowed methods.
pub(crate) const CORS_ALLOW_METHODS: &str = "GET,OPTIONS,POST";

/// CORS preflight: allowed origins.
pub(crate) const CORS_ALLOW_ORIGIN: &str = "*";

/// CORS preflight: how long the preflight response may be cached, in seconds.
pub(crate) const CORS_MAX_AGE: &str = "86400";

/// Default number of entries kept in a [`SigningKeyCache`][crate::SigningKeyCache].
pub(crate) const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Default lifetime of a presigned S3 URL, in seconds (24 hours).
pub(crate) const DEFAULT_PRESIGN_EXPIRES_SECS: u64 = 86400;

/// Default region when none is configured.
pub(crate) const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable: access key id.
pub(crate) const ENV_ACCESS_KEY_ID: &str = "ACCESS_KEY_ID";

/// Environment variable: addressing style (`virtual` or `path`).
pub(crate) const ENV_S3_ADDRESSING_STYLE: &str = "S3_ADDRESSING_STYLE";

/// Environment variable: bucket name.
pub(crate) const ENV_S3_BUCKET_NAME: &str = "S3_BUCKET_NAME";

/// Environment variable: custom S3-compatible endpoint host.
pub(crate) const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT";

/// Environment variable: region.
pub(crate) const ENV_S3_REGION: &str = "S3_REGION";

/// Environment variable: secret access key.
pub(crate) const ENV_SECRET_ACCESS_KEY: &str = "SECRET_ACCESS_KEY";

/// Environment variable: session token.
pub(crate) const ENV_SESSION_TOKEN: &str = "SESSION_TOKEN";

/// Error code: InternalFailure
pub(crate) const ERR_CODE_INTERNAL_FAILURE: &str = "InternalFailure";

/// Error code: InvalidConfiguration (non-AWS standard)
pub(crate) const ERR_CODE_INVALID_CONFIGURATION: &str = "InvalidConfiguration";

/// Error code: InvalidURIPath
pub(crate) const ERR_CODE_INVALID_URI_PATH: &str = "InvalidURIPath";

/// Error code: MalformedHeader
pub(crate) const ERR_CODE_MALFORMED_HEADER: &str = "MalformedHeader";

/// Error code: MalformedQueryString
pub(crate) const ERR_CODE_MALFORMED_QUERY_STRING: &str = "MalformedQueryString";

/// Error code: MissingAuthenticationToken
pub(crate) const ERR_CODE_MISSING_AUTHENTICATION_TOKEN: &str = "MissingAuthenticationToken";

/// Error code: UnsupportedInput (non-AWS standard)
pub(crate) const ERR_CODE_UNSUPPORTED_INPUT: &str = "UnsupportedInput";

/// Header for `authorization`
pub(crate) const HDR_AUTHORIZATION: &str = "authorization";

/// Header for `content-length`
pub(crate) const HDR_CONTENT_LENGTH: &str = "content-length";

/// Header for `content-type`
pub(crate) const HDR_CONTENT_TYPE: &str = "content-type";

/// Header for `expect`
pub(crate) const HDR_EXPECT: &str = "expect";

/// Header for `host`
pub(crate) const HDR_HOST: &str = "host";

/// Header for `presigned-expires`
pub(crate) const HDR_PRESIGNED_EXPIRES: &str = "presigned-expires";

/// Header for `range`
pub(crate) const HDR_RANGE: &str = "range";

/// Header for `user-agent`
pub(crate) const HDR_USER_AGENT: &str = "user-agent";

/// Prefix shared by all AWS-specific headers.
pub(crate) const HDR_X_AMZ_PREFIX: &str = "x-amz-";

/// Header for `x-amz-content-sha256`
pub(crate) const HDR_X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

/// Header for delivering the alternate date
pub(crate) const HDR_X_AMZ_DATE: &str = "x-amz-date";

/// Header for delivering the session token
pub(crate) const HDR_X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

/// Header for `x-amzn-trace-id`
pub(crate) const HDR_X_AMZN_TRACE_ID: &str = "x-amzn-trace-id";

/// Header for `x-forwarded-proto`
pub(crate) const HDR_X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Uppercase hex digits.
pub(crate) const HEX_DIGITS_UPPER: [u8; 16] =
    [b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'A', b'B', b'C', b'D', b'E', b'F'];

/// Compact ISO8601 format used for the string to sign.
pub(crate) const ISO8601_COMPACT_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Short date format
pub(crate) const ISO8601_DATE_FORMAT: &str = "%Y%m%d";

/// Error message: `"Illegal hex character in escape % pattern: %"`
pub(crate) const MSG_ILLEGAL_HEX_CHAR: &str = "Illegal hex character in escape % pattern: %";

/// Error message: `"Incomplete trailing escape % sequence"`
pub(crate) const MSG_INCOMPLETE_TRAILING_ESCAPE: &str = "Incomplete trailing escape % sequence";

/// Error message: `"accessKeyId is a required option"`
pub(crate) const MSG_MISSING_ACCESS_KEY_ID: &str = "accessKeyId is a required option";

/// Error message: `"secretAccessKey is a required option"`
pub(crate) const MSG_MISSING_SECRET_ACCESS_KEY: &str = "secretAccessKey is a required option";

/// Error message: `"url is a required option"`
pub(crate) const MSG_MISSING_URL: &str = "url is a required option";

/// Body of the response substituted for failed upstream responses.
pub(crate) const MSG_NOT_READY: &str = "Setup not yet complete!";

/// Upstream statuses above this value are replaced with the "not ready" response.
pub(crate) const NOT_READY_STATUS_THRESHOLD: u16 = 400;

/// Query parameter for the signature algorithm
pub(crate) const QP_X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";

/// Query parameter for delivering the access key
pub(crate) const QP_X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";

/// Query parameter for delivering the date
pub(crate) const QP_X_AMZ_DATE: &str = "X-Amz-Date";

/// Query parameter for delivering the expiration time of a presigned URL
pub(crate) const QP_X_AMZ_EXPIRES: &str = "X-Amz-Expires";

/// Query parameter for delivering the session token
pub(crate) const QP_X_AMZ_SECURITY_TOKEN: &str = "X-Amz-Security-Token";

/// Query parameter for delivering the signature
pub(crate) const QP_X_AMZ_SIGNATURE: &str = "X-Amz-Signature";

/// Query parameter specifying the signed headers
pub(crate) const QP_X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";

/// Service name for S3. Enables the S3-specific canonicalization rules.
pub(crate) const S3_SERVICE: &str = "s3";

/// Domain suffix for AWS S3 endpoints.
pub(crate) const S3_DOMAIN: &str = "amazonaws.com";

/// SHA-256 of an empty string.
pub(crate) const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// The length of a SHA-256 digest in bytes.
pub(crate) const SHA256_OUTPUT_LEN: usize = 32;

/// Headers that are never signed unless the signer is asked to sign everything.
pub(crate) const UNSIGNABLE_HEADERS: [&str; 9] = [
    HDR_AUTHORIZATION,
    HDR_CONTENT_TYPE,
    HDR_CONTENT_LENGTH,
    HDR_USER_AGENT,
    HDR_PRESIGNED_EXPIRES,
    HDR_EXPECT,
    HDR_X_AMZN_TRACE_ID,
    HDR_X_FORWARDED_PROTO,
    HDR_RANGE,
];

/// Region whose path-style endpoint carries no region segment.
pub(crate) const US_EAST_1: &str = "us-east-1";

/// Historical alias for `us-east-1`.
pub(crate) const US_EAST_LEGACY: &str = "us-east";

/// Token used for `x-amz-content-sha256` when the payload is unsigned
pub(crate) const XACS_UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
