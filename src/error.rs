use {
    crate::constants::*,
    derive_builder::UninitializedFieldError,
    http::status::StatusCode,
    scratchstack_errors::ServiceError,
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

/// Error returned when a request cannot be prepared for signing or signed.
#[derive(Debug)]
#[non_exhaustive]
pub enum SignatureError {
    /// The access key id was not supplied or is empty.
    MissingAccessKeyId,

    /// The secret access key was not supplied or is empty.
    MissingSecretAccessKey,

    /// No URL was supplied for the request.
    MissingUrl,

    /// Some other configuration value is missing or invalid, e.g. an empty bucket name or an
    /// unknown addressing style.
    InvalidConfiguration(/* message */ String),

    /// The input to sign was not a usable URL or request. Sample messages:
    /// `Runtime error - can only sign URLs or Requests`
    /// `URL must be absolute: /foo`
    UnsupportedInput(/* message */ String),

    /// Signing failed due to an internal error, e.g. from an injected service.
    InternalServiceError(Box<dyn Error + Send + Sync>),

    /// The URI path includes invalid components. This can be a malformed hex encoding (e.g. `%0J`) or a path
    /// that does not decode to UTF-8.
    InvalidURIPath(/* message */ String),

    /// A header value could not be represented, e.g. a session token containing control characters.
    MalformedHeader(/* message */ String),

    /// The query string could not be rebuilt after adding the signing parameters.
    MalformedQueryString(/* message */ String),
}

impl SignatureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAccessKeyId | Self::MissingSecretAccessKey => ERR_CODE_MISSING_AUTHENTICATION_TOKEN,
            Self::MissingUrl | Self::InvalidConfiguration(_) => ERR_CODE_INVALID_CONFIGURATION,
            Self::UnsupportedInput(_) => ERR_CODE_UNSUPPORTED_INPUT,
            Self::InternalServiceError(_) => ERR_CODE_INTERNAL_FAILURE,
            Self::InvalidURIPath(_) => ERR_CODE_INVALID_URI_PATH,
            Self::MalformedHeader(_) => ERR_CODE_MALFORMED_HEADER,
            Self::MalformedQueryString(_) => ERR_CODE_MALFORMED_QUERY_STRING,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Self::UnsupportedInput(_)
            | Self::InvalidURIPath(_)
            | Self::MalformedHeader(_)
            | Self::MalformedQueryString(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Indicates whether this error was caused by the signer's configuration rather than the request.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingAccessKeyId | Self::MissingSecretAccessKey | Self::MissingUrl | Self::InvalidConfiguration(_)
        )
    }
}

impl ServiceError for SignatureError {
    fn error_code(&self) -> &'static str {
        SignatureError::error_code(self)
    }

    fn http_status(&self) -> StatusCode {
        SignatureError::http_status(self)
    }
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::MissingAccessKeyId => f.write_str(MSG_MISSING_ACCESS_KEY_ID),
            Self::MissingSecretAccessKey => f.write_str(MSG_MISSING_SECRET_ACCESS_KEY),
            Self::MissingUrl => f.write_str(MSG_MISSING_URL),
            Self::InvalidConfiguration(msg) => f.write_str(msg),
            Self::UnsupportedInput(msg) => f.write_str(msg),
            Self::InternalServiceError(ref e) => Display::fmt(e, f),
            Self::InvalidURIPath(msg) => f.write_str(msg),
            Self::MalformedHeader(msg) => f.write_str(msg),
            Self::MalformedQueryString(msg) => f.write_str(msg),
        }
    }
}

impl Error for SignatureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InternalServiceError(ref e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<Box<dyn Error + Send + Sync>> for SignatureError {
    fn from(e: Box<dyn Error + Send + Sync>) -> SignatureError {
        match e.downcast::<SignatureError>() {
            Ok(sig_err) => *sig_err,
            Err(e) => SignatureError::InternalServiceError(e),
        }
    }
}

impl From<UninitializedFieldError> for SignatureError {
    fn from(e: UninitializedFieldError) -> SignatureError {
        match e.field_name() {
            "access_key_id" => SignatureError::MissingAccessKeyId,
            "secret_access_key" => SignatureError::MissingSecretAccessKey,
            field => SignatureError::InvalidConfiguration(format!("{} is a required option", field)),
        }
    }
}
