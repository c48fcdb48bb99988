//! Proxy configuration: credentials, target bucket and addressing.
//!
//! Configuration is usually read from the process environment with [`ProxyConfig::from_env`]:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `ACCESS_KEY_ID` | Access key id (required) |
//! | `SECRET_ACCESS_KEY` | Secret access key (required) |
//! | `SESSION_TOKEN` | Session token for temporary credentials |
//! | `S3_REGION` | Region, default `us-east-1` |
//! | `S3_BUCKET_NAME` | Bucket name (required) |
//! | `S3_ADDRESSING_STYLE` | `virtual` (default) or `path` |
//! | `S3_ENDPOINT` | Host of an S3-compatible store, optionally with `http://` or `https://` |
//!
//! Empty values are treated as unset.

use {
    crate::{constants::*, AddressingStyle, EndpointRewriter, SignatureError, SignerConfig},
    log::debug,
    std::{
        env,
        fmt::{Debug, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// An access key id, secret access key and optional session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Create a new set of credentials. The access key id and secret access key must not be empty.
    pub fn new<A, S>(access_key_id: A, secret_access_key: S, session_token: Option<String>) -> Result<Self, SignatureError>
    where
        A: Into<String>,
        S: Into<String>,
    {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();

        if access_key_id.is_empty() {
            return Err(SignatureError::MissingAccessKeyId);
        }

        if secret_access_key.is_empty() {
            return Err(SignatureError::MissingSecretAccessKey);
        }

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: session_token.filter(|token| !token.is_empty()),
        })
    }

    /// Retrieve the access key id.
    #[inline(always)]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Retrieve the secret access key.
    #[inline(always)]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Retrieve the session token, if any.
    #[inline(always)]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything the proxy needs to rewrite and sign requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    credentials: Credentials,
    region: String,
    bucket: String,
    addressing_style: AddressingStyle,
    endpoint: Option<String>,
}

impl ProxyConfig {
    /// Create a configuration for `bucket` in `region` with virtual-hosted addressing.
    pub fn new<B, R>(credentials: Credentials, bucket: B, region: R) -> Result<Self, SignatureError>
    where
        B: Into<String>,
        R: Into<String>,
    {
        let bucket = bucket.into();
        let mut region = region.into();

        if bucket.is_empty() {
            return Err(SignatureError::InvalidConfiguration("bucketName is a required option".to_string()));
        }

        if region.is_empty() {
            region = DEFAULT_REGION.to_string();
        }

        Ok(Self {
            credentials,
            region,
            bucket,
            addressing_style: AddressingStyle::default(),
            endpoint: None,
        })
    }

    /// Use the given addressing style.
    pub fn with_addressing_style(mut self, addressing_style: AddressingStyle) -> Self {
        self.addressing_style = addressing_style;
        self
    }

    /// Send requests to an S3-compatible store instead of `amazonaws.com`.
    pub fn with_endpoint<E: Into<String>>(mut self, endpoint: E) -> Self {
        self.endpoint = Some(endpoint.into()).filter(|endpoint| !endpoint.is_empty());
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, SignatureError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SignatureError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let credentials = Credentials::new(
            get(ENV_ACCESS_KEY_ID).unwrap_or_default(),
            get(ENV_SECRET_ACCESS_KEY).unwrap_or_default(),
            get(ENV_SESSION_TOKEN),
        )?;

        let region = get(ENV_S3_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string());
        let bucket = get(ENV_S3_BUCKET_NAME).unwrap_or_default();

        let mut config = Self::new(credentials, bucket, region)?;

        if let Some(style) = get(ENV_S3_ADDRESSING_STYLE) {
            config = config.with_addressing_style(AddressingStyle::from_str(&style)?);
        }

        if let Some(endpoint) = get(ENV_S3_ENDPOINT) {
            config = config.with_endpoint(endpoint);
        }

        debug!(
            "Loaded proxy configuration: bucket={} region={} addressing_style={} endpoint={:?}",
            config.bucket, config.region, config.addressing_style, config.endpoint
        );

        Ok(config)
    }

    /// Retrieve the credentials.
    #[inline(always)]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Retrieve the region.
    #[inline(always)]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Retrieve the bucket name.
    #[inline(always)]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Retrieve the addressing style.
    #[inline(always)]
    pub fn addressing_style(&self) -> AddressingStyle {
        self.addressing_style
    }

    /// Retrieve the custom endpoint, if any.
    #[inline(always)]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Build the endpoint rewriter for this configuration.
    pub fn rewriter(&self) -> Result<EndpointRewriter, SignatureError> {
        let rewriter = EndpointRewriter::new(self.bucket.as_str(), self.region.as_str(), self.addressing_style)?;
        match &self.endpoint {
            Some(endpoint) => rewriter.with_custom_host(endpoint),
            None => Ok(rewriter),
        }
    }

    /// Build the header-mode S3 signer configuration for these credentials and region.
    pub fn signer_config(&self) -> Result<SignerConfig, SignatureError> {
        let mut builder = SignerConfig::builder();
        builder
            .access_key_id(self.credentials.access_key_id())
            .secret_access_key(self.credentials.secret_access_key())
            .region(self.region.as_str())
            .service(S3_SERVICE);

        if let Some(token) = self.credentials.session_token() {
            builder.session_token(token);
        }

        builder.build()
    }
}
