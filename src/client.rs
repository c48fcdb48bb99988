//! Signing whole inbound requests for forwarding to S3.
//!
//! [`ProxySigner`] rewrites the request target with an [`EndpointRewriter`], signs the result with an
//! [`AwsV4Signer`] and then merges back the client's remaining headers.

use {
    crate::{
        constants::*, AwsV4Signer, EndpointRewriter, ProxyConfig, SignatureError, SigningKeyCache, SigningRequest,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    http::{
        header::{HeaderMap, HeaderValue},
        request::Request,
    },
    log::{debug, trace},
    std::sync::Arc,
};

/// What to sign: a bare URL or a complete request.
#[derive(Debug)]
pub enum SignInput {
    /// An absolute URL, signed as a `GET` with no headers and no body.
    RawUrl(String),

    /// A complete request. The method and body are kept; `x-amz-*` headers are signed and the other
    /// headers are forwarded unsigned.
    FullRequest(Request<Bytes>),
}

impl From<String> for SignInput {
    fn from(url: String) -> Self {
        Self::RawUrl(url)
    }
}

impl From<&str> for SignInput {
    fn from(url: &str) -> Self {
        Self::RawUrl(url.to_string())
    }
}

impl From<Request<Bytes>> for SignInput {
    fn from(request: Request<Bytes>) -> Self {
        Self::FullRequest(request)
    }
}

/// Rewrites and signs inbound requests for a single bucket.
#[derive(Clone, Debug)]
pub struct ProxySigner {
    rewriter: EndpointRewriter,
    signer: AwsV4Signer,
}

impl ProxySigner {
    /// Create a proxy signer with its own signing-key cache.
    pub fn new(config: &ProxyConfig) -> Result<Self, SignatureError> {
        Self::with_cache(config, Arc::new(SigningKeyCache::new()))
    }

    /// Create a proxy signer that uses a shared signing-key cache.
    pub fn with_cache(config: &ProxyConfig, cache: Arc<SigningKeyCache>) -> Result<Self, SignatureError> {
        let signer = AwsV4Signer::with_cache(config.signer_config()?, cache)?;
        Ok(Self::from_parts(config.rewriter()?, signer))
    }

    /// Combine an existing rewriter and signer.
    pub fn from_parts(rewriter: EndpointRewriter, signer: AwsV4Signer) -> Self {
        Self {
            rewriter,
            signer,
        }
    }

    /// Retrieve the endpoint rewriter.
    #[inline(always)]
    pub fn rewriter(&self) -> &EndpointRewriter {
        &self.rewriter
    }

    /// Retrieve the signer.
    #[inline(always)]
    pub fn signer(&self) -> &AwsV4Signer {
        &self.signer
    }

    /// Rewrite and sign `input` at the signer's configured time, or now if none is configured.
    pub fn sign<I: Into<SignInput>>(&self, input: I) -> Result<Request<Bytes>, SignatureError> {
        let datetime = self.signer.config().datetime().unwrap_or_else(Utc::now);
        self.sign_at(input, &datetime)
    }

    /// Rewrite and sign `input` at the given time.
    pub fn sign_at<I: Into<SignInput>>(
        &self,
        input: I,
        datetime: &DateTime<Utc>,
    ) -> Result<Request<Bytes>, SignatureError> {
        match input.into() {
            SignInput::RawUrl(url) => {
                let request = SigningRequest::from_url(&url)?;
                let uri = self.rewriter.rewrite(request.uri())?;
                debug!("Signing URL {} as {}", url, uri);
                self.signer.sign_at(SigningRequest::new(uri), datetime)
            }
            SignInput::FullRequest(request) => {
                let (parts, body) = request.into_parts();
                let uri = self.rewriter.rewrite(&parts.uri)?;
                debug!("Signing {} {} as {}", parts.method, parts.uri, uri);

                let mut amz_headers = HeaderMap::new();
                for (name, value) in parts.headers.iter() {
                    if name.as_str().starts_with(HDR_X_AMZ_PREFIX) {
                        amz_headers.append(name.clone(), value.clone());
                    }
                }

                let signing_request =
                    SigningRequest::new(uri).with_method(parts.method).with_headers(amz_headers).with_body(body);
                let mut signed = self.signer.sign_at(signing_request, datetime)?;
                merge_client_headers(signed.headers_mut(), &parts.headers);
                Ok(signed)
            }
        }
    }
}

/// Append the client's headers that the signer did not produce. `host` and `authorization` from the
/// client are never forwarded.
fn merge_client_headers(signed: &mut HeaderMap<HeaderValue>, client: &HeaderMap<HeaderValue>) {
    let signer_set: Vec<_> = signed.keys().cloned().collect();

    for (name, value) in client.iter() {
        let skip = name.as_str() == HDR_HOST || name.as_str() == HDR_AUTHORIZATION || signer_set.contains(name);
        if skip {
            trace!("Not forwarding client header {}", name);
        } else {
            signed.append(name.clone(), value.clone());
        }
    }
}
