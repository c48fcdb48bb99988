//! Rewriting inbound request targets into S3 endpoints.
//!
//! Two addressing styles are supported:
//!
//! * Virtual-hosted style: `https://<bucket>.s3.<region>.amazonaws.com/<path>`
//! * Path style: `https://s3.amazonaws.com/<bucket>/<path>` for `us-east-1` (and its historical
//!   alias `us-east`), `https://s3-<region>.amazonaws.com/<bucket>/<path>` elsewhere.
//!
//! A custom endpoint replaces the `amazonaws.com` host for S3-compatible stores.

use {
    crate::{constants::*, SignatureError},
    http::uri::{Authority, Scheme, Uri},
    log::debug,
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// How the bucket name is embedded in the endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressingStyle {
    /// The bucket is a subdomain of the regional S3 host.
    #[default]
    VirtualHosted,

    /// The bucket is the first path segment.
    Path,
}

impl FromStr for AddressingStyle {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, SignatureError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" | "virtual-hosted" | "virtual_hosted" => Ok(Self::VirtualHosted),
            "path" => Ok(Self::Path),
            _ => Err(SignatureError::InvalidConfiguration(format!("Unknown S3 addressing style: {}", s))),
        }
    }
}

impl Display for AddressingStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::VirtualHosted => f.write_str("virtual"),
            Self::Path => f.write_str("path"),
        }
    }
}

/// The virtual-hosted-style host for `bucket` in `region`.
pub fn virtual_hosted_host(bucket: &str, region: &str) -> String {
    format!("{}.{}.{}.{}", bucket, S3_SERVICE, region, S3_DOMAIN)
}

/// The path-style host for `region`. `us-east-1` and `us-east` have no region segment.
pub fn path_style_host(region: &str) -> String {
    if region == US_EAST_1 || region == US_EAST_LEGACY {
        format!("{}.{}", S3_SERVICE, S3_DOMAIN)
    } else {
        format!("{}-{}.{}", S3_SERVICE, region, S3_DOMAIN)
    }
}

/// Rewrites request URIs to target a bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointRewriter {
    bucket: String,
    region: String,
    style: AddressingStyle,
    scheme: Scheme,
    custom_host: Option<Authority>,
}

impl EndpointRewriter {
    /// Create a rewriter for `bucket` in `region`. The bucket and region must not be empty.
    pub fn new<B, R>(bucket: B, region: R, style: AddressingStyle) -> Result<Self, SignatureError>
    where
        B: Into<String>,
        R: Into<String>,
    {
        let bucket = bucket.into();
        let region = region.into();

        if bucket.is_empty() {
            return Err(SignatureError::InvalidConfiguration("bucketName is a required option".to_string()));
        }

        if region.is_empty() {
            return Err(SignatureError::InvalidConfiguration("region is a required option".to_string()));
        }

        Ok(Self {
            bucket,
            region,
            style,
            scheme: Scheme::HTTPS,
            custom_host: None,
        })
    }

    /// Target an S3-compatible store instead of `amazonaws.com`.
    ///
    /// `endpoint` is a host with an optional port, optionally prefixed by `http://` or `https://`
    /// (the default). Virtual-hosted requests go to `<bucket>.<host>`, path-style requests to `<host>`.
    pub fn with_custom_host(mut self, endpoint: &str) -> Result<Self, SignatureError> {
        let (scheme, host) = if let Some(host) = endpoint.strip_prefix("https://") {
            (Scheme::HTTPS, host)
        } else if let Some(host) = endpoint.strip_prefix("http://") {
            (Scheme::HTTP, host)
        } else {
            (Scheme::HTTPS, endpoint)
        };

        let host = host.trim_end_matches('/');
        let authority = Authority::from_str(host)
            .map_err(|e| SignatureError::InvalidConfiguration(format!("Invalid S3 endpoint {}: {}", endpoint, e)))?;

        self.scheme = scheme;
        self.custom_host = Some(authority);
        Ok(self)
    }

    /// The bucket name.
    #[inline(always)]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The region name.
    #[inline(always)]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The addressing style.
    #[inline(always)]
    pub fn style(&self) -> AddressingStyle {
        self.style
    }

    /// The host requests are sent to.
    pub fn host(&self) -> String {
        match (&self.custom_host, self.style) {
            (None, AddressingStyle::VirtualHosted) => virtual_hosted_host(&self.bucket, &self.region),
            (None, AddressingStyle::Path) => path_style_host(&self.region),
            (Some(custom), AddressingStyle::VirtualHosted) => format!("{}.{}", self.bucket, custom),
            (Some(custom), AddressingStyle::Path) => custom.to_string(),
        }
    }

    /// Rewrite `uri` to target the bucket. The path and query are kept; for path style the bucket
    /// is prepended to the path. Any scheme, host and port on `uri` are replaced.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri, SignatureError> {
        let path = match self.style {
            AddressingStyle::VirtualHosted => uri.path().to_string(),
            AddressingStyle::Path => format!("/{}{}", self.bucket, uri.path()),
        };

        let path_and_query = match uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        let host = self.host();
        let result = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(host.as_str())
            .path_and_query(path_and_query.as_str())
            .build()
            .map_err(|e| SignatureError::InvalidConfiguration(format!("Cannot build S3 URL for {}: {}", host, e)))?;

        debug!("Rewrote {} to {}", uri, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{path_style_host, virtual_hosted_host, AddressingStyle, EndpointRewriter},
        crate::SignatureError,
        http::uri::Uri,
        std::str::FromStr,
    };

    #[test_log::test]
    fn test_region_aliasing() {
        assert_eq!(path_style_host("us-east-1"), "s3.amazonaws.com");
        assert_eq!(path_style_host("us-east"), "s3.amazonaws.com");
        assert_eq!(path_style_host("eu-west-1"), "s3-eu-west-1.amazonaws.com");
        assert_eq!(virtual_hosted_host("bucket", "us-east-1"), "bucket.s3.us-east-1.amazonaws.com");
    }

    #[test_log::test]
    fn test_addressing_style_parse() {
        assert_eq!(AddressingStyle::from_str("virtual").unwrap(), AddressingStyle::VirtualHosted);
        assert_eq!(AddressingStyle::from_str("Path").unwrap(), AddressingStyle::Path);
        assert_eq!(AddressingStyle::default(), AddressingStyle::VirtualHosted);
        assert_eq!(AddressingStyle::Path.to_string(), "path");

        match AddressingStyle::from_str("dns") {
            Err(SignatureError::InvalidConfiguration(msg)) => assert_eq!(msg, "Unknown S3 addressing style: dns"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test_log::test]
    fn test_virtual_hosted_rewrite() {
        let rewriter = EndpointRewriter::new("bucket", "us-east-1", AddressingStyle::VirtualHosted).unwrap();
        let uri = Uri::from_static("https://proxy.example.com:8443/object.txt?x=1");
        assert_eq!(
            rewriter.rewrite(&uri).unwrap().to_string(),
            "https://bucket.s3.us-east-1.amazonaws.com/object.txt?x=1"
        );

        let uri = Uri::from_static("/a%20b/c.txt");
        assert_eq!(rewriter.rewrite(&uri).unwrap().to_string(), "https://bucket.s3.us-east-1.amazonaws.com/a%20b/c.txt");
    }

    #[test_log::test]
    fn test_path_style_rewrite() {
        let rewriter = EndpointRewriter::new("bucket", "us-east-1", AddressingStyle::Path).unwrap();
        let uri = Uri::from_static("http://proxy.example.com/key.txt");
        assert_eq!(rewriter.rewrite(&uri).unwrap().to_string(), "https://s3.amazonaws.com/bucket/key.txt");

        let rewriter = EndpointRewriter::new("bucket", "eu-west-1", AddressingStyle::Path).unwrap();
        assert_eq!(rewriter.host(), "s3-eu-west-1.amazonaws.com");
        assert_eq!(rewriter.rewrite(&uri).unwrap().to_string(), "https://s3-eu-west-1.amazonaws.com/bucket/key.txt");
    }

    #[test_log::test]
    fn test_custom_host() {
        let rewriter = EndpointRewriter::new("bucket", "us-east-1", AddressingStyle::Path)
            .unwrap()
            .with_custom_host("http://localhost:9000/")
            .unwrap();
        let uri = Uri::from_static("https://proxy.example.com/key.txt");
        assert_eq!(rewriter.rewrite(&uri).unwrap().to_string(), "http://localhost:9000/bucket/key.txt");

        let rewriter = EndpointRewriter::new("bucket", "auto", AddressingStyle::VirtualHosted)
            .unwrap()
            .with_custom_host("storage.example.net")
            .unwrap();
        assert_eq!(rewriter.host(), "bucket.storage.example.net");
        assert_eq!(rewriter.rewrite(&uri).unwrap().to_string(), "https://bucket.storage.example.net/key.txt");
    }

    #[test_log::test]
    fn test_invalid_configuration() {
        assert!(matches!(
            EndpointRewriter::new("", "us-east-1", AddressingStyle::VirtualHosted),
            Err(SignatureError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            EndpointRewriter::new("bucket", "", AddressingStyle::VirtualHosted),
            Err(SignatureError::InvalidConfiguration(_))
        ));
        assert!(EndpointRewriter::new("bucket", "us-east-1", AddressingStyle::Path)
            .unwrap()
            .with_custom_host("bad host")
            .is_err());
    }
}
