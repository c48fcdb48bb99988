//! Signing-key derivation and caching.
//!
//! The SigV4 signing key is derived from the secret access key through a four-step HMAC chain:
//!
//! ```text
//! kDate    = HMAC("AWS4" + secret, "YYYYMMDD")
//! kRegion  = HMAC(kDate, region)
//! kService = HMAC(kRegion, service)
//! kSigning = HMAC(kService, "aws4_request")
//! ```
//!
//! The chain only depends on the secret, the calendar date, the region, and the service, so the
//! result is memoized in a [`SigningKeyCache`] shared across signing operations.

use {
    crate::{
        constants::*,
        crypto::{hmac_sha256, sha256},
        SignatureError,
    },
    chrono::NaiveDate,
    log::trace,
    parking_lot::RwLock,
    std::{
        collections::HashMap,
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        str::FromStr,
        sync::atomic::{AtomicU64, Ordering},
    },
};

/// A raw AWS secret key (`kSecret`).
#[derive(Clone, PartialEq, Eq)]
pub struct KSecretKey {
    /// The secret key, prefixed with "AWS4".
    prefixed_key: Vec<u8>,
}

/// The `kDate` key: `HMAC_SHA256("AWS4" + KSecretKey, "YYYYMMDD")`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KDateKey {
    /// The raw key.
    key: [u8; SHA256_OUTPUT_LEN],
}

/// The `kRegion` key: an AWS `kDate` key, HMAC-SHA256 hashed with the region.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KRegionKey {
    /// The raw key.
    key: [u8; SHA256_OUTPUT_LEN],
}

/// The `kService` key: an AWS `kRegion` key, HMAC-SHA256 hashed with the service.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KServiceKey {
    /// The raw key.
    key: [u8; SHA256_OUTPUT_LEN],
}

/// The `kSigning` key: an AWS `kService` key, HMAC-SHA256 hashed with the "aws4_request" string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KSigningKey {
    /// The resulting raw signing key.
    key: [u8; SHA256_OUTPUT_LEN],
}

impl AsRef<[u8]> for KSecretKey {
    fn as_ref(&self) -> &[u8] {
        // Remove the "AWS4" prefix.
        &self.prefixed_key[AWS4.len()..]
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for KDateKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for KRegionKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for KServiceKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for KSigningKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

/// Key material never shows up in logs; `Debug` and `Display` print only the key type.
macro_rules! redacted_fmt {
    ($($key_type:ident),+) => {
        $(
            impl Debug for $key_type {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    f.write_str(stringify!($key_type))
                }
            }

            impl Display for $key_type {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    f.write_str(stringify!($key_type))
                }
            }
        )+
    };
}

redacted_fmt!(KSecretKey, KDateKey, KRegionKey, KServiceKey, KSigningKey);

impl FromStr for KSecretKey {
    type Err = SignatureError;

    /// Create a new `KSecretKey` from a raw AWS secret key. An empty key is a configuration error.
    fn from_str(raw: &str) -> Result<Self, SignatureError> {
        if raw.is_empty() {
            return Err(SignatureError::MissingSecretAccessKey);
        }

        let mut prefixed_key = Vec::with_capacity(AWS4.len() + raw.len());
        prefixed_key.extend_from_slice(AWS4.as_bytes());
        prefixed_key.extend_from_slice(raw.as_bytes());
        Ok(Self {
            prefixed_key,
        })
    }
}

impl KSecretKey {
    /// SHA-256 over the prefixed secret. Identifies the secret in cache keys without storing it there.
    pub fn fingerprint(&self) -> [u8; SHA256_OUTPUT_LEN] {
        sha256(&self.prefixed_key)
    }

    /// Create a new `KDateKey` from this `KSecretKey` and a date.
    pub fn to_kdate(&self, date: NaiveDate) -> KDateKey {
        let date = date.format(ISO8601_DATE_FORMAT).to_string();
        KDateKey {
            key: hmac_sha256(&self.prefixed_key, date.as_bytes()),
        }
    }

    /// Create a new `KSigningKey` from this `KSecretKey`, a date, a region, and a service.
    pub fn to_ksigning(&self, date: NaiveDate, region: &str, service: &str) -> KSigningKey {
        self.to_kdate(date).to_ksigning(region, service)
    }
}

impl KDateKey {
    /// Create a new `KRegionKey` from this `KDateKey` and a region.
    pub fn to_kregion(&self, region: &str) -> KRegionKey {
        KRegionKey {
            key: hmac_sha256(&self.key, region.as_bytes()),
        }
    }

    /// Create a new `KSigningKey` from this `KDateKey`, a region, and a service.
    pub fn to_ksigning(&self, region: &str, service: &str) -> KSigningKey {
        self.to_kregion(region).to_ksigning(service)
    }
}

impl KRegionKey {
    /// Create a new `KServiceKey` from this `KRegionKey` and a service.
    pub fn to_kservice(&self, service: &str) -> KServiceKey {
        KServiceKey {
            key: hmac_sha256(&self.key, service.as_bytes()),
        }
    }

    /// Create a new `KSigningKey` from this `KRegionKey` and a service.
    pub fn to_ksigning(&self, service: &str) -> KSigningKey {
        self.to_kservice(service).to_ksigning()
    }
}

impl KServiceKey {
    /// Create a new `KSigningKey` from this `KServiceKey`.
    pub fn to_ksigning(&self) -> KSigningKey {
        KSigningKey {
            key: hmac_sha256(&self.key, AWS4_REQUEST.as_bytes()),
        }
    }
}

impl KSigningKey {
    /// Sign `string_to_sign` with this key, returning the lowercase hex signature.
    pub fn sign(&self, string_to_sign: &str) -> String {
        hex::encode(hmac_sha256(&self.key, string_to_sign.as_bytes()))
    }
}

/// Cache key: the secret is represented by its fingerprint so that distinct credential sets sharing
/// a process never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    secret_fingerprint: [u8; SHA256_OUTPUT_LEN],
    date: NaiveDate,
    region: String,
    service: String,
}

/// Thread-safe memo of derived [`KSigningKey`]s keyed by `(secret, date, region, service)`.
///
/// The cache holds at most `capacity` entries. When it is full, entries for the oldest calendar
/// date are evicted first; a long-lived process therefore keeps roughly one day's worth of keys per
/// credential set and region.
///
/// Concurrent misses for the same key may both derive the key; the derivation is deterministic, so
/// whichever insert lands last stores the same value.
pub struct SigningKeyCache {
    entries: RwLock<HashMap<CacheKey, KSigningKey>>,
    capacity: usize,
    derivations: AtomicU64,
}

impl SigningKeyCache {
    /// Create an empty cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` keys. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            derivations: AtomicU64::new(0),
        }
    }

    /// Return the signing key for the given secret, date, region, and service, deriving and storing
    /// it on a miss.
    pub fn get_signing_key(&self, secret: &KSecretKey, date: NaiveDate, region: &str, service: &str) -> KSigningKey {
        let key = CacheKey {
            secret_fingerprint: secret.fingerprint(),
            date,
            region: region.to_string(),
            service: service.to_string(),
        };

        if let Some(signing_key) = self.entries.read().get(&key) {
            trace!("Signing key cache hit: date={} region={} service={}", date, region, service);
            return *signing_key;
        }

        trace!("Signing key cache miss: date={} region={} service={}", date, region, service);
        let signing_key = secret.to_ksigning(date, region, service);
        self.derivations.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries.write();
        if !entries.contains_key(&key) {
            while entries.len() >= self.capacity {
                evict_oldest_date(&mut entries);
            }
        }
        entries.insert(key, signing_key);
        signing_key
    }

    /// The number of keys currently cached.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Indicates whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The maximum number of keys held at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of times the four-step HMAC chain has been run by this cache.
    pub fn derivations(&self) -> u64 {
        self.derivations.load(Ordering::Relaxed)
    }

    /// Remove every cached key.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SigningKeyCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SigningKeyCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("derivations", &self.derivations())
            .finish()
    }
}

/// Drop every entry for the oldest date present. Always removes at least one entry from a non-empty map.
fn evict_oldest_date(entries: &mut HashMap<CacheKey, KSigningKey>) {
    if let Some(oldest) = entries.keys().map(|k| k.date).min() {
        trace!("Evicting signing keys for {}", oldest);
        entries.retain(|k, _| k.date != oldest);
    }
}
