use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hash functions accepted in `a=fingerprint`.
pub(crate) const SUPPORTED_ALGORITHMS: [&str; 5] =
    ["sha-1", "sha-224", "sha-256", "sha-384", "sha-512"];

/// DTLS certificate fingerprint as signaled in `a=fingerprint`.
///
/// The value is a colon-separated sequence of upper-case hex bytes, for
/// example `AB:CD:EF:...`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    /// Hash function name as it appears in SDP, e.g. `sha-256`.
    pub algorithm: String,

    /// Colon-separated hex digest.
    pub value: String,
}

impl fmt::Display for RTCDtlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

impl RTCDtlsFingerprint {
    pub fn new(algorithm: &str, value: &str) -> Self {
        RTCDtlsFingerprint {
            algorithm: algorithm.to_owned(),
            value: value.to_owned(),
        }
    }

    /// random_sha256 makes a well-formed sha-256 fingerprint of no certificate.
    /// Useful when the DTLS layer is not wired yet.
    pub fn random_sha256() -> Self {
        let mut rng = rand::rng();
        let digest: Vec<String> = (0..32)
            .map(|_| hex::encode_upper([rng.random::<u8>()]))
            .collect();
        RTCDtlsFingerprint::new("sha-256", &digest.join(":"))
    }

    /// parse reads an `a=fingerprint` value and rejects hash functions
    /// outside the supported set.
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let mut split = raw.split_whitespace();
        let (Some(algorithm), Some(value), None) = (split.next(), split.next(), split.next())
        else {
            return Err(Error::invalid_access(format!(
                "invalid fingerprint attribute: {raw}"
            )));
        };

        let algorithm = algorithm.to_lowercase();
        if !SUPPORTED_ALGORITHMS.contains(&algorithm.as_str()) {
            return Err(Error::invalid_access(format!(
                "unsupported fingerprint algorithm: {algorithm}"
            )));
        }
        if value
            .split(':')
            .any(|byte| byte.len() != 2 || hex::decode(byte).is_err())
        {
            return Err(Error::invalid_access(format!(
                "invalid fingerprint value: {value}"
            )));
        }

        Ok(RTCDtlsFingerprint::new(&algorithm, value))
    }
}
