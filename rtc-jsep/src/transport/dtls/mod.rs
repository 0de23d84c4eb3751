pub mod fingerprint;
pub mod role;

use fingerprint::RTCDtlsFingerprint;
use role::RTCDtlsRole;

/// Negotiated DTLS parameters of one transport.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct JsepDtlsTransport {
    pub role: RTCDtlsRole,
    /// Fingerprints the peer's certificate must match.
    pub fingerprints: Vec<RTCDtlsFingerprint>,
}
