use rand::Rng;

use crate::error::{Error, Result};

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const LEN_UFRAG: usize = 16;
const LEN_PWD: usize = 32;

/// <https://tools.ietf.org/html/rfc8839#section-5.4>
/// ice-ufrag = 4*256ice-char, ice-pwd = 22*256ice-char
const MIN_UFRAG: usize = 4;
const MIN_PWD: usize = 22;
const MAX_CREDENTIAL: usize = 256;

/// Remote ICE state of one transport.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct JsepIceTransport {
    pub ufrag: String,
    pub pwd: String,
    /// Remote candidates, as the value of `a=candidate`.
    pub candidates: Vec<String>,
    pub end_of_candidates: bool,
}

/// Local ICE credentials of a session.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IceCredentials {
    pub ufrag: String,
    pub pwd: String,
}

impl IceCredentials {
    /// generate makes a fresh random ufrag/pwd pair.
    pub fn generate() -> Self {
        IceCredentials {
            ufrag: generate_crypto_random_string(LEN_UFRAG, RUNES_ALPHA),
            pwd: generate_crypto_random_string(LEN_PWD, RUNES_ALPHA),
        }
    }

    /// validate checks the lengths and character set of remote credentials.
    pub(crate) fn validate(ufrag: &str, pwd: &str) -> Result<()> {
        if !is_ice_string(ufrag, MIN_UFRAG) {
            return Err(Error::invalid_access(format!("invalid ice-ufrag: {ufrag}")));
        }
        if !is_ice_string(pwd, MIN_PWD) {
            return Err(Error::invalid_access("invalid ice-pwd"));
        }
        Ok(())
    }
}

/// ice-char = ALPHA / DIGIT / "+" / "/"
fn is_ice_string(s: &str, min: usize) -> bool {
    (min..=MAX_CREDENTIAL).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

pub(crate) fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rand::rng();

    (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_credentials_generate() {
        let a = IceCredentials::generate();
        let b = IceCredentials::generate();
        assert_eq!(a.ufrag.len(), LEN_UFRAG);
        assert_eq!(a.pwd.len(), LEN_PWD);
        assert_ne!(a, b);
        assert!(IceCredentials::validate(&a.ufrag, &a.pwd).is_ok());
    }

    #[test]
    fn test_ice_credentials_validate() {
        let pwd = "a".repeat(22);
        let tests = vec![
            ("abcd", pwd.as_str(), true),
            ("ab+/", pwd.as_str(), true),
            ("abc", pwd.as_str(), false),
            ("ab-d", pwd.as_str(), false),
            ("abcd", "tooshort", false),
            ("", pwd.as_str(), false),
        ];

        for (ufrag, pwd, expected) in tests {
            assert_eq!(
                IceCredentials::validate(ufrag, pwd).is_ok(),
                expected,
                "{ufrag}"
            );
        }

        let long = "a".repeat(257);
        assert!(IceCredentials::validate(&long, &long).is_err());
    }
}
