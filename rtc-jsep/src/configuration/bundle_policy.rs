use std::fmt;

use serde::{Deserialize, Serialize};

/// Decides which m-sections of an offer are marked `a=bundle-only`.
///
/// Only m-sections that have never been part of a negotiated bundle are
/// subject to the policy; once a bundle has been negotiated every non-tag
/// member is bundle-only regardless of policy.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCBundlePolicy {
    #[default]
    Unspecified = 0,

    /// The first m-section of each media type is offered normally, later
    /// ones of the same type are bundle-only.
    #[serde(rename = "balanced")]
    Balanced = 1,

    /// Nothing is bundle-only.
    #[serde(rename = "max-compat")]
    MaxCompat = 2,

    /// Only the first enabled m-section is offered normally.
    #[serde(rename = "max-bundle")]
    MaxBundle = 3,
}

const BUNDLE_POLICY_BALANCED_STR: &str = "balanced";
const BUNDLE_POLICY_MAX_COMPAT_STR: &str = "max-compat";
const BUNDLE_POLICY_MAX_BUNDLE_STR: &str = "max-bundle";

impl From<&str> for RTCBundlePolicy {
    fn from(raw: &str) -> Self {
        match raw {
            BUNDLE_POLICY_BALANCED_STR => RTCBundlePolicy::Balanced,
            BUNDLE_POLICY_MAX_COMPAT_STR => RTCBundlePolicy::MaxCompat,
            BUNDLE_POLICY_MAX_BUNDLE_STR => RTCBundlePolicy::MaxBundle,
            _ => RTCBundlePolicy::Unspecified,
        }
    }
}

impl fmt::Display for RTCBundlePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCBundlePolicy::Balanced => write!(f, "{BUNDLE_POLICY_BALANCED_STR}"),
            RTCBundlePolicy::MaxCompat => write!(f, "{BUNDLE_POLICY_MAX_COMPAT_STR}"),
            RTCBundlePolicy::MaxBundle => write!(f, "{BUNDLE_POLICY_MAX_BUNDLE_STR}"),
            _ => write!(f, "{}", super::UNSPECIFIED_STR),
        }
    }
}

impl RTCBundlePolicy {
    /// is_bundle_only decides for a never-negotiated m-section other than the
    /// first enabled one, which always carries its own transport.
    ///
    /// `kind_seen` is set when an earlier enabled m-section has the same media type.
    pub(crate) fn is_bundle_only(&self, kind_seen: bool) -> bool {
        match *self {
            RTCBundlePolicy::MaxCompat => false,
            RTCBundlePolicy::MaxBundle => true,
            RTCBundlePolicy::Balanced | RTCBundlePolicy::Unspecified => kind_seen,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_bundle_policy() {
        let tests = vec![
            ("Unspecified", RTCBundlePolicy::Unspecified),
            ("balanced", RTCBundlePolicy::Balanced),
            ("max-compat", RTCBundlePolicy::MaxCompat),
            ("max-bundle", RTCBundlePolicy::MaxBundle),
        ];

        for (policy_string, expected_policy) in tests {
            assert_eq!(RTCBundlePolicy::from(policy_string), expected_policy);
        }
    }

    #[test]
    fn test_bundle_policy_string() {
        let tests = vec![
            (RTCBundlePolicy::Unspecified, "Unspecified"),
            (RTCBundlePolicy::Balanced, "balanced"),
            (RTCBundlePolicy::MaxCompat, "max-compat"),
            (RTCBundlePolicy::MaxBundle, "max-bundle"),
        ];

        for (policy, expected_string) in tests {
            assert_eq!(policy.to_string(), expected_string);
        }
    }

    #[test]
    fn test_bundle_policy_is_bundle_only() {
        let tests = vec![
            (RTCBundlePolicy::Balanced, false, false),
            (RTCBundlePolicy::Balanced, true, true),
            (RTCBundlePolicy::Unspecified, true, true),
            (RTCBundlePolicy::MaxBundle, false, true),
            (RTCBundlePolicy::MaxBundle, true, true),
            (RTCBundlePolicy::MaxCompat, false, false),
            (RTCBundlePolicy::MaxCompat, true, false),
        ];

        for (policy, kind_seen, expected) in tests {
            assert_eq!(
                policy.is_bundle_only(kind_seen),
                expected,
                "{policy} seen={kind_seen}"
            );
        }
    }

    #[test]
    fn test_bundle_policy_json() {
        let policy: RTCBundlePolicy = serde_json::from_str(r#""max-bundle""#).unwrap();
        assert_eq!(policy, RTCBundlePolicy::MaxBundle);
        assert_eq!(
            serde_json::to_string(&RTCBundlePolicy::Balanced).unwrap(),
            r#""balanced""#
        );
    }
}
