use std::collections::BTreeMap;
use std::fmt;

/// Format parameters of one payload type (`a=fmtp:<pt> k=v;k2=v2`).
///
/// Keys are lower-cased. Bare tokens such as the `0-15` of telephone-event
/// are kept as keys with an empty value.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FmtpParameters(BTreeMap<String, String>);

impl FmtpParameters {
    pub fn new() -> Self {
        FmtpParameters::default()
    }

    /// parse parses the parameter part of an fmtp line.
    pub fn parse(line: &str) -> Self {
        let mut f = FmtpParameters::new();
        for p in line.split(';') {
            let pp: Vec<&str> = p.trim().splitn(2, '=').collect();
            let key = pp[0].trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let value = if pp.len() > 1 {
                pp[1].trim().to_owned()
            } else {
                String::new()
            };
            f.0.insert(key, value);
        }
        f
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_lowercase(), value.to_owned());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// consist checks that two parameter sets do not contradict each other
    /// on the keys they share.
    pub fn consist(&self, other: &FmtpParameters) -> bool {
        for (k, v) in &self.0 {
            if let Some(vb) = other.0.get(k) {
                if !vb.eq_ignore_ascii_case(v) {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for FmtpParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ";")?;
            }
            first = false;
            if v.is_empty() {
                write!(f, "{k}")?;
            } else {
                write!(f, "{k}={v}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fmtp_parse() {
        let tests = vec![
            ("OneParam", "key-name=value", vec![("key-name", "value")]),
            (
                "OneParamWithWhiteSpaces",
                "\tkey-name=value ",
                vec![("key-name", "value")],
            ),
            (
                "TwoParams",
                "key-name=value;key2=value2",
                vec![("key-name", "value"), ("key2", "value2")],
            ),
            (
                "TwoParamsWithWhiteSpaces",
                "key-name=value;  \n\tkey2=value2 ",
                vec![("key-name", "value"), ("key2", "value2")],
            ),
            ("BareToken", "0-15", vec![("0-15", "")]),
            ("UpperCaseKey", "APT=96", vec![("apt", "96")]),
        ];

        for (name, input, expected) in tests {
            let f = FmtpParameters::parse(input);
            for (k, v) in &expected {
                assert_eq!(f.get(k), Some(*v), "{name} failed");
            }
            assert_eq!(f.iter().count(), expected.len(), "{name} failed");
        }
    }

    #[test]
    fn test_fmtp_display() {
        let f = FmtpParameters::parse("minptime=10;useinbandfec=1");
        assert_eq!(f.to_string(), "minptime=10;useinbandfec=1");

        let f = FmtpParameters::parse("0-15");
        assert_eq!(f.to_string(), "0-15");
    }

    #[test]
    fn test_fmtp_consist() {
        let tests = vec![
            ("Equal", "stereo=1;useinbandfec=1", "stereo=1;useinbandfec=1", true),
            ("EqualWithCase", "profile-id=0", "PROFILE-ID=0", true),
            ("OneHasExtraParam", "stereo=1;useinbandfec=1", "stereo=1", true),
            ("Inconsistent", "profile-id=0", "profile-id=2", false),
        ];

        for (name, a, b, consist) in tests {
            let aa = FmtpParameters::parse(a);
            let bb = FmtpParameters::parse(b);
            assert_eq!(aa.consist(&bb), consist, "{name} forward failed");
            assert_eq!(bb.consist(&aa), consist, "{name} reverse failed");
        }
    }
}
