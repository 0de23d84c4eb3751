use std::fmt::Display;
use std::io::Cursor;

use sdp::description::session::SessionDescription;
use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;
use crate::error::Result;

/// A session description as exchanged over signaling.
///
/// The text is authoritative. `parsed` caches the document the text was
/// produced from or parsed into and is never serialized.
///
/// ```
/// use rtc_jsep::session::sdp::sdp_type::RTCSdpType;
/// use rtc_jsep::session::sdp::session_description::RTCSessionDescription;
///
/// let desc: RTCSessionDescription =
///     serde_json::from_str(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
/// assert_eq!(desc.sdp_type, RTCSdpType::Answer);
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    pub sdp: String,

    #[serde(skip)]
    pub(crate) parsed: Option<SessionDescription>,
}

impl Display for RTCSessionDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type: {}, sdp:\n{}",
            self.sdp_type,
            self.sdp.replace("\r\n", "\n")
        )
    }
}

impl RTCSessionDescription {
    /// Creates an answer session description from SDP text.
    pub fn answer(sdp: String) -> Result<RTCSessionDescription> {
        RTCSessionDescription::new(RTCSdpType::Answer, sdp)
    }

    /// Creates an offer session description from SDP text.
    pub fn offer(sdp: String) -> Result<RTCSessionDescription> {
        RTCSessionDescription::new(RTCSdpType::Offer, sdp)
    }

    /// Creates a provisional answer session description from SDP text.
    pub fn pranswer(sdp: String) -> Result<RTCSessionDescription> {
        RTCSessionDescription::new(RTCSdpType::Pranswer, sdp)
    }

    /// A rollback carries no SDP.
    pub fn rollback() -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Rollback,
            sdp: String::new(),
            parsed: None,
        }
    }

    fn new(sdp_type: RTCSdpType, sdp: String) -> Result<RTCSessionDescription> {
        let mut desc = RTCSessionDescription {
            sdp,
            sdp_type,
            parsed: None,
        };

        let parsed = desc.unmarshal()?;
        desc.parsed = Some(parsed);

        Ok(desc)
    }

    /// from_parsed marshals a document built by the session.
    pub(crate) fn from_parsed(sdp_type: RTCSdpType, parsed: SessionDescription) -> Self {
        RTCSessionDescription {
            sdp_type,
            sdp: parsed.marshal(),
            parsed: Some(parsed),
        }
    }

    /// Parses the SDP text. The result is not cached.
    pub fn unmarshal(&self) -> Result<SessionDescription> {
        let mut reader = Cursor::new(self.sdp.as_bytes());
        let parsed = SessionDescription::unmarshal(&mut reader)?;
        Ok(parsed)
    }

    /// parsed_or_unmarshal returns the cached document, parsing the text
    /// when nothing is cached.
    pub(crate) fn parsed_or_unmarshal(&self) -> Result<SessionDescription> {
        match &self.parsed {
            Some(parsed) => Ok(parsed.clone()),
            None => self.unmarshal(),
        }
    }

    /// update re-marshals the text after `parsed` was edited in place.
    pub(crate) fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut SessionDescription),
    {
        if let Some(parsed) = &mut self.parsed {
            f(parsed);
            self.sdp = parsed.marshal();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_session_description_json() {
        let tests = vec![
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Offer,
                    sdp: "sdp".to_owned(),
                    parsed: None,
                },
                r#"{"type":"offer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Pranswer,
                    sdp: "sdp".to_owned(),
                    parsed: None,
                },
                r#"{"type":"pranswer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Answer,
                    sdp: "sdp".to_owned(),
                    parsed: None,
                },
                r#"{"type":"answer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Rollback,
                    sdp: "sdp".to_owned(),
                    parsed: None,
                },
                r#"{"type":"rollback","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Unspecified,
                    sdp: "sdp".to_owned(),
                    parsed: None,
                },
                r#"{"type":"Unspecified","sdp":"sdp"}"#,
            ),
        ];

        for (desc, expected_string) in tests {
            let result = serde_json::to_string(&desc);
            assert!(result.is_ok(), "testCase: marshal err: {result:?}");
            let desc_data = result.unwrap();
            assert_eq!(desc_data, expected_string, "string is not expected");

            let result = serde_json::from_str::<RTCSessionDescription>(&desc_data);
            assert!(result.is_ok(), "testCase: unmarshal err: {result:?}");
            if let Ok(sd) = result {
                assert!(sd.sdp == desc.sdp && sd.sdp_type == desc.sdp_type);
                assert!(sd.parsed.is_none());
            }
        }
    }

    #[test]
    fn test_session_description_offer_parses() {
        let sdp = "v=0\r\no=- 123 2 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n\
                   m=audio 9 UDP/TLS/RTP/SAVPF 0\r\nc=IN IP4 0.0.0.0\r\na=mid:0\r\n"
            .to_owned();
        let desc = RTCSessionDescription::offer(sdp).unwrap();
        assert_eq!(desc.sdp_type, RTCSdpType::Offer);
        let parsed = desc.parsed.as_ref().unwrap();
        assert_eq!(parsed.media_descriptions.len(), 1);
        assert_eq!(
            parsed.marshal(),
            desc.parsed_or_unmarshal().unwrap().marshal()
        );
    }

    #[test]
    fn test_session_description_garbage() {
        let err = RTCSessionDescription::answer("not sdp".to_owned()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SdpParseError);
    }
}
