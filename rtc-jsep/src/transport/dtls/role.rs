use std::fmt;

use sdp::util::ConnectionRole;
use serde::{Deserialize, Serialize};

use crate::configuration::UNSPECIFIED_STR;
use crate::error::{Error, Result};

/// RTCDtlsRole indicates the role of the DTLS transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsRole {
    #[default]
    Unspecified = 0,

    /// The role is not decided yet; an offer is always `actpass`.
    #[serde(rename = "auto")]
    Auto = 1,

    /// DTLS client, the side that sent `a=setup:active`.
    #[serde(rename = "client")]
    Client = 2,

    /// DTLS server, the side that sent `a=setup:passive`.
    #[serde(rename = "server")]
    Server = 3,
}

/// <https://tools.ietf.org/html/rfc5763>
/// setup:active allows the answer and the DTLS handshake to
/// occur in parallel. Thus, setup:active is RECOMMENDED.
pub(crate) const DEFAULT_DTLS_ROLE_ANSWER: RTCDtlsRole = RTCDtlsRole::Client;

impl fmt::Display for RTCDtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCDtlsRole::Auto => write!(f, "auto"),
            RTCDtlsRole::Client => write!(f, "client"),
            RTCDtlsRole::Server => write!(f, "server"),
            _ => write!(f, "{UNSPECIFIED_STR}"),
        }
    }
}

impl RTCDtlsRole {
    pub(crate) fn to_connection_role(self) -> ConnectionRole {
        match self {
            RTCDtlsRole::Client => ConnectionRole::Active,
            RTCDtlsRole::Server => ConnectionRole::Passive,
            RTCDtlsRole::Auto => ConnectionRole::Actpass,
            _ => ConnectionRole::Unspecified,
        }
    }

    /// answer_setup picks our `a=setup` for an answer to the given offer setup.
    pub(crate) fn answer_setup(offer: ConnectionRole) -> Result<ConnectionRole> {
        match offer {
            ConnectionRole::Actpass | ConnectionRole::Passive => {
                Ok(DEFAULT_DTLS_ROLE_ANSWER.to_connection_role())
            }
            ConnectionRole::Active => Ok(ConnectionRole::Passive),
            _ => Err(Error::invalid_access(format!(
                "offer has invalid setup attribute: {offer}"
            ))),
        }
    }

    /// from_local_answer is our role after we answered with `setup`.
    pub(crate) fn from_local_answer(setup: ConnectionRole) -> Self {
        match setup {
            ConnectionRole::Passive => RTCDtlsRole::Server,
            _ => RTCDtlsRole::Client,
        }
    }

    /// from_remote_answer is our role after the peer answered with `setup`.
    /// A missing setup counts as `active`.
    pub(crate) fn from_remote_answer(setup: Option<ConnectionRole>) -> Result<Self> {
        match setup {
            None | Some(ConnectionRole::Active) => Ok(RTCDtlsRole::Server),
            Some(ConnectionRole::Passive) => Ok(RTCDtlsRole::Client),
            Some(other) => Err(Error::invalid_access(format!(
                "answer has invalid setup attribute: {other}"
            ))),
        }
    }
}
