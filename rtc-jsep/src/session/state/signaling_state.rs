use std::fmt;

use serde::{Deserialize, Serialize};

use crate::configuration::UNSPECIFIED_STR;
use crate::error::{Error, Result};
use crate::session::sdp::sdp_type::RTCSdpType;

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

/// Offer/answer state of a session.
///
/// See [RFC 8829 section 3.2](https://www.rfc-editor.org/rfc/rfc8829#section-3.2).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCSignalingState {
    Unspecified = 0,

    /// No offer/answer exchange in progress.
    #[default]
    #[serde(rename = "stable")]
    Stable,

    /// A local offer has been applied.
    #[serde(rename = "have-local-offer")]
    HaveLocalOffer,

    /// A remote offer has been applied.
    #[serde(rename = "have-remote-offer")]
    HaveRemoteOffer,

    /// A remote offer and a local provisional answer have been applied.
    #[serde(rename = "have-local-pranswer")]
    HaveLocalPranswer,

    /// A local offer and a remote provisional answer have been applied.
    #[serde(rename = "have-remote-pranswer")]
    HaveRemotePranswer,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => RTCSignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => RTCSignalingState::HaveRemotePranswer,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCSignalingState::Stable => write!(f, "{SIGNALING_STATE_STABLE_STR}"),
            RTCSignalingState::HaveLocalOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_LOCAL_OFFER_STR}")
            }
            RTCSignalingState::HaveRemoteOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_REMOTE_OFFER_STR}")
            }
            RTCSignalingState::HaveLocalPranswer => {
                write!(f, "{SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR}")
            }
            RTCSignalingState::HaveRemotePranswer => {
                write!(f, "{SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR}")
            }
            _ => write!(f, "{UNSPECIFIED_STR}"),
        }
    }
}

/// next_signaling_state returns the state reached by applying a
/// description of `sdp_type` with `op` in state `cur`.
pub(crate) fn next_signaling_state(
    cur: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    use RTCSdpType::*;
    use RTCSignalingState::*;
    use StateChangeOp::*;

    let next = match (cur, op, sdp_type) {
        (Stable, _, Rollback) => {
            return Err(Error::invalid_state("cannot rollback in stable state"));
        }

        // stable->SetLocal(offer)->have-local-offer
        (Stable, SetLocal, Offer) => Some(HaveLocalOffer),
        // stable->SetRemote(offer)->have-remote-offer
        (Stable, SetRemote, Offer) => Some(HaveRemoteOffer),

        // re-offers replace the pending offer
        (HaveLocalOffer, SetLocal, Offer) => Some(HaveLocalOffer),
        (HaveRemoteOffer, SetRemote, Offer) => Some(HaveRemoteOffer),

        (HaveLocalOffer, SetRemote, Answer) => Some(Stable),
        (HaveLocalOffer, SetRemote, Pranswer) => Some(HaveRemotePranswer),
        (HaveRemotePranswer, SetRemote, Pranswer) => Some(HaveRemotePranswer),
        (HaveRemotePranswer, SetRemote, Answer) => Some(Stable),

        (HaveRemoteOffer, SetLocal, Answer) => Some(Stable),
        (HaveRemoteOffer, SetLocal, Pranswer) => Some(HaveLocalPranswer),
        (HaveLocalPranswer, SetLocal, Pranswer) => Some(HaveLocalPranswer),
        (HaveLocalPranswer, SetLocal, Answer) => Some(Stable),

        // rollback is legal only while an offer is pending, never after a pranswer
        (HaveLocalOffer, SetLocal, Rollback) => Some(Stable),
        (HaveRemoteOffer, SetRemote, Rollback) => Some(Stable),

        _ => None,
    };

    next.ok_or_else(|| {
        Error::invalid_state(format!("cannot {op}({sdp_type}) in state {cur}"))
    })
}
