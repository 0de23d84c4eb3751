/// Options for [`JsepSession::create_answer`](crate::session::JsepSession::create_answer).
///
/// There are none yet; the struct keeps the call signature stable.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCAnswerOptions {}

/// Options for [`JsepSession::create_offer`](crate::session::JsepSession::create_offer).
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCOfferOptions {
    /// Legacy count of audio m-sections that must be able to receive.
    /// Missing ones are added as recvonly transceivers.
    pub offer_to_receive_audio: Option<u32>,

    /// Same as `offer_to_receive_audio`, for video.
    pub offer_to_receive_video: Option<u32>,

    /// Generate fresh ICE credentials for this offer.
    pub ice_restart: bool,
}
