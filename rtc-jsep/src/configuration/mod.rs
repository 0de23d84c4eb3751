pub mod bundle_policy;
pub mod offer_answer_options;

use sdp::extmap::{
    ABS_SEND_TIME_URI, AUDIO_LEVEL_URI, SDES_MID_URI, SDES_RTP_STREAM_ID_URI, TRANSPORT_CC_URI,
    VIDEO_ORIENTATION_URI,
};

use crate::codec::{
    AudioCodec, Codec, RTCPFeedback, RtpCodecKind, VideoCodec, CODEC_NAME_AV1, CODEC_NAME_G722,
    CODEC_NAME_OPUS, CODEC_NAME_PCMA, CODEC_NAME_PCMU, CODEC_NAME_TELEPHONE_EVENT,
    CODEC_NAME_VP8, CODEC_NAME_VP9, TYPE_RTCP_FB_CCM, TYPE_RTCP_FB_GOOG_REMB, TYPE_RTCP_FB_NACK,
    TYPE_RTCP_FB_TRANSPORT_CC,
};
use crate::codec::h264::DEFAULT_PROFILE_LEVEL_ID;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::transport::dtls::fingerprint::RTCDtlsFingerprint;
use bundle_policy::RTCBundlePolicy;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

pub const REPAIRED_RTP_STREAM_ID_URI: &str =
    "urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id";

/// Payload types of the FEC companions shared by the default video codecs.
pub const DEFAULT_RED_PT: u8 = 122;
pub const DEFAULT_ULPFEC_PT: u8 = 116;
pub const DEFAULT_RED_RTX_PT: u8 = 121;

/// An RTP header extension this side is willing to negotiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsepExtension {
    pub uri: String,
    pub kind: RtpCodecKind,
    /// Directions of the m-section the extension is offered in.
    pub direction: RTCRtpTransceiverDirection,
}

impl JsepExtension {
    pub fn new(uri: &str, kind: RtpCodecKind) -> Self {
        JsepExtension {
            uri: uri.to_owned(),
            kind,
            direction: RTCRtpTransceiverDirection::Sendrecv,
        }
    }

    pub(crate) fn is_matching_direction(&self, dir: RTCRtpTransceiverDirection) -> bool {
        match self.direction {
            RTCRtpTransceiverDirection::Sendrecv | RTCRtpTransceiverDirection::Unspecified => true,
            RTCRtpTransceiverDirection::Sendonly => dir.has_send(),
            RTCRtpTransceiverDirection::Recvonly => dir.has_recv(),
            RTCRtpTransceiverDirection::Inactive => false,
        }
    }
}

/// Immutable preferences of one negotiation engine.
///
/// A configuration is built once and shared by `Arc`; sessions never modify
/// it. Per-transceiver codec tweaks live in the track prototypes instead.
#[derive(Debug, Clone)]
pub struct JsepConfiguration {
    pub(crate) codecs: Vec<Codec>,
    pub(crate) header_extensions: Vec<JsepExtension>,
    pub(crate) bundle_policy: RTCBundlePolicy,
    pub(crate) fingerprints: Vec<RTCDtlsFingerprint>,
    pub(crate) ice_options: Vec<String>,
}

impl Default for JsepConfiguration {
    fn default() -> Self {
        JsepConfigurationBuilder::new().build()
    }
}

impl JsepConfiguration {
    pub fn codecs(&self) -> &[Codec] {
        &self.codecs
    }

    pub fn header_extensions(&self) -> &[JsepExtension] {
        &self.header_extensions
    }

    pub fn bundle_policy(&self) -> RTCBundlePolicy {
        self.bundle_policy
    }

    pub fn fingerprints(&self) -> &[RTCDtlsFingerprint] {
        &self.fingerprints
    }

    pub fn ice_options(&self) -> &[String] {
        &self.ice_options
    }

    /// codecs_for returns the codec prototypes of one media type.
    pub(crate) fn codecs_for(&self, kind: RtpCodecKind) -> Vec<Codec> {
        self.codecs
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    pub(crate) fn extensions_for(
        &self,
        kind: RtpCodecKind,
        dir: RTCRtpTransceiverDirection,
    ) -> impl Iterator<Item = &JsepExtension> {
        self.header_extensions
            .iter()
            .filter(move |e| e.kind == kind && e.is_matching_direction(dir))
    }

    pub(crate) fn supports_extension(&self, kind: RtpCodecKind, uri: &str) -> bool {
        self.header_extensions
            .iter()
            .any(|e| e.kind == kind && e.uri == uri)
    }
}

#[derive(Default)]
pub struct JsepConfigurationBuilder {
    codecs: Option<Vec<Codec>>,
    header_extensions: Option<Vec<JsepExtension>>,
    bundle_policy: RTCBundlePolicy,
    fingerprints: Vec<RTCDtlsFingerprint>,
    ice_options: Option<Vec<String>>,
}

impl JsepConfigurationBuilder {
    pub fn new() -> Self {
        JsepConfigurationBuilder::default()
    }

    /// with_codecs replaces the default codec table. Order is preference.
    pub fn with_codecs(mut self, codecs: Vec<Codec>) -> Self {
        self.codecs = Some(codecs);
        self
    }

    pub fn with_header_extensions(mut self, header_extensions: Vec<JsepExtension>) -> Self {
        self.header_extensions = Some(header_extensions);
        self
    }

    pub fn with_bundle_policy(mut self, bundle_policy: RTCBundlePolicy) -> Self {
        self.bundle_policy = bundle_policy;
        self
    }

    /// with_fingerprints sets the fingerprints of the local DTLS certificates.
    pub fn with_fingerprints(mut self, fingerprints: Vec<RTCDtlsFingerprint>) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    pub fn with_ice_options(mut self, ice_options: Vec<String>) -> Self {
        self.ice_options = Some(ice_options);
        self
    }

    /// build fills every unset field with its default. Without explicit
    /// fingerprints a random sha-256 placeholder is used.
    pub fn build(self) -> JsepConfiguration {
        let bundle_policy = if self.bundle_policy == RTCBundlePolicy::Unspecified {
            RTCBundlePolicy::Balanced
        } else {
            self.bundle_policy
        };
        let fingerprints = if self.fingerprints.is_empty() {
            vec![RTCDtlsFingerprint::random_sha256()]
        } else {
            self.fingerprints
        };

        JsepConfiguration {
            codecs: self.codecs.unwrap_or_else(default_codecs),
            header_extensions: self
                .header_extensions
                .unwrap_or_else(default_header_extensions),
            bundle_policy,
            fingerprints,
            ice_options: self
                .ice_options
                .unwrap_or_else(|| vec!["trickle".to_owned()]),
        }
    }
}

fn video_rtcp_feedback() -> Vec<RTCPFeedback> {
    vec![
        RTCPFeedback::new(TYPE_RTCP_FB_GOOG_REMB, ""),
        RTCPFeedback::new(TYPE_RTCP_FB_TRANSPORT_CC, ""),
        RTCPFeedback::new(TYPE_RTCP_FB_CCM, "fir"),
        RTCPFeedback::new(TYPE_RTCP_FB_NACK, ""),
        RTCPFeedback::new(TYPE_RTCP_FB_NACK, "pli"),
    ]
}

/// default_codecs is the codec table used when none is configured.
pub fn default_codecs() -> Vec<Codec> {
    let video = |c: VideoCodec| -> Codec {
        c.with_rtcp_fb(video_rtcp_feedback())
            .with_fec(DEFAULT_RED_PT, DEFAULT_ULPFEC_PT, Some(DEFAULT_RED_RTX_PT))
            .into()
    };

    vec![
        AudioCodec::new(CODEC_NAME_OPUS, 111, 48000, 2)
            .with_fmtp("minptime=10;useinbandfec=1")
            .into(),
        AudioCodec::new(CODEC_NAME_G722, 9, 8000, 1).into(),
        AudioCodec::new(CODEC_NAME_PCMU, 0, 8000, 1).into(),
        AudioCodec::new(CODEC_NAME_PCMA, 8, 8000, 1).into(),
        AudioCodec::new(CODEC_NAME_TELEPHONE_EVENT, 101, 8000, 1)
            .with_fmtp("0-15")
            .into(),
        video(VideoCodec::new(CODEC_NAME_VP8, 96).with_rtx(97)),
        video(
            VideoCodec::new(CODEC_NAME_VP9, 98)
                .with_fmtp("profile-id=0")
                .with_rtx(99),
        ),
        video(VideoCodec::h264(102, 1, DEFAULT_PROFILE_LEVEL_ID).with_rtx(103)),
        video(VideoCodec::h264(127, 0, DEFAULT_PROFILE_LEVEL_ID).with_rtx(125)),
        video(VideoCodec::new(CODEC_NAME_AV1, 41).with_rtx(42)),
    ]
}

/// default_header_extensions is the extension table used when none is
/// configured.
pub fn default_header_extensions() -> Vec<JsepExtension> {
    vec![
        JsepExtension::new(AUDIO_LEVEL_URI, RtpCodecKind::Audio),
        JsepExtension::new(SDES_MID_URI, RtpCodecKind::Audio),
        JsepExtension::new(SDES_MID_URI, RtpCodecKind::Video),
        JsepExtension::new(ABS_SEND_TIME_URI, RtpCodecKind::Video),
        JsepExtension::new(TRANSPORT_CC_URI, RtpCodecKind::Video),
        JsepExtension {
            direction: RTCRtpTransceiverDirection::Recvonly,
            ..JsepExtension::new(VIDEO_ORIENTATION_URI, RtpCodecKind::Video)
        },
        JsepExtension::new(SDES_RTP_STREAM_ID_URI, RtpCodecKind::Video),
        JsepExtension::new(REPAIRED_RTP_STREAM_ID_URI, RtpCodecKind::Video),
    ]
}
