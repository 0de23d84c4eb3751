//! Negotiable codecs.
//!
//! A [`Codec`] is either an [`AudioCodec`] or a [`VideoCodec`]; both share a
//! [`CodecDescription`] with the name, clock rate and payload-type state.
//! Video codecs additionally carry their RTX and FEC companions: the
//! companions are not separate list entries, they are emitted next to the
//! primary codec they protect and share its payload-type namespace.

pub mod fmtp;
pub mod h264;
pub(crate) mod payload_type;

use std::cmp::Ordering;
use std::fmt;

use sdp::MediaDescription;
use unicase::UniCase;

use crate::configuration::UNSPECIFIED_STR;
pub use fmtp::FmtpParameters;

/// RTP payload type, 0-127.
pub type PayloadType = u8;

pub const CODEC_NAME_OPUS: &str = "opus";
pub const CODEC_NAME_G722: &str = "G722";
pub const CODEC_NAME_PCMU: &str = "PCMU";
pub const CODEC_NAME_PCMA: &str = "PCMA";
pub const CODEC_NAME_TELEPHONE_EVENT: &str = "telephone-event";
pub const CODEC_NAME_VP8: &str = "VP8";
pub const CODEC_NAME_VP9: &str = "VP9";
pub const CODEC_NAME_H264: &str = "H264";
pub const CODEC_NAME_AV1: &str = "AV1";
pub const CODEC_NAME_RTX: &str = "rtx";
pub const CODEC_NAME_RED: &str = "red";
pub const CODEC_NAME_ULPFEC: &str = "ulpfec";

/// Transport-wide congestion control feedback type
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";
/// Google REMB feedback type
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";
/// Codec Control Message feedback type
pub const TYPE_RTCP_FB_CCM: &str = "ccm";
/// Negative Acknowledgment feedback type
pub const TYPE_RTCP_FB_NACK: &str = "nack";

const VIDEO_CLOCK_RATE: u32 = 90000;

/// fmtp keys that must agree between two otherwise matching codecs.
/// A missing key means "0".
const FMTP_PROFILE_KEYS: [&str; 2] = ["profile-id", "profile"];

/// Codec kind identifying the media type.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RtpCodecKind {
    #[default]
    Unspecified = 0,
    Audio = 1,
    Video = 2,
}

impl From<&str> for RtpCodecKind {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RtpCodecKind::Audio,
            "video" => RtpCodecKind::Video,
            _ => RtpCodecKind::Unspecified,
        }
    }
}

impl fmt::Display for RtpCodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RtpCodecKind::Audio => "audio",
            RtpCodecKind::Video => "video",
            RtpCodecKind::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// One `a=rtcp-fb` entry, e.g. `nack pli`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCPFeedback {
    pub typ: String,
    pub parameter: String,
}

impl RTCPFeedback {
    pub fn new(typ: &str, parameter: &str) -> Self {
        RTCPFeedback {
            typ: typ.to_owned(),
            parameter: parameter.to_owned(),
        }
    }

    pub(crate) fn parse(value: &str) -> Self {
        let mut split = value.trim().splitn(2, ' ');
        let typ = split.next().unwrap_or_default();
        let parameter = split.next().unwrap_or_default();
        RTCPFeedback::new(typ, parameter.trim())
    }
}

impl fmt::Display for RTCPFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameter.is_empty() {
            write!(f, "{}", self.typ)
        } else {
            write!(f, "{} {}", self.typ, self.parameter)
        }
    }
}

pub(crate) fn rtcp_feedback_intersection(
    a: &[RTCPFeedback],
    b: &[RTCPFeedback],
) -> Vec<RTCPFeedback> {
    let mut out = vec![];
    for a_feedback in a {
        if b.iter().any(|b_feedback| {
            a_feedback.typ == b_feedback.typ && a_feedback.parameter == b_feedback.parameter
        }) {
            out.push(a_feedback.clone());
        }
    }
    out
}

/// Fields shared by audio and video codecs.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct CodecDescription {
    pub name: String,
    /// Payload type used when nothing else claims it.
    pub default_pt: PayloadType,
    /// Working payload type.
    pub pt: PayloadType,
    pub clock_rate: u32,
    pub enabled: bool,
    /// Wins over list order when both sides support it.
    pub strongly_preferred: bool,
    pub fmtp: FmtpParameters,

    /// `pt` came out of a completed negotiation and must be kept.
    pub(crate) negotiated_pt: bool,
}

impl CodecDescription {
    pub fn new(name: &str, default_pt: PayloadType, clock_rate: u32) -> Self {
        CodecDescription {
            name: name.to_owned(),
            default_pt,
            pt: default_pt,
            clock_rate,
            enabled: true,
            strongly_preferred: false,
            fmtp: FmtpParameters::new(),
            negotiated_pt: false,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AudioCodec {
    pub description: CodecDescription,
    pub channels: u16,
    /// Set after negotiation when telephone-event survived.
    pub dtmf_enabled: bool,
}

impl AudioCodec {
    pub fn new(name: &str, default_pt: PayloadType, clock_rate: u32, channels: u16) -> Self {
        AudioCodec {
            description: CodecDescription::new(name, default_pt, clock_rate),
            channels,
            dtmf_enabled: false,
        }
    }

    pub fn with_fmtp(mut self, fmtp: &str) -> Self {
        self.description.fmtp = FmtpParameters::parse(fmtp);
        self
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct VideoCodec {
    pub description: CodecDescription,
    pub rtcp_fb: Vec<RTCPFeedback>,

    pub rtx_enabled: bool,
    pub rtx_pt: Option<PayloadType>,
    pub default_rtx_pt: Option<PayloadType>,

    pub fec_enabled: bool,
    pub red_pt: Option<PayloadType>,
    pub ulpfec_pt: Option<PayloadType>,
    pub red_rtx_pt: Option<PayloadType>,

    pub profile_level_id: u32,
    pub packetization_mode: u8,
    pub level_asymmetry_allowed: bool,

    pub(crate) negotiated_rtx: bool,
    pub(crate) negotiated_fec: bool,
}

impl VideoCodec {
    pub fn new(name: &str, default_pt: PayloadType) -> Self {
        VideoCodec {
            description: CodecDescription::new(name, default_pt, VIDEO_CLOCK_RATE),
            level_asymmetry_allowed: true,
            ..Default::default()
        }
    }

    pub fn h264(default_pt: PayloadType, packetization_mode: u8, profile_level_id: u32) -> Self {
        VideoCodec {
            profile_level_id,
            packetization_mode,
            ..VideoCodec::new(CODEC_NAME_H264, default_pt)
        }
    }

    pub fn with_fmtp(mut self, fmtp: &str) -> Self {
        self.description.fmtp = FmtpParameters::parse(fmtp);
        self
    }

    pub fn with_rtx(mut self, default_rtx_pt: PayloadType) -> Self {
        self.rtx_enabled = true;
        self.default_rtx_pt = Some(default_rtx_pt);
        self.rtx_pt = Some(default_rtx_pt);
        self
    }

    pub fn with_fec(
        mut self,
        red_pt: PayloadType,
        ulpfec_pt: PayloadType,
        red_rtx_pt: Option<PayloadType>,
    ) -> Self {
        self.fec_enabled = true;
        self.red_pt = Some(red_pt);
        self.ulpfec_pt = Some(ulpfec_pt);
        self.red_rtx_pt = red_rtx_pt;
        self
    }

    pub fn with_rtcp_fb(mut self, rtcp_fb: Vec<RTCPFeedback>) -> Self {
        self.rtcp_fb = rtcp_fb;
        self
    }

    pub fn is_h264(&self) -> bool {
        UniCase::new(self.description.name.as_str()) == UniCase::new(CODEC_NAME_H264)
    }

    fn h264_matches(&self, remote: &FmtpParameters) -> bool {
        let remote_mode = remote
            .get("packetization-mode")
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(0);
        if remote_mode != self.packetization_mode {
            return false;
        }

        let remote_plid = remote
            .get("profile-level-id")
            .and_then(h264::parse_profile_level_id)
            .unwrap_or(self.profile_level_id);
        if h264::profile_idc(remote_plid) != h264::profile_idc(self.profile_level_id) {
            return false;
        }

        let symmetric =
            !self.level_asymmetry_allowed || remote.get("level-asymmetry-allowed") == Some("0");
        !symmetric
            || h264::compare_levels(remote_plid, self.profile_level_id) == Ordering::Equal
    }

    /// fmtp to put on the wire; for H.264 it is derived from the typed fields.
    fn sdp_fmtp(&self) -> FmtpParameters {
        let mut fmtp = self.description.fmtp.clone();
        if self.is_h264() {
            fmtp.insert(
                "level-asymmetry-allowed",
                if self.level_asymmetry_allowed { "1" } else { "0" },
            );
            fmtp.insert(
                "packetization-mode",
                &self.packetization_mode.to_string(),
            );
            fmtp.insert(
                "profile-level-id",
                &h264::format_profile_level_id(self.profile_level_id),
            );
        }
        fmtp
    }
}

/// A negotiable codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    Audio(AudioCodec),
    Video(VideoCodec),
}

impl From<AudioCodec> for Codec {
    fn from(c: AudioCodec) -> Self {
        Codec::Audio(c)
    }
}

impl From<VideoCodec> for Codec {
    fn from(c: VideoCodec) -> Self {
        Codec::Video(c)
    }
}

impl Codec {
    pub fn kind(&self) -> RtpCodecKind {
        match self {
            Codec::Audio(_) => RtpCodecKind::Audio,
            Codec::Video(_) => RtpCodecKind::Video,
        }
    }

    pub fn description(&self) -> &CodecDescription {
        match self {
            Codec::Audio(a) => &a.description,
            Codec::Video(v) => &v.description,
        }
    }

    pub fn description_mut(&mut self) -> &mut CodecDescription {
        match self {
            Codec::Audio(a) => &mut a.description,
            Codec::Video(v) => &mut v.description,
        }
    }

    pub fn name(&self) -> &str {
        &self.description().name
    }

    pub fn pt(&self) -> PayloadType {
        self.description().pt
    }

    pub fn is_enabled(&self) -> bool {
        self.description().enabled
    }

    pub fn is_telephone_event(&self) -> bool {
        UniCase::new(self.name()) == UniCase::new(CODEC_NAME_TELEPHONE_EVENT)
    }

    /// The codec used in disabled m-sections of the given kind.
    pub(crate) fn reserved(kind: RtpCodecKind) -> Codec {
        match kind {
            RtpCodecKind::Video => VideoCodec::new(CODEC_NAME_VP8, 120).into(),
            _ => AudioCodec::new(CODEC_NAME_PCMU, 0, 8000, 1).into(),
        }
    }

    /// matches reports whether a codec found in SDP is the same codec as
    /// this one, ignoring payload types.
    pub(crate) fn matches(&self, remote: &SdpCodec) -> bool {
        let d = self.description();
        if UniCase::new(d.name.as_str()) != UniCase::new(remote.name.as_str())
            || d.clock_rate != remote.clock_rate
        {
            return false;
        }

        match self {
            Codec::Audio(a) => a.channels.max(1) == remote.channels.max(1),
            Codec::Video(v) => {
                if v.is_h264() {
                    v.h264_matches(&remote.fmtp)
                } else {
                    FMTP_PROFILE_KEYS.iter().all(|k| {
                        d.fmtp.get(k).unwrap_or("0") == remote.fmtp.get(k).unwrap_or("0")
                    })
                }
            }
        }
    }

    /// negotiate produces the codec both sides agreed on. `local` and its
    /// list decide the payload types; `remote` and its list must confirm
    /// every companion format.
    pub(crate) fn negotiate(
        &self,
        local: &SdpCodec,
        local_list: &[SdpCodec],
        remote: &SdpCodec,
        remote_list: &[SdpCodec],
    ) -> Codec {
        let mut negotiated = self.clone();
        negotiated.description_mut().pt = local.pt;

        if let Codec::Video(v) = &mut negotiated {
            v.rtcp_fb = rtcp_feedback_intersection(
                &rtcp_feedback_intersection(&v.rtcp_fb, &remote.rtcp_fb),
                &local.rtcp_fb,
            );

            if v.is_h264() {
                for fmtp in [&remote.fmtp, &local.fmtp] {
                    if let Some(plid) = fmtp
                        .get("profile-level-id")
                        .and_then(h264::parse_profile_level_id)
                    {
                        v.profile_level_id = h264::min_level(v.profile_level_id, plid);
                    }
                }
            }

            v.rtx_pt = if v.rtx_enabled && find_rtx(remote_list, remote.pt).is_some() {
                find_rtx(local_list, local.pt)
            } else {
                None
            };
            v.rtx_enabled = v.rtx_pt.is_some();

            let local_fec = (
                find_named(local_list, CODEC_NAME_RED),
                find_named(local_list, CODEC_NAME_ULPFEC),
            );
            let remote_has_fec = find_named(remote_list, CODEC_NAME_RED).is_some()
                && find_named(remote_list, CODEC_NAME_ULPFEC).is_some();
            match local_fec {
                (Some(red), Some(ulpfec)) if v.fec_enabled && remote_has_fec => {
                    v.red_pt = Some(red);
                    v.ulpfec_pt = Some(ulpfec);
                    v.red_rtx_pt = if v.rtx_enabled {
                        find_rtx(local_list, red)
                    } else {
                        None
                    };
                }
                _ => {
                    v.fec_enabled = false;
                    v.red_pt = None;
                    v.ulpfec_pt = None;
                    v.red_rtx_pt = None;
                }
            }
        }

        negotiated
    }

    /// add_to_media appends the format, rtpmap, fmtp and rtcp-fb lines of
    /// this codec and its RTX companion.
    pub(crate) fn add_to_media(&self, mut md: MediaDescription) -> MediaDescription {
        let d = self.description();
        let channels = match self {
            Codec::Audio(a) if a.channels > 1 => a.channels,
            _ => 0,
        };
        let fmtp = match self {
            Codec::Audio(_) => d.fmtp.clone(),
            Codec::Video(v) => v.sdp_fmtp(),
        };

        md = add_format(md, d.pt, &d.name, d.clock_rate, channels, &fmtp.to_string());
        if let Codec::Video(v) = self {
            for fb in &v.rtcp_fb {
                md = md.with_value_attribute("rtcp-fb".to_owned(), format!("{} {}", d.pt, fb));
            }
            if let (true, Some(rtx_pt)) = (v.rtx_enabled, v.rtx_pt) {
                md = add_format(
                    md,
                    rtx_pt,
                    CODEC_NAME_RTX,
                    VIDEO_CLOCK_RATE,
                    0,
                    &format!("apt={}", d.pt),
                );
            }
        }
        md
    }
}

/// add_fec_to_media emits the RED, ULPFEC and RED-RTX formats shared by the
/// video codecs of one m-section.
pub(crate) fn add_fec_to_media(mut md: MediaDescription, codecs: &[Codec]) -> MediaDescription {
    let fec = codecs.iter().find_map(|c| match c {
        Codec::Video(v) if v.description.enabled && v.fec_enabled => Some(v),
        _ => None,
    });

    if let Some(v) = fec {
        if let (Some(red), Some(ulpfec)) = (v.red_pt, v.ulpfec_pt) {
            md = add_format(md, red, CODEC_NAME_RED, VIDEO_CLOCK_RATE, 0, "");
            md = add_format(md, ulpfec, CODEC_NAME_ULPFEC, VIDEO_CLOCK_RATE, 0, "");
            if let Some(red_rtx) = v.red_rtx_pt {
                md = add_format(
                    md,
                    red_rtx,
                    CODEC_NAME_RTX,
                    VIDEO_CLOCK_RATE,
                    0,
                    &format!("apt={red}"),
                );
            }
        }
    }
    md
}

fn add_format(
    mut md: MediaDescription,
    pt: PayloadType,
    name: &str,
    clock_rate: u32,
    channels: u16,
    fmtp: &str,
) -> MediaDescription {
    md.media_name.formats.push(pt.to_string());
    let rtpmap = if channels > 1 {
        format!("{pt} {name}/{clock_rate}/{channels}")
    } else {
        format!("{pt} {name}/{clock_rate}")
    };
    md = md.with_value_attribute("rtpmap".to_owned(), rtpmap);
    if !fmtp.is_empty() {
        md = md.with_value_attribute("fmtp".to_owned(), format!("{pt} {fmtp}"));
    }
    md
}

/// One format of an m-section, as written on the wire.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SdpCodec {
    pub(crate) pt: PayloadType,
    pub(crate) name: String,
    pub(crate) clock_rate: u32,
    pub(crate) channels: u16,
    pub(crate) fmtp: FmtpParameters,
    pub(crate) rtcp_fb: Vec<RTCPFeedback>,
}

impl SdpCodec {
    fn is_named(&self, name: &str) -> bool {
        UniCase::new(self.name.as_str()) == UniCase::new(name)
    }

    /// Primary codecs are everything except the RTX/RED/ULPFEC companions.
    pub(crate) fn is_primary(&self) -> bool {
        !self.is_named(CODEC_NAME_RTX)
            && !self.is_named(CODEC_NAME_RED)
            && !self.is_named(CODEC_NAME_ULPFEC)
    }

    pub(crate) fn apt(&self) -> Option<PayloadType> {
        if !self.is_named(CODEC_NAME_RTX) {
            return None;
        }
        self.fmtp.get("apt").and_then(|s| s.parse().ok())
    }
}

fn find_rtx(list: &[SdpCodec], primary: PayloadType) -> Option<PayloadType> {
    list.iter().find(|c| c.apt() == Some(primary)).map(|c| c.pt)
}

fn find_named(list: &[SdpCodec], name: &str) -> Option<PayloadType> {
    list.iter().find(|c| c.is_named(name)).map(|c| c.pt)
}

/// negotiate_codecs intersects the local prototypes with the formats of a
/// pair of m-sections.
///
/// The result follows the order of `local` and takes its payload types;
/// `remote` only has to confirm each codec. An empty result means no codec
/// other than telephone-event survived.
pub(crate) fn negotiate_codecs(
    prototypes: &[Codec],
    local: &[SdpCodec],
    remote: &[SdpCodec],
) -> Vec<Codec> {
    let mut used = vec![false; prototypes.len()];
    let mut negotiated: Vec<Codec> = vec![];

    for local_codec in local.iter().filter(|c| c.is_primary()) {
        let Some(index) = prototypes
            .iter()
            .enumerate()
            .position(|(i, p)| !used[i] && p.is_enabled() && p.matches(local_codec))
        else {
            log::trace!("no local codec for {} {}", local_codec.pt, local_codec.name);
            continue;
        };
        let prototype = &prototypes[index];

        let remote_codec = remote
            .iter()
            .find(|r| r.is_primary() && r.pt == local_codec.pt && prototype.matches(r))
            .or_else(|| {
                remote
                    .iter()
                    .find(|r| r.is_primary() && prototype.matches(r))
            });
        let Some(remote_codec) = remote_codec else {
            continue;
        };

        used[index] = true;
        negotiated.push(prototype.negotiate(local_codec, local, remote_codec, remote));
    }

    if !negotiated.iter().any(|c| !c.is_telephone_event()) {
        return vec![];
    }

    if negotiated.iter().any(|c| c.is_telephone_event()) {
        for c in negotiated.iter_mut() {
            if let Codec::Audio(a) = c {
                a.dtmf_enabled = true;
            }
        }
    }

    let (mut preferred, rest): (Vec<Codec>, Vec<Codec>) = negotiated
        .into_iter()
        .partition(|c| c.description().strongly_preferred);
    preferred.extend(rest);
    preferred
}

/// remember_payload_types writes negotiated payload types back into the
/// prototypes so that later rounds keep them.
pub(crate) fn remember_payload_types(prototypes: &mut [Codec], negotiated: &[Codec]) {
    for n in negotiated {
        let Some(p) = prototypes.iter_mut().find(|p| {
            p.kind() == n.kind()
                && UniCase::new(p.name()) == UniCase::new(n.name())
                && p.description().clock_rate == n.description().clock_rate
                && match (&**p, n) {
                    (Codec::Video(pv), Codec::Video(nv)) if pv.is_h264() => {
                        pv.packetization_mode == nv.packetization_mode
                            && h264::profile_idc(pv.profile_level_id)
                                == h264::profile_idc(nv.profile_level_id)
                    }
                    (Codec::Audio(pa), Codec::Audio(na)) => pa.channels == na.channels,
                    _ => p.description().fmtp.consist(&n.description().fmtp),
                }
        }) else {
            continue;
        };

        p.description_mut().pt = n.pt();
        p.description_mut().negotiated_pt = true;
        if let (Codec::Video(pv), Codec::Video(nv)) = (p, n) {
            if let Some(rtx) = nv.rtx_pt {
                pv.rtx_pt = Some(rtx);
                pv.negotiated_rtx = true;
            }
            if nv.fec_enabled {
                pv.red_pt = nv.red_pt;
                pv.ulpfec_pt = nv.ulpfec_pt;
                if nv.red_rtx_pt.is_some() {
                    pv.red_rtx_pt = nv.red_rtx_pt;
                }
                pv.negotiated_fec = true;
            }
        }
    }
}
