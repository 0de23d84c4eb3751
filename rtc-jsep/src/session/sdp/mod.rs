//! SDP helpers shared by offer and answer generation.

pub mod sdp_type;
pub mod session_description;

use sdp::description::common::{Address, ConnectionInformation};
use sdp::description::media::MediaDescription;
use sdp::description::session::{
    SessionDescription, ATTR_KEY_CANDIDATE, ATTR_KEY_CONNECTION_SETUP, ATTR_KEY_GROUP,
    ATTR_KEY_INACTIVE, ATTR_KEY_MID,
};
use sdp::util::ConnectionRole;

use crate::codec::payload_type::is_dynamic;
use crate::codec::{Codec, FmtpParameters, PayloadType, RTCPFeedback, RtpCodecKind, SdpCodec};
use crate::error::{Error, Result};
use crate::transport::dtls::fingerprint::RTCDtlsFingerprint;

pub(crate) const ATTR_KEY_BUNDLE_ONLY: &str = "bundle-only";
pub(crate) const ATTR_KEY_ICE_UFRAG: &str = "ice-ufrag";
pub(crate) const ATTR_KEY_ICE_PWD: &str = "ice-pwd";
pub(crate) const ATTR_KEY_ICE_OPTIONS: &str = "ice-options";
pub(crate) const ATTR_KEY_FINGERPRINT: &str = "fingerprint";
pub(crate) const ATTR_KEY_RTPMAP: &str = "rtpmap";
pub(crate) const ATTR_KEY_FMTP: &str = "fmtp";
pub(crate) const ATTR_KEY_RTCP_FB: &str = "rtcp-fb";
pub(crate) const ATTR_KEY_RTCP: &str = "rtcp";
pub(crate) const SEMANTIC_TOKEN_BUNDLE: &str = "BUNDLE";
const BANDWIDTH_TYPE_TIAS: &str = "TIAS";

/// Static payload types that may appear without an rtpmap.
const STATIC_PAYLOAD_TYPES: [(PayloadType, &str, u32); 3] =
    [(0, "PCMU", 8000), (8, "PCMA", 8000), (9, "G722", 8000)];

pub(crate) fn get_mid(md: &MediaDescription) -> Option<&str> {
    md.attribute(ATTR_KEY_MID).flatten()
}

/// A port of zero without `a=bundle-only` rejects or disables the m-section.
pub(crate) fn is_disabled(md: &MediaDescription) -> bool {
    md.media_name.port.value == 0 && !md.has_attribute(ATTR_KEY_BUNDLE_ONLY)
}

pub(crate) fn media_kind(md: &MediaDescription) -> RtpCodecKind {
    RtpCodecKind::from(md.media_name.media.as_str())
}

/// bundle_group returns the mids of the first `a=group:BUNDLE`, tag first.
pub(crate) fn bundle_group(sd: &SessionDescription) -> Option<Vec<String>> {
    sd.attributes
        .iter()
        .filter(|a| a.key == ATTR_KEY_GROUP)
        .filter_map(|a| a.value.as_deref())
        .find_map(|value| {
            let mut split = value.split_whitespace();
            if split.next() != Some(SEMANTIC_TOKEN_BUNDLE) {
                return None;
            }
            Some(split.map(str::to_owned).collect())
        })
}

/// level_of_mid finds the m-section carrying `mid`.
pub(crate) fn level_of_mid(sd: &SessionDescription, mid: &str) -> Option<usize> {
    sd.media_descriptions
        .iter()
        .position(|md| get_mid(md) == Some(mid))
}

/// transport_media returns the m-section whose transport attributes apply
/// to `level`: the bundle tag for bundled m-sections, `level` otherwise.
pub(crate) fn transport_media(sd: &SessionDescription, level: usize) -> Option<&MediaDescription> {
    let md = sd.media_descriptions.get(level)?;
    let Some(mid) = get_mid(md) else {
        return Some(md);
    };
    let tag_level = bundle_group(sd)
        .filter(|group| group.iter().any(|m| m == mid))
        .and_then(|group| group.first().and_then(|tag| level_of_mid(sd, tag)));
    match tag_level {
        Some(tag) => sd.media_descriptions.get(tag),
        None => Some(md),
    }
}

fn split_payload_type(value: &str) -> (&str, &str) {
    match value.split_once(' ') {
        Some((pt, rest)) => (pt, rest.trim()),
        None => (value, ""),
    }
}

/// codecs_from_media reads every format of an m-section.
///
/// A dynamic payload type without rtpmap is an error; unknown static ones
/// are skipped.
pub(crate) fn codecs_from_media(md: &MediaDescription) -> Result<Vec<SdpCodec>> {
    let mut codecs = vec![];

    for format in &md.media_name.formats {
        let pt = match format.parse::<PayloadType>() {
            Ok(pt) if pt <= 127 => pt,
            _ => {
                log::trace!("skipping non-RTP format {format}");
                continue;
            }
        };

        let mut codec = SdpCodec {
            pt,
            ..Default::default()
        };
        let mut has_rtpmap = false;

        for attr in &md.attributes {
            let Some(value) = &attr.value else {
                continue;
            };
            let (attr_pt, rest) = split_payload_type(value);
            if attr_pt != format && !(attr_pt == "*" && attr.key == ATTR_KEY_RTCP_FB) {
                continue;
            }

            match attr.key.as_str() {
                ATTR_KEY_RTPMAP => {
                    let mut split = rest.split('/');
                    codec.name = split.next().unwrap_or_default().to_owned();
                    codec.clock_rate = split
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| Error::operation(format!("invalid rtpmap: {value}")))?;
                    codec.channels = split.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                    has_rtpmap = !codec.name.is_empty();
                }
                ATTR_KEY_FMTP => codec.fmtp = FmtpParameters::parse(rest),
                ATTR_KEY_RTCP_FB => codec.rtcp_fb.push(RTCPFeedback::parse(rest)),
                _ => {}
            }
        }

        if !has_rtpmap {
            match STATIC_PAYLOAD_TYPES.iter().find(|(p, _, _)| *p == pt) {
                Some((_, name, clock_rate)) => {
                    codec.name = (*name).to_owned();
                    codec.clock_rate = *clock_rate;
                }
                None if is_dynamic(pt) => {
                    return Err(Error::operation(format!(
                        "no rtpmap for dynamic payload type {pt}"
                    )));
                }
                None => {
                    log::debug!("skipping static payload type {pt} without rtpmap");
                    continue;
                }
            }
        }

        codecs.push(codec);
    }

    Ok(codecs)
}

/// ice_credentials reads ufrag and pwd, media level first.
pub(crate) fn ice_credentials(
    sd: &SessionDescription,
    md: &MediaDescription,
) -> Option<(String, String)> {
    let lookup = |key: &str| -> Option<String> {
        md.attribute(key)
            .flatten()
            .map(str::to_owned)
            .or_else(|| sd.attribute(key).cloned())
    };
    Some((lookup(ATTR_KEY_ICE_UFRAG)?, lookup(ATTR_KEY_ICE_PWD)?))
}

/// fingerprints reads the media-level fingerprints, falling back to the
/// session level. At least one is required.
pub(crate) fn fingerprints(
    sd: &SessionDescription,
    md: &MediaDescription,
) -> Result<Vec<RTCDtlsFingerprint>> {
    fn collect(attrs: &[sdp::description::common::Attribute]) -> Vec<&str> {
        attrs
            .iter()
            .filter(|a| a.key == ATTR_KEY_FINGERPRINT)
            .filter_map(|a| a.value.as_deref())
            .collect()
    }

    let mut raw = collect(&md.attributes);
    if raw.is_empty() {
        raw = collect(&sd.attributes);
    }
    if raw.is_empty() {
        return Err(Error::invalid_access("no fingerprint"));
    }
    raw.into_iter().map(RTCDtlsFingerprint::parse).collect()
}

/// setup reads `a=setup`, media level first.
pub(crate) fn setup(sd: &SessionDescription, md: &MediaDescription) -> Option<ConnectionRole> {
    md.attribute(ATTR_KEY_CONNECTION_SETUP)
        .flatten()
        .or_else(|| sd.attribute(ATTR_KEY_CONNECTION_SETUP).map(String::as_str))
        .map(ConnectionRole::from)
}

pub(crate) fn candidates(md: &MediaDescription) -> Vec<String> {
    md.attributes
        .iter()
        .filter(|a| a.key == ATTR_KEY_CANDIDATE)
        .filter_map(|a| a.value.clone())
        .collect()
}

/// tias returns the `b=TIAS` limit in bits per second, 0 without one.
pub(crate) fn tias(md: &MediaDescription) -> u64 {
    md.bandwidth
        .iter()
        .find(|b| !b.experimental && b.bandwidth_type == BANDWIDTH_TYPE_TIAS)
        .map(|b| b.bandwidth)
        .unwrap_or(0)
}

pub(crate) fn connection_information(address: &str) -> ConnectionInformation {
    ConnectionInformation {
        network_type: "IN".to_owned(),
        address_type: if address.contains(':') { "IP6" } else { "IP4" }.to_owned(),
        address: Some(Address {
            address: address.to_owned(),
            ttl: None,
            range: None,
        }),
    }
}

/// disabled_media builds a port-zero m-section carrying only mid,
/// `a=inactive` and one format.
///
/// Known media types get the reserved codec of their kind; anything else
/// keeps the formats and protocol of `like`.
pub(crate) fn disabled_media(
    kind: &str,
    mid: Option<&str>,
    like: Option<&MediaDescription>,
) -> MediaDescription {
    let mut md = MediaDescription::new_jsep_media_description(kind.to_owned(), vec![]);
    md.media_name.port.value = 0;

    let media_kind = RtpCodecKind::from(kind);
    if media_kind == RtpCodecKind::Unspecified {
        if let Some(like) = like {
            md.media_name.protos = like.media_name.protos.clone();
            md.media_name.formats = like.media_name.formats.clone();
        }
    }

    if let Some(mid) = mid {
        md = md.with_value_attribute(ATTR_KEY_MID.to_owned(), mid.to_owned());
    }
    md = md.with_property_attribute(ATTR_KEY_INACTIVE.to_owned());

    if media_kind != RtpCodecKind::Unspecified {
        let reserved = Codec::reserved(media_kind);
        md.media_name.formats.push(reserved.pt().to_string());
        md = md.with_value_attribute(
            ATTR_KEY_RTPMAP.to_owned(),
            format!(
                "{} {}/{}",
                reserved.pt(),
                reserved.name(),
                reserved.description().clock_rate
            ),
        );
    }
    md
}
