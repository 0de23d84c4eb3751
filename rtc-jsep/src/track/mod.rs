//! Send and receive tracks of a transceiver.

use std::collections::BTreeMap;

use rand::Rng;
use sdp::description::session::{
    ATTR_KEY_MSID, ATTR_KEY_SSRC, ATTR_KEY_SSRCGROUP, SEMANTIC_TOKEN_FLOW_IDENTIFICATION,
};
use sdp::MediaDescription;

use crate::codec::{Codec, RtpCodecKind};
use crate::transport::ice::generate_crypto_random_string;

pub(crate) const SDP_ATTRIBUTE_RID: &str = "rid";
pub(crate) const SDP_ATTRIBUTE_SIMULCAST: &str = "simulcast";

const RUNES_ALPHA_NUMBER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LEN_CNAME: usize = 16;

/// generate_cname makes a random RTCP CNAME.
pub(crate) fn generate_cname() -> String {
    generate_crypto_random_string(LEN_CNAME, RUNES_ALPHA_NUMBER)
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackDirection {
    #[default]
    Send,
    Recv,
}

/// One negotiated RTP stream of a track.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct JsepEncoding {
    /// Empty unless the track is simulcast.
    pub rid: String,
    /// Negotiated codecs, in preference order.
    pub codecs: Vec<Codec>,
}

/// Result of the last successful negotiation of a track.
///
/// Replaced wholesale after every round; there is no way to change one
/// in place.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedDetails {
    pub(crate) encodings: Vec<JsepEncoding>,
    pub(crate) extmap: BTreeMap<String, u16>,
    pub(crate) tias: u64,
}

impl NegotiatedDetails {
    pub fn encodings(&self) -> &[JsepEncoding] {
        &self.encodings
    }

    /// extension_id returns the negotiated id of a header extension.
    pub fn extension_id(&self, uri: &str) -> Option<u16> {
        self.extmap.get(uri).copied()
    }

    pub fn extmap(&self) -> &BTreeMap<String, u16> {
        &self.extmap
    }

    /// Transport-independent bandwidth limit from `b=TIAS`, 0 if none.
    pub fn tias(&self) -> u64 {
        self.tias
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct JsepTrack {
    pub(crate) media_type: RtpCodecKind,
    pub(crate) direction: TrackDirection,
    pub(crate) stream_ids: Vec<String>,
    pub(crate) track_id: String,
    pub(crate) ssrcs: Vec<u32>,
    pub(crate) rtx_ssrcs: Vec<u32>,
    pub(crate) cname: String,
    pub(crate) active: bool,
    pub(crate) rids: Vec<String>,
    pub(crate) prototype_codecs: Vec<Codec>,
    pub(crate) negotiated_details: Option<NegotiatedDetails>,
}

impl JsepTrack {
    pub fn new(media_type: RtpCodecKind, direction: TrackDirection) -> Self {
        JsepTrack {
            media_type,
            direction,
            ..Default::default()
        }
    }

    pub fn media_type(&self) -> RtpCodecKind {
        self.media_type
    }

    pub fn direction(&self) -> TrackDirection {
        self.direction
    }

    pub fn stream_ids(&self) -> &[String] {
        &self.stream_ids
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn ssrcs(&self) -> &[u32] {
        &self.ssrcs
    }

    pub fn rtx_ssrcs(&self) -> &[u32] {
        &self.rtx_ssrcs
    }

    pub fn cname(&self) -> &str {
        &self.cname
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn rids(&self) -> &[String] {
        &self.rids
    }

    pub fn prototype_codecs(&self) -> &[Codec] {
        &self.prototype_codecs
    }

    pub fn negotiated_details(&self) -> Option<&NegotiatedDetails> {
        self.negotiated_details.as_ref()
    }

    /// set_stream_ids keeps the first occurrence of every id.
    pub fn set_stream_ids(&mut self, stream_ids: &[&str]) {
        self.stream_ids.clear();
        for id in stream_ids {
            if !self.stream_ids.iter().any(|s| s == id) {
                self.stream_ids.push((*id).to_owned());
            }
        }
    }

    pub fn set_track_id(&mut self, track_id: &str) {
        self.track_id = track_id.to_owned();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// set_rids configures simulcast sending; one ssrc is used per rid.
    pub fn set_rids(&mut self, rids: &[&str]) {
        self.rids = rids.iter().map(|r| (*r).to_owned()).collect();
        self.ssrcs.clear();
        self.rtx_ssrcs.clear();
    }

    /// ensure_ssrcs makes sure a send track has one primary and one RTX
    /// ssrc per encoding.
    pub(crate) fn ensure_ssrcs(&mut self) {
        let wanted = self.rids.len().max(1);
        let mut rng = rand::rng();
        while self.ssrcs.len() < wanted {
            let ssrc = rng.random::<u32>();
            if ssrc != 0 && !self.ssrcs.contains(&ssrc) && !self.rtx_ssrcs.contains(&ssrc) {
                self.ssrcs.push(ssrc);
            }
        }
        while self.rtx_ssrcs.len() < wanted {
            let ssrc = rng.random::<u32>();
            if ssrc != 0 && !self.ssrcs.contains(&ssrc) && !self.rtx_ssrcs.contains(&ssrc) {
                self.rtx_ssrcs.push(ssrc);
            }
        }
    }

    /// msid_values are the `a=msid` values this track is signaled with.
    pub(crate) fn msid_values(&self) -> Vec<String> {
        if self.stream_ids.is_empty() {
            vec![format!("- {}", self.track_id)]
        } else {
            self.stream_ids
                .iter()
                .map(|s| format!("{s} {}", self.track_id))
                .collect()
        }
    }

    /// add_send_lines appends msid, ssrc and simulcast attributes of an
    /// active send track.
    pub(crate) fn add_send_lines(&self, mut md: MediaDescription, rtx: bool) -> MediaDescription {
        for msid in self.msid_values() {
            md = md.with_value_attribute(ATTR_KEY_MSID.to_owned(), msid);
        }

        for (i, ssrc) in self.ssrcs.iter().enumerate() {
            md = md.with_value_attribute(
                ATTR_KEY_SSRC.to_owned(),
                format!("{ssrc} cname:{}", self.cname),
            );
            if let (true, Some(rtx_ssrc)) = (rtx, self.rtx_ssrcs.get(i)) {
                md = md
                    .with_value_attribute(
                        ATTR_KEY_SSRC.to_owned(),
                        format!("{rtx_ssrc} cname:{}", self.cname),
                    )
                    .with_value_attribute(
                        ATTR_KEY_SSRCGROUP.to_owned(),
                        format!("{SEMANTIC_TOKEN_FLOW_IDENTIFICATION} {ssrc} {rtx_ssrc}"),
                    );
            }
        }

        if self.rids.len() > 1 {
            for rid in &self.rids {
                md = md.with_value_attribute(SDP_ATTRIBUTE_RID.to_owned(), format!("{rid} send"));
            }
            md = md.with_value_attribute(
                SDP_ATTRIBUTE_SIMULCAST.to_owned(),
                format!("send {}", self.rids.join(";")),
            );
        }
        md
    }

    /// add_recv_simulcast_lines answers a remote simulcast offer.
    pub(crate) fn add_recv_simulcast_lines(&self, mut md: MediaDescription) -> MediaDescription {
        if self.rids.len() > 1 {
            for rid in &self.rids {
                md = md.with_value_attribute(SDP_ATTRIBUTE_RID.to_owned(), format!("{rid} recv"));
            }
            md = md.with_value_attribute(
                SDP_ATTRIBUTE_SIMULCAST.to_owned(),
                format!("recv {}", self.rids.join(";")),
            );
        }
        md
    }

    /// update_from_remote refreshes a receive track from the peer's
    /// m-section.
    pub(crate) fn update_from_remote(&mut self, md: &MediaDescription) {
        let mut stream_ids = vec![];
        let mut track_id = None;
        let mut ssrcs = vec![];
        let mut repair_flows = vec![];
        let mut cname = None;

        for attr in &md.attributes {
            let Some(value) = &attr.value else {
                continue;
            };
            match attr.key.as_str() {
                ATTR_KEY_MSID => {
                    let mut split = value.split_whitespace();
                    if let Some(sid) = split.next() {
                        if sid != "-" && !stream_ids.contains(&sid) {
                            stream_ids.push(sid);
                        }
                    }
                    if let Some(tid) = split.next() {
                        track_id = Some(tid);
                    }
                }
                ATTR_KEY_SSRCGROUP => {
                    let split: Vec<&str> = value.split_whitespace().collect();
                    if split.len() == 3 && split[0] == SEMANTIC_TOKEN_FLOW_IDENTIFICATION {
                        match split[2].parse::<u32>() {
                            Ok(repair) => repair_flows.push(repair),
                            Err(err) => log::warn!("Failed to parse SSRC: {err}"),
                        }
                    }
                }
                ATTR_KEY_SSRC => {
                    let mut split = value.splitn(2, ' ');
                    match split.next().map(str::parse::<u32>) {
                        Some(Ok(ssrc)) => {
                            if !ssrcs.contains(&ssrc) {
                                ssrcs.push(ssrc);
                            }
                            let value = split.next().and_then(|s| s.strip_prefix("cname:"));
                            if cname.is_none() {
                                cname = value;
                            }
                        }
                        Some(Err(err)) => log::warn!("Failed to parse SSRC: {err}"),
                        None => {}
                    }
                }
                _ => {}
            }
        }

        self.stream_ids = stream_ids.into_iter().map(str::to_owned).collect();
        self.track_id = track_id.unwrap_or_default().to_owned();
        self.rtx_ssrcs = ssrcs
            .iter()
            .copied()
            .filter(|s| repair_flows.contains(s))
            .collect();
        self.ssrcs = ssrcs
            .into_iter()
            .filter(|s| !repair_flows.contains(s))
            .collect();
        self.cname = cname.unwrap_or_default().to_owned();
        self.rids = send_rids(md);
    }

    /// encodings splits a negotiated codec list into one encoding per rid.
    pub(crate) fn encodings(&self, codecs: &[Codec]) -> Vec<JsepEncoding> {
        if self.rids.len() <= 1 {
            return vec![JsepEncoding {
                rid: self.rids.first().cloned().unwrap_or_default(),
                codecs: codecs.to_vec(),
            }];
        }
        self.rids
            .iter()
            .map(|rid| JsepEncoding {
                rid: rid.clone(),
                codecs: codecs.to_vec(),
            })
            .collect()
    }
}

/// send_rids lists the rids the peer declares it will send, in
/// `a=simulcast` order when present.
pub(crate) fn send_rids(md: &MediaDescription) -> Vec<String> {
    let mut rids: Vec<String> = vec![];
    let mut simulcast = None;

    for attr in &md.attributes {
        let Some(value) = &attr.value else {
            continue;
        };
        match attr.key.as_str() {
            SDP_ATTRIBUTE_RID => {
                let mut split = value.split_whitespace();
                match (split.next(), split.next()) {
                    (Some(id), Some("send")) => rids.push(id.to_owned()),
                    (Some(_), Some("recv")) => {}
                    _ => log::warn!("Failed to parse RID: {value}"),
                }
            }
            SDP_ATTRIBUTE_SIMULCAST => simulcast = Some(value.as_str()),
            _ => {}
        }
    }

    let Some(simulcast) = simulcast else {
        return rids;
    };
    let mut split = simulcast.split_whitespace();
    let mut ordered = vec![];
    while let (Some(dir), Some(list)) = (split.next(), split.next()) {
        if dir != "send" {
            continue;
        }
        for alt in list.split([';', ',']) {
            let id = alt.trim_start_matches('~');
            if rids.iter().any(|r| r == id) && !ordered.iter().any(|r: &String| r == id) {
                ordered.push(id.to_owned());
            }
        }
    }
    if ordered.is_empty() {
        rids
    } else {
        ordered
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn media() -> MediaDescription {
        MediaDescription::new_jsep_media_description("video".to_owned(), vec![])
    }

    #[test]
    fn test_track_stream_ids_dedup() {
        let mut track = JsepTrack::new(RtpCodecKind::Audio, TrackDirection::Send);
        track.set_stream_ids(&["a", "b", "a"]);
        track.set_track_id("t");
        assert_eq!(track.stream_ids(), &["a".to_owned(), "b".to_owned()]);
        assert_eq!(track.msid_values(), vec!["a t".to_owned(), "b t".to_owned()]);

        track.set_stream_ids(&[]);
        assert_eq!(track.msid_values(), vec!["- t".to_owned()]);
    }

    #[test]
    fn test_track_ensure_ssrcs() {
        let mut track = JsepTrack::new(RtpCodecKind::Video, TrackDirection::Send);
        track.ensure_ssrcs();
        assert_eq!(track.ssrcs().len(), 1);
        assert_eq!(track.rtx_ssrcs().len(), 1);
        let first = track.ssrcs()[0];
        track.ensure_ssrcs();
        assert_eq!(track.ssrcs(), &[first]);

        track.set_rids(&["h", "m", "l"]);
        track.ensure_ssrcs();
        assert_eq!(track.ssrcs().len(), 3);
        assert_eq!(track.rtx_ssrcs().len(), 3);
    }

    #[test]
    fn test_track_send_lines_round_trip_to_recv() {
        let mut send = JsepTrack::new(RtpCodecKind::Video, TrackDirection::Send);
        send.set_stream_ids(&["stream"]);
        send.set_track_id("track");
        send.cname = "cname".to_owned();
        send.ssrcs = vec![1111];
        send.rtx_ssrcs = vec![2222];

        let md = send.add_send_lines(media(), true);
        assert_eq!(md.attribute("msid"), Some(Some("stream track")));
        assert_eq!(md.attribute("ssrc-group"), Some(Some("FID 1111 2222")));

        let mut recv = JsepTrack::new(RtpCodecKind::Video, TrackDirection::Recv);
        recv.update_from_remote(&md);
        assert_eq!(recv.stream_ids(), &["stream".to_owned()]);
        assert_eq!(recv.track_id(), "track");
        assert_eq!(recv.ssrcs(), &[1111]);
        assert_eq!(recv.rtx_ssrcs(), &[2222]);
        assert_eq!(recv.cname(), "cname");
        assert!(recv.rids().is_empty());
    }

    #[test]
    fn test_send_rids() {
        let tests = vec![
            ("no simulcast", vec![], vec![]),
            (
                "rid only",
                vec![("rid", "a send"), ("rid", "b recv")],
                vec!["a"],
            ),
            (
                "simulcast order wins",
                vec![
                    ("rid", "a send"),
                    ("rid", "b send"),
                    ("rid", "c send"),
                    ("simulcast", "send c;~b,a"),
                ],
                vec!["c", "b", "a"],
            ),
            ("garbled rid", vec![("rid", "x")], vec![]),
        ];

        for (name, attributes, expected) in tests {
            let mut md = media();
            for (k, v) in attributes {
                md = md.with_value_attribute(k.to_owned(), v.to_owned());
            }
            assert_eq!(send_rids(&md), expected, "{name}");
        }
    }

    #[test]
    fn test_track_encodings() {
        let mut track = JsepTrack::new(RtpCodecKind::Video, TrackDirection::Recv);
        assert_eq!(track.encodings(&[]).len(), 1);
        assert_eq!(track.encodings(&[])[0].rid, "");

        track.rids = vec!["h".to_owned(), "l".to_owned()];
        let rids: Vec<String> = track.encodings(&[]).into_iter().map(|e| e.rid).collect();
        assert_eq!(rids, vec!["h".to_owned(), "l".to_owned()]);
    }
}
