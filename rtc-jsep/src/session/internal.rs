use super::extmap::{parse_extmaps, ExtmapEntry};
use super::sdp::{
    bundle_group, candidates, codecs_from_media, connection_information, disabled_media,
    fingerprints, get_mid, ice_credentials, is_disabled, level_of_mid, media_kind, setup, tias,
    transport_media, ATTR_KEY_BUNDLE_ONLY, ATTR_KEY_FINGERPRINT, ATTR_KEY_ICE_OPTIONS,
    ATTR_KEY_ICE_PWD, ATTR_KEY_ICE_UFRAG, ATTR_KEY_RTCP, SEMANTIC_TOKEN_BUNDLE,
};
use super::*;
use crate::codec::payload_type::assign_payload_types;
use crate::codec::{add_fec_to_media, negotiate_codecs, remember_payload_types, Codec};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::track::NegotiatedDetails;
use crate::transport::dtls::role::RTCDtlsRole;
use crate::transport::dtls::JsepDtlsTransport;
use crate::transport::ice::JsepIceTransport;
use ::sdp::description::common::Attribute;
use ::sdp::description::media::MediaDescription;
use ::sdp::description::session::*;
use ::sdp::util::ConnectionRole;
use std::collections::{BTreeMap, BTreeSet};

/// What an offer puts at one level.
enum OfferSection {
    /// Slot of the transceiver that owns the level.
    Enabled(usize),
    Disabled {
        kind: String,
        mid: Option<String>,
        like: Option<MediaDescription>,
    },
}

/// A transceiver without an active send track can only receive.
fn send_available(t: &JsepTransceiver) -> RTCRtpTransceiverDirection {
    if t.send_track.active {
        RTCRtpTransceiverDirection::Sendrecv
    } else {
        RTCRtpTransceiverDirection::Recvonly
    }
}

fn offer_direction(t: &JsepTransceiver) -> RTCRtpTransceiverDirection {
    t.js_direction.intersect(send_available(t))
}

fn parsed(desc: Option<&RTCSessionDescription>) -> Option<SessionDescription> {
    desc.and_then(|d| d.parsed.clone())
}

/// next_free_mid claims the lowest integer mid not in `used`.
fn next_free_mid(used: &mut BTreeSet<String>) -> String {
    let mut n = 0usize;
    loop {
        let mid = n.to_string();
        if used.insert(mid.clone()) {
            return mid;
        }
        n += 1;
    }
}

fn has_video_rtx(codecs: &[Codec]) -> bool {
    codecs.iter().any(|c| {
        matches!(c, Codec::Video(v) if v.description.enabled && v.rtx_enabled && v.rtx_pt.is_some())
    })
}

fn strip_candidate_prefix(candidate: &str) -> &str {
    let candidate = candidate.trim();
    candidate
        .strip_prefix("candidate:")
        .unwrap_or(candidate)
}

impl JsepSession {
    /// prepare_transceiver fills what the application left empty.
    pub(super) fn prepare_transceiver(&self, t: &mut JsepTransceiver) {
        if t.send_track.prototype_codecs.is_empty() {
            t.send_track.prototype_codecs = self.config.codecs_for(t.kind);
        }
        if t.recv_track.prototype_codecs.is_empty() {
            t.recv_track.prototype_codecs = self.config.codecs_for(t.kind);
        }
        if t.send_track.cname.is_empty() {
            t.send_track.cname = self.cname.clone();
        }
    }

    fn ensure_snapshot(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(NegotiationSnapshot {
                transceivers: self.transceivers.clone(),
                ice: self.ice.clone(),
            });
        }
    }

    /// restore_snapshot undoes the bookkeeping of the exchange in progress.
    ///
    /// Transceivers created since the snapshot lose their association. On a
    /// remote rollback those that only a remote offer created are removed.
    fn restore_snapshot(&mut self, remote: bool) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };

        let saved_len = snapshot.transceivers.len();
        for index in 0..self.transceivers.len() {
            if index < saved_len {
                let (Some(saved), Some(t)) = (
                    snapshot.transceivers.at(index),
                    self.transceivers.at_mut(index),
                ) else {
                    continue;
                };
                t.mid = saved.mid.clone();
                t.level = saved.level;
                t.bundle_level = saved.bundle_level;
                t.transport = saved.transport.clone();
                t.current_direction = saved.current_direction;
                t.can_recycle_my_msection = saved.can_recycle_my_msection;
                t.send_track.negotiated_details = saved.send_track.negotiated_details.clone();
                if remote {
                    t.recv_track = saved.recv_track.clone();
                } else {
                    t.recv_track.negotiated_details = saved.recv_track.negotiated_details.clone();
                }
                continue;
            }

            let remove = remote
                && self
                    .transceivers
                    .at(index)
                    .is_some_and(|t| t.only_exists_because_of_set_remote && !t.add_track_magic);
            if remove {
                log::debug!("[{}] removing transceiver {index}", self.name);
                self.transceivers.remove(index);
            } else if let Some(t) = self.transceivers.at_mut(index) {
                t.disassociate();
            }
        }

        self.ice = snapshot.ice;
        self.old_ice = None;
    }

    /// complete_round forgets everything kept to undo the finished exchange.
    fn complete_round(&mut self) {
        if self.old_ice.is_some() {
            self.ice_restart_requested = false;
        }
        self.snapshot = None;
        self.old_ice = None;
        self.last_offer.clear();
        self.last_answer.clear();
    }

    fn update_sdp_origin(&mut self, d: &mut SessionDescription) {
        if self.sdp_origin.session_version == 0 {
            self.sdp_origin = d.origin.clone();
        } else {
            self.sdp_origin.session_version += 1;
            d.origin = self.sdp_origin.clone();
        }
    }

    fn session_skeleton(&mut self, group: &[String], allow_mixed: bool) -> SessionDescription {
        let mut d = SessionDescription::new_jsep_session_description(false);
        self.update_sdp_origin(&mut d);

        if !group.is_empty() {
            d = d.with_value_attribute(
                ATTR_KEY_GROUP.to_owned(),
                format!("{SEMANTIC_TOKEN_BUNDLE} {}", group.join(" ")),
            );
        }
        if allow_mixed {
            // RFC 8285 6.
            d = d.with_property_attribute(ATTR_KEY_EXTMAP_ALLOW_MIXED.to_owned());
        }
        if !self.config.ice_options.is_empty() {
            d = d.with_value_attribute(
                ATTR_KEY_ICE_OPTIONS.to_owned(),
                self.config.ice_options.join(" "),
            );
        }
        d.with_value_attribute(
            ATTR_KEY_MSID_SEMANTIC.to_owned(),
            format!("{SEMANTIC_TOKEN_WEBRTC_MEDIA_STREAMS} *"),
        )
    }

    fn add_transport_attributes(
        &self,
        mut md: MediaDescription,
        setup: ConnectionRole,
    ) -> MediaDescription {
        md = md
            .with_value_attribute(ATTR_KEY_ICE_UFRAG.to_owned(), self.ice.ufrag.clone())
            .with_value_attribute(ATTR_KEY_ICE_PWD.to_owned(), self.ice.pwd.clone());
        for fingerprint in &self.config.fingerprints {
            md = md.with_value_attribute(ATTR_KEY_FINGERPRINT.to_owned(), fingerprint.to_string());
        }
        md.with_value_attribute(ATTR_KEY_CONNECTION_SETUP.to_owned(), setup.to_string())
    }

    /// carry_candidates copies gathered candidates and the default address
    /// from the current local m-section at `level`, unless ICE restarts.
    fn carry_candidates(
        &self,
        mut md: MediaDescription,
        level: usize,
        mid: Option<&str>,
        current_local: Option<&SessionDescription>,
    ) -> MediaDescription {
        if self.old_ice.is_some() {
            return md;
        }
        let Some(prev) = current_local.and_then(|d| d.media_descriptions.get(level)) else {
            return md;
        };
        if get_mid(prev) != mid || prev.media_name.port.value == 0 {
            return md;
        }

        md.media_name.port = prev.media_name.port.clone();
        md.connection_information = prev.connection_information.clone();
        md.attributes.extend(
            prev.attributes
                .iter()
                .filter(|a| {
                    a.key == ATTR_KEY_CANDIDATE
                        || a.key == ATTR_KEY_END_OF_CANDIDATES
                        || a.key == ATTR_KEY_RTCP
                })
                .cloned(),
        );
        md
    }

    /// used_mids collects every mid a transceiver or description carries.
    fn used_mids(&self) -> BTreeSet<String> {
        let mut used: BTreeSet<String> = self
            .transceivers
            .iter()
            .filter_map(|(_, t)| t.mid.clone())
            .collect();

        let d = &self.descriptions;
        for desc in [
            &d.local.current,
            &d.local.pending,
            &d.remote.current,
            &d.remote.pending,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(parsed) = &desc.parsed {
                used.extend(
                    parsed
                        .media_descriptions
                        .iter()
                        .filter_map(get_mid)
                        .map(str::to_owned),
                );
            }
        }
        used
    }

    /// A disabled level is free when nobody owns it or its owner has
    /// finished stopping.
    fn can_recycle_level(&self, level: usize) -> bool {
        match self.transceivers.iter().find(|(_, t)| t.level == Some(level)) {
            Some((_, t)) => t.stopped && t.can_recycle_my_msection,
            None => true,
        }
    }

    /// assign_levels gives every live transceiver without one a level and
    /// a mid. Returns the number of levels of the next offer.
    fn assign_levels(&mut self, current_local: Option<&SessionDescription>) -> usize {
        let local_count = current_local.map_or(0, |d| d.media_descriptions.len());
        let mut num_levels = self
            .transceivers
            .iter()
            .filter_map(|(_, t)| t.level)
            .map(|l| l + 1)
            .max()
            .unwrap_or(0)
            .max(local_count);
        let mut used_mids = self.used_mids();

        for index in 0..self.transceivers.len() {
            let needs_level = self
                .transceivers
                .at(index)
                .is_some_and(|t| t.level.is_none() && !t.stopped && !t.stopping);
            if !needs_level {
                continue;
            }

            let recycled = current_local.and_then(|d| {
                (0..local_count).find(|&level| {
                    d.media_descriptions.get(level).is_some_and(is_disabled)
                        && self.can_recycle_level(level)
                })
            });

            let level = match recycled {
                Some(level) => {
                    if let Some(owner) = self.transceivers.find_index(|t| t.level == Some(level)) {
                        log::debug!(
                            "[{}] transceiver {index} recycles level {level} of transceiver {owner}",
                            self.name
                        );
                        if let Some(t) = self.transceivers.at_mut(owner) {
                            t.disassociate();
                        }
                    }
                    level
                }
                None => {
                    num_levels += 1;
                    num_levels - 1
                }
            };

            if let Some(t) = self.transceivers.at_mut(index) {
                t.level = Some(level);
                if t.mid.is_none() {
                    t.mid = Some(next_free_mid(&mut used_mids));
                }
            }
        }

        num_levels
    }

    /// ensure_transports gives every enabled transceiver a transport id and
    /// the local ICE credentials.
    fn ensure_transports(&mut self) {
        for t in self.transceivers.iter_mut() {
            if t.level.is_none() || t.stopped || t.stopping {
                continue;
            }
            if t.transport.transport_id.is_empty() || !t.transport.is_enabled() {
                t.transport.transport_id = format!("transport_{}", self.next_transport_id);
                self.next_transport_id += 1;
                t.transport.components = 1;
            }
            t.transport.local_ufrag = self.ice.ufrag.clone();
            t.transport.local_pwd = self.ice.pwd.clone();
        }
    }

    /// apply_offer_to_receive makes at least `count` transceivers of `kind`
    /// receive, turning on recv first and adding recvonly ones after.
    fn apply_offer_to_receive(&mut self, kind: RtpCodecKind, count: Option<u32>) {
        let Some(count) = count else {
            return;
        };
        let wanted = count as usize;

        let mut receiving = self
            .transceivers
            .iter()
            .filter(|(_, t)| t.kind == kind && !t.stopping && t.js_direction.has_recv())
            .count();

        for t in self.transceivers.iter_mut() {
            if receiving >= wanted {
                break;
            }
            if t.kind == kind && !t.stopping && !t.js_direction.has_recv() {
                t.js_direction =
                    RTCRtpTransceiverDirection::from_send_recv(t.js_direction.has_send(), true);
                receiving += 1;
            }
        }

        while receiving < wanted {
            let mut t = JsepTransceiver::new(kind, RTCRtpTransceiverDirection::Recvonly);
            self.prepare_transceiver(&mut t);
            let handle = self.transceivers.insert(t);
            log::debug!(
                "[{}] added recvonly {kind} transceiver {}",
                self.name,
                handle.index()
            );
            receiving += 1;
        }
    }

    fn offer_media(
        &self,
        t: &JsepTransceiver,
        level: usize,
        extmap_ids: &BTreeMap<String, u16>,
        current_local: Option<&SessionDescription>,
    ) -> Option<MediaDescription> {
        let mut codecs = t.recv_track.prototype_codecs.clone();
        assign_payload_types(&mut codecs);
        if !codecs
            .iter()
            .any(|c| c.is_enabled() && !c.is_telephone_event())
        {
            log::warn!(
                "[{}] no enabled codec for {} transceiver at level {level}",
                self.name,
                t.kind
            );
            return None;
        }

        let direction = offer_direction(t);
        let mut md = MediaDescription::new_jsep_media_description(t.kind.to_string(), vec![]);
        if let Some(mid) = &t.mid {
            md = md.with_value_attribute(ATTR_KEY_MID.to_owned(), mid.clone());
        }
        md = md.with_property_attribute(direction.to_string());
        md = self
            .add_transport_attributes(md, ConnectionRole::Actpass)
            .with_property_attribute(ATTR_KEY_RTCPMUX.to_owned())
            .with_property_attribute(ATTR_KEY_RTCPRSIZE.to_owned());

        for ext in self.config.extensions_for(t.kind, direction) {
            if let Some(id) = extmap_ids.get(&ext.uri) {
                md = md.with_value_attribute(ATTR_KEY_EXT_MAP.to_owned(), format!("{id} {}", ext.uri));
            }
        }

        for codec in codecs.iter().filter(|c| c.is_enabled()) {
            md = codec.add_to_media(md);
        }
        md = add_fec_to_media(md, &codecs);

        if direction.has_send() {
            md = t.send_track.add_send_lines(md, has_video_rtx(&codecs));
        }

        Some(self.carry_candidates(md, level, t.mid.as_deref(), current_local))
    }

    /// The bundle tag of an offer: the negotiated tag while it stays
    /// enabled, else a previously bundled m-section, else the first one.
    fn offer_bundle_tag(enabled: &[(usize, RtpCodecKind, Option<usize>)]) -> Option<usize> {
        let previous = enabled.iter().find_map(|(_, _, bundle_level)| *bundle_level);
        match previous {
            Some(tag) if enabled.iter().any(|(level, _, _)| *level == tag) => Some(tag),
            _ => enabled
                .iter()
                .find(|(_, _, bundle_level)| bundle_level.is_some())
                .or(enabled.first())
                .map(|(level, _, _)| *level),
        }
    }

    pub(super) fn create_offer_internal(
        &mut self,
        options: RTCOfferOptions,
    ) -> Result<RTCSessionDescription> {
        if !matches!(
            self.signaling_state,
            RTCSignalingState::Stable | RTCSignalingState::HaveLocalOffer
        ) {
            return Err(Error::invalid_state(format!(
                "cannot create offer in state {}",
                self.signaling_state
            )));
        }
        self.ensure_snapshot();

        if (options.ice_restart || self.ice_restart_requested) && self.old_ice.is_none() {
            log::debug!("[{}] restarting ICE", self.name);
            self.old_ice = Some(std::mem::replace(&mut self.ice, IceCredentials::generate()));
        }

        self.apply_offer_to_receive(RtpCodecKind::Audio, options.offer_to_receive_audio);
        self.apply_offer_to_receive(RtpCodecKind::Video, options.offer_to_receive_video);

        let current_local = parsed(self.descriptions.local.current.as_ref());
        let pending_local = parsed(self.descriptions.local.pending.as_ref());
        let num_levels = self.assign_levels(current_local.as_ref());
        self.ensure_transports();
        for t in self.transceivers.iter_mut() {
            if t.js_direction.has_send() {
                t.send_track.ensure_ssrcs();
            }
        }

        let mut sections = Vec::with_capacity(num_levels);
        for level in 0..num_levels {
            let owner = self
                .transceivers
                .find_index(|t| t.level == Some(level))
                .and_then(|i| self.transceivers.at(i).map(|t| (i, t)));
            let section = match owner {
                Some((index, t)) if !t.stopped && !t.stopping => OfferSection::Enabled(index),
                Some((_, t)) => OfferSection::Disabled {
                    kind: t.kind.to_string(),
                    mid: t.mid.clone(),
                    like: None,
                },
                None => {
                    // the owner is gone; keep what the level was offered as
                    let like = pending_local
                        .as_ref()
                        .or(current_local.as_ref())
                        .and_then(|d| d.media_descriptions.get(level))
                        .cloned();
                    OfferSection::Disabled {
                        kind: like
                            .as_ref()
                            .map(|md| md.media_name.media.clone())
                            .unwrap_or_else(|| RtpCodecKind::Audio.to_string()),
                        mid: like.as_ref().and_then(get_mid).map(str::to_owned),
                        like,
                    }
                }
            };
            sections.push(section);
        }

        let uris: Vec<String> = sections
            .iter()
            .filter_map(|s| match s {
                OfferSection::Enabled(index) => self.transceivers.at(*index),
                OfferSection::Disabled { .. } => None,
            })
            .flat_map(|t| {
                self.config
                    .extensions_for(t.kind, offer_direction(t))
                    .map(|e| e.uri.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        let extmap_ids = self.extmaps.plan(uris.iter().map(String::as_str));

        let mut media = Vec::with_capacity(sections.len());
        let mut enabled = vec![];
        for (level, section) in sections.iter().enumerate() {
            let md = match section {
                OfferSection::Enabled(index) => self.transceivers.at(*index).map(|t| {
                    match self.offer_media(t, level, &extmap_ids, current_local.as_ref()) {
                        Some(md) => {
                            enabled.push((level, t.kind, t.bundle_level));
                            md
                        }
                        None => disabled_media(&t.kind.to_string(), t.mid.as_deref(), None),
                    }
                }),
                OfferSection::Disabled { kind, mid, like } => {
                    Some(disabled_media(kind, mid.as_deref(), like.as_ref()))
                }
            };
            if let Some(md) = md {
                media.push(md);
            }
        }

        let mut group = vec![];
        if let Some(tag) = Self::offer_bundle_tag(&enabled) {
            let tag_kind = enabled
                .iter()
                .find(|(level, _, _)| *level == tag)
                .map(|(_, kind, _)| *kind);
            if let Some(mid) = media.get(tag).and_then(get_mid) {
                group.push(mid.to_owned());
            }

            for (i, &(level, kind, bundle_level)) in enabled.iter().enumerate() {
                if level == tag {
                    continue;
                }
                let kind_seen = tag_kind == Some(kind)
                    || enabled[..i].iter().any(|(_, k, _)| *k == kind);
                let bundle_only = bundle_level.is_some()
                    || self.config.bundle_policy.is_bundle_only(kind_seen);

                let Some(md) = media.get_mut(level) else {
                    continue;
                };
                if bundle_only {
                    md.media_name.port.value = 0;
                    md.attributes
                        .push(Attribute::new(ATTR_KEY_BUNDLE_ONLY.to_owned(), None));
                }
                if let Some(mid) = get_mid(md) {
                    group.push(mid.to_owned());
                }
            }
        }

        let mut d = self.session_skeleton(&group, true);
        d.media_descriptions = media;

        let offer = RTCSessionDescription::from_parsed(RTCSdpType::Offer, d);
        self.last_offer = offer.sdp.clone();
        log::debug!("[{}] created offer with {num_levels} m-sections", self.name);
        Ok(offer)
    }

    fn answer_media(
        &self,
        offer: &SessionDescription,
        level: usize,
        t: Option<&JsepTransceiver>,
        current_local: Option<&SessionDescription>,
    ) -> Result<Option<MediaDescription>> {
        let Some(offer_md) = offer.media_descriptions.get(level) else {
            return Ok(None);
        };
        let Some(t) = t else {
            return Ok(None);
        };
        if is_disabled(offer_md) || t.stopped || media_kind(offer_md) == RtpCodecKind::Unspecified {
            return Ok(None);
        }

        let offered = codecs_from_media(offer_md)?;
        let codecs = negotiate_codecs(&t.recv_track.prototype_codecs, &offered, &offered);
        if codecs.is_empty() {
            log::debug!("[{}] no common codec at level {level}", self.name);
            return Ok(None);
        }

        let direction = if t.stopping {
            RTCRtpTransceiverDirection::Inactive
        } else {
            RTCRtpTransceiverDirection::from_media(offer_md)
                .reverse()
                .intersect(t.js_direction)
                .intersect(send_available(t))
        };

        let offer_transport = transport_media(offer, level).unwrap_or(offer_md);
        let offer_setup = setup(offer, offer_transport).ok_or_else(|| {
            Error::invalid_access(format!("m-section {level} has no setup attribute"))
        })?;
        let answer_setup = RTCDtlsRole::answer_setup(offer_setup)?;

        let mut md = MediaDescription::new_jsep_media_description(t.kind.to_string(), vec![]);
        md.media_name.protos = offer_md.media_name.protos.clone();
        if let Some(mid) = get_mid(offer_md) {
            md = md.with_value_attribute(ATTR_KEY_MID.to_owned(), mid.to_owned());
        }
        md = md.with_property_attribute(direction.to_string());
        md = self.add_transport_attributes(md, answer_setup);
        if offer_transport.has_attribute(ATTR_KEY_RTCPMUX) {
            md = md.with_property_attribute(ATTR_KEY_RTCPMUX.to_owned());
        }
        if offer_md.has_attribute(ATTR_KEY_RTCPRSIZE) {
            md = md.with_property_attribute(ATTR_KEY_RTCPRSIZE.to_owned());
        }

        for e in parse_extmaps(offer_md)? {
            if self.config.supports_extension(t.kind, &e.uri) {
                md = md.with_value_attribute(ATTR_KEY_EXT_MAP.to_owned(), format!("{} {}", e.id, e.uri));
            }
        }

        for codec in &codecs {
            md = codec.add_to_media(md);
        }
        md = add_fec_to_media(md, &codecs);

        if direction.has_send() {
            md = t.send_track.add_send_lines(md, has_video_rtx(&codecs));
        }
        if direction.has_recv() {
            md = t.recv_track.add_recv_simulcast_lines(md);
        }

        Ok(Some(self.carry_candidates(
            md,
            level,
            get_mid(offer_md),
            current_local,
        )))
    }

    pub(super) fn create_answer_internal(&mut self) -> Result<RTCSessionDescription> {
        if !matches!(
            self.signaling_state,
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveLocalPranswer
        ) {
            return Err(Error::invalid_state(format!(
                "cannot create answer in state {}",
                self.signaling_state
            )));
        }

        let offer = self
            .descriptions
            .remote
            .pending
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no remote offer to answer"))?
            .parsed_or_unmarshal()?;
        let current_local = parsed(self.descriptions.local.current.as_ref());

        for t in self.transceivers.iter_mut() {
            if t.js_direction.has_send() {
                t.send_track.ensure_ssrcs();
            }
        }

        let mut media = Vec::with_capacity(offer.media_descriptions.len());
        let mut accepted = vec![];
        for (level, offer_md) in offer.media_descriptions.iter().enumerate() {
            let t = self
                .transceivers
                .find_index(|t| t.level == Some(level))
                .and_then(|i| self.transceivers.at(i));
            match self.answer_media(&offer, level, t, current_local.as_ref())? {
                Some(md) => {
                    if let Some(mid) = get_mid(&md) {
                        accepted.push(mid.to_owned());
                    }
                    media.push(md);
                }
                None => media.push(disabled_media(
                    &offer_md.media_name.media,
                    get_mid(offer_md),
                    Some(offer_md),
                )),
            }
        }

        // the first accepted member of the offered group becomes the tag
        let group: Vec<String> = bundle_group(&offer)
            .unwrap_or_default()
            .into_iter()
            .filter(|mid| accepted.contains(mid))
            .collect();
        for md in media.iter_mut() {
            let member = get_mid(md).is_some_and(|mid| group.iter().skip(1).any(|m| m == mid));
            if member {
                md.media_name.port.value = 0;
                md.attributes
                    .push(Attribute::new(ATTR_KEY_BUNDLE_ONLY.to_owned(), None));
            }
        }

        let allow_mixed = offer.has_attribute(ATTR_KEY_EXTMAP_ALLOW_MIXED);
        let mut d = self.session_skeleton(&group, allow_mixed);
        d.media_descriptions = media;

        let answer = RTCSessionDescription::from_parsed(RTCSdpType::Answer, d);
        self.last_answer = answer.sdp.clone();
        Ok(answer)
    }

    pub(super) fn set_local_offer(&mut self, sdp: &str) -> Result<()> {
        if self.last_offer.is_empty() {
            return Err(Error::invalid_modification("no offer has been created"));
        }
        if !sdp.is_empty() && sdp != self.last_offer {
            return Err(Error::invalid_modification(
                "offer differs from the last created offer",
            ));
        }

        let desc = RTCSessionDescription::offer(self.last_offer.clone())?;
        self.ensure_transports();
        self.descriptions.local.pending = Some(desc);
        self.is_offerer = true;
        Ok(())
    }

    pub(super) fn set_local_answer(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        if self.last_answer.is_empty() {
            return Err(Error::invalid_modification("no answer has been created"));
        }
        if !sdp.is_empty() && sdp != self.last_answer {
            return Err(Error::invalid_modification(
                "answer differs from the last created answer",
            ));
        }

        let desc = if sdp_type == RTCSdpType::Pranswer {
            RTCSessionDescription::pranswer(self.last_answer.clone())?
        } else {
            RTCSessionDescription::answer(self.last_answer.clone())?
        };
        let answer = desc.parsed_or_unmarshal()?;
        let offer = self
            .descriptions
            .remote
            .pending
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no remote offer"))?
            .parsed_or_unmarshal()?;

        let is_final = sdp_type == RTCSdpType::Answer;
        self.finalize(&offer, &answer, true, is_final)?;

        if is_final {
            self.descriptions.local.current = Some(desc);
            self.descriptions.local.pending = None;
            self.descriptions.remote.promote();
            self.complete_round();
        } else {
            self.descriptions.local.pending = Some(desc);
        }
        Ok(())
    }

    fn validate_remote_offer(&self, offer: &SessionDescription) -> Result<()> {
        let count = offer.media_descriptions.len();
        for prev in [
            &self.descriptions.remote.current,
            &self.descriptions.local.current,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(prev) = &prev.parsed {
                if count < prev.media_descriptions.len() {
                    return Err(Error::invalid_access(format!(
                        "offer has {count} m-sections, {} were negotiated",
                        prev.media_descriptions.len()
                    )));
                }
            }
        }

        let mut mids = BTreeSet::new();
        for (level, md) in offer.media_descriptions.iter().enumerate() {
            match get_mid(md) {
                Some(mid) => {
                    if !mids.insert(mid) {
                        return Err(Error::invalid_access(format!("duplicate mid {mid}")));
                    }
                }
                None if is_disabled(md) => {}
                None => {
                    return Err(Error::invalid_access(format!(
                        "m-section {level} has no mid"
                    )));
                }
            }

            if is_disabled(md) || media_kind(md) == RtpCodecKind::Unspecified {
                continue;
            }

            let transport = transport_media(offer, level).unwrap_or(md);
            let (ufrag, pwd) = ice_credentials(offer, transport).ok_or_else(|| {
                Error::invalid_access(format!("m-section {level} has no ICE credentials"))
            })?;
            IceCredentials::validate(&ufrag, &pwd)?;
            fingerprints(offer, transport)?;
            let role = setup(offer, transport).ok_or_else(|| {
                Error::invalid_access(format!("m-section {level} has no setup attribute"))
            })?;
            RTCDtlsRole::answer_setup(role)?;
            codecs_from_media(md)?;
            self.extmaps.check(&parse_extmaps(md)?)?;
        }
        Ok(())
    }

    /// remote_ice_restarted reports whether the offer changes the ICE
    /// credentials of a negotiated transport.
    fn remote_ice_restarted(&self, offer: &SessionDescription) -> bool {
        let Some(current) = self
            .descriptions
            .remote
            .current
            .as_ref()
            .and_then(|d| d.parsed.as_ref())
        else {
            return false;
        };

        let levels = offer
            .media_descriptions
            .len()
            .min(current.media_descriptions.len());
        (0..levels).any(|level| {
            let (Some(new_md), Some(old_md)) = (
                offer.media_descriptions.get(level),
                current.media_descriptions.get(level),
            ) else {
                return false;
            };
            if is_disabled(new_md) || is_disabled(old_md) {
                return false;
            }
            let old = transport_media(current, level).and_then(|md| ice_credentials(current, md));
            let new = transport_media(offer, level).and_then(|md| ice_credentials(offer, md));
            old.is_some() && new.is_some() && old != new
        })
    }

    /// associate_remote_section binds the transceiver that will answer the
    /// m-section at `level`, creating one when nothing matches.
    fn associate_remote_section(&mut self, offer: &SessionDescription, level: usize) -> Result<()> {
        let Some(md) = offer.media_descriptions.get(level) else {
            return Ok(());
        };
        let kind = media_kind(md);
        if kind == RtpCodecKind::Unspecified {
            log::debug!(
                "[{}] ignoring m-section {level} of type {}",
                self.name,
                md.media_name.media
            );
            return Ok(());
        }
        let mid = get_mid(md).map(str::to_owned);
        let disabled = is_disabled(md);

        let mut index = mid
            .as_deref()
            .and_then(|m| self.transceivers.find_index(|t| t.mid.as_deref() == Some(m)));

        if let Some(t) = index.and_then(|i| self.transceivers.at(i)) {
            if t.kind != kind {
                return Err(Error::invalid_access(format!(
                    "m-section {} changed type from {} to {kind}",
                    mid.as_deref().unwrap_or_default(),
                    t.kind
                )));
            }
        } else if let Some(owner) = self.transceivers.find_index(|t| t.level == Some(level)) {
            let stopped = self.transceivers.at(owner).is_some_and(|t| t.stopped);
            if !stopped {
                return Err(Error::invalid_access(format!(
                    "offer reuses level {level} of a transceiver that is not stopped"
                )));
            }
            if let Some(t) = self.transceivers.at_mut(owner) {
                t.disassociate();
            }
        }

        if index.is_none() && !disabled {
            index = self.transceivers.find_index(|t| {
                t.add_track_magic
                    && t.kind == kind
                    && t.mid.is_none()
                    && t.level.is_none()
                    && !t.stopped
                    && !t.stopping
            });
        }

        if index.is_none() && !disabled {
            let mut t = JsepTransceiver::new(kind, RTCRtpTransceiverDirection::Recvonly);
            t.only_exists_because_of_set_remote = true;
            self.prepare_transceiver(&mut t);
            let handle = self.transceivers.insert(t);
            log::debug!(
                "[{}] created {kind} transceiver {} for m-section {level}",
                self.name,
                handle.index()
            );
            index = Some(handle.index());
        }

        let Some(t) = index.and_then(|i| self.transceivers.at_mut(i)) else {
            return Ok(());
        };
        t.mid = mid;
        t.level = Some(level);
        if !disabled {
            t.recv_track.update_from_remote(md);
        }
        Ok(())
    }

    pub(super) fn set_remote_offer(&mut self, sdp: &str) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp.to_owned())?;
        let offer = desc.parsed_or_unmarshal()?;

        match self.signaling_state {
            RTCSignalingState::HaveRemoteOffer => self.restore_snapshot(true),
            // an offer was created but never applied
            RTCSignalingState::Stable if self.snapshot.is_some() => {
                self.restore_snapshot(false);
                self.last_offer.clear();
            }
            _ => {}
        }
        self.ensure_snapshot();

        self.validate_remote_offer(&offer)?;

        if self.remote_ice_restarted(&offer) && self.old_ice.is_none() {
            log::debug!("[{}] remote restarted ICE", self.name);
            self.old_ice = Some(std::mem::replace(&mut self.ice, IceCredentials::generate()));
        }

        for level in 0..offer.media_descriptions.len() {
            self.associate_remote_section(&offer, level)?;
        }

        self.descriptions.remote.pending = Some(desc);
        self.is_offerer = false;
        Ok(())
    }

    fn validate_remote_answer(
        &self,
        offer: &SessionDescription,
        answer: &SessionDescription,
    ) -> Result<()> {
        if answer.media_descriptions.len() != offer.media_descriptions.len() {
            return Err(Error::invalid_access(format!(
                "answer has {} m-sections, offer had {}",
                answer.media_descriptions.len(),
                offer.media_descriptions.len()
            )));
        }

        for (level, (offer_md, answer_md)) in offer
            .media_descriptions
            .iter()
            .zip(answer.media_descriptions.iter())
            .enumerate()
        {
            if get_mid(offer_md) != get_mid(answer_md) {
                return Err(Error::invalid_access(format!(
                    "answer mid {:?} does not match offer mid {:?} at level {level}",
                    get_mid(answer_md),
                    get_mid(offer_md)
                )));
            }
            if is_disabled(offer_md) && !is_disabled(answer_md) {
                return Err(Error::invalid_access(format!(
                    "answer enables m-section {level} the offer disabled"
                )));
            }
            if is_disabled(answer_md) || media_kind(answer_md) == RtpCodecKind::Unspecified {
                continue;
            }

            let transport = transport_media(answer, level).unwrap_or(answer_md);
            let (ufrag, pwd) = ice_credentials(answer, transport).ok_or_else(|| {
                Error::invalid_access(format!("m-section {level} has no ICE credentials"))
            })?;
            IceCredentials::validate(&ufrag, &pwd)?;
            fingerprints(answer, transport)?;
            RTCDtlsRole::from_remote_answer(setup(answer, transport))?;
            codecs_from_media(answer_md)?;

            let offered = parse_extmaps(offer_md)?;
            let entries = parse_extmaps(answer_md)?;
            if let Some(e) = entries.iter().find(|e| !offered.contains(e)) {
                return Err(Error::invalid_access(format!(
                    "answer uses extmap {} {} that was not offered",
                    e.id, e.uri
                )));
            }
            self.extmaps.check(&entries)?;
        }
        Ok(())
    }

    pub(super) fn set_remote_answer(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        let desc = if sdp_type == RTCSdpType::Pranswer {
            RTCSessionDescription::pranswer(sdp.to_owned())?
        } else {
            RTCSessionDescription::answer(sdp.to_owned())?
        };
        let answer = desc.parsed_or_unmarshal()?;
        let offer = self
            .descriptions
            .local
            .pending
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no local offer"))?
            .parsed_or_unmarshal()?;

        self.validate_remote_answer(&offer, &answer)?;

        let is_final = sdp_type == RTCSdpType::Answer;
        self.finalize(&offer, &answer, false, is_final)?;

        if is_final {
            self.descriptions.remote.current = Some(desc);
            self.descriptions.remote.pending = None;
            self.descriptions.local.promote();
            self.complete_round();
        } else {
            self.descriptions.remote.pending = Some(desc);
        }
        Ok(())
    }

    /// finalize applies the outcome of an answer or pranswer to the
    /// transceivers. Stopping and payload-type memory wait for the final
    /// answer.
    fn finalize(
        &mut self,
        offer: &SessionDescription,
        answer: &SessionDescription,
        local_answer: bool,
        is_final: bool,
    ) -> Result<()> {
        let (local, remote) = if local_answer {
            (answer, offer)
        } else {
            (offer, answer)
        };
        let group = bundle_group(answer).unwrap_or_default();
        let tag_level = group.first().and_then(|mid| level_of_mid(answer, mid));
        let mut negotiated_extmaps: Vec<ExtmapEntry> = vec![];

        for (level, answer_md) in answer.media_descriptions.iter().enumerate() {
            let Some(index) = self.transceivers.find_index(|t| t.level == Some(level)) else {
                continue;
            };

            if is_disabled(answer_md) {
                if is_final {
                    if let Some(t) = self.transceivers.at_mut(index) {
                        if !t.stopped {
                            log::debug!("[{}] m-section {level} rejected", self.name);
                        }
                        t.set_stopped();
                        t.current_direction = None;
                    }
                }
                continue;
            }

            let (Some(local_md), Some(remote_md)) = (
                local.media_descriptions.get(level),
                remote.media_descriptions.get(level),
            ) else {
                continue;
            };
            let local_transport = transport_media(local, level).unwrap_or(local_md);
            let remote_transport = transport_media(remote, level).unwrap_or(remote_md);
            let answer_transport = if local_answer {
                local_transport
            } else {
                remote_transport
            };

            let answer_direction = RTCRtpTransceiverDirection::from_media(answer_md);
            let current_direction = if local_answer {
                answer_direction
            } else {
                answer_direction.reverse()
            };

            let local_codecs = codecs_from_media(local_md)?;
            let remote_codecs = codecs_from_media(remote_md)?;
            let entries = parse_extmaps(answer_md)?;
            let extmap: BTreeMap<String, u16> =
                entries.iter().map(|e| (e.uri.clone(), e.id)).collect();
            negotiated_extmaps.extend(entries);

            let role = if local_answer {
                RTCDtlsRole::from_local_answer(
                    setup(answer, answer_transport).unwrap_or(ConnectionRole::Active),
                )
            } else {
                RTCDtlsRole::from_remote_answer(setup(answer, answer_transport))?
            };
            let remote_fingerprints = fingerprints(remote, remote_transport)?;
            let (remote_ufrag, remote_pwd) =
                ice_credentials(remote, remote_transport).unwrap_or_default();
            let mut remote_ice = JsepIceTransport {
                ufrag: remote_ufrag,
                pwd: remote_pwd,
                candidates: candidates(remote_transport),
                end_of_candidates: remote_transport.has_attribute(ATTR_KEY_END_OF_CANDIDATES),
            };
            let rtcp_mux = answer_transport.has_attribute(ATTR_KEY_RTCPMUX);
            let bundled = tag_level.is_some()
                && get_mid(answer_md).is_some_and(|mid| group.iter().any(|m| m == mid));
            let (local_tias, remote_tias) = (tias(local_md), tias(remote_md));

            let Some(t) = self.transceivers.at_mut(index) else {
                continue;
            };

            let recv = negotiate_codecs(&t.recv_track.prototype_codecs, &local_codecs, &remote_codecs);
            let send = negotiate_codecs(&t.send_track.prototype_codecs, &remote_codecs, &local_codecs);
            if recv.is_empty() || send.is_empty() {
                // an answer whose codecs we cannot use counts as a rejection
                log::warn!("[{}] m-section {level} has no usable codec", self.name);
                if is_final {
                    t.set_stopped();
                    t.current_direction = None;
                }
                continue;
            }

            t.current_direction = Some(current_direction);
            t.recv_track.update_from_remote(remote_md);
            t.recv_track.negotiated_details = Some(NegotiatedDetails {
                encodings: t.recv_track.encodings(&recv),
                extmap: extmap.clone(),
                tias: local_tias,
            });
            t.send_track.negotiated_details = Some(NegotiatedDetails {
                encodings: t.send_track.encodings(&send),
                extmap,
                tias: remote_tias,
            });
            if is_final {
                remember_payload_types(&mut t.recv_track.prototype_codecs, &recv);
                remember_payload_types(&mut t.send_track.prototype_codecs, &send);
            }

            if t.transport.transport_id.is_empty() {
                t.transport.transport_id = format!("transport_{}", self.next_transport_id);
                self.next_transport_id += 1;
            }
            t.transport.components = if rtcp_mux { 1 } else { 2 };
            t.transport.local_ufrag = self.ice.ufrag.clone();
            t.transport.local_pwd = self.ice.pwd.clone();
            // keep trickled candidates of the same ICE generation
            if let Some(old) = &t.transport.ice {
                if old.ufrag.is_empty() || old.ufrag == remote_ice.ufrag {
                    for c in &old.candidates {
                        if !remote_ice.candidates.contains(c) {
                            remote_ice.candidates.push(c.clone());
                        }
                    }
                    remote_ice.end_of_candidates |= old.end_of_candidates;
                }
            }
            t.transport.ice = Some(remote_ice);
            t.transport.dtls = Some(JsepDtlsTransport {
                role,
                fingerprints: remote_fingerprints,
            });
            t.bundle_level = if bundled { tag_level } else { None };
        }

        if let Some(tag) = tag_level {
            let tag_transport = self
                .transceivers
                .iter()
                .find(|(_, t)| t.level == Some(tag))
                .map(|(_, t)| t.transport.clone());
            if let Some(tag_transport) = tag_transport {
                for t in self.transceivers.iter_mut() {
                    if t.bundle_level == Some(tag) && t.level != Some(tag) && !t.stopped {
                        t.transport = tag_transport.clone();
                    }
                }
            }
        }

        if is_final {
            if self.old_ice.is_some() {
                log::debug!("[{}] ICE restart completed, extmap ids reset", self.name);
                self.extmaps = ExtmapTable::default();
            }
            self.extmaps.commit(&negotiated_extmaps);
        }
        Ok(())
    }

    pub(super) fn rollback_local(&mut self) {
        self.restore_snapshot(false);
        self.descriptions.clear_pending();
        self.last_offer.clear();
    }

    pub(super) fn rollback_remote(&mut self) {
        self.restore_snapshot(true);
        self.descriptions.clear_pending();
        self.last_answer.clear();
    }

    pub(super) fn add_local_ice_candidate_internal(
        &mut self,
        candidate: &str,
        transport_id: &str,
        ufrag: &str,
    ) -> Result<LocalCandidateResult> {
        if self.descriptions.local.effective().is_none() {
            return Err(Error::invalid_state(
                "cannot add a local candidate without a local description",
            ));
        }
        let skipped = LocalCandidateResult {
            skipped: true,
            ..Default::default()
        };
        if ufrag != self.ice.ufrag {
            log::debug!("[{}] skipping candidate of ufrag {ufrag}", self.name);
            return Ok(skipped);
        }

        let owner = self.transceivers.iter().find_map(|(_, t)| match t.level {
            Some(level)
                if t.transport.transport_id == transport_id
                    && t.has_own_transport()
                    && !t.stopped =>
            {
                Some((level, t.mid.clone()))
            }
            _ => None,
        });
        let Some((level, mid)) = owner else {
            log::debug!(
                "[{}] skipping candidate of unused transport {transport_id}",
                self.name
            );
            return Ok(skipped);
        };

        let value = strip_candidate_prefix(candidate).to_owned();
        for desc in self.descriptions.local.each_mut() {
            desc.update(|d| {
                let Some(md) = d.media_descriptions.get_mut(level) else {
                    return;
                };
                let present = md
                    .attributes
                    .iter()
                    .any(|a| a.key == ATTR_KEY_CANDIDATE && a.value.as_deref() == Some(value.as_str()));
                if !is_disabled(md) && get_mid(md) == mid.as_deref() && !present {
                    md.attributes.push(Attribute::new(
                        ATTR_KEY_CANDIDATE.to_owned(),
                        Some(value.clone()),
                    ));
                }
            });
        }

        Ok(LocalCandidateResult {
            level: Some(level),
            mid,
            skipped: false,
        })
    }

    pub(super) fn add_remote_ice_candidate_internal(
        &mut self,
        candidate: &str,
        mid: Option<&str>,
        level: Option<usize>,
        ufrag: Option<&str>,
    ) -> Result<Option<String>> {
        let remote = self
            .descriptions
            .remote
            .effective()
            .ok_or_else(|| {
                Error::invalid_state("cannot add a remote candidate without a remote description")
            })?
            .parsed_or_unmarshal()?;

        let target = match (mid, level) {
            (Some(mid), _) if !mid.is_empty() => level_of_mid(&remote, mid),
            (_, Some(level)) if level < remote.media_descriptions.len() => Some(level),
            _ => None,
        }
        .ok_or_else(|| {
            Error::operation(format!(
                "no m-section for candidate (mid {mid:?}, level {level:?})"
            ))
        })?;

        let Some(md) = remote.media_descriptions.get(target) else {
            return Ok(None);
        };
        if is_disabled(md) {
            log::debug!("[{}] candidate for disabled m-section {target}", self.name);
            return Ok(None);
        }
        if let Some(ufrag) = ufrag {
            let expected = transport_media(&remote, target)
                .and_then(|t| ice_credentials(&remote, t))
                .map(|(u, _)| u);
            if expected.as_deref() != Some(ufrag) {
                log::debug!("[{}] skipping remote candidate of ufrag {ufrag}", self.name);
                return Ok(None);
            }
        }

        let Some(index) = self.transceivers.find_index(|t| t.level == Some(target)) else {
            return Ok(None);
        };
        let transport_id = self
            .transceivers
            .at(index)
            .map(|t| t.transport.transport_id.clone())
            .unwrap_or_default();

        let value = strip_candidate_prefix(candidate).to_owned();
        let apply = |ice: &mut JsepIceTransport| {
            if value.is_empty() {
                ice.end_of_candidates = true;
            } else if !ice.candidates.contains(&value) {
                ice.candidates.push(value.clone());
            }
        };

        if transport_id.is_empty() {
            if let Some(t) = self.transceivers.at_mut(index) {
                apply(t.transport.ice.get_or_insert_with(Default::default));
            }
        } else {
            for t in self.transceivers.iter_mut() {
                if t.transport.transport_id == transport_id {
                    apply(t.transport.ice.get_or_insert_with(Default::default));
                }
            }
        }

        let target_mid = get_mid(md).map(str::to_owned);
        for desc in self.descriptions.remote.each_mut() {
            desc.update(|d| {
                let Some(md) = d.media_descriptions.get_mut(target) else {
                    return;
                };
                if get_mid(md) != target_mid.as_deref() {
                    return;
                }
                let attr = if value.is_empty() {
                    Attribute::new(ATTR_KEY_END_OF_CANDIDATES.to_owned(), None)
                } else {
                    Attribute::new(ATTR_KEY_CANDIDATE.to_owned(), Some(value.clone()))
                };
                if !md
                    .attributes
                    .iter()
                    .any(|a| a.key == attr.key && a.value == attr.value)
                {
                    md.attributes.push(attr);
                }
            });
        }

        Ok((!transport_id.is_empty()).then_some(transport_id))
    }

    /// Levels of live m-sections carried by `transport_id`.
    fn levels_of_transport(&self, transport_id: &str, own_only: bool) -> Vec<usize> {
        self.transceivers
            .iter()
            .filter(|(_, t)| {
                t.transport.transport_id == transport_id
                    && !t.stopped
                    && (!own_only || t.has_own_transport())
            })
            .filter_map(|(_, t)| t.level)
            .collect()
    }

    pub(super) fn update_default_candidate_internal(
        &mut self,
        rtp_addr: &str,
        rtp_port: u16,
        rtcp_addr: &str,
        rtcp_port: u16,
        transport_id: &str,
    ) -> Result<()> {
        if self.descriptions.local.effective().is_none() {
            return Err(Error::invalid_state(
                "cannot update default candidate without a local description",
            ));
        }
        let levels = self.levels_of_transport(transport_id, false);
        if levels.is_empty() {
            log::debug!("[{}] no m-section uses transport {transport_id}", self.name);
            return Ok(());
        }

        let rtcp = (rtcp_port != 0).then(|| {
            let address_type = if rtcp_addr.contains(':') { "IP6" } else { "IP4" };
            format!("{rtcp_port} IN {address_type} {rtcp_addr}")
        });
        for desc in self.descriptions.local.each_mut() {
            desc.update(|d| {
                for &level in &levels {
                    let Some(md) = d.media_descriptions.get_mut(level) else {
                        continue;
                    };
                    if md.media_name.port.value == 0 {
                        continue;
                    }
                    md.media_name.port.value = rtp_port as isize;
                    md.connection_information = Some(connection_information(rtp_addr));
                    if let Some(rtcp) = &rtcp {
                        md.attributes.retain(|a| a.key != ATTR_KEY_RTCP);
                        md.attributes
                            .push(Attribute::new(ATTR_KEY_RTCP.to_owned(), Some(rtcp.clone())));
                    }
                }
            });
        }
        Ok(())
    }

    pub(super) fn end_of_local_candidates_internal(&mut self, transport_id: &str) -> Result<()> {
        if self.descriptions.local.effective().is_none() {
            return Err(Error::invalid_state(
                "cannot end candidates without a local description",
            ));
        }
        let levels = self.levels_of_transport(transport_id, true);
        for desc in self.descriptions.local.each_mut() {
            desc.update(|d| {
                for &level in &levels {
                    if let Some(md) = d.media_descriptions.get_mut(level) {
                        if !is_disabled(md) && !md.has_attribute(ATTR_KEY_END_OF_CANDIDATES) {
                            md.attributes.push(Attribute::new(
                                ATTR_KEY_END_OF_CANDIDATES.to_owned(),
                                None,
                            ));
                        }
                    }
                }
            });
        }
        Ok(())
    }

    /// check_negotiation_needed_internal compares the transceivers with the
    /// current local description. Only meaningful in stable.
    pub(super) fn check_negotiation_needed_internal(&self) -> bool {
        if self.signaling_state != RTCSignalingState::Stable {
            return false;
        }
        let Some(local) = self
            .descriptions
            .local
            .current
            .as_ref()
            .and_then(|d| d.parsed.as_ref())
        else {
            return self.transceivers.iter().any(|(_, t)| !t.stopped);
        };
        if self.ice_restart_requested {
            return true;
        }
        let remote = self
            .descriptions
            .remote
            .current
            .as_ref()
            .and_then(|d| d.parsed.as_ref());

        for (_, t) in self.transceivers.iter() {
            if t.stopped {
                continue;
            }
            if t.stopping {
                return true;
            }
            let Some(level) = t.level else {
                return true;
            };
            let Some(md) = local.media_descriptions.get(level) else {
                return true;
            };
            if is_disabled(md) {
                continue;
            }

            let local_direction = RTCRtpTransceiverDirection::from_media(md);
            let mut expected = offer_direction(t);
            if !self.is_offerer {
                if let Some(remote_md) = remote.and_then(|r| r.media_descriptions.get(level)) {
                    expected = expected
                        .intersect(RTCRtpTransceiverDirection::from_media(remote_md).reverse());
                }
            }
            if local_direction != expected {
                return true;
            }

            if local_direction.has_send() {
                let signaled: Vec<String> = md
                    .attributes
                    .iter()
                    .filter(|a| a.key == ATTR_KEY_MSID)
                    .filter_map(|a| a.value.clone())
                    .collect();
                if signaled != t.send_track.msid_values() {
                    return true;
                }
            }
        }
        false
    }
}
