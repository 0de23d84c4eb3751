//! The negotiation engine.
//!
//! A [`JsepSession`] owns the transceivers of one peer connection and the
//! four description slots. Every public call either commits completely or
//! leaves the session as it was, apart from [`JsepSession::last_error`].

pub mod description_slots;
pub(crate) mod extmap;
mod internal;
pub mod sdp;
pub mod state;

use std::sync::Arc;

use ::sdp::description::session::Origin;

use crate::codec::RtpCodecKind;
use crate::configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use crate::configuration::JsepConfiguration;
use crate::error::{Error, Result};
use crate::rtp_transceiver::arena::TransceiverArena;
use crate::rtp_transceiver::{JsepTransceiver, TransceiverHandle};
use crate::track::generate_cname;
use crate::transport::ice::IceCredentials;
use description_slots::{DescriptionSide, DescriptionSlot, Descriptions};
use extmap::ExtmapTable;
use self::sdp::sdp_type::RTCSdpType;
use self::sdp::session_description::RTCSessionDescription;
use state::signaling_state::{next_signaling_state, RTCSignalingState, StateChangeOp};

/// Outcome of [`JsepSession::add_local_ice_candidate`].
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct LocalCandidateResult {
    /// Level the candidate was added to.
    pub level: Option<usize>,
    pub mid: Option<String>,
    /// The candidate belongs to an old ICE generation or an unknown
    /// transport and was ignored.
    pub skipped: bool,
}

/// State needed to undo the exchange in progress.
#[derive(Debug, Clone)]
struct NegotiationSnapshot {
    transceivers: TransceiverArena,
    ice: IceCredentials,
}

/// A sans-I/O JSEP session.
///
/// ```
/// use std::sync::Arc;
/// use rtc_jsep::codec::RtpCodecKind;
/// use rtc_jsep::configuration::JsepConfiguration;
/// use rtc_jsep::rtp_transceiver::direction::RTCRtpTransceiverDirection;
/// use rtc_jsep::rtp_transceiver::JsepTransceiver;
/// use rtc_jsep::session::JsepSession;
/// use rtc_jsep::session::sdp::sdp_type::RTCSdpType;
///
/// let config = Arc::new(JsepConfiguration::default());
/// let mut offerer = JsepSession::new("offerer", Arc::clone(&config));
/// let mut answerer = JsepSession::new("answerer", config);
///
/// offerer
///     .add_transceiver(JsepTransceiver::new(
///         RtpCodecKind::Audio,
///         RTCRtpTransceiverDirection::Sendrecv,
///     ))
///     .unwrap();
///
/// let offer = offerer.create_offer(None).unwrap();
/// offerer.set_local_description(RTCSdpType::Offer, &offer.sdp).unwrap();
/// answerer.set_remote_description(RTCSdpType::Offer, &offer.sdp).unwrap();
///
/// let answer = answerer.create_answer(None).unwrap();
/// answerer.set_local_description(RTCSdpType::Answer, &answer.sdp).unwrap();
/// offerer.set_remote_description(RTCSdpType::Answer, &answer.sdp).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct JsepSession {
    name: String,
    config: Arc<JsepConfiguration>,

    transceivers: TransceiverArena,
    signaling_state: RTCSignalingState,
    descriptions: Descriptions,
    extmaps: ExtmapTable,

    ice: IceCredentials,
    /// Credentials replaced by an ICE restart that has not completed.
    old_ice: Option<IceCredentials>,
    ice_restart_requested: bool,

    sdp_origin: Origin,
    cname: String,
    last_offer: String,
    last_answer: String,
    snapshot: Option<NegotiationSnapshot>,
    is_offerer: bool,
    next_transport_id: usize,

    last_error: Option<String>,
}

impl JsepSession {
    pub fn new(name: &str, config: Arc<JsepConfiguration>) -> Self {
        JsepSession {
            name: name.to_owned(),
            config,
            transceivers: TransceiverArena::default(),
            signaling_state: RTCSignalingState::Stable,
            descriptions: Descriptions::default(),
            extmaps: ExtmapTable::default(),
            ice: IceCredentials::generate(),
            old_ice: None,
            ice_restart_requested: false,
            sdp_origin: Origin::default(),
            cname: generate_cname(),
            last_offer: String::new(),
            last_answer: String::new(),
            snapshot: None,
            is_offerer: false,
            next_transport_id: 0,
            last_error: None,
        }
    }

    /// transact runs `f` on a copy of the session and keeps the copy only
    /// if `f` succeeds.
    fn transact<T, F>(&mut self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut JsepSession) -> Result<T>,
    {
        let mut working = self.clone();
        match f(&mut working) {
            Ok(value) => {
                working.last_error = None;
                *self = working;
                Ok(value)
            }
            Err(err) => {
                log::debug!("[{}] {op} failed: {err}", self.name);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// create_offer builds an offer from the current transceivers.
    ///
    /// Only mid, level and transport bookkeeping change; nothing takes
    /// effect until the offer is applied with
    /// [`set_local_description`](Self::set_local_description).
    pub fn create_offer(
        &mut self,
        options: Option<RTCOfferOptions>,
    ) -> Result<RTCSessionDescription> {
        self.transact("create_offer", |s| {
            s.create_offer_internal(options.unwrap_or_default())
        })
    }

    pub fn create_answer(
        &mut self,
        _options: Option<RTCAnswerOptions>,
    ) -> Result<RTCSessionDescription> {
        self.transact("create_answer", |s| s.create_answer_internal())
    }

    /// set_local_description applies an offer or answer created by this
    /// session. An empty `sdp` stands for the last one created.
    pub fn set_local_description(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        self.transact("set_local_description", |s| {
            s.set_description(StateChangeOp::SetLocal, sdp_type, sdp)
        })
    }

    pub fn set_remote_description(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        self.transact("set_remote_description", |s| {
            s.set_description(StateChangeOp::SetRemote, sdp_type, sdp)
        })
    }

    fn set_description(&mut self, op: StateChangeOp, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        let next = next_signaling_state(self.signaling_state, op, sdp_type)?;

        match (op, sdp_type) {
            (StateChangeOp::SetLocal, RTCSdpType::Rollback) => self.rollback_local(),
            (StateChangeOp::SetRemote, RTCSdpType::Rollback) => self.rollback_remote(),
            (StateChangeOp::SetLocal, RTCSdpType::Offer) => self.set_local_offer(sdp)?,
            (StateChangeOp::SetLocal, _) => self.set_local_answer(sdp_type, sdp)?,
            (StateChangeOp::SetRemote, RTCSdpType::Offer) => self.set_remote_offer(sdp)?,
            (StateChangeOp::SetRemote, _) => self.set_remote_answer(sdp_type, sdp)?,
        }

        if self.signaling_state != next {
            log::info!(
                "[{}] signaling state changed: {} -> {next}",
                self.name,
                self.signaling_state
            );
        }
        self.signaling_state = next;
        Ok(())
    }

    /// add_local_ice_candidate adds a gathered candidate to the local
    /// description.
    ///
    /// Candidates of an old ICE generation, or of a transport no m-section
    /// owns, are skipped rather than rejected.
    pub fn add_local_ice_candidate(
        &mut self,
        candidate: &str,
        transport_id: &str,
        ufrag: &str,
    ) -> Result<LocalCandidateResult> {
        self.transact("add_local_ice_candidate", |s| {
            s.add_local_ice_candidate_internal(candidate, transport_id, ufrag)
        })
    }

    /// add_remote_ice_candidate records a trickled remote candidate. An
    /// empty candidate signals end-of-candidates. Returns the transport id
    /// the candidate belongs to.
    pub fn add_remote_ice_candidate(
        &mut self,
        candidate: &str,
        mid: Option<&str>,
        level: Option<usize>,
        ufrag: Option<&str>,
    ) -> Result<Option<String>> {
        self.transact("add_remote_ice_candidate", |s| {
            s.add_remote_ice_candidate_internal(candidate, mid, level, ufrag)
        })
    }

    /// update_default_candidate writes the default address into every
    /// m-section using the transport.
    pub fn update_default_candidate(
        &mut self,
        rtp_addr: &str,
        rtp_port: u16,
        rtcp_addr: &str,
        rtcp_port: u16,
        transport_id: &str,
    ) -> Result<()> {
        self.transact("update_default_candidate", |s| {
            s.update_default_candidate_internal(rtp_addr, rtp_port, rtcp_addr, rtcp_port, transport_id)
        })
    }

    pub fn end_of_local_candidates(&mut self, transport_id: &str) -> Result<()> {
        self.transact("end_of_local_candidates", |s| {
            s.end_of_local_candidates_internal(transport_id)
        })
    }

    /// add_transceiver adds a transceiver. Empty codec prototypes are
    /// filled from the configuration.
    pub fn add_transceiver(&mut self, mut transceiver: JsepTransceiver) -> Result<TransceiverHandle> {
        self.transact("add_transceiver", |s| {
            if transceiver.kind == RtpCodecKind::Unspecified {
                return Err(Error::invalid_access("transceiver has no media type"));
            }
            s.prepare_transceiver(&mut transceiver);
            let handle = s.transceivers.insert(transceiver);
            log::debug!("[{}] added transceiver {}", s.name, handle.index());
            Ok(handle)
        })
    }

    /// set_transceiver copies the application-owned fields of `transceiver`
    /// into the one behind `handle`.
    pub fn set_transceiver(
        &mut self,
        handle: TransceiverHandle,
        transceiver: JsepTransceiver,
    ) -> Result<()> {
        self.transact("set_transceiver", |s| {
            s.transceivers
                .get_mut(handle)
                .ok_or_else(|| Error::invalid_state("stale transceiver handle"))?
                .merge_app_fields(transceiver)
        })
    }

    pub fn get_transceiver(&self, handle: TransceiverHandle) -> Option<&JsepTransceiver> {
        self.transceivers.get(handle)
    }

    /// get_transceivers lists the live transceivers in creation order.
    pub fn get_transceivers(&self) -> impl Iterator<Item = (TransceiverHandle, &JsepTransceiver)> {
        self.transceivers.iter()
    }

    /// check_negotiation_needed reports whether the transceivers differ
    /// from what the current descriptions say.
    pub fn check_negotiation_needed(&self) -> bool {
        self.check_negotiation_needed_internal()
    }

    /// restart_ice makes the next offer carry fresh ICE credentials.
    pub fn restart_ice(&mut self) {
        self.ice_restart_requested = true;
    }

    pub fn description(
        &self,
        side: DescriptionSide,
        slot: DescriptionSlot,
    ) -> Option<&RTCSessionDescription> {
        self.descriptions.get(side, slot)
    }

    pub fn current_local_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.local.current.as_ref()
    }

    pub fn pending_local_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.local.pending.as_ref()
    }

    /// local_description returns the pending local description if there is
    /// one, otherwise the current one.
    pub fn local_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.local.effective()
    }

    pub fn current_remote_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.remote.current.as_ref()
    }

    pub fn pending_remote_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.remote.pending.as_ref()
    }

    pub fn remote_description(&self) -> Option<&RTCSessionDescription> {
        self.descriptions.remote.effective()
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.signaling_state
    }

    /// last_error is the message of the last failed call, cleared by the
    /// next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn local_ice_credentials(&self) -> &IceCredentials {
        &self.ice
    }

    /// is_offerer reports whether this side made the offer of the exchange
    /// in progress, or of the last completed one.
    pub fn is_offerer(&self) -> bool {
        self.is_offerer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &JsepConfiguration {
        &self.config
    }
}
