//! Transceivers and their storage.

pub(crate) mod arena;
pub mod direction;

use crate::codec::{Codec, RtpCodecKind};
use crate::error::{Error, Result};
use crate::track::{JsepTrack, TrackDirection};
use crate::transport::JsepTransport;
use direction::RTCRtpTransceiverDirection;

pub use arena::TransceiverHandle;

/// A send/receive pair bound to at most one m-section.
///
/// The application owns the direction, the send track and the stop flag.
/// Everything else is negotiation state maintained by
/// [`JsepSession`](crate::session::JsepSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsepTransceiver {
    pub(crate) kind: RtpCodecKind,
    pub(crate) send_track: JsepTrack,
    pub(crate) recv_track: JsepTrack,
    pub(crate) transport: JsepTransport,
    pub(crate) js_direction: RTCRtpTransceiverDirection,
    pub(crate) current_direction: Option<RTCRtpTransceiverDirection>,

    pub(crate) mid: Option<String>,
    pub(crate) level: Option<usize>,
    pub(crate) bundle_level: Option<usize>,

    pub(crate) stopped: bool,
    pub(crate) stopping: bool,
    pub(crate) add_track_magic: bool,
    pub(crate) only_exists_because_of_set_remote: bool,
    pub(crate) removed: bool,
    pub(crate) can_recycle_my_msection: bool,
}

impl JsepTransceiver {
    pub fn new(kind: RtpCodecKind, direction: RTCRtpTransceiverDirection) -> Self {
        JsepTransceiver {
            kind,
            send_track: JsepTrack::new(kind, TrackDirection::Send),
            recv_track: JsepTrack::new(kind, TrackDirection::Recv),
            transport: JsepTransport::default(),
            js_direction: direction,
            current_direction: None,
            mid: None,
            level: None,
            bundle_level: None,
            stopped: false,
            stopping: false,
            add_track_magic: false,
            only_exists_because_of_set_remote: false,
            removed: false,
            can_recycle_my_msection: false,
        }
    }

    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    pub fn direction(&self) -> RTCRtpTransceiverDirection {
        self.js_direction
    }

    pub fn set_direction(&mut self, direction: RTCRtpTransceiverDirection) {
        self.js_direction = direction;
    }

    /// Negotiated direction, None until the first answer is applied.
    pub fn current_direction(&self) -> Option<RTCRtpTransceiverDirection> {
        self.current_direction
    }

    pub fn send_track(&self) -> &JsepTrack {
        &self.send_track
    }

    pub fn send_track_mut(&mut self) -> &mut JsepTrack {
        &mut self.send_track
    }

    pub fn recv_track(&self) -> &JsepTrack {
        &self.recv_track
    }

    pub fn transport(&self) -> &JsepTransport {
        &self.transport
    }

    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn level(&self) -> Option<usize> {
        self.level
    }

    pub fn bundle_level(&self) -> Option<usize> {
        self.bundle_level
    }

    pub fn is_associated(&self) -> bool {
        self.mid.is_some()
    }

    pub fn has_level(&self) -> bool {
        self.level.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn has_add_track_magic(&self) -> bool {
        self.add_track_magic
    }

    pub fn only_exists_because_of_set_remote(&self) -> bool {
        self.only_exists_because_of_set_remote
    }

    pub fn can_recycle_my_msection(&self) -> bool {
        self.can_recycle_my_msection
    }

    /// stop starts stopping the transceiver. One that never got an
    /// m-section is stopped right away.
    pub fn stop(&mut self) {
        self.stopping = true;
        if self.level.is_none() {
            self.stopped = true;
        }
    }

    /// set_add_track_magic lets a remote offer claim this transceiver.
    pub fn set_add_track_magic(&mut self) {
        self.add_track_magic = true;
    }

    /// update_codecs edits the codec prototypes of both tracks.
    pub fn update_codecs<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Vec<Codec>),
    {
        f(&mut self.send_track.prototype_codecs);
        f(&mut self.recv_track.prototype_codecs);
    }

    /// Not bundled onto another transceiver's transport.
    pub(crate) fn has_own_transport(&self) -> bool {
        self.bundle_level.is_none() || self.bundle_level == self.level
    }

    pub(crate) fn disassociate(&mut self) {
        self.mid = None;
        self.level = None;
        self.bundle_level = None;
        self.transport = JsepTransport::default();
    }

    /// set_stopped finishes stopping; the m-section becomes recyclable.
    pub(crate) fn set_stopped(&mut self) {
        self.stopping = true;
        self.stopped = true;
        self.can_recycle_my_msection = true;
        self.transport.close();
        self.bundle_level = None;
    }

    /// merge_app_fields copies what the application may change from an
    /// edited copy of this transceiver.
    pub(crate) fn merge_app_fields(&mut self, other: JsepTransceiver) -> Result<()> {
        if other.kind != self.kind {
            return Err(Error::invalid_modification(format!(
                "cannot change transceiver kind from {} to {}",
                self.kind, other.kind
            )));
        }
        self.js_direction = other.js_direction;
        self.add_track_magic |= other.add_track_magic;
        // stopping is one-way
        if other.stopping && !self.stopping {
            self.stop();
        }

        let send = other.send_track;
        self.send_track.stream_ids = send.stream_ids;
        self.send_track.track_id = send.track_id;
        self.send_track.active = send.active;
        if self.send_track.rids != send.rids {
            self.send_track.rids = send.rids;
            self.send_track.ssrcs.clear();
            self.send_track.rtx_ssrcs.clear();
        }
        self.send_track.prototype_codecs = send.prototype_codecs;
        self.recv_track.prototype_codecs = other.recv_track.prototype_codecs;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transceiver_stop() {
        let mut t = JsepTransceiver::new(RtpCodecKind::Video, RTCRtpTransceiverDirection::Sendrecv);
        t.stop();
        assert!(t.is_stopping());
        assert!(t.is_stopped());

        let mut t = JsepTransceiver::new(RtpCodecKind::Video, RTCRtpTransceiverDirection::Sendrecv);
        t.level = Some(0);
        t.stop();
        assert!(t.is_stopping());
        assert!(!t.is_stopped());
    }

    #[test]
    fn test_transceiver_merge_app_fields() {
        let mut t = JsepTransceiver::new(RtpCodecKind::Audio, RTCRtpTransceiverDirection::Sendrecv);
        t.mid = Some("0".to_owned());
        t.level = Some(0);

        let mut edited = t.clone();
        edited.set_direction(RTCRtpTransceiverDirection::Recvonly);
        edited.send_track_mut().set_track_id("track");
        edited.send_track_mut().set_active(true);
        edited.mid = Some("7".to_owned());
        edited.level = Some(3);

        t.merge_app_fields(edited).unwrap();
        assert_eq!(t.direction(), RTCRtpTransceiverDirection::Recvonly);
        assert_eq!(t.send_track().track_id(), "track");
        assert!(t.send_track().is_active());
        assert_eq!(t.mid(), Some("0"));
        assert_eq!(t.level(), Some(0));

        let other = JsepTransceiver::new(RtpCodecKind::Video, RTCRtpTransceiverDirection::Sendrecv);
        assert_eq!(
            t.merge_app_fields(other).unwrap_err().kind(),
            crate::error::ErrorKind::InvalidModificationError
        );
    }
}
