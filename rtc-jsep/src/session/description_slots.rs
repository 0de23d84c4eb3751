use std::fmt;

use super::sdp::session_description::RTCSessionDescription;

/// Which side produced a description.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptionSide {
    Local,
    Remote,
}

impl fmt::Display for DescriptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DescriptionSide::Local => write!(f, "local"),
            DescriptionSide::Remote => write!(f, "remote"),
        }
    }
}

/// Current descriptions come from the last completed exchange, pending
/// ones from the exchange in progress.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptionSlot {
    Current,
    Pending,
}

#[derive(Default, Debug, Clone)]
pub(crate) struct DescriptionPair {
    pub(crate) current: Option<RTCSessionDescription>,
    pub(crate) pending: Option<RTCSessionDescription>,
}

impl DescriptionPair {
    /// The pending description while there is one, else the current one.
    pub(crate) fn effective(&self) -> Option<&RTCSessionDescription> {
        self.pending.as_ref().or(self.current.as_ref())
    }

    pub(crate) fn slot(&self, slot: DescriptionSlot) -> Option<&RTCSessionDescription> {
        match slot {
            DescriptionSlot::Current => self.current.as_ref(),
            DescriptionSlot::Pending => self.pending.as_ref(),
        }
    }

    /// promote makes the pending description current.
    pub(crate) fn promote(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.current = Some(pending);
        }
    }

    pub(crate) fn each_mut(&mut self) -> impl Iterator<Item = &mut RTCSessionDescription> {
        self.current.iter_mut().chain(self.pending.iter_mut())
    }
}

#[derive(Default, Debug, Clone)]
pub(crate) struct Descriptions {
    pub(crate) local: DescriptionPair,
    pub(crate) remote: DescriptionPair,
}

impl Descriptions {
    pub(crate) fn side(&self, side: DescriptionSide) -> &DescriptionPair {
        match side {
            DescriptionSide::Local => &self.local,
            DescriptionSide::Remote => &self.remote,
        }
    }

    pub(crate) fn get(
        &self,
        side: DescriptionSide,
        slot: DescriptionSlot,
    ) -> Option<&RTCSessionDescription> {
        self.side(side).slot(slot)
    }

    pub(crate) fn clear_pending(&mut self) {
        self.local.pending = None;
        self.remote.pending = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::sdp::sdp_type::RTCSdpType;

    fn desc(sdp: &str) -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            sdp: sdp.to_owned(),
            parsed: None,
        }
    }

    #[test]
    fn test_description_pair() {
        let mut pair = DescriptionPair::default();
        assert!(pair.effective().is_none());

        pair.current = Some(desc("current"));
        assert_eq!(pair.effective().map(|d| d.sdp.as_str()), Some("current"));

        pair.pending = Some(desc("pending"));
        assert_eq!(pair.effective().map(|d| d.sdp.as_str()), Some("pending"));
        assert_eq!(pair.each_mut().count(), 2);

        pair.promote();
        assert!(pair.pending.is_none());
        assert_eq!(
            pair.slot(DescriptionSlot::Current).map(|d| d.sdp.as_str()),
            Some("pending")
        );
    }

    #[test]
    fn test_descriptions_get() {
        let mut descriptions = Descriptions::default();
        descriptions.remote.pending = Some(desc("remote"));

        assert!(descriptions
            .get(DescriptionSide::Local, DescriptionSlot::Pending)
            .is_none());
        assert!(descriptions
            .get(DescriptionSide::Remote, DescriptionSlot::Pending)
            .is_some());

        descriptions.clear_pending();
        assert!(descriptions.remote.effective().is_none());
    }
}
