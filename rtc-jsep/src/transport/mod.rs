//! Transport bookkeeping.
//!
//! A [`JsepTransport`] records what negotiation decided about the ICE and
//! DTLS transport of one m-section. Bundled transceivers hold equal copies
//! carrying the tag's transport id.

pub mod dtls;
pub mod ice;

use dtls::JsepDtlsTransport;
use ice::JsepIceTransport;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct JsepTransport {
    pub transport_id: String,
    /// 0 for a disabled transport, 1 with rtcp-mux, 2 without.
    pub components: usize,
    pub local_ufrag: String,
    pub local_pwd: String,
    pub ice: Option<JsepIceTransport>,
    pub dtls: Option<JsepDtlsTransport>,
}

impl JsepTransport {
    pub fn is_enabled(&self) -> bool {
        self.components > 0
    }

    /// close disables the transport and drops everything negotiated on it.
    /// The id is kept so that a later re-enable can be told apart.
    pub(crate) fn close(&mut self) {
        self.components = 0;
        self.ice = None;
        self.dtls = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transport_close() {
        let mut transport = JsepTransport {
            transport_id: "transport_0".to_owned(),
            components: 1,
            ice: Some(JsepIceTransport::default()),
            dtls: Some(JsepDtlsTransport::default()),
            ..Default::default()
        };
        assert!(transport.is_enabled());

        transport.close();
        assert!(!transport.is_enabled());
        assert!(transport.ice.is_none());
        assert!(transport.dtls.is_none());
        assert_eq!(transport.transport_id, "transport_0");
    }
}
