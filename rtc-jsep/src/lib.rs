//! # rtc-jsep - Sans-I/O JSEP Negotiation
//!
//! The offer/answer half of a WebRTC peer connection, without any I/O.
//! A [`JsepSession`](session::JsepSession) turns transceivers into SDP offers
//! and answers, applies the descriptions exchanged with the peer and tracks
//! what was negotiated: mids and levels, payload types, header extension
//! ids, BUNDLE groups, ICE credentials and DTLS roles.
//!
//! Nothing here opens a socket or a timer. Signaling is up to you, and the
//! negotiated [`JsepTransport`](transport::JsepTransport) of every
//! transceiver tells your ICE and DTLS layers what to do.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use rtc_jsep::codec::RtpCodecKind;
//! use rtc_jsep::configuration::JsepConfigurationBuilder;
//! use rtc_jsep::rtp_transceiver::direction::RTCRtpTransceiverDirection;
//! use rtc_jsep::rtp_transceiver::JsepTransceiver;
//! use rtc_jsep::session::sdp::sdp_type::RTCSdpType;
//! use rtc_jsep::session::state::signaling_state::RTCSignalingState;
//! use rtc_jsep::session::JsepSession;
//!
//! # fn example() -> rtc_jsep::Result<()> {
//! let config = Arc::new(JsepConfigurationBuilder::new().build());
//! let mut alice = JsepSession::new("alice", Arc::clone(&config));
//! let mut bob = JsepSession::new("bob", config);
//!
//! let mut video = JsepTransceiver::new(RtpCodecKind::Video, RTCRtpTransceiverDirection::Sendrecv);
//! video.send_track_mut().set_active(true);
//! video.send_track_mut().set_stream_ids(&["stream"]);
//! video.send_track_mut().set_track_id("camera");
//! alice.add_transceiver(video)?;
//!
//! let offer = alice.create_offer(None)?;
//! alice.set_local_description(RTCSdpType::Offer, &offer.sdp)?;
//! bob.set_remote_description(RTCSdpType::Offer, &offer.sdp)?;
//!
//! let answer = bob.create_answer(None)?;
//! bob.set_local_description(RTCSdpType::Answer, &answer.sdp)?;
//! alice.set_remote_description(RTCSdpType::Answer, &answer.sdp)?;
//!
//! assert_eq!(alice.signaling_state(), RTCSignalingState::Stable);
//! for (_, t) in bob.get_transceivers() {
//!     println!("{:?} {:?}", t.mid(), t.current_direction());
//! }
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Failure semantics
//!
//! Every call on a session either completes or leaves the session exactly
//! as it was, except for [`last_error`](session::JsepSession::last_error).
//! Errors are classified by [`ErrorKind`].

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub use sdp;

pub mod codec;
pub mod configuration;
pub mod error;
pub mod rtp_transceiver;
pub mod session;
pub mod track;
pub mod transport;

pub use error::{Error, ErrorKind, Result};
pub use session::JsepSession;
