pub mod signaling_state;
