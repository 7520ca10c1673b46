pub mod harness;
pub mod ws_transport;
