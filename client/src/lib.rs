//! Pong client: a connected UDP transport and the session state machine that
//! joins a match, reports paddle movement and mirrors the server's snapshots.

pub mod network;
pub mod session;
