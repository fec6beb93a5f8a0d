//! Authoritative Pong server: a UDP transport pump feeding a matchmaking
//! dispatcher, which seats peers two at a time into simulation arenas.

pub mod arena;
pub mod dispatcher;
pub mod network;
pub mod physics;
