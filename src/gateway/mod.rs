//! The request-routing, proxying, and streaming usage-observation
//! pipeline (spec §2): gateway middleware (§4.6) wires the forwarder
//! transformer (§4.7) and the streaming usage observer (§4.8) around
//! the path parser and provider router.

pub mod forwarder;
pub mod handler;
pub mod observer;

pub use handler::{handle, GatewayState};
