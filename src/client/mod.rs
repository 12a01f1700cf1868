//! Client-side mirror of weapon state and the presentation derived from it.
//! Nothing here writes back to the server.

pub mod aim;
pub mod presentation;
pub mod replica;
pub mod urgency;
