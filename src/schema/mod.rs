//! Data types shared by the engine and its hosts.

pub mod message;
pub mod persona;
pub mod session;
