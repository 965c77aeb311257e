//! Blind Date Engine: staged conversations with scripted AI personas.
//!
//! A session runs a short date with one persona. Each user line is answered
//! by a language model backend when one is configured, or by scripted
//! fallback content otherwise, and the date ends in a reveal once enough
//! turns have passed.

pub mod config;
pub mod core;
pub mod providers;
pub mod schema;
