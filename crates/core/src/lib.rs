//! Murmur core library
//!
//! Looping background-sound tracks mixed onto a live audio stream.

pub mod domain;
