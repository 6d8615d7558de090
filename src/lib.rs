// labelrelay: authenticated label emission relay for a Bluesky labeler
//
// This is the library root. The binary in main.rs wires these together:
// config -> authority -> web, with classifier feeding the emit client.

pub mod authority;
pub mod classifier;
pub mod config;
pub mod emitter;
pub mod labels;
pub mod web;
