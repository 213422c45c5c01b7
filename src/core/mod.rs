//! Core types: input model, decoder, encoder, screen, and device traits.

pub mod backend;
pub mod canvas;
pub mod decoder;
pub mod escape;
pub mod input_event;
pub mod key;
pub mod output;
pub mod screen;
pub mod terminal;
