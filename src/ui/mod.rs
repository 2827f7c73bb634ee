//! Embeds y formato de respuestas.

pub mod embeds;
