//! `kitroom-api` — HTTP delivery layer.
//!
//! Thin pass-through over the store services: request decoding, error
//! mapping, nothing else. Authorization is a deployment concern handled in
//! front of this service; handlers trust the caller-supplied employee id.

pub mod app;
