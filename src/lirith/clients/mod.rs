//! HTTP-backed implementations of the completion and scoring traits.
//!
//! Each submodule speaks one vendor's API while conforming to the uniform
//! [`ClientWrapper`](crate::client_wrapper::ClientWrapper) or
//! [`services`](crate::services) contracts.

pub mod common;

pub mod huggingface;
pub mod languagetool;
pub mod openai;
