//! HTTP client for the chunk receiver service.
//!
//! The receiver exposes four operations under one base URL:
//! `POST /upload_chunk`, `POST /complete`, `GET /status` and `POST /reset`.
//! This crate resolves those URLs and performs single exchanges with them;
//! retry and resume policy live in `chunkrelay-upload`.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{Client, Error};
pub use endpoints::ReceiverEndpoints;
pub use types::{StatusResponse, UploadOutcome};
