//! Tests for the HTTP endpoints
//!
//! The transcription service is replaced by a local actix server bound to an
//! ephemeral port, and the encoder by `sh` running a throwaway script.

mod integration_tests;
