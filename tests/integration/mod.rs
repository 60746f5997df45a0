//! Integration tests for ratevis
//!
//! Each test starts its own server in-process on ephemeral ports (API and
//! internal) and drives it over HTTP with reqwest. The limiter runs with a
//! single global partition so every request from the test shares one key.

mod helpers;

mod admission;
mod api;
mod internal_server;
mod mirror;
mod simulator;
