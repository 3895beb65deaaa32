//! A distributed counting semaphore backed by Redis.
//!
//! State lives entirely in the store: independent processes, with no direct communication,
//! coordinate so that at most N holders concurrently occupy a named resource. See
//! [`semaphore`] for the client façade, the scoped permit, and the auto-renewer.

#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

pub mod semaphore;
