//! Integration tests for the synchronization engine
//!
//! The engine is exercised against in-memory fakes of all three ports, so
//! every state transition of init/status/pull/push can be asserted without a
//! database, a server or the geodiff binary.

mod common;

mod test_pull;
mod test_push;
