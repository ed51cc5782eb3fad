// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: git mirrors, the origin tracker and the
//! remote issue tracker

mod http;
pub mod mirror;
pub mod origin;
pub mod sink;
pub mod traced;

#[cfg(test)]
mod test_server;

pub use mirror::{GitMirror, MirrorError, MirrorSource};
pub use origin::{OriginError, OriginSource, RedmineOrigin};
pub use sink::{CreatedItem, GithubSink, ItemSink, NewItem, SinkError};
pub use traced::{TracedMirror, TracedOrigin, TracedSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use mirror::{FakeMirror, MirrorCall};
#[cfg(any(test, feature = "test-support"))]
pub use origin::{FakeOrigin, OriginCall};
#[cfg(any(test, feature = "test-support"))]
pub use sink::{FakeSink, SinkCall};
