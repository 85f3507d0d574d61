// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent skill catalog and its rollback safety net.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod library;
mod optimize;
mod rollback;

pub use library::{
    AddObserver, BlacklistEntry, FailureDisposition, LibraryConfig, LibraryError, SkillLibrary,
    MAX_RETRIES,
};
pub use optimize::SkillOptimizer;
#[cfg(any(test, feature = "test-support"))]
pub use optimize::RecordingOptimizer;
pub use rollback::{RollbackManager, SkillHealth, MIN_TRIALS, ROLLBACK_THRESHOLD};
