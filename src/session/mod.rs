// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session orchestration: state machine, approval gate, registry.

pub mod registry;
pub mod runner;
pub mod state;

pub use registry::SessionRegistry;
pub use runner::{new_session, SessionDriver, SessionHandle, SessionTiming};
pub use state::{
    Decision, FindingSummary, PendingApproval, Phase, SessionConfig, SessionState, SessionView,
};
