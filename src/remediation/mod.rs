// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Remediation artifact generation, execution and tracking.

pub mod playbook;
pub mod runner;
pub mod tracker;

pub use playbook::generate_playbook;
pub use runner::PlaybookRunner;
pub use tracker::{RemediationSummary, RemediationTracker};
