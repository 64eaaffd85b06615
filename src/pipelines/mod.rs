// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Frame source │ ──▶ │  Preview          │ ──▶ │ ProcessedFrame   │
//! │              │     │  - throttle       │     │ stream + latest  │
//! │              │     │  - in-flight gate │     │                  │
//! └──────────────┘     └───────────────────┘     └────────┬─────────┘
//!                                                         │
//!                      ┌───────────────────┐     ┌────────▼─────────┐
//!                      │  Photo sink       │ ◀── │  Photo capture   │
//!                      │  (JPEG / PNG)     │     │  - aspect crop   │
//!                      └───────────────────┘     └──────────────────┘
//! ```

pub mod photo;
pub mod preview;
