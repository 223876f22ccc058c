// SPDX-License-Identifier: MIT

//! Skyorg: 3DSky File Organizer
//!
//! Sorts downloaded 3DSky model archives into categorized folders using the
//! 3dsky.org catalog, merges organized trees, and serves a local web UI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fsops;
pub mod history;
pub mod merger;
pub mod model_id;
pub mod organizer;
pub mod progress;
pub mod summary;
pub mod web;

pub use config::AppConfig;
pub use error::{Result, SkyorgError};
