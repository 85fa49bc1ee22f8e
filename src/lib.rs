// Copyright 2026 Snipsave Contributors
// SPDX-License-Identifier: Apache-2.0

//! Snipsave library — Save-button companion for AI chat pages.
//!
//! This library crate exposes the core modules for integration testing.

#![allow(dead_code, unused_imports, clippy::new_without_default)]

pub mod augment;
pub mod browser;
pub mod cli;
pub mod error;
pub mod events;
pub mod export;
pub mod extract;
pub mod hosts;
pub mod page;
pub mod scan;
pub mod watch;
