// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod config;
pub mod frame;
pub mod history;
pub mod render;
pub mod session;
pub mod stream;
