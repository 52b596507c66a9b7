// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pathway Canvas: an interactive editing engine for biological pathway diagrams.
//!
//! Protein boxes, interaction edges, groups, decorations and modification markers live in one
//! [`Engine`]. Hosts feed it input events or call its operations directly, then drain
//! [`Engine::take_deltas`] for redraws and [`Engine::take_events`] for persistence.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod ops;
pub mod store;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, LoadError};
