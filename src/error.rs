// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Error types.
//!
//! [`EngineError`] is handled by the engine itself and degrades to a no-op; it is returned so
//! callers and tests can see what was skipped. [`LoadError`] is the only failure that keeps an
//! engine from existing.

use thiserror::Error;

use crate::model::{EndpointRef, EntityRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("entity not found ({entity})")]
    NotFound { entity: EntityRef },
    #[error("invalid topology: {reason}")]
    InvalidTopology { reason: String },
    #[error("constraint violation: {reason}")]
    ConstraintViolation { reason: String },
    #[error("cascade step already absent: {step}")]
    StructuralCascadeFailure { step: String },
    #[error("edge chain through {endpoint} cycles back to itself")]
    CycleDetected { endpoint: EndpointRef },
}

impl EngineError {
    pub fn not_found(entity: impl Into<EntityRef>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn invalid_topology(reason: impl Into<String>) -> Self {
        Self::InvalidTopology {
            reason: reason.into(),
        }
    }

    pub fn constraint(reason: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A malformed initial snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("duplicate id {entity}")]
    DuplicateId { entity: EntityRef },
    #[error("{owner} references missing {missing}")]
    DanglingReference { owner: EntityRef, missing: EntityRef },
    #[error("node {entity} has a non-finite or negative-size rect")]
    InvalidRect { entity: EntityRef },
    #[error("group membership cycles through {entity}")]
    GroupCycle { entity: EntityRef },
    #[error("edge chain cycles through {endpoint}")]
    ChainCycle { endpoint: EndpointRef },
}
