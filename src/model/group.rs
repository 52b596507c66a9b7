// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::entity::EntityRef;

/// Display flags of a group's bounding outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFlags {
    #[serde(default = "default_outline")]
    pub outline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<SmolStr>,
}

fn default_outline() -> bool {
    true
}

impl Default for GroupFlags {
    fn default() -> Self {
        Self {
            outline: true,
            label: None,
        }
    }
}

/// Ordered composition of nodes, edges, decorations and other groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    members: Vec<EntityRef>,
    #[serde(default)]
    flags: GroupFlags,
}

impl Group {
    pub fn new(members: Vec<EntityRef>) -> Self {
        Self {
            members,
            flags: GroupFlags::default(),
        }
    }

    pub fn members(&self) -> &[EntityRef] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut Vec<EntityRef> {
        &mut self.members
    }

    pub fn contains(&self, member: &EntityRef) -> bool {
        self.members.contains(member)
    }

    pub fn flags(&self) -> &GroupFlags {
        &self.flags
    }

    pub(crate) fn set_flags(&mut self, flags: GroupFlags) {
        self.flags = flags;
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
