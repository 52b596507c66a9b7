// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::geometry::Rect;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<SmolStr>,
}

/// Free-standing text or shape, not tied to any node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    rect: Rect,
    #[serde(default)]
    style: DecorationStyle,
}

impl Decoration {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            style: DecorationStyle::default(),
        }
    }

    pub fn with_style(mut self, style: DecorationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn style(&self) -> &DecorationStyle {
        &self.style
    }
}
