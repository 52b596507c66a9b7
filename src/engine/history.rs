// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Undo/redo over invertible [`Command`] values.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use super::Engine;
use crate::error::EngineError;
use crate::model::EntityRef;
use crate::ops::{Command, EngineEvent, GeometrySnapshot, Membership};

#[derive(Debug, Clone, Default)]
pub struct History {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    limit: usize,
    replaying: bool,
}

impl History {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Undoable entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Command> {
        self.undo.iter()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn push(&mut self, command: Command) {
        self.redo.clear();
        self.undo.push_back(command);
        while self.undo.len() > self.limit.max(1) {
            self.undo.pop_front();
        }
    }
}

impl Engine {
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.history.undo.clear();
        self.history.redo.clear();
        self.notify_history();
    }

    /// The undo stack as JSON, oldest entry first.
    pub fn history_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.history.undo)
    }

    /// Pushes a finished command. Ignored while an entry is being replayed.
    pub(crate) fn record(&mut self, command: Command) {
        if self.history.replaying {
            trace!(kind:? = command.kind(); "replaying, not recorded");
            return;
        }
        debug!(kind:? = command.kind(); "history entry recorded");
        self.history.push(command);
        self.notify_history();
    }

    fn notify_history(&mut self) {
        self.events.push(EngineEvent::HistoryChanged {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    /// Reverts the newest entry. Entries whose targets no longer exist are dropped and the
    /// next one is tried. Returns whether anything was reverted.
    pub fn undo(&mut self) -> bool {
        while let Some(command) = self.history.undo.pop_back() {
            match self.replay(&command.inverse()) {
                Ok(()) => {
                    self.history.redo.push(command);
                    self.notify_history();
                    return true;
                }
                Err(err) => warn!(kind:? = command.kind(), err:% = err; "undo entry skipped"),
            }
        }
        self.notify_history();
        false
    }

    pub fn redo(&mut self) -> bool {
        while let Some(command) = self.history.redo.pop() {
            match self.replay(&command) {
                Ok(()) => {
                    self.history.undo.push_back(command);
                    self.notify_history();
                    return true;
                }
                Err(err) => warn!(kind:? = command.kind(), err:% = err; "redo entry skipped"),
            }
        }
        self.notify_history();
        false
    }

    fn replay(&mut self, command: &Command) -> Result<(), EngineError> {
        self.history.replaying = true;
        let result = self.apply_command(command);
        self.history.replaying = false;
        self.commit();
        result
    }

    /// Applies one command without recording it. Fails with `NotFound` before mutating
    /// anything when its target is gone.
    fn apply_command(&mut self, command: &Command) -> Result<(), EngineError> {
        match command {
            Command::Move(record) | Command::MultiMove(record) | Command::Unlink(record) => {
                if !self.snapshot_alive(&record.after) {
                    let target = record
                        .targets
                        .first()
                        .cloned()
                        .ok_or_else(|| EngineError::constraint("move entry without targets"))?;
                    return Err(EngineError::not_found(target));
                }
                self.apply_snapshot(&record.after);
                Ok(())
            }
            Command::Add { record } => self.restore_entity(record),
            Command::Delete { record } => self.delete_raw(&record.entity_ref()).map(|_| ()),
            Command::Group { creation } => {
                let id = &creation.record.id;
                if self.groups.get(id).is_some() {
                    return Err(EngineError::invalid_topology(format!("{id} already exists")));
                }
                if !creation
                    .record
                    .group
                    .members()
                    .iter()
                    .any(|member| self.entity_exists(member))
                {
                    return Err(EngineError::not_found(id.clone()));
                }
                self.apply_group_creation(creation);
                Ok(())
            }
            Command::Dissolve { creation } => {
                if self.groups.get(&creation.record.id).is_none() {
                    return Err(EngineError::not_found(creation.record.id.clone()));
                }
                self.dissolve_group_creation(creation);
                Ok(())
            }
            Command::Ungroup { removed } => match removed.first() {
                Some(first) => self.ungroup_raw(&first.id).map(|_| ()),
                None => Ok(()),
            },
            Command::Regroup { removed } => {
                if let Some(present) = removed.iter().find(|r| self.groups.get(&r.id).is_some()) {
                    return Err(EngineError::invalid_topology(format!(
                        "{} already exists",
                        present.id
                    )));
                }
                for record in removed.iter().rev() {
                    self.restore_group(record);
                }
                Ok(())
            }
            Command::AddMember {
                group,
                member,
                index,
            } => {
                if self.groups.get(group).is_none() {
                    return Err(EngineError::not_found(group.clone()));
                }
                if !self.entity_exists(member) {
                    return Err(EngineError::not_found(member.clone()));
                }
                let membership = Membership {
                    group: group.clone(),
                    index: *index,
                };
                self.restore_memberships(member, std::slice::from_ref(&membership));
                Ok(())
            }
            Command::RemoveMember { group, member, .. } => {
                self.groups
                    .remove_member(group, member)
                    .ok_or_else(|| EngineError::not_found(member.clone()))?;
                self.pending.record_updated(EntityRef::Group(group.clone()));
                Ok(())
            }
            Command::SetAnchor {
                endpoint, after, ..
            } => self.set_anchor_raw(endpoint, after.clone()).map(|_| ()),
            Command::EdgeStyle { edge, after, .. } => {
                self.set_edge_style_raw(edge, *after).map(|_| ())
            }
            Command::FlipEdge { edge } => self.flip_edge_raw(edge),
            Command::HandleDistance {
                node, side, after, ..
            } => self.set_handle_distance_raw(node, *side, *after),
            Command::SetGroupFlags { group, after, .. } => {
                self.set_group_flags_raw(group, after.clone())
            }
            Command::SetVariant { node, after, .. } => {
                self.set_active_variant_raw(node, after.clone())?;
                self.derive_markers(node);
                Ok(())
            }
            Command::MarkerVisibility { marker, after, .. }
            | Command::MarkerMove { marker, after, .. } => {
                if self.set_marker_override_raw(marker, after.clone()) {
                    Ok(())
                } else {
                    Err(EngineError::not_found(marker.node.clone()))
                }
            }
            Command::Composite { commands } => {
                let mut applied = 0;
                let mut first_err = None;
                for step in commands {
                    match self.apply_command(step) {
                        Ok(()) => applied += 1,
                        Err(err) => {
                            debug!(kind:? = step.kind(), err:% = err; "composite step skipped");
                            first_err.get_or_insert(err);
                        }
                    }
                }
                match first_err {
                    Some(err) if applied == 0 => Err(err),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Whether at least one entity captured in `snapshot` still exists.
    fn snapshot_alive(&self, snapshot: &GeometrySnapshot) -> bool {
        snapshot
            .nodes
            .iter()
            .any(|(id, _)| self.store.node(id).is_some())
            || snapshot
                .edges
                .iter()
                .any(|(id, _, _)| self.store.edge(id).is_some())
            || snapshot
                .decorations
                .iter()
                .any(|(id, _)| self.store.decoration(id).is_some())
            || snapshot
                .markers
                .iter()
                .any(|(marker, _)| self.store.node(&marker.node).is_some())
    }
}
