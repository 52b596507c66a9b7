// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nested groups over nodes, edges, decorations and other groups.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use log::debug;

use super::traverse::depth_first;
use super::Engine;
use crate::error::EngineError;
use crate::model::{EdgeEnd, EntityRef, Group, GroupFlags, GroupId, Rect};
use crate::ops::{Command, GroupCreation, GroupRecord, Membership};

#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    groups: IndexMap<GroupId, Group>,
    bounds: BTreeMap<GroupId, Option<Rect>>,
}

impl GroupTable {
    pub fn get(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &Group)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Cached padded bounding box, refreshed after every mutation.
    pub fn bounds(&self, id: &GroupId) -> Option<Rect> {
        self.bounds.get(id).copied().flatten()
    }

    /// Groups that list `member` directly.
    pub fn parents_of(&self, member: &EntityRef) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|(_, group)| group.contains(member))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn memberships_of(&self, member: &EntityRef) -> Vec<Membership> {
        self.groups
            .iter()
            .filter_map(|(id, group)| {
                group
                    .members()
                    .iter()
                    .position(|candidate| candidate == member)
                    .map(|index| Membership {
                        group: id.clone(),
                        index,
                    })
            })
            .collect()
    }

    /// Outermost group reached by climbing first parents from `member`.
    pub fn root_of(&self, member: &EntityRef) -> Option<GroupId> {
        let chain = depth_first([member.clone()], |current, out| {
            if let Some(parent) = self.parents_of(current).into_iter().next() {
                out.push(EntityRef::Group(parent));
            }
        });
        chain.into_iter().skip(1).last().and_then(|entity| match entity {
            EntityRef::Group(id) => Some(id),
            _ => None,
        })
    }

    /// Every entity reachable below `group`, nested groups included, in depth-first order.
    /// A group only appears among its own descendants when membership is cyclic.
    pub fn descendants(&self, group: &GroupId) -> Vec<EntityRef> {
        let roots = self
            .groups
            .get(group)
            .map(|g| g.members().to_vec())
            .unwrap_or_default();
        depth_first(roots, |current, out| {
            if let Some(members) = current.as_group().and_then(|id| self.groups.get(id)) {
                out.extend(members.members().iter().cloned());
            }
        })
    }

    pub fn is_descendant(&self, ancestor: &GroupId, entity: &EntityRef) -> bool {
        self.descendants(ancestor).contains(entity)
    }

    /// Leaf (non-group) members of `group`, flattened depth-first.
    pub fn collect_leaves(&self, group: &GroupId) -> Vec<EntityRef> {
        self.descendants(group)
            .into_iter()
            .filter(|entity| !matches!(entity, EntityRef::Group(_)))
            .collect()
    }

    /// The member of `group` that is, or contains, `entity`.
    pub fn direct_child_containing(&self, group: &GroupId, entity: &EntityRef) -> Option<EntityRef> {
        let members = self.groups.get(group)?.members();
        if members.contains(entity) {
            return Some(entity.clone());
        }
        members
            .iter()
            .find(|member| {
                member
                    .as_group()
                    .is_some_and(|child| self.is_descendant(child, entity))
            })
            .cloned()
    }

    pub(crate) fn insert(&mut self, id: GroupId, group: Group) {
        self.bounds.remove(&id);
        self.groups.insert(id, group);
    }

    pub(crate) fn remove(&mut self, id: &GroupId) -> Option<Group> {
        self.bounds.remove(id);
        self.groups.shift_remove(id)
    }

    pub(crate) fn insert_member(&mut self, membership: &Membership, member: EntityRef) -> bool {
        let Some(group) = self.groups.get_mut(&membership.group) else {
            return false;
        };
        if group.contains(&member) {
            return false;
        }
        let members = group.members_mut();
        let index = membership.index.min(members.len());
        members.insert(index, member);
        true
    }

    pub(crate) fn remove_member(&mut self, group: &GroupId, member: &EntityRef) -> Option<usize> {
        let members = self.groups.get_mut(group)?.members_mut();
        let index = members.iter().position(|candidate| candidate == member)?;
        members.remove(index);
        Some(index)
    }

    pub(crate) fn set_flags(&mut self, id: &GroupId, flags: GroupFlags) -> bool {
        match self.groups.get_mut(id) {
            Some(group) => {
                group.set_flags(flags);
                true
            }
            None => false,
        }
    }

    /// Stores a freshly computed box; returns whether it changed.
    fn cache_bounds(&mut self, id: &GroupId, bounds: Option<Rect>) -> bool {
        self.bounds.insert(id.clone(), bounds) != Some(bounds)
    }
}

impl Engine {
    pub fn groups(&self) -> &GroupTable {
        &self.groups
    }

    /// Groups at least two existing members. When every member sits in the same single
    /// parent, the new group takes their place there.
    pub fn create_group(&mut self, members: &[EntityRef]) -> Result<GroupId, EngineError> {
        let mut unique: Vec<EntityRef> = Vec::new();
        for member in members {
            if !unique.contains(member) {
                unique.push(member.clone());
            }
        }
        if unique.len() < 2 {
            return Err(EngineError::constraint("a group needs at least two members"));
        }
        for member in &unique {
            if !member.is_groupable() {
                return Err(EngineError::constraint(format!("{member} cannot be grouped")));
            }
            if !self.entity_exists(member) {
                return Err(EngineError::not_found(member.clone()));
            }
        }

        let parent_sets: Vec<Vec<GroupId>> = unique
            .iter()
            .map(|member| self.groups.parents_of(member))
            .collect();
        let common = match parent_sets.first() {
            Some(first) if first.len() == 1 && parent_sets.iter().all(|set| set == first) => {
                first.first().cloned()
            }
            _ => None,
        };

        let id = self.fresh_group_id();
        let mut displaced = Vec::new();
        let mut memberships = Vec::new();
        if let Some(parent) = &common {
            for member in &unique {
                if let Some(found) = self
                    .groups
                    .memberships_of(member)
                    .into_iter()
                    .find(|m| &m.group == parent)
                {
                    displaced.push((member.clone(), found));
                }
            }
            let index = displaced.iter().map(|(_, m)| m.index).min().unwrap_or(0);
            memberships.push(Membership {
                group: parent.clone(),
                index,
            });
        }

        let creation = GroupCreation {
            record: GroupRecord {
                id: id.clone(),
                group: Group::new(unique),
                memberships,
            },
            displaced,
        };
        self.apply_group_creation(&creation);
        self.commit();
        self.record(Command::Group { creation });
        Ok(id)
    }

    pub(crate) fn apply_group_creation(&mut self, creation: &GroupCreation) {
        let mut displaced = creation.displaced.clone();
        displaced.sort_by(|a, b| b.1.index.cmp(&a.1.index));
        for (member, membership) in &displaced {
            self.groups.remove_member(&membership.group, member);
        }
        self.restore_group(&creation.record);
    }

    pub(crate) fn dissolve_group_creation(&mut self, creation: &GroupCreation) {
        let id = &creation.record.id;
        let entity = EntityRef::Group(id.clone());
        for parent in self.groups.parents_of(&entity) {
            self.groups.remove_member(&parent, &entity);
            self.pending.record_updated(EntityRef::Group(parent));
        }
        self.groups.remove(id);
        self.pending.record_removed(entity.clone());
        self.forget_selected(&entity);

        let mut displaced = creation.displaced.clone();
        displaced.sort_by(|a, b| a.1.index.cmp(&b.1.index));
        for (member, membership) in displaced {
            self.groups.insert_member(&membership, member);
        }
    }

    /// Removes a group; parents left empty are removed too, recursively.
    pub fn ungroup(&mut self, id: &GroupId) -> Result<Vec<GroupId>, EngineError> {
        let removed = self.ungroup_raw(id)?;
        let ids = removed.iter().map(|record| record.id.clone()).collect();
        self.commit();
        self.record(Command::Ungroup { removed });
        Ok(ids)
    }

    pub(crate) fn ungroup_raw(&mut self, id: &GroupId) -> Result<Vec<GroupRecord>, EngineError> {
        if self.groups.get(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }
        let entity = EntityRef::Group(id.clone());
        let memberships = self.detach_from_parents(&entity);
        let parents: Vec<GroupId> = memberships.iter().map(|m| m.group.clone()).collect();
        let group = self
            .groups
            .remove(id)
            .ok_or_else(|| EngineError::StructuralCascadeFailure {
                step: format!("remove group {id}"),
            })?;
        self.pending.record_removed(entity.clone());
        self.forget_selected(&entity);
        debug!(group:% = id, members = group.members().len(); "ungrouped");

        let mut removed = vec![GroupRecord {
            id: id.clone(),
            group,
            memberships,
        }];
        removed.extend(self.remove_empty_groups(parents));
        Ok(removed)
    }

    fn detach_from_parents(&mut self, member: &EntityRef) -> Vec<Membership> {
        let mut memberships = Vec::new();
        for parent in self.groups.parents_of(member) {
            if let Some(index) = self.groups.remove_member(&parent, member) {
                self.pending.record_updated(EntityRef::Group(parent.clone()));
                memberships.push(Membership {
                    group: parent,
                    index,
                });
            }
        }
        memberships
    }

    /// Removes every group in `candidates` that is empty, walking up to parents that empty
    /// out in turn. Returns the removed groups in removal order.
    pub(crate) fn remove_empty_groups(&mut self, candidates: Vec<GroupId>) -> Vec<GroupRecord> {
        let mut removed = Vec::new();
        let mut queue = candidates;
        while let Some(id) = queue.pop() {
            let Some(group) = self.groups.get(&id) else {
                debug!(group:% = id; "cascade step skipped, group already gone");
                continue;
            };
            if !group.is_empty() {
                continue;
            }
            let entity = EntityRef::Group(id.clone());
            let memberships = self.detach_from_parents(&entity);
            queue.extend(memberships.iter().map(|m| m.group.clone()));
            if let Some(group) = self.groups.remove(&id) {
                self.pending.record_removed(entity.clone());
                self.forget_selected(&entity);
                debug!(group:% = id; "empty group removed");
                removed.push(GroupRecord {
                    id,
                    group,
                    memberships,
                });
            }
        }
        removed
    }

    /// Removes `member` from every group and cascades empty groups away.
    pub(crate) fn remove_from_all_groups(
        &mut self,
        member: &EntityRef,
    ) -> (Vec<Membership>, Vec<GroupRecord>) {
        let memberships = self.detach_from_parents(member);
        let parents = memberships.iter().map(|m| m.group.clone()).collect();
        let emptied = self.remove_empty_groups(parents);
        (memberships, emptied)
    }

    pub(crate) fn restore_group(&mut self, record: &GroupRecord) {
        let entity = EntityRef::Group(record.id.clone());
        self.groups.insert(record.id.clone(), record.group.clone());
        self.pending.record_added(entity.clone());
        self.restore_memberships(&entity, &record.memberships);
    }

    pub(crate) fn restore_memberships(&mut self, member: &EntityRef, memberships: &[Membership]) {
        for membership in memberships {
            if self.groups.insert_member(membership, member.clone()) {
                self.pending
                    .record_updated(EntityRef::Group(membership.group.clone()));
            } else {
                debug!(group:% = membership.group, member:% = member; "membership not restored");
            }
        }
    }

    /// Depth-first flatten to leaf members.
    pub fn collect_members(&self, id: &GroupId) -> Result<Vec<EntityRef>, EngineError> {
        if self.groups.get(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }
        Ok(self.groups.collect_leaves(id))
    }

    /// Bounding rect over the current leaf positions, or `None` when nothing is positioned.
    pub fn compute_bounding_box(&self, id: &GroupId, padding: f64) -> Option<Rect> {
        self.groups
            .collect_leaves(id)
            .iter()
            .filter_map(|leaf| self.leaf_bounds(leaf))
            .reduce(|a, b| a.merge(&b))
            .map(|rect| rect.pad(padding))
    }

    fn leaf_bounds(&self, leaf: &EntityRef) -> Option<Rect> {
        match leaf {
            EntityRef::Node(id) => self.store.node(id).map(|node| node.rect()),
            EntityRef::Decoration(id) => self.store.decoration(id).map(|d| d.rect()),
            EntityRef::Edge(id) => self.store.edge(id).map(|edge| {
                Rect::spanning(
                    edge.endpoint(EdgeEnd::Start).rendered(),
                    edge.endpoint(EdgeEnd::End).rendered(),
                )
            }),
            EntityRef::Group(_) | EntityRef::Marker(_) => None,
        }
    }

    /// Translates every leaf of the group: nodes move with their attachments, free edge
    /// endpoints and decorations move directly.
    pub fn move_members(&mut self, id: &GroupId, dx: f64, dy: f64) -> Result<(), EngineError> {
        if self.groups.get(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }
        let targets = vec![EntityRef::Group(id.clone())];
        let leaves = self.leaves_of(&targets);
        let before = self.capture(&leaves);
        for leaf in &leaves {
            self.move_leaf_raw(leaf, dx, dy);
        }
        self.commit();
        let after = self.capture(&leaves);
        self.record_move(targets, before, after);
        Ok(())
    }

    /// Adds `member` at the end of `group`. Rejects membership cycles.
    pub fn add_to_group(&mut self, group: &GroupId, member: EntityRef) -> Result<(), EngineError> {
        let Some(target) = self.groups.get(group) else {
            return Err(EngineError::not_found(group.clone()));
        };
        if !member.is_groupable() || !self.entity_exists(&member) {
            return Err(EngineError::not_found(member));
        }
        if target.contains(&member) {
            return Err(EngineError::constraint(format!("{member} already in {group}")));
        }
        if let EntityRef::Group(child) = &member {
            if child == group || self.groups.is_descendant(child, &EntityRef::Group(group.clone()))
            {
                return Err(EngineError::invalid_topology(format!(
                    "adding {member} to {group} would form a cycle"
                )));
            }
        }

        let index = target.members().len();
        self.groups.insert_member(
            &Membership {
                group: group.clone(),
                index,
            },
            member.clone(),
        );
        self.pending.record_updated(EntityRef::Group(group.clone()));
        self.commit();
        self.record(Command::AddMember {
            group: group.clone(),
            member,
            index,
        });
        Ok(())
    }

    pub fn set_group_flags(&mut self, id: &GroupId, flags: GroupFlags) -> Result<(), EngineError> {
        let Some(before) = self.groups.get(id).map(|group| group.flags().clone()) else {
            return Err(EngineError::not_found(id.clone()));
        };
        if before == flags {
            return Ok(());
        }
        self.set_group_flags_raw(id, flags.clone())?;
        self.commit();
        self.record(Command::SetGroupFlags {
            group: id.clone(),
            before,
            after: flags,
        });
        Ok(())
    }

    pub(crate) fn set_group_flags_raw(
        &mut self,
        id: &GroupId,
        flags: GroupFlags,
    ) -> Result<(), EngineError> {
        if !self.groups.set_flags(id, flags) {
            return Err(EngineError::not_found(id.clone()));
        }
        self.pending.record_updated(EntityRef::Group(id.clone()));
        Ok(())
    }

    /// Recomputes every group box, reporting the ones that changed.
    pub(crate) fn refresh_group_bounds(&mut self) {
        let ids: Vec<GroupId> = self.groups.iter().map(|(id, _)| id.clone()).collect();
        for id in ids {
            let bounds = self.compute_bounding_box(&id, self.config.group_padding);
            if self.groups.cache_bounds(&id, bounds) {
                self.pending.record_updated(EntityRef::Group(id));
            }
        }
    }

    pub fn enter_group_edit(&mut self, id: &GroupId) -> Result<(), EngineError> {
        if self.groups.get(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }
        debug!(group:% = id; "entering group edit");
        self.group_edit = Some(id.clone());
        Ok(())
    }

    pub fn exit_group_edit(&mut self) {
        if let Some(id) = self.group_edit.take() {
            debug!(group:% = id; "leaving group edit");
        }
    }

    pub fn editing_group(&self) -> Option<&GroupId> {
        self.group_edit.as_ref()
    }

    fn fresh_group_id(&mut self) -> GroupId {
        loop {
            self.next_id += 1;
            let id = GroupId::generated("g", self.next_id);
            if self.groups.get(&id).is_none() {
                return id;
            }
        }
    }

    pub(crate) fn entity_exists(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Group(id) => self.groups.get(id).is_some(),
            other => self.store.contains(other),
        }
    }

    /// Groups whose membership reaches back to themselves.
    pub(crate) fn group_cycles(&self) -> BTreeSet<GroupId> {
        self.groups
            .iter()
            .filter(|(id, _)| self.groups.is_descendant(id, &EntityRef::Group((*id).clone())))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
