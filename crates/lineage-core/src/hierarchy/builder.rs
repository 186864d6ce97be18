//! Hierarchy Builder: links normalized records into root trees.
//!
//! ## Algorithm
//!
//! 1. Index records by the parent contract number they declare.
//! 2. Roots are records without a parent reference, plus records whose
//!    parent reference matches no known contract number.
//! 3. Depth-first from each root, a record claims its own contract number
//!    and receives every record that references it as children.
//! 4. A child whose contract number already appears on the current path is
//!    a cycle: it is dropped and reported.
//! 5. A record whose contract number was already claimed by an earlier
//!    record keeps no children and is reported as an ambiguous claim.
//! 6. Records never reached from a root hang off a parent-reference loop.
//!    They are grouped per loop, excluded, and reported.
//!
//! Roots and siblings are ordered by [`sibling_order`], and traversal
//! follows that order, so "first claimant" is deterministic.

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::types::ContractRecord;

use super::arena::{NodeId, RecordArena};
use super::sibling_order;

/// Where a record ended up after traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Unvisited,
    Placed,
    /// Excluded because of the cycle at this index
    Excluded(usize),
}

/// A parent-reference loop and the records dropped because of it.
struct CycleReport {
    cycle: Vec<String>,
    record_ids: Vec<String>,
}

/// Result of a build pass.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// Root records with their subtrees attached, in sibling order
    pub roots: Vec<ContractRecord>,

    /// Unresolved references, cycles and ambiguous claims found while linking
    pub diagnostics: Vec<Diagnostic>,
}

/// Links a flat record collection into a forest.
pub struct HierarchyBuilder {
    arena: RecordArena,
}

impl HierarchyBuilder {
    pub fn new(records: Vec<ContractRecord>) -> Self {
        let mut arena = RecordArena::with_capacity(records.len());
        for record in records {
            arena.insert(record);
        }
        Self { arena }
    }

    /// Link every record and export the resulting root trees.
    pub fn build(mut self) -> Hierarchy {
        let count = self.arena.len();
        let mut diagnostics = Vec::new();

        // contract number -> records carrying it, in input order
        let mut owners: HashMap<String, Vec<NodeId>> = HashMap::new();
        // contract number -> records declaring it as their parent
        let mut claimants: HashMap<String, Vec<NodeId>> = HashMap::new();

        for id in 0..count {
            let record = self.arena.get(id);
            if let Some(number) = &record.contract_number {
                owners.entry(number.clone()).or_default().push(id);
            }
            if let Some(parent) = &record.parent_contract_number {
                claimants.entry(parent.clone()).or_default().push(id);
            }
        }
        for list in claimants.values_mut() {
            self.sort_nodes(list);
        }

        let mut roots = Vec::new();
        for id in 0..count {
            let record = self.arena.get(id);
            match &record.parent_contract_number {
                None => roots.push(id),
                Some(parent) if !owners.contains_key(parent) => {
                    diagnostics.push(Diagnostic::UnresolvedParentReference {
                        record_id: record.id.clone(),
                        parent_contract_number: parent.clone(),
                    });
                    roots.push(id);
                }
                Some(_) => {}
            }
        }
        self.sort_nodes(&mut roots);

        let mut placement = vec![Placement::Unvisited; count];
        let mut claimed: HashMap<String, NodeId> = HashMap::new();
        let mut cycles: Vec<CycleReport> = Vec::new();

        for &root in &roots {
            self.attach_from(
                root,
                &claimants,
                &mut claimed,
                &mut placement,
                &mut cycles,
                &mut diagnostics,
            );
        }

        self.collect_unreachable(&owners, &mut placement, &mut cycles);

        diagnostics.extend(cycles.into_iter().map(|c| Diagnostic::CycleDetected {
            cycle: c.cycle,
            record_ids: c.record_ids,
        }));

        let roots = roots.iter().map(|&root| self.arena.export(root)).collect();
        Hierarchy { roots, diagnostics }
    }

    fn sort_nodes(&self, nodes: &mut [NodeId]) {
        nodes.sort_by(|&a, &b| sibling_order(self.arena.get(a), self.arena.get(b)));
    }

    /// Depth-first attachment from one root, guarding the ancestor path.
    fn attach_from(
        &mut self,
        root: NodeId,
        claimants: &HashMap<String, Vec<NodeId>>,
        claimed: &mut HashMap<String, NodeId>,
        placement: &mut [Placement],
        cycles: &mut Vec<CycleReport>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // Contract numbers along the current path; `None` for records without one
        let mut path: Vec<Option<String>> = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];

        while let Some((node, depth)) = stack.pop() {
            placement[node] = Placement::Placed;
            path.truncate(depth);
            let key = self.arena.get(node).contract_number.clone();
            path.push(key.clone());

            let Some(key) = key else { continue };
            let Some(children) = claimants.get(&key) else { continue };

            if let Some(&owner) = claimed.get(&key) {
                diagnostics.push(Diagnostic::AmbiguousParentClaim {
                    contract_number: key,
                    claimed_by: self.arena.get(owner).id.clone(),
                    orphaned_claimant: self.arena.get(node).id.clone(),
                });
                continue;
            }
            claimed.insert(key, node);

            let mut accepted = Vec::with_capacity(children.len());
            for &child in children {
                let child_key = self.arena.get(child).contract_number.as_deref();
                let loop_start = child_key.and_then(|ck| {
                    path.iter().position(|p| p.as_deref() == Some(ck))
                });

                match loop_start {
                    Some(start) => {
                        let cycle = path[start..].iter().flatten().cloned().collect();
                        placement[child] = Placement::Excluded(cycles.len());
                        cycles.push(CycleReport {
                            cycle,
                            record_ids: vec![self.arena.get(child).id.clone()],
                        });
                    }
                    None => {
                        self.arena.attach(node, child);
                        accepted.push(child);
                    }
                }
            }

            for &child in accepted.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Group every record no root reached under the parent-reference loop it
    /// leads into.
    fn collect_unreachable(
        &self,
        owners: &HashMap<String, Vec<NodeId>>,
        placement: &mut [Placement],
        cycles: &mut Vec<CycleReport>,
    ) {
        let parent_of = |id: NodeId| -> Option<NodeId> {
            let parent = self.arena.get(id).parent_contract_number.as_ref()?;
            owners.get(parent).and_then(|ids| ids.first().copied())
        };

        for start in 0..placement.len() {
            if placement[start] != Placement::Unvisited {
                continue;
            }

            let mut trail: Vec<NodeId> = Vec::new();
            let mut on_trail: HashMap<NodeId, usize> = HashMap::new();
            let mut current = start;

            let cycle_index = loop {
                match placement[current] {
                    Placement::Excluded(index) => break Some(index),
                    // Claimed keys always attach their children, so an
                    // unvisited chain never ends at a placed record.
                    Placement::Placed => break None,
                    Placement::Unvisited => {}
                }
                if let Some(&position) = on_trail.get(&current) {
                    let cycle = trail[position..]
                        .iter()
                        .filter_map(|&id| self.arena.get(id).contract_number.clone())
                        .collect();
                    cycles.push(CycleReport {
                        cycle,
                        record_ids: Vec::new(),
                    });
                    break Some(cycles.len() - 1);
                }
                on_trail.insert(current, trail.len());
                trail.push(current);
                match parent_of(current) {
                    Some(parent) => current = parent,
                    None => break None,
                }
            };

            if let Some(index) = cycle_index {
                for &id in &trail {
                    placement[id] = Placement::Excluded(index);
                    cycles[index].record_ids.push(self.arena.get(id).id.clone());
                }
            }
        }
    }
}

/// Link records into root trees, discarding diagnostics.
pub fn build(records: Vec<ContractRecord>) -> Vec<ContractRecord> {
    HierarchyBuilder::new(records).build().roots
}
