//! Cascading record-to-node matching. Tried strictly in order; the first hit
//! wins. Later steps are progressively weaker: ids survive renames, paths
//! survive sibling shifts, names are a last resort disambiguated by parent
//! path, and the tree walk tolerates case drift.

use log::debug;
use rebind_graph::{SceneGraph, full_name_path, resolve_path};
use rebind_ids::{NodeId, UniqueId};
use rebind_store::TransformRecord;

use crate::index::GraphIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    PathId,
    ItemId,
    FullPath,
    SiblingPath,
    NameUnique,
    NameByParent,
    NameFirst,
    TreeWalk,
    TreeWalkCaseInsensitive,
}

/// Resolve `record` against one indexed snapshot of the live graph.
pub fn match_record(
    graph: &dyn SceneGraph,
    index: &GraphIndex,
    scene: &str,
    record: &TransformRecord,
) -> Option<(NodeId, MatchMethod)> {
    // (a) PathID
    if !record.path_id.is_empty()
        && let Some(&node) = index.by_path_id.get(&record.path_id)
    {
        return Some((node, MatchMethod::PathId));
    }

    // (b) ItemID
    if !record.item_id.is_empty()
        && let Some(&node) = index.by_item_id.get(&record.item_id)
    {
        return Some((node, MatchMethod::ItemId));
    }

    // (c) full path
    if !record.object_path.is_empty()
        && let Some(&node) = index.by_full_path.get(&record.object_path)
    {
        return Some((node, MatchMethod::FullPath));
    }

    // (d) sibling-index path recovered from a legacy unique id
    if let Some(sib_path) = UniqueId::parse(&record.unique_id).legacy_sibling_path(scene)
        && let Some(&node) = index.by_sibling_path.get(&sib_path)
    {
        return Some((node, MatchMethod::SiblingPath));
    }

    // (e) name, disambiguated by parent path when needed
    if !record.object_name.is_empty()
        && let Some(candidates) = index.by_name.get(&record.object_name)
    {
        if candidates.len() == 1 {
            return Some((candidates[0], MatchMethod::NameUnique));
        }
        if !record.parent_path.is_empty() {
            for &candidate in candidates {
                let parent_path = graph
                    .parent(candidate)
                    .and_then(|p| full_name_path(graph, p))
                    .unwrap_or_default();
                if parent_path == record.parent_path {
                    return Some((candidate, MatchMethod::NameByParent));
                }
            }
        }
        // Residual ambiguity is reduced precision, not an error.
        if let Some(&first) = candidates.first() {
            debug!(
                "ambiguous name `{}` for {}, taking first enumerated match",
                record.object_name, record.unique_id
            );
            return Some((first, MatchMethod::NameFirst));
        }
    }

    // (f) tree walk, case-sensitive then case-insensitive
    if !record.object_path.is_empty() {
        if let Some(node) = resolve_path(graph, &record.object_path, false) {
            return Some((node, MatchMethod::TreeWalk));
        }
        if let Some(node) = resolve_path(graph, &record.object_path, true) {
            return Some((node, MatchMethod::TreeWalkCaseInsensitive));
        }
    }

    None
}
