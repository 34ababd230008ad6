//! The three-tier identity scheme: PathID + ItemID, joined into one UniqueId
//! string, with a legacy positional fallback for nodes where either sub-id
//! cannot be derived.

use crate::ids::stable_hash_64;

/// Separator used by the legacy fallback format
/// `{scene}_{path}_{x}_{y}_{z}` (position rounded to one decimal).
pub const LEGACY_SEPARATOR: char = '_';

/// `"P" + abs(hash(full ancestor-name path))`. Empty input yields an empty id.
pub fn path_id(full_name_path: &str) -> String {
    if full_name_path.is_empty() {
        return String::new();
    }
    format!("P{}", (stable_hash_64(full_name_path) as i64).unsigned_abs())
}

/// `"I" + abs(hash(name + "_" + scene + "_" + sibling_index))`.
/// Empty name yields an empty id.
pub fn item_id(name: &str, scene: &str, sibling_index: usize) -> String {
    if name.is_empty() {
        return String::new();
    }
    let key = format!("{name}_{scene}_{sibling_index}");
    format!("I{}", (stable_hash_64(&key) as i64).unsigned_abs())
}

/// A parsed unique id. Structural ids are the normal `P…+I…` form; legacy ids
/// carry a raw path segment (which may itself be a sibling-index path like
/// `0/2/1`) plus the rounded spawn position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueId {
    Structural { path_id: String, item_id: String },
    Legacy { body: String },
}

impl UniqueId {
    /// Join two non-empty sub-ids into `"{path_id}+{item_id}"`.
    /// Returns `None` when either half is empty; callers then fall back to
    /// [`UniqueId::legacy`].
    pub fn compose(path_id: &str, item_id: &str) -> Option<String> {
        if path_id.is_empty() || item_id.is_empty() {
            return None;
        }
        Some(format!("{path_id}+{item_id}"))
    }

    /// Legacy fallback id: scene, path, and position rounded to one decimal.
    pub fn legacy(scene: &str, path: &str, position: (f32, f32, f32)) -> String {
        let (x, y, z) = position;
        format!("{scene}_{path}_{x:.1}_{y:.1}_{z:.1}")
    }

    pub fn parse(id: &str) -> UniqueId {
        if let Some((p, i)) = id.split_once('+')
            && p.starts_with('P')
            && i.starts_with('I')
        {
            return UniqueId::Structural {
                path_id: p.to_string(),
                item_id: i.to_string(),
            };
        }
        UniqueId::Legacy {
            body: id.to_string(),
        }
    }

    /// For a legacy id belonging to `scene`, recover the path segment by
    /// stripping the scene prefix and the three trailing rounded-position
    /// tokens. Returns `None` for structural ids or foreign scenes.
    pub fn legacy_path(&self, scene: &str) -> Option<String> {
        let UniqueId::Legacy { body } = self else {
            return None;
        };
        let rest = body.strip_prefix(scene)?.strip_prefix(LEGACY_SEPARATOR)?;

        // Walk back over `_z`, `_y`, `_x`.
        let mut end = rest.len();
        for _ in 0..3 {
            let cut = rest[..end].rfind(LEGACY_SEPARATOR)?;
            if rest[cut + 1..end].parse::<f32>().is_err() {
                return None;
            }
            end = cut;
        }
        if end == 0 {
            return None;
        }
        Some(rest[..end].to_string())
    }

    /// The legacy path segment, but only when it is a sibling-index path
    /// (digits and slashes, e.g. `"0/2/1"`). Consumed by the matcher.
    pub fn legacy_sibling_path(&self, scene: &str) -> Option<String> {
        let path = self.legacy_path(scene)?;
        if !path.is_empty() && path.chars().all(|c| c.is_ascii_digit() || c == '/') {
            Some(path)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id_stable() {
        let a = path_id("Root/Warehouse/Crate");
        let b = path_id("Root/Warehouse/Crate");
        assert_eq!(a, b);
        assert!(a.starts_with('P'));
        assert!(a[1..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_empty_inputs_yield_empty_ids() {
        assert_eq!(path_id(""), "");
        assert_eq!(item_id("", "Warehouse", 0), "");
    }

    #[test]
    fn test_item_id_varies_by_sibling_index() {
        let a = item_id("Crate", "Warehouse", 0);
        let b = item_id("Crate", "Warehouse", 1);
        assert_ne!(a, b);
        assert!(a.starts_with('I'));
    }

    #[test]
    fn test_compose_requires_both_halves() {
        assert_eq!(
            UniqueId::compose("P12", "I34").as_deref(),
            Some("P12+I34")
        );
        assert_eq!(UniqueId::compose("", "I34"), None);
        assert_eq!(UniqueId::compose("P12", ""), None);
    }

    #[test]
    fn test_parse_structural() {
        let parsed = UniqueId::parse("P123+I456");
        assert_eq!(
            parsed,
            UniqueId::Structural {
                path_id: "P123".to_string(),
                item_id: "I456".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_legacy_roundtrip_path() {
        let id = UniqueId::legacy("Warehouse", "Root/Crate", (1.04, 2.0, -3.26));
        assert_eq!(id, "Warehouse_Root/Crate_1.0_2.0_-3.3");
        let parsed = UniqueId::parse(&id);
        assert_eq!(
            parsed.legacy_path("Warehouse").as_deref(),
            Some("Root/Crate")
        );
        assert_eq!(parsed.legacy_sibling_path("Warehouse"), None);
    }

    #[test]
    fn test_legacy_sibling_path() {
        let id = UniqueId::legacy("Warehouse", "0/2/1", (0.0, 0.0, 0.0));
        let parsed = UniqueId::parse(&id);
        assert_eq!(
            parsed.legacy_sibling_path("Warehouse").as_deref(),
            Some("0/2/1")
        );
    }

    #[test]
    fn test_legacy_path_foreign_scene() {
        let id = UniqueId::legacy("Warehouse", "Root/Crate", (0.0, 0.0, 0.0));
        assert_eq!(UniqueId::parse(&id).legacy_path("Depot"), None);
    }
}
