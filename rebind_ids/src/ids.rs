//! Content-stable hashing and the opaque node handle.
//! The hash must produce the same value for the same string in every process,
//! on every platform, forever; persisted identities depend on it. Never swap
//! it for a std HashMap-style salted hasher; bump HASH_VERSION instead.

use std::fmt;

/// Version tag persisted alongside every store file. Bump when the hash
/// algorithm changes so old files can be detected and migrated.
pub const HASH_VERSION: u32 = 1;

const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// FNV-1a over the UTF-8 bytes of `s`. Process-stable by construction.
pub const fn stable_hash_64(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0usize;

    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }

    hash
}

// ---- NodeId: generational handle ----
// u64 layout: low 32 = index (0 = nil, 1.. = slot), high 32 = generation.
// When a slot is reused, generation is bumped so old handles no longer match.

/// Opaque handle to a live node in a host scene graph. Index + generation.
/// Handles are issued by the graph that owns the node; they are only
/// meaningful against that graph and only for the current process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    #[inline]
    pub const fn nil() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self((index as u64) | ((generation as u64) << 32))
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.index(), self.generation())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(stable_hash_64("Root/Player"), stable_hash_64("Root/Player"));
        assert_ne!(stable_hash_64("Root/Player"), stable_hash_64("Root/player"));
    }

    #[test]
    fn test_hash_known_vectors() {
        // FNV-1a 64 reference values; these pin the algorithm across releases.
        assert_eq!(stable_hash_64(""), 0xCBF2_9CE4_8422_2325);
        assert_eq!(stable_hash_64("a"), 0xAF63_DC4C_8601_EC8C);
        assert_eq!(stable_hash_64("foobar"), 0x85944171F73967E8);
    }

    #[test]
    fn test_node_id_parts() {
        let id = NodeId::from_parts(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert!(!id.is_nil());
        assert!(NodeId::nil().is_nil());
    }

    #[test]
    fn test_node_id_generation_distinguishes_reuse() {
        let old = NodeId::from_parts(5, 0);
        let reused = NodeId::from_parts(5, 1);
        assert_ne!(old, reused);
        assert_eq!(old.index(), reused.index());
    }
}
