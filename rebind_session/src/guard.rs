//! Re-entrancy guard shared between the reconciler and the session tracker.
//! Everything runs on the host's single logical thread, so a shared
//! `Rc<Cell<bool>>` is enough: the reconciler holds the guard while writing
//! transforms, and the change-detection auto-save checks it to avoid
//! re-saving the very transforms it just applied.

use std::cell::Cell;
use std::rc::Rc;

/// Cloneable handle to the shared apply flag. Clones observe the same flag.
#[derive(Clone, Default)]
pub struct ApplyGuard {
    flag: Rc<Cell<bool>>,
}

impl ApplyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while some holder is alive. Holds do not nest.
    pub fn is_held(&self) -> bool {
        self.flag.get()
    }

    /// Raise the flag until the returned holder is dropped.
    pub fn hold(&self) -> ApplyGuardHold {
        self.flag.set(true);
        ApplyGuardHold {
            flag: Rc::clone(&self.flag),
        }
    }
}

pub struct ApplyGuardHold {
    flag: Rc<Cell<bool>>,
}

impl Drop for ApplyGuardHold {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
