use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::{BranchId, ContextId};

/// A single resolved branch choice.
///
/// A decision records which outgoing edge (`choice`) was taken at a branch
/// site (`branch`), and in which procedure activation (`context`) the branch
/// executed.
///
/// # Equality
///
/// Decisions are keyed by value equality on `(branch, choice)` only. The
/// context is metadata: it drives context-preserving history extraction but
/// never participates in `Eq` or `Hash`. This is what lets a policy learned
/// in one activation apply to every later activation of the same procedure.
#[derive(Debug, Copy, Clone)]
pub struct Decision {
    pub branch: BranchId,
    pub choice: u32,
    pub context: ContextId,
}

impl Decision {
    pub fn new(branch: BranchId, choice: u32, context: ContextId) -> Self {
        Decision { branch, choice, context }
    }
}

impl PartialEq for Decision {
    fn eq(&self, other: &Self) -> bool {
        // Context deliberately excluded, see the type-level doc.
        self.branch == other.branch && self.choice == other.choice
    }
}

impl Eq for Decision {}

impl Hash for Decision {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.branch.hash(state);
        self.choice.hash(state);
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.branch, self.choice)
    }
}
