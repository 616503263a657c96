use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable token identifying one table for the lifetime of the pool.
///
/// The numeric id is the key: it never changes, not even when the table is renamed.
/// The name travels along for display and diagnostics only and may go stale between
/// a rename and the next reactivation of a pooled resource - rename propagation is
/// deliberately lazy because renames are rare. Equality and hashing therefore
/// consider only the id.
///
/// The token is cheap to clone; the name is reference-counted.
///
/// # Example
///
/// ```
/// use tenant_pool::TableIdentity;
///
/// let before = TableIdentity::new("trades", 42);
/// let after = TableIdentity::new("trades_renamed", 42);
///
/// // Same table, regardless of what it is currently called.
/// assert_eq!(before, after);
/// ```
#[derive(Clone, Debug)]
pub struct TableIdentity {
    name: Arc<str>,
    id: u64,
}

impl TableIdentity {
    /// Creates a new identity from a display name and a stable numeric id.
    #[must_use]
    pub fn new(name: impl AsRef<str>, id: u64) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            id,
        }
    }

    /// The advisory display name of the table.
    ///
    /// May lag behind the real table name after a rename; never use it as a key.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stable numeric id that keys all pool bookkeeping.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for TableIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TableIdentity {}

impl Hash for TableIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
