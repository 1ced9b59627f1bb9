use super::kind::Kind;
use super::object::{Object, ObjectIdentifier};

/// Backing object store consumed by
/// [`ResourceGroupRouter`](super::ResourceGroupRouter).
///
/// Implementations may block (for example on a remote API); cancellation is
/// theirs to handle. Writes may complete asynchronously, which is why the
/// router answers creates and updates with 202.
pub trait Store: Send + Sync {
    fn get(&self, kind: &Kind, id: &ObjectIdentifier) -> anyhow::Result<Object>;
    fn list(&self, kind: &Kind, namespace: &str) -> anyhow::Result<Vec<Object>>;
    fn add(&self, kind: &Kind, object: Object) -> anyhow::Result<Object>;
    fn update(&self, kind: &Kind, object: Object) -> anyhow::Result<Object>;
    fn delete(&self, kind: &Kind, id: &ObjectIdentifier) -> anyhow::Result<()>;
}
