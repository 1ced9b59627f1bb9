//! # Resource Module
//!
//! The resource-kind model consumed by the dispatch layer, the [`Store`]
//! collaborator, and [`ResourceGroupRouter`], the generic CRUD convention
//! built on [`JsonRouter`](crate::json::JsonRouter).
//!
//! A [`Kind`] names a resource type ([`GroupVersionKind`] plus plural) and owns
//! the [`Codec`] that turns bytes into an [`Object`] and back. Kinds are
//! usually generated from a schema; [`Kind::untyped`] covers types nobody
//! registered.

mod kind;
mod object;
mod router;
mod store;

pub use kind::{Codec, CodecError, GroupKind, GroupVersionKind, JsonCodec, Kind};
pub use object::{Object, ObjectIdentifier, ObjectList, ObjectMeta};
pub use router::ResourceGroupRouter;
pub use store::Store;
