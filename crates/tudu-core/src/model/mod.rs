//! Entities held by the local store and exchanged with the server.

pub mod entity;
pub mod id;
pub mod validate;

pub use entity::{
    Container, ContainerFields, ContainerPatch, EntityKind, Member, MemberFields, MemberPatch,
    MemberRef, NewContainer, NewMember, SyncFailure, SyncFlags, SyncState, Tracked,
};
pub use id::{is_placeholder, placeholder_id};
pub use validate::ValidationError;
