use crate::error::ErrorCode;
use crate::model::{Container, ContainerFields, Member, MemberFields, MemberRef};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single server call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure or timeout. Nothing is known about server state.
    #[error("network error: {0}")]
    Network(String),

    /// No valid session.
    #[error("not signed in")]
    Unauthorized,

    /// The entity exists but belongs to someone else.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Any other non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server answered with a body we could not decode.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RemoteError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) => ErrorCode::RemoteUnreachable,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Forbidden => ErrorCode::Forbidden,
            Self::NotFound => ErrorCode::EntityNotFound,
            Self::Rejected { .. } | Self::Decode(_) => ErrorCode::RemoteRejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Remote trait
// ---------------------------------------------------------------------------

/// The authoritative server, one method per REST operation.
///
/// Every call requires an authenticated session. Implementations return the
/// server's copy of the record on create/update; that copy carries no sync
/// flags and therefore reads as clean.
pub trait Remote {
    fn create_container(&mut self, title: &str) -> Result<Container, RemoteError>;

    fn update_container(
        &mut self,
        id: &str,
        fields: &ContainerFields,
    ) -> Result<Container, RemoteError>;

    fn delete_container(&mut self, id: &str) -> Result<(), RemoteError>;

    /// Create an item in `container_id`, or a standalone todo for `None`.
    /// The server assigns `sort_order`.
    fn create_member(
        &mut self,
        container_id: Option<&str>,
        title: &str,
    ) -> Result<Member, RemoteError>;

    fn update_member(
        &mut self,
        target: MemberRef<'_>,
        fields: &MemberFields,
    ) -> Result<Member, RemoteError>;

    fn delete_member(&mut self, target: MemberRef<'_>) -> Result<(), RemoteError>;

    fn list_containers(&mut self) -> Result<Vec<Container>, RemoteError>;

    /// Items of one list, or all standalone todos for `None`.
    fn list_members(&mut self, container_id: Option<&str>) -> Result<Vec<Member>, RemoteError>;
}

impl<R: Remote + ?Sized> Remote for &mut R {
    fn create_container(&mut self, title: &str) -> Result<Container, RemoteError> {
        (**self).create_container(title)
    }

    fn update_container(
        &mut self,
        id: &str,
        fields: &ContainerFields,
    ) -> Result<Container, RemoteError> {
        (**self).update_container(id, fields)
    }

    fn delete_container(&mut self, id: &str) -> Result<(), RemoteError> {
        (**self).delete_container(id)
    }

    fn create_member(
        &mut self,
        container_id: Option<&str>,
        title: &str,
    ) -> Result<Member, RemoteError> {
        (**self).create_member(container_id, title)
    }

    fn update_member(
        &mut self,
        target: MemberRef<'_>,
        fields: &MemberFields,
    ) -> Result<Member, RemoteError> {
        (**self).update_member(target, fields)
    }

    fn delete_member(&mut self, target: MemberRef<'_>) -> Result<(), RemoteError> {
        (**self).delete_member(target)
    }

    fn list_containers(&mut self) -> Result<Vec<Container>, RemoteError> {
        (**self).list_containers()
    }

    fn list_members(&mut self, container_id: Option<&str>) -> Result<Vec<Member>, RemoteError> {
        (**self).list_members(container_id)
    }
}
