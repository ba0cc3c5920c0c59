use crate::client::SessionToken;
use crate::domain::{Identity, Role};

/// The signed-in user for the current request, resolved from the backend
/// by the page guard and stored in request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub identity: Identity,
}

impl Session {
    pub fn new(token: SessionToken, identity: Identity) -> Self {
        Self { token, identity }
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn is_staff(&self) -> bool {
        self.identity.role == Role::Staff
    }
}
