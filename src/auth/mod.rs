use crate::state::AppState;
use axum::Router;
use uuid::Uuid;

pub mod dto;
pub mod handlers;
pub mod password;
pub mod session;
pub mod validate;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

/// The ownership capability: an identity may mutate a resource only when it
/// equals the resource's stored owner.
pub fn can_mutate(actor: Uuid, owner: Uuid) -> bool {
    actor == owner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_may_mutate() {
        let owner = Uuid::new_v4();
        assert!(can_mutate(owner, owner));
    }

    #[test]
    fn anyone_else_may_not() {
        assert!(!can_mutate(Uuid::new_v4(), Uuid::new_v4()));
    }
}
