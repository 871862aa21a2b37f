use crate::domain::UserId;

// ============== Authorization ==============

/// Single-user authorization gate.
///
/// Fails closed: an unknown sender or an unset allowed identity is never
/// authorized.
pub fn is_allowed(user_id: Option<UserId>, allowed: Option<UserId>) -> bool {
    let Some(allowed) = allowed else {
        return false;
    };
    let Some(user_id) = user_id else {
        return false;
    };
    user_id == allowed
}
