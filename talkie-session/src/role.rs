use talkie_core::{Role, Room, UserId};

/// Deterministic, coordination-free caller/callee assignment: the
/// lexicographically smaller of the two member identities calls.
///
/// Returns `None` until the room has exactly two members including the
/// local identity. Earlier versions fell back to "creator acts as caller"
/// while the counterpart was still unknown, which could mint two callers in
/// a join-timing race; negotiation now simply waits for both identities.
pub fn resolve_role(local: &UserId, room: &Room) -> Option<Role> {
    if !room.is_member(local) {
        return None;
    }
    let other = room.other_member(local)?;
    if local < other {
        Some(Role::Caller)
    } else {
        Some(Role::Callee)
    }
}
