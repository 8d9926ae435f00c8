pub mod allocator;
pub mod friends;
pub mod presence;
pub mod rooms;
pub mod store;
pub mod users;

pub use allocator::{AllocatorPolicy, AllocatorState, IdAllocator};
pub use friends::FriendService;
pub use presence::run_presence_mirror;
pub use rooms::{run_membership_watcher, RoomService};
pub use store::{AllocatorStore, DirectoryStore};
pub use users::UserService;

/// Allocation scope for user short IDs.
pub const USER_ID_SCOPE: &str = "user-ids";
/// Allocation scope for hidden room codes.
pub const ROOM_CODE_SCOPE: &str = "room-codes";
