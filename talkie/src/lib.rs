pub use talkie_core::{Role, RoomId, ShortId, UserId};

pub mod model {
    pub use talkie_core::model::*;
}

pub mod session {
    pub use talkie_session::*;
}

#[cfg(feature = "directory")]
pub mod directory {
    pub use talkie_directory::*;
}

#[cfg(feature = "store")]
pub mod store {
    pub use talkie_store::*;
}

#[cfg(feature = "rtc")]
pub mod rtc {
    pub use talkie_rtc::*;
}
