pub mod mock_channel;
pub mod mock_transport;

pub use mock_channel::*;
pub use mock_media::*;
pub use mock_transport::*;
pub use session_helpers::*;
