pub mod error;
pub mod model;

pub use error::ServiceError;
pub use model::*;
