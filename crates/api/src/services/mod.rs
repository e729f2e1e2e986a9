pub mod conversations;
pub mod error;
pub mod geo;
pub mod plasmas;
pub mod points;
pub mod reviews;
pub mod stats;

pub use error::*;
