pub mod assignment;
pub mod stats;
pub mod user;

pub use assignment::*;
pub use stats::*;
pub use user::*;
