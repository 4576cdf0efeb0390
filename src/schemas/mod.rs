pub mod announcement;
pub mod concern;
pub mod response;
pub mod user;

pub use announcement::*;
pub use concern::*;
pub use response::*;
pub use user::*;
