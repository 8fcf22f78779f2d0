pub mod credential;
pub mod response;

pub use credential::*;
pub use response::*;
