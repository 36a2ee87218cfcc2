pub mod authentication;
pub mod permissions;
pub mod policy;
pub mod user;

pub use authentication::*;
pub use permissions::*;
pub use policy::*;
pub use user::*;
