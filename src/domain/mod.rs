mod user;

pub use user::{NewUser, ProfileChanges, Role, UserProfile, UserRecord};
