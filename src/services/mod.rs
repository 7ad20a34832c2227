pub mod google;
pub mod login_flow;
pub mod user_store;

pub use google::{GoogleClient, IdentityProvider};
pub use login_flow::{LoginFlow, LoginStart};
pub use user_store::{InMemoryUserStore, UserStore, UserStoreError};
