pub mod home_handler;
pub mod oauth;

pub use home_handler::home_handler;
pub use oauth::{callback_handler, login_handler, login_page_handler, logout_handler};
