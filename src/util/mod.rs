mod email;
mod ids;
mod password;

pub use email::is_valid_email;
pub use ids::{lenient_id, parse_id};
pub use password::{hash_password, verify_password, PasswordError};
