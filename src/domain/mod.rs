//! Domain models

mod address;
mod gov;
mod user;

pub use address::Address;
pub use gov::Gov;
pub use user::{CreateUserInput, UpdateUserInput, User};
