//! Persistence layer

pub mod address;
pub mod gov;
pub mod user;

pub use address::{AddressRepository, AddressRepositoryImpl};
pub use gov::{GovRepository, GovRepositoryImpl};
pub use user::{UserRepository, UserRepositoryImpl};

#[cfg(test)]
pub use address::MockAddressRepository;
#[cfg(test)]
pub use gov::MockGovRepository;
#[cfg(test)]
pub use user::MockUserRepository;
