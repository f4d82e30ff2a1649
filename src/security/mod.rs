pub mod memory;
pub mod validation;

pub use memory::{SecureBytes, SecureString};
pub use validation::InputValidator;
