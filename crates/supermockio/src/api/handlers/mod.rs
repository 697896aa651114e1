pub mod collaborators;
pub mod mocks;
pub mod services;
pub mod system;
