pub mod health;
pub mod migrate;
pub mod permissions;
pub mod token;
