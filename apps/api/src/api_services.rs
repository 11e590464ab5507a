mod database;
mod state_builder;

pub use database::connect_and_migrate;
pub use state_builder::{RepositorySet, build_app_state, compose_app_state};
