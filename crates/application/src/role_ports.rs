mod records;
mod repository;

pub use records::{EntityRolesSnapshot, NewRole, RoleProvisionOutcome};
pub use repository::RoleRepository;
