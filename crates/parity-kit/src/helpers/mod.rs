pub mod hcl;
pub mod location;
