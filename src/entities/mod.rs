// Entity Models - one struct per relation of the dataset
//
// Each entity has:
// - Integer identity, unique within its table
// - Plain values read once per session, never mutated

pub mod capability;
pub mod company;
pub mod product;

pub use capability::{Capability, CapabilityId};
pub use company::{Company, CompanyId, CompanyProfile};
pub use product::{Product, ProductId};
