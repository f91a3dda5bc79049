//! Repository implementations for the key tree tables.

mod keys;
mod values;

pub use keys::KeyRepo;
pub use values::ValueRepo;
