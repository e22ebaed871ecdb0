//! Check whether code in one store of a multi-store dex program may refer to a symbol
//!
//! A whole-program optimizer rewriting code in some store can only introduce references to
//! symbols that will resolve at run time on every device: symbols defined in a store that is
//! visible from the one being optimized, or symbols the platform guarantees at the minimum API
//! level. [`ref_checker::RefChecker`] answers that question for types, methods, and fields.
//!
//! The other modules supply what the checker needs:
//!
//!   - [`dex`] is the symbol graph (classes, methods, fields, descriptors)
//!   - [`store`] describes stores and which can see which
//!   - [`api`] is the platform API surface
//!   - [`loader`] and [`config`] read all of the above from files

pub mod api;
pub mod config;
pub mod dex;
mod errors;
pub mod loader;
pub mod ref_checker;
pub mod store;

#[cfg(test)]
mod testing;

pub use errors::*;
