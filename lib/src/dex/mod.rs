//! Symbols of a dex program: names, type descriptors, and the class graph
//!
//! ### Simple example
//!
//! ```
//! use refcheck::dex::*;
//!
//! # fn build() -> Result<(), refcheck::Error> {
//! let arenas = ClassGraphArenas::new();
//! let graph = ClassGraph::new(&arenas);
//!
//! let object = graph.add_class(
//!     ClassKind::External,
//!     BinaryName::OBJECT,
//!     None,
//!     vec![],
//!     ClassAccessFlags::PUBLIC,
//! )?;
//! let point = graph.add_class(
//!     ClassKind::Defined,
//!     BinaryName::from_string(String::from("me/alec/Point")).unwrap(),
//!     Some(object),
//!     vec![],
//!     ClassAccessFlags::PUBLIC,
//! )?;
//! let x = graph.add_field(
//!     point,
//!     UnqualifiedName::from_string(String::from("x")).unwrap(),
//!     FieldType::int(),
//!     FieldAccessFlags::PUBLIC,
//! );
//! assert_eq!(x.render(), "Lme/alec/Point;.x:I");
//! # Ok(())
//! # }
//! # build().unwrap();
//! ```

mod access_flags;
mod class_graph;
mod descriptors;
mod names;

pub use access_flags::*;
pub use class_graph::*;
pub use descriptors::*;
pub use names::*;
