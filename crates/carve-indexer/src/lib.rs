//! Class file analysis and per-unit dependency graph building

pub mod builder;
pub mod classfile;
pub mod descriptor;
pub mod discover;
pub mod error;
pub mod extractor;
pub mod scope;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;


pub use builder::UnitGraphBuilder;
pub use classfile::{parse_class, ConstantNames};
pub use discover::discover_class_files;
pub use error::ClassFileError;
pub use extractor::{collect_references, extract_references, ClassReferences};
pub use scope::{canonical_name, ScopeFilter};
