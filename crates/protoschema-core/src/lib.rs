//! # protoschema-core
//!
//! JSON Schema (Draft 2020-12) synthesis for protobuf message graphs.
//!
//! This crate provides:
//! - A read-only descriptor model behind the [`DescriptorPool`] trait
//! - Option resolution for file, message and field overlays
//! - Selection of the types to generate, with forced inclusion of dependencies
//! - Field type mapping and cycle-safe schema synthesis into a shared `$defs` registry
//! - Per-file compilation into JSON documents and Rust builder modules
//!
//! ## Example
//!
//! ```rust
//! use protoschema_core::{compile_unit, DescriptorSet, FileDescriptor, GeneratorConfig};
//!
//! let file: FileDescriptor = serde_json::from_value(serde_json::json!({
//!     "path": "users/v1/user.proto",
//!     "package": "users.v1",
//!     "options": {"generate": true},
//!     "messages": [{
//!         "name": "User",
//!         "full_name": "users.v1.User",
//!         "file": "users/v1/user.proto",
//!         "fields": [{"name": "id", "number": 1, "kind": "string"}]
//!     }]
//! }))?;
//! let set = DescriptorSet::new(vec![file], vec![]);
//! let unit = compile_unit(&set, &set.files()[0], &GeneratorConfig::default())?
//!     .expect("user.proto generates");
//!
//! let root = &unit.types[0].root;
//! assert_eq!(root.referenced_name(), Some("users.v1.User"));
//! assert_eq!(root.defs["users.v1.User"].required, vec!["id".to_string()]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codegen;
mod comments;
mod descriptor;
mod error;
mod generate;
mod mapping;
mod options;
mod schema;
mod select;
mod synth;

pub use comments::*;
pub use descriptor::*;
pub use error::*;
pub use generate::*;
pub use mapping::*;
pub use options::*;
pub use schema::*;
pub use select::*;
pub use synth::*;
