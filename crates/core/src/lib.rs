//! Semantic core of the bhl compiler: symbols, scopes and the type system.
//!
//! The front end drives a [`TypeSystem`] while walking parse trees, building
//! a tree of symbols addressed by [`SymbolId`]; the bytecode emitter then
//! reads slots, signatures and resolved types back out of it.

pub mod config;
pub mod error;
pub mod location;
pub mod logging;
pub mod natives;
pub mod pipeline;
pub mod symbol;
pub mod type_system;
pub mod types;

pub use config::CompileConf;
pub use error::{CompileError, Result};
pub use location::SourceLocation;
pub use symbol::{ClassFlavor, SymbolId, SymbolKind, SymbolNode, SymbolsDictionary, UpValue};
pub use type_system::{TypeSystem, TypedNode};
pub use types::{BuiltIn, FuncSignature, TupleType, Type, TypeName, TypeRef};
