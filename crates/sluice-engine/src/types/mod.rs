//! Interned type factory
//!
//! Every type of a compilation lives in one `TypeContext`; everything else refers
//! to types by `TypeId`.

pub mod context;
pub mod ty;

pub use context::TypeContext;
pub use ty::{CollectionType, EnumType, MapType, PrimitiveType, TupleType, Type, TypeId};
