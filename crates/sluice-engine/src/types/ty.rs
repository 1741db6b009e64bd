//! Core type definitions for the Sluice type system

use std::fmt;

/// Unique identifier for a type in the type context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Create a new TypeId from a raw value
    ///
    /// Prefer the `TypeContext` constructors; this exists for interop and tests.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value of this TypeId
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal32,
    Decimal64,
    Decimal128,
    Complex32,
    Complex64,
    Timestamp,
    /// Unbounded raw string
    Rstring,
    /// Unicode string
    Ustring,
    Blob,
    Xml,
    Void,
}

impl PrimitiveType {
    /// Every primitive, in source spelling order
    pub const ALL: [PrimitiveType; 22] = [
        PrimitiveType::Boolean,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Uint8,
        PrimitiveType::Uint16,
        PrimitiveType::Uint32,
        PrimitiveType::Uint64,
        PrimitiveType::Float32,
        PrimitiveType::Float64,
        PrimitiveType::Decimal32,
        PrimitiveType::Decimal64,
        PrimitiveType::Decimal128,
        PrimitiveType::Complex32,
        PrimitiveType::Complex64,
        PrimitiveType::Timestamp,
        PrimitiveType::Rstring,
        PrimitiveType::Ustring,
        PrimitiveType::Blob,
        PrimitiveType::Xml,
        PrimitiveType::Void,
    ];

    /// Source spelling of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Uint8 => "uint8",
            PrimitiveType::Uint16 => "uint16",
            PrimitiveType::Uint32 => "uint32",
            PrimitiveType::Uint64 => "uint64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::Decimal32 => "decimal32",
            PrimitiveType::Decimal64 => "decimal64",
            PrimitiveType::Decimal128 => "decimal128",
            PrimitiveType::Complex32 => "complex32",
            PrimitiveType::Complex64 => "complex64",
            PrimitiveType::Timestamp => "timestamp",
            PrimitiveType::Rstring => "rstring",
            PrimitiveType::Ustring => "ustring",
            PrimitiveType::Blob => "blob",
            PrimitiveType::Xml => "xml",
            PrimitiveType::Void => "void",
        }
    }

    /// Parse a primitive from its source spelling
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
                | PrimitiveType::Uint8
                | PrimitiveType::Uint16
                | PrimitiveType::Uint32
                | PrimitiveType::Uint64
                | PrimitiveType::Float32
                | PrimitiveType::Float64
                | PrimitiveType::Decimal32
                | PrimitiveType::Decimal64
                | PrimitiveType::Decimal128
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collection type with an optional element bound: `list<T>[n]`, `set<T>[n]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionType {
    pub element: TypeId,
    pub bound: Option<u32>,
}

/// Map type: `map<K, V>` with an optional bound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapType {
    pub key: TypeId,
    pub value: TypeId,
    pub bound: Option<u32>,
}

/// Tuple type: ordered named attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleType {
    pub attributes: Vec<(String, TypeId)>,
}

impl TupleType {
    /// Type of the named attribute, if present
    pub fn attribute(&self, name: &str) -> Option<TypeId> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }
}

/// Enumeration type: ordered value names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub values: Vec<String>,
}

/// A type in the Sluice type system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    /// Raw string with a maximum length: `rstring[n]`
    BoundedRstring(u32),
    List(CollectionType),
    Set(CollectionType),
    Map(MapType),
    Optional(TypeId),
    Tuple(TupleType),
    Enum(EnumType),
    /// Type parameter of a generic signature or a composite `type` formal
    TypeFormal(String),
    /// Result of any failed resolution
    Unknown,
}

impl Type {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn as_tuple(&self) -> Option<&TupleType> {
        match self {
            Type::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }
}
