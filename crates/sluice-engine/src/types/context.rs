//! Type context for managing types and type interning

use super::ty::{CollectionType, EnumType, MapType, PrimitiveType, TupleType, Type, TypeId};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Type context that manages all types of one compilation
///
/// Types are interned: structurally identical types share one `TypeId`, so type
/// equality is id equality.
#[derive(Debug, Clone)]
pub struct TypeContext {
    /// Storage for all types, indexed by TypeId
    types: Vec<Arc<Type>>,

    /// Reverse mapping from Type to TypeId for interning
    type_to_id: FxHashMap<Type, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    /// Well-known id of the unknown type
    pub const UNKNOWN: TypeId = TypeId(0);

    /// Create a new type context with the unknown type and every primitive pre-interned
    pub fn new() -> Self {
        let mut ctx = TypeContext {
            types: Vec::new(),
            type_to_id: FxHashMap::default(),
        };
        ctx.intern(Type::Unknown);
        for p in PrimitiveType::ALL {
            ctx.intern(Type::Primitive(p));
        }
        ctx
    }

    /// Intern a type, returning its TypeId
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.type_to_id.get(&ty) {
            return id;
        }

        let id = TypeId(self.types.len() as u32);
        self.types.push(Arc::new(ty.clone()));
        self.type_to_id.insert(ty, id);
        id
    }

    /// Get a type by its TypeId
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize).map(|arc| arc.as_ref())
    }

    /// Look up a type's ID without interning
    pub fn lookup(&self, ty: &Type) -> Option<TypeId> {
        self.type_to_id.get(ty).copied()
    }

    pub fn unknown_type(&self) -> TypeId {
        Self::UNKNOWN
    }

    pub fn is_unknown(&self, id: TypeId) -> bool {
        id == Self::UNKNOWN
    }

    pub fn primitive(&mut self, p: PrimitiveType) -> TypeId {
        self.intern(Type::Primitive(p))
    }

    pub fn bounded_rstring(&mut self, bound: u32) -> TypeId {
        self.intern(Type::BoundedRstring(bound))
    }

    pub fn list(&mut self, element: TypeId, bound: Option<u32>) -> TypeId {
        self.intern(Type::List(CollectionType { element, bound }))
    }

    pub fn set(&mut self, element: TypeId, bound: Option<u32>) -> TypeId {
        self.intern(Type::Set(CollectionType { element, bound }))
    }

    pub fn map(&mut self, key: TypeId, value: TypeId, bound: Option<u32>) -> TypeId {
        self.intern(Type::Map(MapType { key, value, bound }))
    }

    pub fn optional(&mut self, inner: TypeId) -> TypeId {
        self.intern(Type::Optional(inner))
    }

    /// Tuple type from ordered `(name, type)` pairs
    pub fn tuple(&mut self, attributes: Vec<(String, TypeId)>) -> TypeId {
        self.intern(Type::Tuple(TupleType { attributes }))
    }

    pub fn enumeration(&mut self, values: Vec<String>) -> TypeId {
        self.intern(Type::Enum(EnumType { values }))
    }

    pub fn type_formal(&mut self, name: impl Into<String>) -> TypeId {
        self.intern(Type::TypeFormal(name.into()))
    }

    /// Tuple attributes of `id`, if it is a tuple type
    pub fn tuple_attributes(&self, id: TypeId) -> Option<&[(String, TypeId)]> {
        match self.get(id) {
            Some(Type::Tuple(t)) => Some(&t.attributes),
            _ => None,
        }
    }

    /// Render a type the way it is spelled in source
    pub fn display(&self, id: TypeId) -> String {
        let Some(ty) = self.get(id) else {
            return format!("<invalid {}>", id);
        };
        match ty {
            Type::Primitive(p) => p.to_string(),
            Type::BoundedRstring(n) => format!("rstring[{}]", n),
            Type::List(c) => format!("list<{}>{}", self.display(c.element), bound_suffix(c.bound)),
            Type::Set(c) => format!("set<{}>{}", self.display(c.element), bound_suffix(c.bound)),
            Type::Map(m) => format!(
                "map<{}, {}>{}",
                self.display(m.key),
                self.display(m.value),
                bound_suffix(m.bound)
            ),
            Type::Optional(inner) => format!("optional<{}>", self.display(*inner)),
            Type::Tuple(t) => {
                let attrs: Vec<String> = t
                    .attributes
                    .iter()
                    .map(|(name, ty)| format!("{} {}", self.display(*ty), name))
                    .collect();
                format!("tuple<{}>", attrs.join(", "))
            }
            Type::Enum(e) => format!("enum{{{}}}", e.values.join(", ")),
            Type::TypeFormal(name) => name.clone(),
            Type::Unknown => "unknown".to_string(),
        }
    }

    /// Number of interned types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn bound_suffix(bound: Option<u32>) -> String {
    match bound {
        Some(n) => format!("[{}]", n),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_preinterned() {
        let ctx = TypeContext::new();
        assert!(ctx.is_unknown(ctx.unknown_type()));
        assert_eq!(ctx.get(TypeContext::UNKNOWN), Some(&Type::Unknown));
    }

    #[test]
    fn test_interning_shares_ids() {
        let mut ctx = TypeContext::new();
        let i32_a = ctx.primitive(PrimitiveType::Int32);
        let i32_b = ctx.primitive(PrimitiveType::Int32);
        assert_eq!(i32_a, i32_b);

        let t1 = ctx.tuple(vec![("a".into(), i32_a)]);
        let t2 = ctx.tuple(vec![("a".into(), i32_b)]);
        assert_eq!(t1, t2);

        let t3 = ctx.tuple(vec![("b".into(), i32_a)]);
        assert_ne!(t1, t3);
    }

    #[test]
    fn test_bounded_and_unbounded_lists_differ() {
        let mut ctx = TypeContext::new();
        let s = ctx.primitive(PrimitiveType::Rstring);
        assert_ne!(ctx.list(s, None), ctx.list(s, Some(4)));
    }

    #[test]
    fn test_display() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(PrimitiveType::Int32);
        let s = ctx.bounded_rstring(8);
        let l = ctx.list(s, Some(3));
        let m = ctx.map(s, i32_ty, None);
        let t = ctx.tuple(vec![("a".into(), i32_ty), ("names".into(), l)]);
        let e = ctx.enumeration(vec!["csv".into(), "txt".into()]);

        assert_eq!(ctx.display(l), "list<rstring[8]>[3]");
        assert_eq!(ctx.display(m), "map<rstring[8], int32>");
        assert_eq!(ctx.display(t), "tuple<int32 a, list<rstring[8]>[3] names>");
        assert_eq!(ctx.display(e), "enum{csv, txt}");
        assert_eq!(ctx.display(TypeContext::UNKNOWN), "unknown");
    }

    #[test]
    fn test_tuple_attributes_only_for_tuples() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(PrimitiveType::Int32);
        let t = ctx.tuple(vec![("a".into(), i32_ty)]);
        assert_eq!(ctx.tuple_attributes(t).map(|a| a.len()), Some(1));
        assert!(ctx.tuple_attributes(i32_ty).is_none());
    }
}
