// src/sema/types.rs
//! The coarse value-type model driving codegen decisions.
//!
//! Types here are tags, not a lattice: sema only needs enough precision to
//! pick reference-counting and integer fast paths downstream.

/// The closed set of value-type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Any,
    Boolean,
    Number,
    Int,
    List,
    Map,
    Fiber,
    String,
    StaticString,
    Box,
    Tag,
    TagLiteral,
    Undefined,
}

/// A type tag plus its per-tag payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Type {
    Any,
    Boolean,
    Number {
        /// Literals that fit signed 32-bit may be requested as integers by
        /// operator consumers. Cleared on storage into a local.
        can_request_integer: bool,
    },
    Int,
    List,
    Map,
    Fiber,
    String,
    StaticString,
    Box,
    Tag {
        tag_id: u8,
    },
    TagLiteral,
    /// Not yet assigned. Must never reach codegen on a live path.
    Undefined,
}

impl Type {
    pub fn number() -> Type {
        Type::Number {
            can_request_integer: false,
        }
    }

    pub fn number_or_request_integer() -> Type {
        Type::Number {
            can_request_integer: true,
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Any => TypeTag::Any,
            Type::Boolean => TypeTag::Boolean,
            Type::Number { .. } => TypeTag::Number,
            Type::Int => TypeTag::Int,
            Type::List => TypeTag::List,
            Type::Map => TypeTag::Map,
            Type::Fiber => TypeTag::Fiber,
            Type::String => TypeTag::String,
            Type::StaticString => TypeTag::StaticString,
            Type::Box => TypeTag::Box,
            Type::Tag { .. } => TypeTag::Tag,
            Type::TagLiteral => TypeTag::TagLiteral,
            Type::Undefined => TypeTag::Undefined,
        }
    }

    /// True when the runtime representation is reference-counted and the
    /// value needs a release when a holding local dies.
    pub fn rc_candidate(&self) -> bool {
        matches!(
            self,
            Type::List | Type::Map | Type::Fiber | Type::String | Type::Box | Type::Any
        )
    }

    /// Lower a value type to what a local variable stores. Storage drops the
    /// integer-request side channel.
    pub fn to_local_type(self) -> Type {
        match self {
            Type::Number { .. } => Type::number(),
            other => other,
        }
    }

    pub fn can_request_integer(&self) -> bool {
        matches!(
            self,
            Type::Int
                | Type::Number {
                    can_request_integer: true
                }
        )
    }

    pub fn name(&self) -> &'static str {
        match self.tag() {
            TypeTag::Any => "any",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::Int => "int",
            TypeTag::List => "List",
            TypeTag::Map => "Map",
            TypeTag::Fiber => "fiber",
            TypeTag::String => "string",
            TypeTag::StaticString => "staticString",
            TypeTag::Box => "box",
            TypeTag::Tag => "tag",
            TypeTag::TagLiteral => "tagLiteral",
            TypeTag::Undefined => "undefined",
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self.tag(), TypeTag::String | TypeTag::StaticString)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_candidates_are_exactly_the_boxed_kinds() {
        let rc = [
            Type::List,
            Type::Map,
            Type::Fiber,
            Type::String,
            Type::Box,
            Type::Any,
        ];
        for ty in rc {
            assert!(ty.rc_candidate(), "{} should be rc", ty.name());
        }
        let plain = [
            Type::Boolean,
            Type::number(),
            Type::Int,
            Type::StaticString,
            Type::Tag { tag_id: 0 },
            Type::TagLiteral,
            Type::Undefined,
        ];
        for ty in plain {
            assert!(!ty.rc_candidate(), "{} should not be rc", ty.name());
        }
    }

    #[test]
    fn storage_clears_integer_request() {
        let lit = Type::number_or_request_integer();
        assert!(lit.can_request_integer());
        let stored = lit.to_local_type();
        assert_eq!(stored, Type::number());
        assert!(!stored.can_request_integer());
    }

    #[test]
    fn int_always_requests_integer() {
        assert!(Type::Int.can_request_integer());
        assert!(!Type::number().can_request_integer());
    }
}
