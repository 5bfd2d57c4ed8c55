//! Entity handles.
//!
//! Every object of a function body (instructions, blocks, values, ...) lives in a table owned by
//! the [`Function`](crate::Function). Everything else only holds these small `u32` handles, which
//! double as keys for `TiVec` and `BitSet`.

use core::fmt;

macro_rules! entity {
    ($(#[$attr: meta])* $name: ident, $prefix: literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a new instance from a `u32`.
            ///
            /// Returns `None` for the reserved value `u32::MAX`.
            #[inline]
            pub fn with_number(n: u32) -> Option<Self> {
                if n < u32::MAX {
                    Some(Self(n))
                } else {
                    None
                }
            }

            #[inline]
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(raw: usize) -> Self {
                debug_assert!(raw < u32::MAX as usize);
                Self(raw as u32)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(entity: $name) -> usize {
                entity.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

entity! {
    /// An opaque reference to a basic block in a [`Function`](crate::Function).
    Block, "block"
}

entity! {
    /// An opaque reference to an instruction in a [`Function`](crate::Function).
    Inst, "inst"
}

entity! {
    /// An opaque reference to an SSA value.
    ///
    /// A value is an instruction result, a function parameter, an integer constant or the address
    /// of a global.
    Value, "v"
}

entity! {
    /// A function parameter, in declaration order.
    Param, "param"
}

entity! {
    /// A reference to an external function or intrinsic declared in the function preamble.
    FuncRef, "fn"
}

/// A reference to any of the entities defined in this module that can appear in diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnyEntity {
    Block(Block),
    Inst(Inst),
    Value(Value),
    FuncRef(FuncRef),
}

impl fmt::Display for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Block(r) => r.fmt(f),
            Self::Inst(r) => r.fmt(f),
            Self::Value(r) => r.fmt(f),
            Self::FuncRef(r) => r.fmt(f),
        }
    }
}

impl From<Block> for AnyEntity {
    fn from(r: Block) -> Self {
        Self::Block(r)
    }
}

impl From<Inst> for AnyEntity {
    fn from(r: Inst) -> Self {
        Self::Inst(r)
    }
}

impl From<Value> for AnyEntity {
    fn from(r: Value) -> Self {
        Self::Value(r)
    }
}

impl From<FuncRef> for AnyEntity {
    fn from(r: FuncRef) -> Self {
        Self::FuncRef(r)
    }
}
