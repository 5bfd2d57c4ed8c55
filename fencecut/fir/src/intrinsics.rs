use std::fmt;

macro_rules! intrinsics {
    ($($variant: ident => $name: literal,)*) => {
        /// Functions with builtin semantics. Calls to these are recognized by name.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Intrinsic {
            $($variant,)*
            /// A builtin declared with `intrinsic` that has no known semantics.
            Unknown,
        }

        impl Intrinsic {
            pub const KNOWN: &'static [Intrinsic] = &[$(Intrinsic::$variant,)*];

            pub fn from_name(name: &str) -> Intrinsic {
                match name {
                    $($name => Intrinsic::$variant,)*
                    _ => Intrinsic::Unknown,
                }
            }

            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(Intrinsic::$variant => Some($name),)*
                    Intrinsic::Unknown => None,
                }
            }
        }
    };
}

intrinsics! {
    Memset => "memset",
    Memcpy => "memcpy",
    Memmove => "memmove",
    Lfence => "lfence",
    Mfence => "mfence",
    Annotation => "annotation",
    Assume => "assume",
    DbgValue => "dbg_value",
    LifetimeStart => "lifetime_start",
    LifetimeEnd => "lifetime_end",
    Stacksave => "stacksave",
    Stackrestore => "stackrestore",
    Vastart => "vastart",
    Vaend => "vaend",
    Ctpop => "ctpop",
    Ctlz => "ctlz",
    Cttz => "cttz",
    Bswap => "bswap",
    Bitreverse => "bitreverse",
    Fshl => "fshl",
    Fshr => "fshr",
    Umin => "umin",
    Umax => "umax",
    Smin => "smin",
    Smax => "smax",
    Abs => "abs",
    Fabs => "fabs",
    Floor => "floor",
    Fmuladd => "fmuladd",
    UaddSat => "uadd_sat",
    UsubSat => "usub_sat",
    UaddWithOverflow => "uadd_with_overflow",
    UmulWithOverflow => "umul_with_overflow",
    VectorReduceAdd => "vector_reduce_add",
    VectorReduceMul => "vector_reduce_mul",
    VectorReduceAnd => "vector_reduce_and",
    VectorReduceOr => "vector_reduce_or",
    VectorReduceXor => "vector_reduce_xor",
    VectorReduceUmax => "vector_reduce_umax",
    VectorReduceUmin => "vector_reduce_umin",
    VectorReduceSmax => "vector_reduce_smax",
    VectorReduceSmin => "vector_reduce_smin",
    Aesenc => "aesenc",
    Aesenclast => "aesenclast",
    Aeskeygenassist => "aeskeygenassist",
    Pclmulqdq => "pclmulqdq",
    Rdrand => "rdrand",
    MaskedLoad => "masked_load",
    MaskedGather => "masked_gather",
    EhTypeidFor => "eh_typeid_for",
    ConstrainedFadd => "constrained_fadd",
    ConstrainedFsub => "constrained_fsub",
    ConstrainedFmul => "constrained_fmul",
    ConstrainedFdiv => "constrained_fdiv",
}

/// A function called by the body of a [`Function`](crate::Function).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: u16,
    pub returns: bool,
    /// Set for builtins. The name of an `Unknown` intrinsic is kept in `name`.
    pub intrinsic: Option<Intrinsic>,
}

impl FunctionSignature {
    pub fn external(name: impl Into<String>, params: u16, returns: bool) -> FunctionSignature {
        FunctionSignature { name: name.into(), params, returns, intrinsic: None }
    }

    pub fn intrinsic(name: impl Into<String>, params: u16, returns: bool) -> FunctionSignature {
        let name = name.into();
        let intrinsic = Intrinsic::from_name(&name);
        FunctionSignature { name, params, returns, intrinsic: Some(intrinsic) }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.intrinsic.is_some() { "intrinsic" } else { "fn" };
        write!(f, "{kind} %{}({}) -> {}", self.name, self.params, u8::from(self.returns))
    }
}
