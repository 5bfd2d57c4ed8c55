use fir::Inst;
use thiserror::Error;

/// An instruction the taint rules do not cover.
///
/// Ignoring such an instruction would under-approximate the secret values of a function, so the
/// analysis of the whole function is aborted instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaintError {
    #[error("unhandled instruction '{kind}' ({inst})")]
    UnhandledInstruction { inst: Inst, kind: String },

    #[error("unhandled intrinsic '{name}' called by {inst}")]
    UnhandledIntrinsic { inst: Inst, name: String },
}

pub type TaintResult<T> = Result<T, TaintError>;
