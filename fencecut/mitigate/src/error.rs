use fir::Inst;
use mincut::CutViolation;
use taint::TaintError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MitigationError {
    #[error(transparent)]
    Taint(#[from] TaintError),
    #[error("unsound mitigation: {0}")]
    UnsoundCut(#[from] CutViolation<Inst>),
}

pub type MitigationResult<T> = Result<T, MitigationError>;
