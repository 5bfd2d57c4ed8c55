use core::fmt;
use core::str::FromStr;

use mincut::Strategy;
use taint::{AliasPolicy, TaintConfig};

use crate::EdgeWeights;

/// The kinds of constraints the pass derives from the taint analyses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// An out-of-bounds store of a secret must not reach a transmitter that depends on a load the
    /// store may have overwritten.
    StoreToTransmitter,
    /// Out-of-bounds stores of secrets must resolve before control leaves the function.
    StoreToControl,
    /// A speculatively secret transmitter operand must not be computed from an out-of-bounds
    /// load.
    LoadToTransmitter,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 3] = [
        ConstraintKind::StoreToTransmitter,
        ConstraintKind::StoreToControl,
        ConstraintKind::LoadToTransmitter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConstraintKind::StoreToTransmitter => "store-transmitter",
            ConstraintKind::StoreToControl => "store-control",
            ConstraintKind::LoadToTransmitter => "load-transmitter",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstraintKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown constraint kind '{s}'"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnabledConstraints {
    pub store_to_transmitter: bool,
    pub store_to_control: bool,
    pub load_to_transmitter: bool,
}

impl Default for EnabledConstraints {
    fn default() -> Self {
        EnabledConstraints {
            store_to_transmitter: true,
            store_to_control: true,
            load_to_transmitter: true,
        }
    }
}

impl EnabledConstraints {
    pub fn is_enabled(&self, kind: ConstraintKind) -> bool {
        match kind {
            ConstraintKind::StoreToTransmitter => self.store_to_transmitter,
            ConstraintKind::StoreToControl => self.store_to_control,
            ConstraintKind::LoadToTransmitter => self.load_to_transmitter,
        }
    }

    pub fn set(&mut self, kind: ConstraintKind, enabled: bool) {
        match kind {
            ConstraintKind::StoreToTransmitter => self.store_to_transmitter = enabled,
            ConstraintKind::StoreToControl => self.store_to_control = enabled,
            ConstraintKind::LoadToTransmitter => self.load_to_transmitter = enabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MitigationConfig {
    pub taint: TaintConfig,
    pub constraints: EnabledConstraints,
    pub weights: EdgeWeights,
    pub strategy: Strategy,
    /// Functions with these names are left untouched.
    pub skip_functions: Vec<String>,
}

impl MitigationConfig {
    /// There is no default alias policy, it must always be chosen explicitly.
    pub fn new(alias_policy: AliasPolicy) -> MitigationConfig {
        MitigationConfig {
            taint: TaintConfig::new(alias_policy),
            constraints: EnabledConstraints::default(),
            weights: EdgeWeights::default(),
            strategy: Strategy::default(),
            skip_functions: Vec::new(),
        }
    }

    pub fn skips(&self, name: &str) -> bool {
        self.skip_functions.iter().any(|skip| skip == name)
    }
}
