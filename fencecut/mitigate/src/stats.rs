use std::time::Duration;

use serde::Serialize;

/// Per function statistics of the mitigation pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MitigationStats {
    pub function: String,
    /// The function was on the skip list and left untouched.
    pub skipped: bool,
    pub instructions: usize,
    pub nonspeculative_secrets: usize,
    pub speculative_secrets: usize,
    pub transmitters: TransmitterStats,
    pub stores: AccessStats,
    pub loads: AccessStats,
    pub constraints: ConstraintStats,
    pub solver: String,
    pub cut_edges: usize,
    pub fences: usize,
    pub edge_splits: usize,
    /// Time spent in the min-cut solver.
    #[serde(serialize_with = "serialize_secs")]
    pub solve_time: Duration,
    /// Time spent checking that the cut blocks every constraint.
    #[serde(serialize_with = "serialize_secs")]
    pub validate_time: Duration,
}

/// Instructions with transmitter operands by their most observable secret operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransmitterStats {
    pub safe: usize,
    pub pseudo: usize,
    pub strong: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccessStats {
    /// Accesses to constant addresses.
    pub constant: usize,
    pub nonconstant_public: usize,
    pub nonconstant_secret: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintStats {
    pub store_to_transmitter: usize,
    pub store_to_control: usize,
    pub load_to_transmitter: usize,
}

impl ConstraintStats {
    pub fn total(&self) -> usize {
        self.store_to_transmitter + self.store_to_control + self.load_to_transmitter
    }
}

fn serialize_secs<S: serde::Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

impl MitigationStats {
    pub fn skipped(function: &str) -> MitigationStats {
        MitigationStats { function: function.to_owned(), skipped: true, ..Default::default() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
