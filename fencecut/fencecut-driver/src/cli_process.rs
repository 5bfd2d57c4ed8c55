use std::time::Duration;

use anyhow::{bail, Result};
use camino::Utf8PathBuf;
use clap::ArgMatches;
use mincut::{GreedyOrder, Strategy};
use mitigate::{ConstraintKind, EdgeWeights, MitigationConfig};
use taint::AliasPolicy;

use crate::cli_def::{
    ALIAS_POLICY, DISABLE, DOMINATOR_WEIGHT, EXACT_LIMIT, GREEDY_ORDER, INPUT, LOOP_WEIGHT,
    OUTPUT, SKIP, STATS, STRATEGY, STRICT_CALLING_CONV, TIMEOUT, WEIGHTED,
};

pub struct Opts {
    pub inputs: Vec<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
    pub config: MitigationConfig,
    pub print_stats: bool,
    pub timeout: Option<Duration>,
}

pub fn matches_to_opts(matches: ArgMatches) -> Result<Opts> {
    let inputs: Vec<Utf8PathBuf> =
        matches.get_many::<Utf8PathBuf>(INPUT).map_or_else(Vec::new, |it| it.cloned().collect());
    let output = matches.get_one::<Utf8PathBuf>(OUTPUT).cloned();

    let alias_policy = match matches.get_one::<String>(ALIAS_POLICY).map(String::as_str) {
        Some("sound") => AliasPolicy::Sound,
        Some("optimistic") => AliasPolicy::Optimistic,
        Some(policy) => bail!("unknown alias policy {policy}"),
        None => bail!("an alias policy is required\nhelp: pass --alias-policy sound"),
    };

    let mut config = MitigationConfig::new(alias_policy);
    config.taint.strict_calling_conv = matches.get_flag(STRICT_CALLING_CONV);

    let greedy_order = match matches.get_one::<String>(GREEDY_ORDER).map(String::as_str) {
        Some("criticality") => GreedyOrder::Criticality,
        Some("construction") | None => GreedyOrder::Construction,
        Some(order) => bail!("unknown greedy order {order}"),
    };
    let exact_limit =
        matches.get_one::<usize>(EXACT_LIMIT).copied().unwrap_or(mincut::DEFAULT_EXACT_LIMIT);
    config.strategy = match matches.get_one::<String>(STRATEGY).map(String::as_str) {
        Some("exact") => Strategy::Exact,
        Some("greedy") => Strategy::Greedy(greedy_order),
        Some("auto") | None => Strategy::Auto { exact_limit },
        Some(strategy) => bail!("unknown strategy {strategy}"),
    };

    config.weights = EdgeWeights {
        enabled: matches.get_flag(WEIGHTED),
        loop_weight: matches.get_one::<f64>(LOOP_WEIGHT).copied().unwrap_or(1.0),
        dominator_weight: matches.get_one::<f64>(DOMINATOR_WEIGHT).copied().unwrap_or(1.0),
    };

    if let Some(disabled) = matches.get_many::<String>(DISABLE) {
        for kind in disabled {
            let kind: ConstraintKind = kind.parse().map_err(anyhow::Error::msg)?;
            config.constraints.set(kind, false);
        }
    }

    config.skip_functions =
        matches.get_many::<String>(SKIP).map_or_else(Vec::new, |it| it.cloned().collect());

    let timeout = matches.get_one::<u64>(TIMEOUT).map(|&secs| Duration::from_secs(secs));

    Ok(Opts { inputs, output, config, print_stats: matches.get_flag(STATS), timeout })
}
