use std::fs;
use std::path::Path;

use anyhow::bail;
use camino::Utf8Path;
use clap::builder::{PossibleValue, PossibleValuesParser, ValueParser};
use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use mitigate::ConstraintKind;

const ABOUT: &str = r"Inserts speculation barriers into FIR functions until no out-of-bounds access
can leak through a side channel under misspeculation.";

pub fn main_command() -> Command {
    Command::new("fencecut")
        .version(env!("CARGO_PKG_VERSION"))
        .about(ABOUT)
        .args([
            alias_policy(),
            strict_calling_conv(),
            strategy(),
            greedy_order(),
            exact_limit(),
            weighted(),
            loop_weight(),
            dominator_weight(),
            disable(),
            skip(),
            stats(),
            timeout(),
            output(),
            input(),
        ])
        .arg_required_else_help(true)
}

pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";
pub const ALIAS_POLICY: &str = "alias-policy";
pub const STRICT_CALLING_CONV: &str = "strict-calling-conv";
pub const STRATEGY: &str = "strategy";
pub const GREEDY_ORDER: &str = "greedy-order";
pub const EXACT_LIMIT: &str = "exact-limit";
pub const WEIGHTED: &str = "weighted";
pub const LOOP_WEIGHT: &str = "loop-weight";
pub const DOMINATOR_WEIGHT: &str = "dominator-weight";
pub const DISABLE: &str = "disable";
pub const SKIP: &str = "skip";
pub const STATS: &str = "stats";
pub const TIMEOUT: &str = "timeout";

fn alias_policy() -> Arg {
    Arg::new(ALIAS_POLICY)
        .long(ALIAS_POLICY)
        .short('a')
        .help("How may-alias answers of the alias analysis are treated.")
        .long_help("How may-alias answers of the alias analysis are treated.\nThere is no default, the policy must always be chosen explicitly.\n\npossible values\n\nsound - only must-alias proves that two accesses touch the same memory\noptimistic - may-alias is treated like must-alias (unsound, fewer barriers)")
        .value_name("POLICY")
        .value_parser(PossibleValuesParser::new([
            PossibleValue::new("sound"),
            PossibleValue::new("optimistic"),
        ]))
        .hide_possible_values(true)
        .required(true)
}

fn strict_calling_conv() -> Arg {
    flag(STRICT_CALLING_CONV, STRICT_CALLING_CONV)
        .help("Assume calls only exchange public values.")
        .long_help("Assume calls only exchange public values.\nCall arguments, call results and returned values are treated as public.")
}

fn strategy() -> Arg {
    Arg::new(STRATEGY)
        .long(STRATEGY)
        .short('s')
        .help("The min cut solver.")
        .long_help("The min cut solver.\n\npossible values\n\nexact - a maximum flow per constraint\ngreedy - cut the heaviest edge of an open path until every constraint is blocked\nauto - exact for at most --exact-limit constraints, greedy otherwise")
        .value_name("SOLVER")
        .value_parser(["exact", "greedy", "auto"])
        .default_value("auto")
        .hide_possible_values(true)
}

fn greedy_order() -> Arg {
    Arg::new(GREEDY_ORDER)
        .long(GREEDY_ORDER)
        .help("The order in which the greedy solver processes constraints.")
        .long_help("The order in which the greedy solver processes constraints.\n\npossible values\n\nconstruction - the order in which they were extracted\ncriticality - constraints with the fewest source/sink pairs first")
        .value_name("ORDER")
        .value_parser(["construction", "criticality"])
        .default_value("construction")
        .hide_possible_values(true)
}

fn exact_limit() -> Arg {
    Arg::new(EXACT_LIMIT)
        .long(EXACT_LIMIT)
        .help("The largest number of constraints the auto strategy solves exactly.")
        .value_name("N")
        .value_hint(ValueHint::Other)
        .value_parser(value_parser!(usize))
        .default_value("16")
}

fn weighted() -> Arg {
    flag(WEIGHTED, WEIGHTED)
        .help("Weigh edges by loop depth and dominator depth.")
        .long_help("Weigh edges by loop depth and dominator depth.\nBarriers inside loops become more expensive, barriers deep in the dominator tree cheaper.\nOtherwise every edge has the same weight.")
}

fn loop_weight() -> Arg {
    Arg::new(LOOP_WEIGHT)
        .long(LOOP_WEIGHT)
        .help("The exponent of the loop depth in the edge weight.")
        .value_name("EXP")
        .value_hint(ValueHint::Other)
        .value_parser(value_parser!(f64))
        .default_value("1.0")
}

fn dominator_weight() -> Arg {
    Arg::new(DOMINATOR_WEIGHT)
        .long(DOMINATOR_WEIGHT)
        .help("The exponent of the dominator tree depth in the edge weight.")
        .value_name("EXP")
        .value_hint(ValueHint::Other)
        .value_parser(value_parser!(f64))
        .default_value("1.0")
}

fn disable() -> Arg {
    Arg::new(DISABLE)
        .long(DISABLE)
        .short('d')
        .help("Do not mitigate this kind of constraint.")
        .long_help("Do not mitigate this kind of constraint.\n\npossible values\n\nstore-transmitter - out-of-bounds stores of secrets reaching transmitters\nstore-control - out-of-bounds stores of secrets reaching calls and returns\nload-transmitter - out-of-bounds loads reaching transmitters")
        .value_name("KIND")
        .action(ArgAction::Append)
        .value_parser(PossibleValuesParser::new(
            ConstraintKind::ALL.map(|kind| PossibleValue::new(kind.name())),
        ))
        .hide_possible_values(true)
}

fn skip() -> Arg {
    Arg::new(SKIP)
        .long(SKIP)
        .help("Leave the function with this name untouched.")
        .value_name("FUNCTION")
        .action(ArgAction::Append)
        .value_hint(ValueHint::Other)
}

fn stats() -> Arg {
    flag(STATS, STATS).help("Print statistics as JSON after the mitigated functions.")
}

fn timeout() -> Arg {
    Arg::new(TIMEOUT)
        .long(TIMEOUT)
        .short('t')
        .help("Abort after this many seconds.")
        .long_help("Abort after this many seconds.\nThe process is terminated without printing partial results.")
        .value_name("SECS")
        .value_hint(ValueHint::Other)
        .value_parser(value_parser!(u64))
}

fn input() -> Arg {
    input_file_path_arg(INPUT)
        .help("The FIR files to mitigate.")
        .action(ArgAction::Append)
        .num_args(1..)
        .required(true)
}

fn output() -> Arg {
    output_file_path_arg(OUTPUT)
        .long(OUTPUT)
        .short('o')
        .help("Write the mitigated functions to this file instead of stdout.")
        .required(false)
}

fn flag(name: &'static str, long: &'static str) -> Arg {
    Arg::new(name).long(long).action(ArgAction::SetTrue)
}

fn output_file_path_arg(name: &'static str) -> Arg {
    let parse = |raw: &str| {
        let path = Utf8Path::new(raw).to_owned();

        if path.exists() {
            match fs::metadata(&path) {
                Err(err) => bail!("{err}"),
                Ok(info) if !info.is_file() => bail!("is not a file"),
                _ => Ok(path),
            }
        } else {
            use path_absolutize::Absolutize;

            let raw_path: &Path = path.as_ref();
            let raw_path = match raw_path.absolutize() {
                Ok(path) => path,
                Err(err) => bail!("failed to access {err}"),
            };

            let parent = match raw_path.parent() {
                Some(parent) => parent,
                None => bail!("is not a file"),
            };

            match fs::metadata(parent) {
                Err(err) => bail!("{} {err}", parent.display()),
                Ok(info) if !info.is_dir() => bail!("{} is not a directory", parent.display()),
                _ => Ok(path),
            }
        }
    };

    Arg::new(name)
        .value_name("FILE")
        .value_hint(ValueHint::FilePath)
        .value_parser(ValueParser::new(parse))
}

fn input_file_path_arg(name: &'static str) -> Arg {
    let parse = |raw: &str| {
        let path = Utf8Path::new(raw).to_owned();

        match fs::metadata(&path) {
            Err(err) => bail!("{err}"),
            Ok(info) if !info.is_file() => bail!("is not a file"),
            _ => Ok(path),
        }
    };

    Arg::new(name).value_name("FILE").value_hint(ValueHint::FilePath).value_parser(parse)
}
