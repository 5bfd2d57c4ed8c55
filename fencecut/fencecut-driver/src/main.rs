use std::fs;
use std::io::{self, Write};
use std::process::exit;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::ArgMatches;
use fir::BasicAliasAnalysis;
use fir_reader::parse_functions;
use log::error;
use mimalloc::MiMalloc;
use mitigate::mitigate_function;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli_def::main_command;
use crate::cli_process::{matches_to_opts, Opts};

mod cli_def;
mod cli_process;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub fn main() {
    let matches = main_command().get_matches();

    let env = env_logger::Env::default().filter("FENCECUT_LOG").write_style("FENCECUT_LOG_STYLE");
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Off)
        .parse_env(env)
        .init();

    match wrapped_main(matches) {
        Ok(err_code) => exit(err_code),
        Err(err) => {
            // nothing sensible is left to do if stderr is gone
            let _ = print_error(&err);
            exit(DATA_ERROR)
        }
    }
}

pub const DATA_ERROR: i32 = 65;
pub const TIMEOUT_ERROR: i32 = 124;

fn wrapped_main(matches: ArgMatches) -> Result<i32> {
    let opts = matches_to_opts(matches)?;
    if let Some(timeout) = opts.timeout {
        start_watchdog(timeout);
    }
    run(&opts)
}

/// Terminates the process once `timeout` has passed. A partially mitigated function must never
/// be printed, so there is no attempt to stop gracefully.
fn start_watchdog(timeout: Duration) {
    thread::spawn(move || {
        thread::sleep(timeout);
        error!("timeout after {}s", timeout.as_secs());
        let _ = print_error(&anyhow::anyhow!("timeout after {}s", timeout.as_secs()));
        exit(TIMEOUT_ERROR)
    });
}

fn run(opts: &Opts) -> Result<i32> {
    let start = Instant::now();
    let mut printed = String::new();
    let mut stats = Vec::new();
    let mut failed = 0;

    for input in &opts.inputs {
        let src = fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?;
        let funcs = parse_functions(&src).with_context(|| format!("failed to parse {input}"))?;
        for mut func in funcs {
            match mitigate_function(&mut func, &BasicAliasAnalysis, &opts.config) {
                Ok(func_stats) => stats.push(func_stats),
                Err(err) => {
                    failed += 1;
                    let err = anyhow::Error::new(err)
                        .context(format!("failed to mitigate %{} in {input}", func.name));
                    print_error(&err)?;
                }
            }
            if !printed.is_empty() {
                printed.push('\n');
            }
            printed.push_str(&func.to_debug_string());
        }
    }

    match &opts.output {
        Some(path) => {
            fs::write(path, &printed).with_context(|| format!("failed to write {path}"))?
        }
        None => print!("{printed}"),
    }
    if opts.print_stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    if failed != 0 {
        return Ok(DATA_ERROR);
    }

    let fences: usize = stats.iter().map(|stats| stats.fences).sum();
    let seconds = Instant::elapsed(&start).as_secs_f64();
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(&mut stderr, "Finished")?;
    stderr.set_color(&ColorSpec::new())?;
    writeln!(
        &mut stderr,
        " mitigating {} functions ({fences} fences) in {seconds:.2}s",
        stats.len()
    )?;
    Ok(0)
}

fn print_error(err: &anyhow::Error) -> io::Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for cause in err.chain() {
        stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(&mut stderr, "error")?;
        stderr.set_color(ColorSpec::new().set_bold(true))?;
        write!(&mut stderr, ":")?;
        stderr.set_color(&ColorSpec::new())?;
        writeln!(&mut stderr, " {cause}")?;
    }
    Ok(())
}
