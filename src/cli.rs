//! Command line surface
use std::{
    fs::File,
    io::{BufReader, BufWriter},
};

use clap::{Arg, ArgAction, ArgMatches, Command};
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};

use crate::{cfg::Config, codec::Codec, orbit::OrbitSource, session::Session};

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const TOO_MANY_INPUTS: i32 = -1;
    pub const MISSING_INPUTS: i32 = -2;
    pub const MISSING_OUTPUT: i32 = -3;
    pub const OPEN_FAILURE: i32 = -4;
    pub const RUN_FAILURE: i32 = -5;
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub rover: String,
    pub base: String,
    pub output: String,
    pub trace_level: u8,
    pub cfg: Config,
}

fn command() -> Command {
    Command::new("pr_adjust")
        .author("Guillaume W. Bres <guillaume.bressaix@gmail.com>")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Apply DGNSS corrections to a stream of rover observations")
        .override_usage("pr_adjust [option ...] <rover stream> <correction stream>")
        .arg(
            Arg::new("inputs")
                .action(ArgAction::Append)
                .num_args(1..)
                .help("Rover stream, then base (correction) stream"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .action(ArgAction::Set)
                .help("Output file"),
        )
        .arg(
            Arg::new("frequencies")
                .short('f')
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(usize))
                .help("Number of frequencies (1:L1, 2:L1+L2, 3:L1+L2+L5) [3]"),
        )
        .arg(
            Arg::new("sys")
                .long("sys")
                .action(ArgAction::Set)
                .help("Navigation system(s) (G:GPS,R:GLO,E:GAL,J:QZS,C:BDS,I:IRN) [G,E,C]"),
        )
        .arg(
            Arg::new("ex")
                .long("ex")
                .action(ArgAction::Set)
                .help("Excluded satellites (G05,E11..)"),
        )
        .arg(
            Arg::new("tr")
                .long("tr")
                .action(ArgAction::Set)
                .num_args(2)
                .value_names(["y/m/d", "h:m:s"])
                .help("Approximate time of the streams"),
        )
        .arg(
            Arg::new("trace")
                .short('x')
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(u8))
                .help("Debug trace level (0:off) [0]"),
        )
}

/// Single dash long options ("-sys", "-ex", "-tr") are accepted.
fn normalize<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-sys" | "-ex" | "-tr" => format!("-{}", arg),
            _ => arg,
        })
        .collect()
}

fn options(matches: &ArgMatches) -> Result<Options, i32> {
    let inputs = matches
        .get_many::<String>("inputs")
        .map(|inputs| inputs.cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    if inputs.len() > 2 {
        eprintln!("error : too many input files");
        return Err(exit_code::TOO_MANY_INPUTS);
    }

    if inputs.len() < 2 {
        eprintln!("error : missing input files");
        return Err(exit_code::MISSING_INPUTS);
    }

    let output = match matches.get_one::<String>("output") {
        Some(output) => output.clone(),
        None => {
            eprintln!("error : missing output file");
            return Err(exit_code::MISSING_OUTPUT);
        },
    };

    let mut cfg = Config::default();

    if let Some(frequencies) = matches.get_one::<usize>("frequencies") {
        cfg.frequencies = *frequencies;
    }

    let invalid = |e: crate::cfg::Error| {
        eprintln!("error : {}", e);
        exit_code::RUN_FAILURE
    };

    if let Some(csv) = matches.get_one::<String>("sys") {
        cfg = cfg.with_constellations_csv(csv).map_err(invalid)?;
    }

    if let Some(csv) = matches.get_one::<String>("ex") {
        cfg = cfg.with_excluded_csv(csv).map_err(invalid)?;
    }

    if let Some(values) = matches.get_many::<String>("tr") {
        let description = values.cloned().collect::<Vec<_>>().join(" ");
        cfg = cfg
            .with_reference_epoch_str(&description)
            .map_err(invalid)?;
    }

    Ok(Options {
        rover: inputs[0].clone(),
        base: inputs[1].clone(),
        output,
        trace_level: matches.get_one::<u8>("trace").copied().unwrap_or(0),
        cfg,
    })
}

/// Parses the command line. Err contains the process exit code,
/// help and version requests exit successfully.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Options, i32> {
    match command().try_get_matches_from(normalize(args)) {
        Ok(matches) => options(&matches),
        Err(e) => {
            let _ = e.print();
            Err(exit_code::SUCCESS)
        },
    }
}

/// Trace verbosity to [LevelFilter]
pub fn level_filter(trace_level: u8) -> LevelFilter {
    match trace_level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Traces are written to "<output>.trace", or stderr
/// when that file cannot be created.
fn init_logger(trace_level: u8, output: &str) {
    let mut builder = Builder::new();
    builder
        .filter_level(level_filter(trace_level))
        .format_module_path(false);

    if trace_level > 0 {
        let path = format!("{}.trace", output);
        match File::create(&path) {
            Ok(fd) => {
                builder.target(Target::Pipe(Box::new(fd)));
            },
            Err(e) => {
                eprintln!("failed to create {}: {}", path, e);
                builder.target(Target::Stderr);
            },
        }
    }

    let _ = builder.try_init();
}

/// Command line entry point, returns the process exit code.
/// The wire [Codec] is provided by `codec`, one instance per stream.
pub fn main_with<I, C, F, O>(args: I, orbits: O, codec: F) -> i32
where
    I: IntoIterator<Item = String>,
    C: Codec,
    F: Fn() -> C,
    O: OrbitSource,
{
    let opts = match parse(args) {
        Ok(opts) => opts,
        Err(code) => return code,
    };

    init_logger(opts.trace_level, &opts.output);

    let rover = match File::open(&opts.rover) {
        Ok(fd) => BufReader::new(fd),
        Err(e) => {
            error!("failed to open input file {}: {}", opts.rover, e);
            eprintln!("Failed to open input file {}", opts.rover);
            return exit_code::OPEN_FAILURE;
        },
    };

    let base = match File::open(&opts.base) {
        Ok(fd) => BufReader::new(fd),
        Err(e) => {
            error!("failed to open input file {}: {}", opts.base, e);
            eprintln!("Failed to open input file {}", opts.base);
            return exit_code::OPEN_FAILURE;
        },
    };

    let output = match File::create(&opts.output) {
        Ok(fd) => BufWriter::new(fd),
        Err(e) => {
            error!("failed to open output file {}: {}", opts.output, e);
            eprintln!("Failed to open output file {}", opts.output);
            return exit_code::OPEN_FAILURE;
        },
    };

    info!("{:?}", opts.cfg);

    let mut session = match Session::new(opts.cfg, orbits, rover, base, output, codec) {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            eprintln!("error : {}", e);
            return exit_code::RUN_FAILURE;
        },
    };

    match session.run() {
        Ok(report) => {
            info!("{}", report);
            exit_code::SUCCESS
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("error : {}", e);
            exit_code::RUN_FAILURE
        },
    }
}
