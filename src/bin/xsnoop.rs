//! Command-line interface for xsnoop
//! Prints a bpftrace probe for every kfunc taking an argument of the requested type.
//!
//! Usage:
//!   xsnoop --X-type `<type>` --X-output `<fields>` [--no-type `<type>`] [--X-filter `<expr>`]
//!
//! Example:
//!   xsnoop --X-type "struct net_device *" --no-type "struct sk_buff *" \
//!          --X-filter 'X->name == "eth0"' --X-output "X->name:%s" > netdev.bt

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xsnoop::config::Loader;
use xsnoop::listing::ListingSource;
use xsnoop::{Emit, SnoopError, SnoopOptions, Snooper};

fn build_cli() -> Command {
    Command::new("xsnoop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Snoop every kfunc taking an argument of a given type")
        .arg(
            Arg::new("x-type")
                .long("X-type")
                .value_name("TYPE")
                .help("Declared argument type to match, e.g. \"struct net_device *\"")
                .required(true),
        )
        .arg(
            Arg::new("no-type")
                .long("no-type")
                .value_name("TYPE")
                .help("Skip functions that also take this type, e.g. \"struct sk_buff *\""),
        )
        .arg(
            Arg::new("x-filter")
                .long("X-filter")
                .value_name("EXPR")
                .help("bpftrace condition over X, e.g. 'X->name == \"eth0\"'")
                .default_value("true"),
        )
        .arg(
            Arg::new("x-output")
                .long("X-output")
                .value_name("FIELDS")
                .help("Fields to print, e.g. \"X->name:%s,X->ifindex:%d\" (reserved)")
                .required(true),
        )
        .arg(
            Arg::new("listing")
                .long("listing")
                .value_name("PATH")
                .help("Read a saved `bpftrace -lv` listing instead of running bpftrace ('-' for stdin)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("listing-command")
                .long("listing-command")
                .value_name("CMD")
                .help("Command producing the listing (default: bpftrace)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Configuration file layered over the built-in defaults")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .help("What to print")
                .value_parser(["snippets", "table-json"])
                .default_value("snippets"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .help("Write to a file instead of stdout")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase log verbosity (repeatable)")
                .action(ArgAction::Count),
        )
}

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays a clean bpftrace script. RUST_LOG wins over -v.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), SnoopError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }
    if let Some(command) = matches.get_one::<String>("listing-command") {
        loader = loader.set_override("listing.command", command.as_str())?;
    }
    let config = loader.build()?;

    let target_type = matches
        .get_one::<String>("x-type")
        .expect("X-type is required");
    let output_fields = matches
        .get_one::<String>("x-output")
        .expect("X-output is required");
    let filter = matches
        .get_one::<String>("x-filter")
        .expect("X-filter has a default");

    let mut options = SnoopOptions::new(target_type.as_str())
        .with_filter(filter.as_str())
        .with_output(output_fields);
    if let Some(excluded) = matches.get_one::<String>("no-type") {
        options = options.excluding(excluded.as_str());
    }

    let emit = matches
        .get_one::<String>("emit")
        .and_then(|name| Emit::from_name(name))
        .unwrap_or_default();

    let listing_path = matches.get_one::<PathBuf>("listing").map(PathBuf::as_path);
    let source = ListingSource::open(&config.listing, listing_path)?;

    let mut out: Box<dyn Write> = match matches.get_one::<PathBuf>("output") {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let snooper = Snooper::new(options, config);
    let summary = snooper.run(source, &mut out, emit)?;
    tracing::info!(
        functions = summary.functions,
        snippets = summary.snippets,
        "done"
    );
    Ok(())
}
