use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use deep_match::{compile, eq_deeply_with, from_json, match_deeply_with, Config, UsageError};
use tracing::level_filters::LevelFilter;

/// Check a JSON document against an expected-value expression.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON document (string), or `-` to read it from stdin.
    got: String,
    /// Expected value, e.g. '{"id": any(1, 2), "tags": contains("x")}'
    expected: String,
    /// Name of the document root in reported paths.
    #[arg(long, default_value = "DATA")]
    root_name: String,
    /// Maximum nesting rendered in got/expected values.
    #[arg(long, default_value_t = 32)]
    max_depth: usize,
    /// Print the report as JSON.
    #[arg(long, conflicts_with = "quiet")]
    json: bool,
    /// Print nothing, only set the exit status.
    #[arg(short, long)]
    quiet: bool,
    /// More logging on stderr (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, UsageError> {
    let got = if args.got == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| UsageError::Json(format!("reading stdin: {e}")))?;
        from_json(&buf)?
    } else {
        from_json(&args.got)?
    };
    let expected = compile(&args.expected)?;
    let config = Config::default()
        .with_root_name(args.root_name.as_str())
        .with_max_render_depth(args.max_depth);

    if args.quiet {
        let ok = eq_deeply_with(&config, &got, &expected);
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) });
    }

    let Err(report) = match_deeply_with(&config, &got, &expected) else {
        return Ok(ExitCode::SUCCESS);
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(ExitCode::from(1))
}
