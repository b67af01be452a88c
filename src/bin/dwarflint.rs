//! CLI front end (spec.md §6): parses flags into a `Criteria`, drives one
//! `LintSession` per input file, and maps the session's diagnostics onto
//! stdout and a process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dwarflint::objectview::ObjectFile;
use dwarflint::{Criteria, LintSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dwarflint", about = "A pedantic structural validator for DWARF debugging information in ELF object files")]
struct Args {
    /// Hold the default axes at their strictest setting; documented as a
    /// no-op flag kept for symmetry with --gnu/--tolerant (spec.md §6).
    #[arg(long)]
    strict: bool,

    /// Mask off the `bloat` axis, tolerating common GCC artifacts.
    #[arg(long)]
    gnu: bool,

    /// Mask off the `loc`/`ranges` axes.
    #[arg(long)]
    tolerant: bool,

    /// Render the `Where` chain's root-cause reference alongside each
    /// diagnostic's immediate location.
    #[arg(long = "ref")]
    with_ref: bool,

    /// Skip the optional high-level CU-coverage-vs-aranges and
    /// CU-coverage-vs-sections compare passes.
    #[arg(long)]
    nohl: bool,

    /// Mask off the `elf` axis and continue past a missing
    /// `.debug_abbrev`/`.debug_info` instead of aborting.
    #[arg(short = 'i', long = "ignore-missing")]
    ignore_missing: bool,

    /// Suppress the trailing "No errors." summary line.
    #[arg(short, long)]
    quiet: bool,

    /// Print the computed warning/error criteria before linting.
    #[arg(short, long)]
    verbose: bool,

    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let mut criteria = Criteria::default();
    if args.gnu {
        criteria.apply_gnu();
    }
    if args.tolerant {
        criteria.apply_tolerant();
    }
    if args.ignore_missing {
        criteria.apply_ignore_missing();
    }
    if args.strict {
        criteria.apply_strict();
    }

    if args.verbose {
        eprintln!("warnings: {:?}", criteria.warnings);
        eprintln!("errors: {:?}", criteria.errors);
    }

    let mut any_errors = false;
    for path in &args.files {
        let obj = match ObjectFile::open(path) {
            Ok(obj) => obj,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                any_errors = true;
                continue;
            }
        };

        let mut session = LintSession::new(&criteria, args.with_ref, args.ignore_missing, args.tolerant, args.nohl);
        if let Err(e) = session.run(&obj) {
            eprintln!("{}: {}", path.display(), e);
            any_errors = true;
            continue;
        }

        for line in session.diags.render() {
            println!("{}: {}", path.display(), line);
        }
        if !session.diags.is_clean() {
            any_errors = true;
        }
        if !args.quiet && session.diags.is_clean() {
            println!("{}: No errors.", path.display());
        }
    }

    if any_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
