use std::{fs::File, path::Path, process::exit};

use anyhow::Context;
use clap::Parser;
use just_class_file::{standard_registry, Severity};
use just_jimage::Archive;
use memmap::Mmap;

use crate::{
    args::Cli,
    scan::{Outcome, Report},
};

mod args;
mod scan;

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(err) => {
            eprintln!("just-scan: {:#}", err);
            exit(1);
        }
    }
}

/// Returns whether every input could be parsed.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let images = cli
        .jimage
        .iter()
        .map(|path| map_file(path).map(|mmap| (path.as_path(), mmap)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut ok = true;
    let archives = images
        .iter()
        .filter_map(|(path, mmap)| match Archive::parse(mmap) {
            Ok(archive) => Some((*path, archive)),
            Err(err) => {
                println!("{}: fatal: {}", path.display(), err);
                ok = false;
                None
            }
        })
        .collect::<Vec<_>>();

    let mut inputs = Vec::new();
    for path in &cli.paths {
        scan::collect_class_files(path, &mut inputs)?;
    }
    for (path, archive) in &archives {
        scan::collect_jimage_classes(path, archive, &mut inputs);
    }

    log::info!("scanning {} inputs on {} threads", inputs.len(), cli.jobs);
    let reports = scan::scan(&inputs, standard_registry(), cli.jobs, cli.deps);
    for report in &reports {
        print_report(report, cli);
        ok &= !matches!(report.outcome, Outcome::Fatal(_));
    }

    Ok(ok)
}

fn print_report(report: &Report, cli: &Cli) {
    match &report.outcome {
        Outcome::Fatal(message) => println!("{}: fatal: {}", report.name, message),
        Outcome::Parsed {
            diagnostics,
            dependencies,
        } => {
            let shown = diagnostics
                .iter()
                .filter(|d| !cli.quiet || d.severity == Severity::Error);
            for diagnostic in shown {
                println!("{}: {}", report.name, diagnostic);
            }
            if cli.deps {
                for dependency in dependencies {
                    println!("{}: depends on {}", report.name, dependency);
                }
            }
        }
    }
}

fn map_file(path: &Path) -> anyhow::Result<Mmap> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {}", path.display()))
}

