use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Class files, or directories searched recursively for `*.class`
    pub paths: Vec<PathBuf>,

    #[arg(long)]
    /// jimage archives (e.g. `$JAVA_HOME/lib/modules`) whose classes are scanned
    pub jimage: Vec<PathBuf>,

    #[arg(short, long, default_value_t = default_jobs())]
    /// Number of worker threads
    pub jobs: usize,

    #[arg(long)]
    /// Print the classes each input references
    pub deps: bool,

    #[arg(short, long)]
    /// Only print errors and fatal failures
    pub quiet: bool,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
