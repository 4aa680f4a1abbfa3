use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dupesweep")]
#[command(about = "Find duplicate files in a directory tree and list, move, or delete them")]
pub struct Cli {
    /// Directory to scan for duplicates
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Number of concurrent hash workers (default: number of CPU cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write a JSON report of the duplicate groups to this path
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Mirror log output to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_config() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["dupesweep"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.workers, None);
        assert!(cli.json.is_none());
        assert!(cli.log_file.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "dupesweep",
            "/data",
            "-w",
            "4",
            "--json",
            "report.json",
            "--verbose",
        ]);
        assert_eq!(cli.path, PathBuf::from("/data"));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.json, Some(PathBuf::from("report.json")));
        assert!(cli.verbose);
    }
}
