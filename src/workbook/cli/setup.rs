use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Returns the version string, including git hash and commit date for non-release builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "workbook", bin_name = "workbook", version = get_version())]
#[command(about = "Inspect, migrate and repackage interactive workbooks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the manifest, cell summary and dependency files of a workbook
    #[command(alias = "i")]
    Info {
        /// Workbook directory, archive or page file
        path: PathBuf,
    },

    /// List the cells of a workbook
    #[command(alias = "c")]
    Cells {
        /// Workbook directory, archive or page file
        path: PathBuf,
    },

    /// Save a workbook, in place or to a new location
    ///
    /// Saving in place upgrades legacy JSON manifests to YAML front matter.
    #[command(alias = "s")]
    Save {
        /// Workbook directory, archive or page file
        path: PathBuf,

        /// Destination (defaults to the workbook's own path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a zip archive instead of a directory
        #[arg(short, long)]
        archive: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save_with_options() {
        let cli = Cli::try_parse_from([
            "workbook",
            "save",
            "demo.workbook",
            "--output",
            "out.workbook",
            "--archive",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Save {
                path,
                output,
                archive,
            } => {
                assert_eq!(path, PathBuf::from("demo.workbook"));
                assert_eq!(output, Some(PathBuf::from("out.workbook")));
                assert!(archive);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::try_parse_from(["workbook", "i", "demo.workbook"]).unwrap();
        assert!(matches!(cli.command, Commands::Info { .. }));
        let cli = Cli::try_parse_from(["workbook", "c", "demo.workbook"]).unwrap();
        assert!(matches!(cli.command, Commands::Cells { .. }));
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["workbook", "info"]).is_err());
    }
}
