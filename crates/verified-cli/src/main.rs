use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verified_core::config::Config;
use verified_core::descriptor::describe_build;
use verified_core::programs::{
    declared_builds, load_organizations, load_programs, ORGANIZATIONS_FILE_NAME,
    PROGRAMS_FILE_NAME,
};
use verified_index::fetch::{HttpSource, RemoteSource};
use verified_index::generate::generate_index;
use verified_index::workflows::generate_workflows;
use verified_index::writer::IndexWriter;

#[derive(Debug, Parser)]
#[command(
    name = "verified",
    version,
    about = "Index verified program builds and generate their CI workflows"
)]
struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        default_value = ".",
        help = "Project root containing programs.yml and organizations.yml"
    )]
    root: PathBuf,
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Increase verbosity",
        conflicts_with = "quiet"
    )]
    verbose: bool,
    #[arg(short = 'q', long = "quiet", help = "Only report errors")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fetch published build artifacts and write the index")]
    Index,
    #[command(about = "Generate a CI workflow for every declared build")]
    Workflows {
        #[arg(long, help = "Skip manifest lookups and use the default toolchain")]
        no_manifest: bool,
    },
    #[command(about = "List declared builds")]
    List,
    #[command(about = "Print shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] verified_core::config::ConfigError),
    #[error("{0}")]
    Programs(#[from] verified_core::programs::ProgramsError),
    #[error("{0}")]
    Build(#[from] verified_core::descriptor::BuildError),
    #[error("index error: {0}")]
    Index(#[from] verified_index::generate::IndexError),
    #[error("workflow error: {0}")]
    Workflows(#[from] verified_index::workflows::WorkflowsError),
    #[error("{0}")]
    Fetch(#[from] verified_index::fetch::FetchError),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    if let Err(err) = run(cli) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let root = cli.root;
    match cli.command {
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "verified", &mut io::stdout());
            Ok(())
        }
        Command::List => {
            let programs = load_programs(&root.join(PROGRAMS_FILE_NAME))?;
            for declared in declared_builds(&programs) {
                let build = describe_build(&declared.repo, &declared.tag)?;
                let marker = if declared.latest { " (latest)" } else { "" };
                println!(
                    "{} {} {}{}",
                    declared.repo, declared.tag, build.slug, marker
                );
            }
            Ok(())
        }
        Command::Index => {
            let config = Config::load_or_default(&root)?;
            let programs = load_programs(&root.join(PROGRAMS_FILE_NAME))?;
            let organizations = load_organizations(&root.join(ORGANIZATIONS_FILE_NAME))?;
            let source = http_source(&config)?;
            let writer = IndexWriter::new(config.paths.index_dir(&root));
            let summary = generate_index(
                &source,
                &config.artifacts,
                &programs,
                &organizations,
                &writer,
                Utc::now(),
            )?;
            info!(
                index = %writer.root().display(),
                artifacts = summary.stats.artifacts,
                orgs = summary.stats.orgs,
                repos = summary.stats.repos,
                programs = summary.stats.programs,
                "index written"
            );
            Ok(())
        }
        Command::Workflows { no_manifest } => {
            let config = Config::load_or_default(&root)?;
            let programs = load_programs(&root.join(PROGRAMS_FILE_NAME))?;
            let source = if no_manifest {
                None
            } else {
                Some(http_source(&config)?)
            };
            let written = generate_workflows(
                source.as_ref().map(|source| source as &dyn RemoteSource),
                &config,
                &root,
                &programs,
            )?;
            info!(
                count = written.len(),
                dir = %config.paths.workflows_dir(&root).display(),
                "workflows written"
            );
            Ok(())
        }
    }
}

fn http_source(config: &Config) -> Result<HttpSource, CliError> {
    Ok(HttpSource::new(Duration::from_secs(
        config.http.timeout_secs,
    ))?)
}
