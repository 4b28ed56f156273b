pub mod batch;
pub mod fix_tempo;
pub mod harm;
pub mod import;
pub mod modulations;
pub mod tables;
pub mod tempo;

mod error;

use std::fmt;
use std::fmt::Debug;
use std::io;

use clap::Parser;
use clap::Subcommand;
use humkern::annotate::AnnotateError;
use humkern::filter::FilterError;
use humkern::position::PositionError;
use humkern::stream::StreamError;
use humkern::table::TableError;

use fix_tempo::FixTempoOptions;
use harm::HarmOptions;
use import::ImportOptions;
use modulations::ModulationsOptions;
use tempo::TempoOptions;

#[derive(Parser)]
#[command(name = "humkern", about = "Annotate Humdrum kern scores with harmonic-analysis metadata")]
struct MainOptions {
    #[command(subcommand)]
    command: MainCommand,
}

#[derive(Subcommand)]
enum MainCommand {
    /// Insert DCML chord labels as a **harm spine
    Harm(HarmOptions),

    /// Insert *MM metronome rows from the tempo rule table
    Tempo(TempoOptions),

    /// Splice corrected movement designations (!!!OMD) at fixed timepoints
    FixTempo(FixTempoOptions),

    /// Insert *key: changes listed in the modulation table
    Modulations(ModulationsOptions),

    /// Convert labeled-span JSON exports into the YAML annotation tables
    Import(ImportOptions),
}

impl MainCommand {
    fn run(&self) -> CliResult<()> {
        match self {
            MainCommand::Harm(options) => options.run(),
            MainCommand::Tempo(options) => options.run(),
            MainCommand::FixTempo(options) => options.run(),
            MainCommand::Modulations(options) => options.run(),
            MainCommand::Import(options) => options.run(),
        }
    }
}

pub fn run_in_shell_env(args: impl IntoIterator<Item = String>) -> CliResult<()> {
    let options = match MainOptions::try_parse_from(args) {
        Err(err) => {
            return if err.use_stderr() {
                Err(CliError::CommandError(err.to_string()))
            } else {
                print!("{err}");
                Ok(())
            };
        }
        Ok(options) => options,
    };

    options.command.run()
}

pub type CliResult<T> = Result<T, CliError>;

pub enum CliError {
    IoError(io::Error),
    CommandError(String),
}

impl Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::IoError(err) => write!(f, "IO error / {err}"),
            CliError::CommandError(err) => write!(f, "The command failed / {err}"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(v: io::Error) -> Self {
        CliError::IoError(v)
    }
}

impl From<String> for CliError {
    fn from(v: String) -> Self {
        CliError::CommandError(v)
    }
}

impl From<StreamError> for CliError {
    fn from(v: StreamError) -> Self {
        CliError::CommandError(format!("Malformed score stream ({v:?})"))
    }
}

impl From<PositionError> for CliError {
    fn from(v: PositionError) -> Self {
        CliError::CommandError(format!("Invalid position ({v:?})"))
    }
}

impl From<AnnotateError> for CliError {
    fn from(v: AnnotateError) -> Self {
        CliError::CommandError(format!("Could not annotate score ({v:?})"))
    }
}

impl From<TableError> for CliError {
    fn from(v: TableError) -> Self {
        CliError::CommandError(format!("Could not build annotation table ({v:?})"))
    }
}

impl From<FilterError> for CliError {
    fn from(v: FilterError) -> Self {
        CliError::CommandError(format!("External toolchain call failed ({v:?})"))
    }
}
