use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, warn};
use std::path::PathBuf;
use tablebooking_server::cli;
use tablebooking_server::cli_error::CliError;

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run_command(args.command) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve => tablebooking_server::web::serve(),
        Command::MigrateDatabase => cli::database_migration::run_migrations(),
        Command::LoadCatalog { path } => cli::file_io::load_catalog_from_file(&path),
        Command::ListCatalog => cli::manage_catalog::print_catalog(),
        Command::AddHall { name } => cli::manage_catalog::add_hall(name),
        Command::AddTable { hall_id, name } => cli::manage_catalog::add_table(hall_id, name),
        Command::AddGame { name } => cli::manage_catalog::add_game(name),
        Command::GrantAdmin { external_id, yes } => {
            cli::manage_catalog::grant_admin(external_id, yes)
        }
    }
}

/// Table booking service for board game nights
#[derive(Debug, Parser)]
#[clap(name = "tablebooking_server", version)]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the table booking web API
    Serve,
    /// Migrate the database schema to the current version
    MigrateDatabase,
    /// Load halls, tables and games from a JSON catalog file. Existing entities are skipped.
    LoadCatalog {
        /// The path of the JSON file to read from
        path: PathBuf,
    },
    /// Print all halls, tables and games
    ListCatalog,
    /// Add a new hall. The name is queried interactively, if not given.
    AddHall { name: Option<String> },
    /// Add a new table to a hall. Missing values are queried interactively.
    AddTable {
        /// Id of the hall (see `list-catalog`)
        #[clap(long)]
        hall_id: Option<i32>,
        name: Option<String>,
    },
    /// Add a new game. The name is queried interactively, if not given.
    AddGame { name: Option<String> },
    /// Elevate a user to admin. The user must have logged in once.
    GrantAdmin {
        /// The user's Discord user id
        external_id: String,
        /// Don't ask for confirmation
        #[clap(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
