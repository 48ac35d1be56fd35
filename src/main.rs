use affaire::cli::{Cli, Commands, ConfigAction};
use affaire::cli_handlers;
use affaire::tasks::TaskFilter;
use clap::Parser;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli.db.as_path();

    let result = match cli.command {
        Commands::Init => cli_handlers::handle_init(db),
        Commands::Add { body, expires } => {
            cli_handlers::handle_add(db, &body, expires.as_deref())
        }
        Commands::List {
            id,
            search,
            active,
            limit,
        } => {
            let filter = TaskFilter {
                id,
                search,
                active_only: active,
                limit,
            };
            cli_handlers::handle_list(db, &filter)
        }
        Commands::Update { id, body, expires } => {
            cli_handlers::handle_update(db, id, body.as_deref(), expires.as_deref())
        }
        Commands::Delete { id, force } => cli_handlers::handle_delete(db, id, force),
        Commands::Config { action } => match action {
            ConfigAction::List => cli_handlers::handle_config_list(cli.store, &cli.settings, db),
            ConfigAction::Get { key } => {
                cli_handlers::handle_config_get(cli.store, &cli.settings, db, &key)
            }
            ConfigAction::Set { key, value } => {
                cli_handlers::handle_config_set(cli.store, &cli.settings, db, &key, &value)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
