use chrono::Local;
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use meditrack::api::{HttpClient, MedTrackApi};
use meditrack::cli::{self, Cli, Commands};
use meditrack::logging::{self, LogTarget};
use meditrack::models::DispenseRequest;
use meditrack::{Config, Profile};
use std::io;
use std::path::Path;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let profile = Profile::from_dev_flag(cli.dev);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };
    config.apply_overrides(cli.api_url.clone(), cli.timeout)?;

    let command = cli.command.unwrap_or(Commands::Tui);

    // The TUI owns the terminal, so it logs to a file
    let target = match command {
        Commands::Tui => LogTarget::File(
            config
                .log_file_path(profile)
                .ok_or_else(|| eyre!("Could not determine log file location"))?,
        ),
        _ => LogTarget::Stderr,
    };
    logging::init(&config.logging, cli.verbose, target)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let http = HttpClient::new(config.api.base_url.clone(), config.api_timeout())?;
    let api = MedTrackApi::new(http);
    let now = Local::now().naive_local();
    let mut out = io::stdout();

    match command {
        Commands::Tui => {
            let app = meditrack::tui::App::new(config, api, runtime.handle().clone())?;
            meditrack::tui::run_event_loop(app)?;
        }
        Commands::Health => {
            runtime.block_on(cli::handle_health(&api, &mut out))?;
        }
        Commands::CheckUid { uid } => {
            runtime.block_on(cli::handle_check_uid(&api, &uid, &mut out))?;
        }
        Commands::Reminders { user } => {
            runtime.block_on(cli::handle_reminders(&api, user.as_ref(), now, &mut out))?;
        }
        Commands::Logs { filter, sort, user } => {
            runtime.block_on(cli::handle_logs(&api, filter, sort, user.as_ref(), now, &mut out))?;
        }
        Commands::AddUser { username, email, password } => {
            runtime.block_on(cli::handle_add_user(&api, username, email, password, &mut out))?;
        }
        Commands::Dispense { user, pill, device } => {
            let request = DispenseRequest {
                user_id: user,
                pill_id: pill,
                device_id: device,
            };
            runtime.block_on(cli::handle_dispense(&api, request, &mut out))?;
        }
    }

    Ok(())
}
