use commands::command_argument_builder;
use linkcard::handlers::*;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_flag("verbose"));

    let settings = match load_settings(&chosen_command) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    // Keep stdout clean for JSON output
    if !quiet && !matches!(chosen_command.subcommand_name(), Some("scrape")) {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("enrich", primary_command)) => handle_enrich(primary_command, &settings).await,
        Some(("enrich-selection", primary_command)) => {
            handle_enrich_selection(primary_command, &settings).await
        }
        Some(("enrich-all", primary_command)) => {
            handle_enrich_all(primary_command, &settings).await
        }
        Some(("watch", primary_command)) => handle_watch(primary_command, &settings).await,
        Some(("scrape", primary_command)) => handle_scrape(primary_command, &settings).await,
        Some(("providers", primary_command)) => match primary_command.subcommand() {
            Some(("check", _)) => handle_providers_check(&settings).await,
            Some(("models", _)) => handle_providers_models(&settings).await,
            _ => unreachable!("clap should ensure we don't get here"),
        },
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
