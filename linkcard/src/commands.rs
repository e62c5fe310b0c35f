use crate::CLAP_STYLING;
use clap::{arg, command};
use linkcard_core::config::DEFAULT_CONFIG_PATH;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkcard")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkcard")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("Location of the linkcard config file")
                .default_value(DEFAULT_CONFIG_PATH)
                .global(true),
        )
        .arg(
            arg!(-p --"provider" <NAME>)
                .required(false)
                .help("Override the configured summary provider")
                .value_parser(["ollama", "openai", "openrouter", "anthropic", "claude"])
                .global(true),
        )
        .arg(
            arg!(-m --"model" <MODEL>)
                .required(false)
                .help("Override the model used by the selected provider")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("enrich")
                .about("Enrich a single link card on a canvas")
                .arg(canvas_arg())
                .arg(vault_arg(false))
                .arg(
                    arg!(-n --"node" <ID>)
                        .required(true)
                        .help("Id of the link card to enrich"),
                ),
        )
        .subcommand(
            command!("enrich-selection")
                .about("Enrich several link cards on a canvas, in the order given")
                .arg(canvas_arg())
                .arg(vault_arg(false))
                .arg(
                    arg!(-n --"node" <ID>)
                        .required(true)
                        .help("Id of a link card to enrich (repeatable)")
                        .num_args(1..)
                        .action(clap::ArgAction::Append),
                ),
        )
        .subcommand(
            command!("enrich-all")
                .about("Enrich every link card on a canvas")
                .arg(canvas_arg())
                .arg(vault_arg(false)),
        )
        .subcommand(
            command!("watch")
                .about(
                    "Watch a vault for canvas changes and enrich newly added link cards \
                until interrupted",
                )
                .arg(vault_arg(true))
                .arg(
                    arg!(--"no-auto")
                        .required(false)
                        .help("Only report new link cards, do not enrich them")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("scrape")
                .about("Extract link preview metadata from a URL and print it as JSON")
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("The page to scrape")
                        .value_parser(clap::value_parser!(Url)),
                ),
        )
        .subcommand(
            command!("providers")
                .about("Inspect the configured summary provider")
                .subcommand_required(true)
                .subcommand(command!("check").about("Check that the provider is reachable"))
                .subcommand(command!("models").about("List the models the provider offers")),
        )
}

fn canvas_arg() -> clap::Arg {
    arg!(--"canvas" <PATH>)
        .required(true)
        .help("Path to the .canvas file")
}

fn vault_arg(required: bool) -> clap::Arg {
    arg!(--"vault" <DIR>)
        .required(required)
        .help("Vault root that note and canvas paths are relative to")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "linkcard", "enrich", "--canvas", "board.canvas", "--node", "a", "-v", "-q",
            ])
            .unwrap();

        assert!(matches.get_flag("verbose"));
        assert!(matches.get_flag("quiet"));
        let (name, enrich) = matches.subcommand().unwrap();
        assert_eq!(name, "enrich");
        assert_eq!(enrich.get_one::<String>("node").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_global_flags_on_nested_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["linkcard", "providers", "check", "--verbose", "-p", "openai"])
            .unwrap();

        assert!(matches.get_flag("verbose"));
        assert!(!matches.get_flag("quiet"));
        assert_eq!(
            matches.get_one::<String>("provider").map(String::as_str),
            Some("openai")
        );
    }

    #[test]
    fn test_enrich_selection_collects_every_node() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "linkcard", "enrich-selection", "--canvas", "b.canvas", "-n", "a", "-n", "c",
            ])
            .unwrap();
        let (_, selection) = matches.subcommand().unwrap();
        let nodes: Vec<&String> = selection.get_many::<String>("node").unwrap().collect();
        assert_eq!(nodes, ["a", "c"]);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(command_argument_builder().try_get_matches_from(["linkcard"]).is_err());
    }
}
