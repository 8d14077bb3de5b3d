use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use patrick_push::command_router::{CommandRouter, PushOptions};
use patrick_push::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn problem_arg() -> Arg {
    Arg::new("problem")
        .help("The problem to push")
        .num_args(1..)
        .required(true)
}

fn problem_text(matches: &ArgMatches) -> String {
    matches
        .get_many::<String>("problem")
        .unwrap_or_default()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn cli() -> Command {
    Command::new("patrick")
        .about("Patrick Push Protocol - solves problems by being dumb on purpose")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Show token usage and info-level logs")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("push")
                .about("Interactive mode - tries dumb solutions until one works")
                .arg(problem_arg())
                .arg(
                    Arg::new("attempts")
                        .long("attempts")
                        .help("Number of attempts (default from config)")
                        .value_name("N")
                        .value_parser(value_parser!(u32).range(1..)),
                )
                .arg(
                    Arg::new("auto")
                        .long("auto")
                        .short('a')
                        .help("Auto-accept solutions")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("quick")
                .about("Quick mode - one dumb shot")
                .arg(problem_arg()),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare a normal answer with Patrick's")
                .arg(problem_arg()),
        )
        .subcommand(Command::new("stats").about("Show your Patrick stats"))
        .subcommand(
            Command::new("config")
                .about("Show or change configuration")
                .arg(
                    Arg::new("set-api-key")
                        .long("set-api-key")
                        .help("Set the Anthropic API key")
                        .value_name("API_KEY"),
                )
                .arg(
                    Arg::new("set-max-attempts")
                        .long("set-max-attempts")
                        .help("Set the default number of attempts")
                        .value_name("N")
                        .value_parser(value_parser!(u32).range(1..)),
                )
                .arg(
                    Arg::new("set-auto-save")
                        .long("set-auto-save")
                        .help("Enable or disable session logs")
                        .value_name("BOOL")
                        .value_parser(value_parser!(bool)),
                ),
        )
}

fn handle_config(matches: &ArgMatches) -> anyhow::Result<()> {
    // Work on the file contents only so environment overrides are never persisted.
    let path = Config::get_config_path()?;
    let mut config = Config::load_from(&path)?;
    let mut changed = false;

    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        config.anthropic_api_key = Some(api_key.clone());
        changed = true;
    }
    if let Some(attempts) = matches.get_one::<u32>("set-max-attempts") {
        config.max_attempts = *attempts;
        changed = true;
    }
    if let Some(auto_save) = matches.get_one::<bool>("set-auto-save") {
        config.auto_save = *auto_save;
        changed = true;
    }

    if changed {
        config.save_to(&path)?;
        println!("✅ Configuration saved to {}", path.display());
        return Ok(());
    }

    let mut effective = config;
    effective.apply_env(|key| std::env::var(key).ok());
    effective.show_config_info()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match matches.subcommand() {
        Some(("config", sub)) => return handle_config(sub),
        Some((name, sub)) => {
            let config = Config::load()?;
            let router = CommandRouter::new(config, verbose);
            info!("Running subcommand: {}", name);

            match name {
                "push" => {
                    let options = PushOptions {
                        attempts: sub.get_one::<u32>("attempts").copied(),
                        auto: sub.get_flag("auto"),
                    };
                    router.push(&problem_text(sub), options).await?;
                }
                "quick" => {
                    router.quick(&problem_text(sub)).await?;
                }
                "compare" => router.compare(&problem_text(sub)).await?,
                "stats" => router.stats()?,
                _ => unreachable!("clap rejects unknown subcommands"),
            }
        }
        None => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}
