use std::env;
use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::output::format_architecture;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::models::RenderError;
use crate::domain::models::RendererName;
use crate::domain::models::ServiceType;
use crate::domain::services::actions::help_text;
use crate::domain::services::export;
use crate::domain::services::Architect;
use crate::domain::services::SessionStore;
use crate::infrastructure::renderers;
use crate::infrastructure::renderers::RendererManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("CLOUDSKETCH_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir().unwrap_or_default().join("cloudsketch");
}

fn print_store_warnings(store: &mut SessionStore) {
    for warning in store.take_warnings() {
        eprintln!("{}", Paint::yellow(warning));
    }
}

async fn load_store(config: &Config) -> SessionStore {
    let mut store =
        SessionStore::load(SessionStore::file_path_in(&config.get(ConfigKey::DataDir))).await;
    print_store_warnings(&mut store);
    return store;
}

fn session_id_arg(matches: &ArgMatches) -> Option<String> {
    return matches
        .get_one::<String>(&ConfigKey::SessionID.to_string())
        .map(|e| return e.to_string());
}

/// The session named by `--id`, falling back to the active session.
fn target_session_id(store: &SessionStore, matches: &ArgMatches) -> Result<String> {
    if let Some(session_id) = session_id_arg(matches) {
        store.get_session(&session_id)?;
        return Ok(session_id);
    }

    if let Some(session) = store.active_session() {
        return Ok(session.id.to_string());
    }

    bail!("There is no active session. Pass a session ID with --id, or run `cloudsketch sessions list` to find one.");
}

fn requirement_arg(matches: &ArgMatches) -> String {
    return matches
        .get_many::<String>("requirement")
        .map(|e| return e.map(|s| return s.as_str()).collect::<Vec<&str>>().join(" "))
        .unwrap_or_default()
        .trim()
        .to_string();
}

async fn print_sessions_list(config: &Config) -> Result<()> {
    let mut store = load_store(config).await;
    let active_id = store
        .active_session()
        .map(|e| return e.id.to_string())
        .unwrap_or_default();

    let sessions = store
        .list_sessions()
        .iter()
        .map(|session| {
            let marker = if session.id == active_id { "*" } else { "-" };
            return format!("{marker} {}", session.describe());
        })
        .collect::<Vec<String>>();

    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
    } else {
        println!("{}", sessions.join("\n"));
    }

    print_store_warnings(&mut store);
    return Ok(());
}

async fn show_session(config: &Config, matches: &ArgMatches) -> Result<()> {
    let store = load_store(config).await;
    let session_id = target_session_id(&store, matches)?;
    let session = store.get_session(&session_id)?;

    println!("{}", session.describe());
    for (idx, turn) in session.turns.iter().enumerate() {
        let status = if turn.is_pending() {
            Paint::yellow("pending").to_string()
        } else if turn.is_failed() {
            Paint::red("failed").to_string()
        } else {
            Paint::green("completed").to_string()
        };
        println!("  {}. [{status}] {}", idx + 1, turn.requirement);
    }

    if let Some((architecture, warnings)) = session.latest_completed() {
        println!("\n{}", format_architecture(architecture, warnings));
    }

    return Ok(());
}

async fn load_session_interactive(config: &mut Config) -> Result<bool> {
    let store = load_store(config).await;
    let mut sessions = store.list_sessions().to_vec();
    sessions.reverse();

    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(false);
    }

    let session_options = sessions
        .iter()
        .map(|session| return session.describe())
        .collect::<Vec<String>>();

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which session would you like to load?")
        .default(0)
        .items(&session_options)
        .interact_opt()?;

    if let Some(idx) = idx {
        config.set(ConfigKey::SessionID, &sessions[idx].id);
        return Ok(true);
    }

    return Ok(false);
}

async fn run_requirement(
    config: &Config,
    store: &mut SessionStore,
    session_id: &str,
    requirement: &str,
) -> Result<()> {
    if requirement.is_empty() {
        bail!("A requirement is required. Describe the system you want to build.");
    }

    let architect = Architect::from_config(config).await?;
    architect.backend().health_check().await?;

    eprintln!(
        "{}",
        Paint::new(format!(
            "Designing with {} ({})...",
            architect.backend().name(),
            architect.backend().model()
        ))
        .dimmed()
    );

    let res = architect.submit(store, session_id, requirement, None).await;
    print_store_warnings(store);
    store.flush().await?;

    match res {
        Ok(resolution) => {
            println!(
                "{}",
                format_architecture(&resolution.architecture, &resolution.warnings)
            );
        }
        Err(err) => {
            if let Some(raw) = err.raw_response() {
                eprintln!("{}\n{raw}\n", Paint::new("Raw model response:").bold());
            }
            bail!(format!(
                "{err}\nRun `cloudsketch refine --id {session_id}` with the requirement to try again."
            ));
        }
    }

    return Ok(());
}

async fn generate_architecture(config: &Config, matches: &ArgMatches) -> Result<()> {
    let requirement = requirement_arg(matches);
    let mut store = load_store(config).await;

    let name = match matches.get_one::<String>("name") {
        Some(name) => name.to_string(),
        None => requirement.chars().take(40).collect::<String>(),
    };
    let session_id = store.create_session(name.trim()).await;
    println!("Started session {session_id}");

    run_requirement(config, &mut store, &session_id, &requirement).await?;

    if let Some(output) = matches.get_one::<String>("export") {
        export_architecture(&store, &session_id, path::Path::new(output)).await?;
    }
    if let Some(output) = matches.get_one::<String>("diagram") {
        write_diagram(config, &store, &session_id, path::Path::new(output)).await?;
    }

    return Ok(());
}

async fn refine(config: &Config, matches: &ArgMatches) -> Result<()> {
    let requirement = requirement_arg(matches);
    let mut store = load_store(config).await;
    let session_id = target_session_id(&store, matches)?;
    store.select_active(&session_id).await?;

    return run_requirement(config, &mut store, &session_id, &requirement).await;
}

async fn export_architecture(
    store: &SessionStore,
    session_id: &str,
    output: &path::Path,
) -> Result<()> {
    let architecture = match store.latest_architecture(session_id) {
        Some(architecture) => architecture,
        None => bail!(format!("Session {session_id} has no architecture to export.")),
    };

    export::write(output, architecture).await?;
    println!("Exported architecture to {}", output.display());

    return Ok(());
}

async fn write_diagram(
    config: &Config,
    store: &SessionStore,
    session_id: &str,
    output: &path::Path,
) -> Result<()> {
    let architecture = match store.latest_architecture(session_id) {
        Some(architecture) => architecture,
        None => bail!(format!("Session {session_id} has no diagram to write.")),
    };

    let renderer_name = match RendererName::parse(config.get(ConfigKey::Renderer)) {
        Some(name) => name,
        None => bail!(format!(
            "No renderer implemented for {}",
            config.get(ConfigKey::Renderer)
        )),
    };
    let renderer = RendererManager::get(renderer_name, &config.get(ConfigKey::IconsDir));

    match renderers::write_diagram(&renderer, architecture, output).await {
        Ok(written) => {
            println!("Wrote diagram to {}", written.display());
        }
        Err(err @ (RenderError::MissingBinary | RenderError::Failed(_))) => {
            let source_path = output.with_extension("dot");
            if source_path.exists() {
                bail!(format!(
                    "{err}\nThe diagram source was written to {}",
                    source_path.display()
                ));
            }
            bail!(err);
        }
        Err(err) => bail!(err),
    }

    return Ok(());
}

fn output_arg(matches: &ArgMatches, session_id: &str, extension: &str) -> path::PathBuf {
    if let Some(output) = matches.get_one::<String>("output") {
        return path::PathBuf::from(output);
    }

    return path::PathBuf::from(format!("cloudsketch-{session_id}.{extension}"));
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!(
        "Created default config file at {}",
        config_file_path.display()
    );
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    let mut cmd = Command::new("debug");
    cmd = cmd.about("Debug helpers for cloudsketch")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running cloudsketch with environment variable RUST_LOG=cloudsketch")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        )
        .subcommand(
            Command::new("service-types").about("List all AWS service types a proposal may use.")
        );

    return cmd;
}

fn arg_session_id(help: &'static str) -> Arg {
    return Arg::new(ConfigKey::SessionID.to_string())
        .short('i')
        .long("id")
        .help(help)
        .num_args(1);
}

fn arg_requirement() -> Arg {
    return Arg::new("requirement")
        .help("Free-text description of the system requirements.")
        .num_args(1..)
        .required(true);
}

fn arg_output(help: &'static str) -> Arg {
    return Arg::new("output")
        .short('o')
        .long("output")
        .help(help)
        .num_args(1);
}

fn subcommand_sessions_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all sessions.")
        .arg(arg_session_id("Session ID"))
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all sessions.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args(["session-id", "all"])
                .required(true),
        );
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage design sessions.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the sessions data directory path."))
        .subcommand(Command::new("list").about("List all sessions with their ids. The active session is marked with *."))
        .subcommand(
            Command::new("create")
                .about("Create a new session and make it active.")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Session name.")
                        .num_args(1),
                ),
        )
        .subcommand(
            Command::new("rename")
                .about("Rename a session.")
                .arg(arg_session_id("Session ID. Defaults to the active session."))
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("New session name.")
                        .num_args(1)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("open")
                .about("Open a session by ID and continue chatting. Omit passing any session ID to load an interactive selection.")
                .arg(arg_session_id("Session ID").required(false)),
        )
        .subcommand(
            Command::new("show")
                .about("Print the turns and latest architecture of a session.")
                .arg(arg_session_id("Session ID. Defaults to the active session.")),
        )
        .subcommand(subcommand_sessions_delete());
}

fn subcommand_generate() -> Command {
    return Command::new("generate")
        .about("Design an architecture for a requirement in a new session, and print it.")
        .arg(arg_requirement())
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .help("Session name. Defaults to the start of the requirement.")
                .num_args(1),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .help("Also export the architecture to this path. A .json path writes JSON, anything else Markdown.")
                .num_args(1),
        )
        .arg(
            Arg::new("diagram")
                .long("diagram")
                .help("Also write the diagram to this path. With the dot renderer, .png and .svg paths are rendered by Graphviz.")
                .num_args(1),
        );
}

fn subcommand_refine() -> Command {
    return Command::new("refine")
        .about("Refine the latest architecture of a session with a follow-up requirement.")
        .arg(arg_requirement())
        .arg(arg_session_id("Session ID. Defaults to the active session."));
}

fn subcommand_export() -> Command {
    return Command::new("export")
        .about("Export the latest architecture of a session as Markdown, or JSON when the output ends in .json.")
        .arg(arg_session_id("Session ID. Defaults to the active session."))
        .arg(arg_output("Output path. [default: cloudsketch-<SESSION_ID>.md]"));
}

fn subcommand_diagram() -> Command {
    return Command::new("diagram")
        .about("Write the latest diagram of a session. With the dot renderer, .png and .svg outputs are rendered by Graphviz.")
        .arg(arg_session_id("Session ID. Defaults to the active session."))
        .arg(arg_output("Output path. [default: cloudsketch-<SESSION_ID>.<dot|mmd>]"));
}

fn arg_config(key: ConfigKey, env_name: &str, help: String) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_name.to_string())
        .num_args(1)
        .help(help)
        .global(true);
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:")
                || line.starts_with("HOTKEYS:")
                || line.starts_with("REQUIREMENTS:")
            {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("cloudsketch")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start an interactive design chat. This is the default command."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_diagram())
        .subcommand(subcommand_export())
        .subcommand(subcommand_generate())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .subcommand(subcommand_refine())
        .subcommand(subcommand_sessions())
        .arg(
            arg_config(
                ConfigKey::Backend,
                "CLOUDSKETCH_BACKEND",
                format!("The model backend to send requirements to. [default: {}]", Config::default(ConfigKey::Backend)),
            )
            .short('b')
            .value_parser(PossibleValuesParser::new(BackendName::VARIANTS)),
        )
        .arg(
            arg_config(
                ConfigKey::Model,
                "CLOUDSKETCH_MODEL",
                "The model to use on the backend. Defaults to qwen-max for Qianwen and gemini-pro for Gemini.".to_string(),
            )
            .short('m'),
        )
        .arg(
            arg_config(
                ConfigKey::ConfigFile,
                "CLOUDSKETCH_CONFIG_FILE",
                format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)),
            )
            .short('c'),
        )
        .arg(arg_config(
            ConfigKey::QianwenURL,
            "CLOUDSKETCH_QIANWEN_URL",
            format!("DashScope text generation endpoint when using the Qianwen backend. [default: {}]", Config::default(ConfigKey::QianwenURL)),
        ))
        .arg(arg_config(
            ConfigKey::QianwenApiKey,
            "QIANWEN_API_KEY",
            "DashScope API key when using the Qianwen backend.".to_string(),
        ))
        .arg(arg_config(
            ConfigKey::GeminiURL,
            "CLOUDSKETCH_GEMINI_URL",
            format!("Google Generative Language API URL when using the Gemini backend. [default: {}]", Config::default(ConfigKey::GeminiURL)),
        ))
        .arg(arg_config(
            ConfigKey::GeminiApiKey,
            "GEMINI_API_KEY",
            "Google API key when using the Gemini backend.".to_string(),
        ))
        .arg(arg_config(
            ConfigKey::Temperature,
            "CLOUDSKETCH_TEMPERATURE",
            format!("Sampling temperature sent to the model. [default: {}]", Config::default(ConfigKey::Temperature)),
        ))
        .arg(arg_config(
            ConfigKey::TopP,
            "CLOUDSKETCH_TOP_P",
            format!("Nucleus sampling probability sent to the model. [default: {}]", Config::default(ConfigKey::TopP)),
        ))
        .arg(arg_config(
            ConfigKey::MaxTokens,
            "CLOUDSKETCH_MAX_TOKENS",
            format!("Maximum number of tokens the model may generate. [default: {}]", Config::default(ConfigKey::MaxTokens)),
        ))
        .arg(arg_config(
            ConfigKey::RequestTimeout,
            "CLOUDSKETCH_REQUEST_TIMEOUT",
            format!("Time to wait in milliseconds for a model response. [default: {}]", Config::default(ConfigKey::RequestTimeout)),
        ))
        .arg(arg_config(
            ConfigKey::DataDir,
            "CLOUDSKETCH_DATA_DIR",
            format!("Directory holding the sessions file. [default: {}]", Config::default(ConfigKey::DataDir)),
        ))
        .arg(arg_config(
            ConfigKey::PromptsDir,
            "CLOUDSKETCH_PROMPTS_DIR",
            format!("Directory with prompt template overrides, as <backend>/<kind>.md or <kind>.md. [default: {}]", Config::default(ConfigKey::PromptsDir)),
        ))
        .arg(arg_config(
            ConfigKey::RulesDir,
            "CLOUDSKETCH_RULES_DIR",
            format!("Directory with Markdown architecture rules. [default: {}]", Config::default(ConfigKey::RulesDir)),
        ))
        .arg(arg_config(
            ConfigKey::IconsDir,
            "CLOUDSKETCH_ICONS_DIR",
            "Directory with <ServiceType>.png icons for Graphviz diagrams.".to_string(),
        ))
        .arg(
            arg_config(
                ConfigKey::Renderer,
                "CLOUDSKETCH_RENDERER",
                format!("Diagram format. [default: {}]", Config::default(ConfigKey::Renderer)),
            )
            .value_parser(PossibleValuesParser::new(RendererName::VARIANTS)),
        )
        .arg(arg_config(
            ConfigKey::RuleImprovementRounds,
            "CLOUDSKETCH_RULE_IMPROVEMENT_ROUNDS",
            format!("How many times the model is asked to fix rule violations. [default: {}]", Config::default(ConfigKey::RuleImprovementRounds)),
        ));
}

/// Handles one-shot commands. Returns the config to chat with when the
/// interactive chat should start.
pub async fn parse() -> Result<Option<Config>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    println!("{}", log_dir().join("debug.log").display());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                Some(("service-types", _)) => {
                    println!("{}", ServiceType::names().join("\n"));
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(None);
        }
        Some(("chat", subcmd_matches)) => {
            let config = Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(config));
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
            return Ok(None);
        }
        Some(("generate", subcmd_matches)) => {
            let config = Config::load(build(), vec![&matches, subcmd_matches]).await?;
            generate_architecture(&config, subcmd_matches).await?;
            return Ok(None);
        }
        Some(("refine", subcmd_matches)) => {
            let config = Config::load(build(), vec![&matches, subcmd_matches]).await?;
            refine(&config, subcmd_matches).await?;
            return Ok(None);
        }
        Some(("export", subcmd_matches)) => {
            let config = Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let store = load_store(&config).await;
            let session_id = target_session_id(&store, subcmd_matches)?;
            let output = output_arg(subcmd_matches, &session_id, "md");
            export_architecture(&store, &session_id, &output).await?;
            return Ok(None);
        }
        Some(("diagram", subcmd_matches)) => {
            let config = Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let store = load_store(&config).await;
            let session_id = target_session_id(&store, subcmd_matches)?;
            let extension = match RendererName::parse(config.get(ConfigKey::Renderer)) {
                Some(RendererName::Mermaid) => "mmd",
                _ => "dot",
            };
            let output = output_arg(subcmd_matches, &session_id, extension);
            write_diagram(&config, &store, &session_id, &output).await?;
            return Ok(None);
        }
        Some(("sessions", subcmd_matches)) => {
            match subcmd_matches.subcommand() {
                Some(("dir", dir_matches)) => {
                    let config = Config::load(build(), vec![&matches, dir_matches]).await?;
                    println!("{}", config.get(ConfigKey::DataDir));
                }
                Some(("list", list_matches)) => {
                    let config = Config::load(build(), vec![&matches, list_matches]).await?;
                    print_sessions_list(&config).await?;
                }
                Some(("create", create_matches)) => {
                    let config = Config::load(build(), vec![&matches, create_matches]).await?;
                    let mut store = load_store(&config).await;
                    let name = create_matches
                        .get_one::<String>("name")
                        .map(|e| return e.to_string())
                        .unwrap_or_default();
                    let session_id = store.create_session(&name).await;
                    store.flush().await?;
                    println!("Created session {}", store.get_session(&session_id)?.describe());
                }
                Some(("rename", rename_matches)) => {
                    let config = Config::load(build(), vec![&matches, rename_matches]).await?;
                    let mut store = load_store(&config).await;
                    let session_id = target_session_id(&store, rename_matches)?;
                    let name = rename_matches
                        .get_one::<String>("name")
                        .map(|e| return e.to_string())
                        .unwrap_or_default();
                    store.rename_session(&session_id, &name).await?;
                    store.flush().await?;
                    println!("Renamed session {session_id} to {name}");
                }
                Some(("show", show_matches)) => {
                    let config = Config::load(build(), vec![&matches, show_matches]).await?;
                    show_session(&config, show_matches).await?;
                }
                Some(("open", open_matches)) => {
                    let mut config = Config::load(build(), vec![&matches, open_matches]).await?;
                    if let Some(session_id) = session_id_arg(open_matches) {
                        load_store(&config).await.get_session(&session_id)?;
                        config.set(ConfigKey::SessionID, &session_id);
                    } else if !load_session_interactive(&mut config).await? {
                        return Ok(None);
                    }
                    return Ok(Some(config));
                }
                Some(("delete", delete_matches)) => {
                    let config = Config::load(build(), vec![&matches, delete_matches]).await?;
                    let mut store = load_store(&config).await;
                    if let Some(session_id) = session_id_arg(delete_matches) {
                        store.delete_session(&session_id).await?;
                        store.flush().await?;
                        println!("Deleted session {session_id}");
                    } else if delete_matches.get_flag("all") {
                        let count = store.delete_all_sessions().await;
                        store.flush().await?;
                        println!("Deleted all {count} sessions");
                    } else {
                        subcommand_sessions_delete().print_long_help()?;
                    }
                }
                _ => {
                    subcommand_sessions().print_long_help()?;
                }
            }

            return Ok(None);
        }
        _ => {
            let config = Config::load(build(), vec![&matches]).await?;
            return Ok(Some(config));
        }
    }
}
