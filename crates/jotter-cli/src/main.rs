use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jotter_cli::cli::{headless_backend, init_tracing, listen_backend, open_service, CliConfig};
use jotter_core::models::{
    CommandAction, CommandFilter, CommandPatch, CommandType, ExecutionContext, NewCommand, Params,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "jotter-cli")]
#[command(about = "Manage and run jotter commands and hotkeys")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (contains dataDir, logFile, seedBuiltins)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding the command database (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List commands sorted by category and name
    List {
        /// Only commands of this type (navigation, crud, application, agent)
        #[arg(long = "type")]
        command_type: Option<CommandType>,
        /// Only enabled commands
        #[arg(long)]
        enabled: bool,
    },

    /// Show one command with its hotkeys
    Show { id: String },

    /// Create a user command
    Create {
        name: String,
        #[arg(long = "type", default_value = "application")]
        command_type: CommandType,
        /// navigate, toggle, execute or agent-execute
        #[arg(long)]
        action: String,
        /// Action payload as JSON, e.g. '{"route":"settings"}'
        #[arg(long)]
        payload: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Create the command disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Change fields of a command; hotkeys follow the new enabled state
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
        /// New action type; requires --payload or uses an empty one
        #[arg(long)]
        action: Option<String>,
        #[arg(long, requires = "action")]
        payload: Option<String>,
    },

    /// Delete a user command and its hotkeys
    Delete { id: String },

    /// Bind an accelerator to a command
    AddHotkey {
        command_id: String,
        accelerator: String,
        /// Register with the OS instead of only while the app is focused
        #[arg(long)]
        global: bool,
    },

    /// Remove a hotkey binding
    RemoveHotkey { hotkey_id: String },

    /// Rebind a hotkey to another accelerator
    UpdateHotkey {
        hotkey_id: String,
        accelerator: String,
    },

    /// Check syntax and availability of an accelerator
    CheckAccelerator { accelerator: String },

    /// Execute a command and print its result
    Run {
        id: String,
        #[arg(long)]
        note_id: Option<String>,
        #[arg(long)]
        selected_text: Option<String>,
        /// Extra agent parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Register global hotkeys and execute commands as they fire
    Listen {
        /// Window label to report as focused
        #[arg(long)]
        window: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    init_tracing(config.log_file.as_deref())?;

    let core = config.core_config(cli.data_dir.as_deref());
    let backend = match cli.command {
        Commands::Listen { .. } => listen_backend()?,
        _ => headless_backend(),
    };
    let runtime = open_service(&core, backend, config.seed_builtins)?;
    let service = runtime.service.clone();

    match cli.command {
        Commands::List {
            command_type,
            enabled,
        } => {
            let filter = CommandFilter {
                command_type,
                enabled: enabled.then_some(true),
            };
            print_json(&service.list_commands(&filter)?, cli.pretty)?;
        }
        Commands::Show { id } => print_json(&service.get_command(&id)?, cli.pretty)?,
        Commands::Create {
            name,
            command_type,
            action,
            payload,
            description,
            category,
            disabled,
        } => {
            let mut input = NewCommand::new(name, command_type, parse_action(&action, payload)?);
            input.description = description;
            input.category = category;
            input.enabled = Some(!disabled);
            print_json(&service.create_command(input)?, cli.pretty)?;
        }
        Commands::Update {
            id,
            name,
            description,
            category,
            enabled,
            action,
            payload,
        } => {
            let patch = CommandPatch {
                name,
                description,
                enabled,
                action: action.map(|a| parse_action(&a, payload)).transpose()?,
                category,
            };
            if patch.is_empty() {
                bail!("Nothing to update");
            }
            print_json(&service.update_command(&id, patch)?, cli.pretty)?;
        }
        Commands::Delete { id } => print_json(&service.delete_command(&id)?, cli.pretty)?,
        Commands::AddHotkey {
            command_id,
            accelerator,
            global,
        } => print_json(
            &service.add_hotkey(&command_id, &accelerator, global)?,
            cli.pretty,
        )?,
        Commands::RemoveHotkey { hotkey_id } => {
            print_json(&service.remove_hotkey(&hotkey_id)?, cli.pretty)?
        }
        Commands::UpdateHotkey {
            hotkey_id,
            accelerator,
        } => print_json(&service.update_hotkey(&hotkey_id, &accelerator)?, cli.pretty)?,
        Commands::CheckAccelerator { accelerator } => {
            print_json(&service.validate_accelerator(&accelerator)?, cli.pretty)?
        }
        Commands::Run {
            id,
            note_id,
            selected_text,
            params,
        } => {
            let context = ExecutionContext {
                note_id,
                selected_text,
                params: params.as_deref().map(parse_params).transpose()?,
            };
            let result = service.execute_command(&id, Some(context)).await;
            print_json(&result, cli.pretty)?;
            if !result.success {
                service.shutdown();
                std::process::exit(2);
            }
        }
        Commands::Listen { window } => {
            runtime.notifier.set_focused_window(window);

            let mut notifications = runtime.notifier.subscribe();
            let pretty = cli.pretty;
            tokio::spawn(async move {
                while let Ok(notification) = notifications.recv().await {
                    if let Err(e) = print_json(&notification, pretty) {
                        tracing::warn!(error = %e, "Failed to print notification");
                    }
                }
            });

            let live = service.manager().live_accelerators();
            tracing::info!(live = live.len(), "Listening for global hotkeys, Ctrl-C to stop");
            print_json(&live, pretty)?;

            let manager = service.manager().clone();
            tokio::select! {
                _ = manager.run(runtime.triggers) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                }
            }
        }
    }

    service.shutdown();
    Ok(())
}

fn parse_action(action_type: &str, payload: Option<String>) -> Result<CommandAction> {
    let payload: Value = match payload {
        Some(json) => serde_json::from_str(&json).context("Invalid --payload JSON")?,
        None => Value::Null,
    };
    let action = CommandAction::from_parts(action_type, payload)
        .context("Payload does not match the action type")?;
    if let CommandAction::Unsupported { action_type } = &action {
        bail!("Unknown action type: {}", action_type);
    }
    Ok(action)
}

fn parse_params(json: &str) -> Result<Params> {
    serde_json::from_str(json).context("--params must be a JSON object")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
