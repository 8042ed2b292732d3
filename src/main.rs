use std::path::PathBuf;

use clap::{Parser, Subcommand};

use traybridge::cli;
use traybridge::config::{Config, ElicitationMode};
use traybridge::hooks::{self, HookOutcome};

#[derive(Parser)]
#[command(
    name = "traybridge",
    version,
    about = "File-based bridge between assistant sessions and a tray responder"
)]
struct Cli {
    /// State directory root (default: $TRAYBRIDGE_DIR or ~/.traybridge)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hook (reads the hook document from stdin)
    Hook {
        #[command(subcommand)]
        event: HookEvent,
    },
    /// Poll the state tree and print changes (the responder loop)
    Watch,
    /// List tracked sessions
    Sessions,
    /// List pending requests
    Queue,
    /// Approve a pending permission request
    Approve {
        id: String,
        /// Record the stronger "always allow" intent
        #[arg(long)]
        always: bool,
    },
    /// Deny a pending permission request
    Deny { id: String },
    /// Answer one question of a pending elicitation request
    Answer {
        id: String,
        /// Question index within the request
        #[arg(long)]
        question: usize,
        /// The chosen option label
        #[arg(long)]
        option: String,
    },
    /// Merge the hook configuration into the assistant's settings file
    InstallHooks {
        /// Settings file to merge into (default: ~/.claude/settings.json)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config {
        /// Set the shared elicitation mode instead of printing
        #[arg(long, value_parser = ["terminal", "menubar"])]
        elicitation_mode: Option<String>,
    },
}

#[derive(Subcommand)]
enum HookEvent {
    /// SessionStart: register the session
    SessionStart,
    /// SessionEnd: remove the session
    SessionEnd,
    /// UserPromptSubmit: a new turn begins
    Prompt,
    /// PermissionRequest: block for a tray decision
    Permission,
    /// PreToolUse (AskUserQuestion): publish or block for answers
    Elicitation,
    /// PostToolUse (AskUserQuestion): the question was answered natively
    ElicitationCleanup,
    /// PostToolUse (catch-all): tool activity
    Activity,
    /// Stop: the turn finished
    Stop,
    /// Notification: out-of-band status message
    Notification,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.root.as_deref());

    match cli.command {
        Commands::Hook { event } => {
            let code = run_hook(&config, event).await;
            std::process::exit(code);
        }
        Commands::Watch => cli::watch::run_watch(config).await?,
        Commands::Sessions => cli::sessions::run_sessions(&config).await?,
        Commands::Queue => cli::queue::run_queue(&config).await?,
        Commands::Approve { id, always } => cli::queue::run_approve(&config, &id, always).await?,
        Commands::Deny { id } => cli::queue::run_deny(&config, &id).await?,
        Commands::Answer {
            id,
            question,
            option,
        } => cli::queue::run_answer(&config, &id, question, &option).await?,
        Commands::InstallHooks { settings } => {
            cli::install::run_install_hooks(&config, settings.as_deref()).await?
        }
        Commands::Config { elicitation_mode } => {
            let mode = elicitation_mode.map(|m| match m.as_str() {
                "menubar" => ElicitationMode::Menubar,
                _ => ElicitationMode::Terminal,
            });
            cli::config_cmd::run_config(&config, mode).await?
        }
    }
    Ok(())
}

/// Dispatch one hook invocation to its handler and fold everything, errors
/// included, into the exit-code contract. A hook that cannot do its job
/// must not look like a verdict: blocking hooks fail toward the native
/// prompt (exit 1), status hooks fail silent (exit 0).
async fn run_hook(config: &Config, event: HookEvent) -> i32 {
    let input = match hooks::read_hook_input() {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!("unusable hook input: {e}");
            return match event {
                HookEvent::Permission | HookEvent::Elicitation => {
                    HookOutcome::Fallback.exit_code()
                }
                _ => HookOutcome::Proceed.exit_code(),
            };
        }
    };

    let result = match event {
        HookEvent::SessionStart => hooks::session::run_session_start(config, &input),
        HookEvent::SessionEnd => hooks::session::run_session_end(config, &input),
        HookEvent::Prompt => hooks::activity::run_prompt(config, &input),
        HookEvent::Permission => hooks::permission::run_permission(config, &input).await,
        HookEvent::Elicitation => hooks::elicitation::run_elicitation(config, &input).await,
        HookEvent::ElicitationCleanup => {
            hooks::elicitation::run_elicitation_cleanup(config, &input)
        }
        HookEvent::Activity => hooks::activity::run_activity(config, &input),
        HookEvent::Stop => hooks::activity::run_stop(config, &input),
        HookEvent::Notification => hooks::activity::run_notification(config, &input),
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::warn!("hook failed: {e}");
            match event {
                HookEvent::Permission | HookEvent::Elicitation => {
                    HookOutcome::Fallback.exit_code()
                }
                _ => HookOutcome::Proceed.exit_code(),
            }
        }
    }
}
