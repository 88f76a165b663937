use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cuebot_cli::commands;
use cuebot_cli::logging;
use cuebot_cli::readline;
use cuebot_cli::CliContext;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();

    // Optional definitions file or directory overriding the config
    let definitions = std::env::args().nth(1).map(PathBuf::from);
    let ctx = CliContext::new(definitions)?;
    println!(
        "Loaded definitions from {}. Type `help` for commands.",
        ctx.definitions_path.display()
    );

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "cuebot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a chat message as a viewer, e.g. `chat alice "!so @bob"`
    Chat { user: String, message: String },
    /// Run a preset list with name=value arguments
    Preset {
        id: String,
        args: Vec<String>,
        #[arg(short, long)]
        user: Option<String>,
        /// Queue it instead of running it inline
        #[arg(long)]
        queued: bool,
    },
    Commands,
    Queues,
    /// pause | resume | toggle | clear | interval=<ms>
    Queue { id: String, action: String },
    Timers,
    /// enable | disable | toggle | clear
    Timer { id: String, action: String },
    Vars,
    Get { name: String },
    Set {
        name: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    Effects,
    Variables,
    /// Resolve a template without side effects
    Preview {
        template: String,
        #[arg(short, long, default_value = "streamer")]
        user: String,
        args: Vec<String>,
    },
    /// Send a raw request through the router, e.g. `api GET /queues`
    Api {
        method: String,
        path: String,
        body: Option<String>,
    },
    Reload,
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "cuebot".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Chat { user, message }) => commands::chat(ctx, user, message).await?,
        Some(Commands::Preset {
            id,
            args,
            user,
            queued,
        }) => commands::preset(ctx, id, args, user.as_deref(), !queued).await?,
        Some(Commands::Commands) => commands::list_commands(ctx),
        Some(Commands::Queues) => commands::list_queues(ctx),
        Some(Commands::Queue { id, action }) => commands::queue_action(ctx, id, action)?,
        Some(Commands::Timers) => commands::list_timers(ctx),
        Some(Commands::Timer { id, action }) => commands::timer_action(ctx, id, action)?,
        Some(Commands::Vars) => commands::list_vars(ctx),
        Some(Commands::Get { name }) => commands::get_var(ctx, name),
        Some(Commands::Set { name, value, ttl }) => commands::set_var(ctx, name, value, *ttl),
        Some(Commands::Effects) => commands::list_effects(ctx),
        Some(Commands::Variables) => commands::list_variables(ctx),
        Some(Commands::Preview {
            template,
            user,
            args,
        }) => commands::preview(ctx, template, user, args)?,
        Some(Commands::Api { method, path, body }) => {
            commands::api(ctx, method, path, body.as_deref()).await?
        }
        Some(Commands::Reload) => commands::reload(ctx)?,
        Some(Commands::Config) => commands::show_config(ctx),
        Some(Commands::Exit) => {
            commands::exit(ctx);
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
