use argh::FromArgs;
use infernum_summarize::{
    LengthOverrides, Profile, SummarizerEngine,
    config::{self, CliOverrides, ServerConfig},
    pipeline, server,
    t5::T5Summarizer,
};
use std::{io::Read, path::PathBuf, sync::Arc};

#[derive(FromArgs)]
/// Summarization API backed by a pretrained T5 model.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Serve(ServeCommand),
    Summarize(SummarizeCommand),
}

#[derive(FromArgs)]
/// Load the model and serve the HTTP API
#[argh(subcommand, name = "serve")]
struct ServeCommand {
    /// the host to bind to [env: SUMMARIZER_HOST]
    #[argh(option)]
    host: Option<String>,

    /// the port to listen on [env: SUMMARIZER_PORT]
    #[argh(option, short = 'p')]
    port: Option<u16>,

    #[argh(option)]
    /// generation profile, "quality" or "fast" [env: SUMMARIZER_PROFILE]
    profile: Option<Profile>,

    #[argh(option)]
    /// directory with config.json, tokenizer.json and model.safetensors
    model_dir: Option<PathBuf>,

    #[argh(option)]
    /// task prefix prepended to every input [env: SUMMARIZER_PREFIX]
    prefix: Option<String>,

    #[argh(switch)]
    /// run the model on the CPU
    cpu: bool,

    #[argh(switch)]
    /// verbose logging [env: SUMMARIZER_ENV=development]
    debug: bool,
}

#[derive(FromArgs)]
/// Summarize a single text locally, without the HTTP server
#[argh(subcommand, name = "summarize")]
struct SummarizeCommand {
    #[argh(option, short = 't')]
    /// the text to summarize, read from stdin when omitted
    text: Option<String>,

    #[argh(option)]
    /// maximum summary length in tokens
    max_length: Option<usize>,

    #[argh(option)]
    /// minimum summary length in tokens
    min_length: Option<usize>,

    #[argh(option)]
    /// generation profile, "quality" or "fast"
    profile: Option<Profile>,

    #[argh(option)]
    /// directory with config.json, tokenizer.json and model.safetensors
    model_dir: Option<PathBuf>,

    #[argh(option)]
    /// task prefix prepended to the input [env: SUMMARIZER_PREFIX]
    prefix: Option<String>,

    #[argh(switch)]
    /// run the model on the CPU
    cpu: bool,

    #[argh(switch)]
    /// verbose logging [env: SUMMARIZER_ENV=development]
    debug: bool,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let cli = match args.command {
        Command::Serve(ref cmd) => CliOverrides {
            host: cmd.host.clone(),
            port: cmd.port,
            profile: cmd.profile,
            model_dir: cmd.model_dir.clone(),
            prefix: cmd.prefix.clone(),
            cpu: cmd.cpu,
            debug: cmd.debug,
        },
        Command::Summarize(ref cmd) => CliOverrides {
            profile: cmd.profile,
            model_dir: cmd.model_dir.clone(),
            prefix: cmd.prefix.clone(),
            cpu: cmd.cpu,
            debug: cmd.debug,
            ..Default::default()
        },
    };

    // the logger comes first so warnings raised while resolving the config are kept
    init_logging(config::debug_enabled(cli.debug, |key| {
        std::env::var(key).ok()
    }));
    let config = ServerConfig::resolve(cli)?;

    match args.command {
        Command::Serve(_) => serve(config).await,
        Command::Summarize(cmd) => {
            let overrides = LengthOverrides {
                max_length: cmd.max_length,
                min_length: cmd.min_length,
            };
            summarize_once(config, cmd.text, overrides)
        }
    }
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    log::info!(
        "Loading summarization model from {}",
        config.model.model_dir.display()
    );
    let model = T5Summarizer::load(&config.model)?;
    log::info!("Model loaded successfully!");

    let engine = Arc::new(SummarizerEngine::new(model, config.profile));
    let app = server::router(engine);

    let addr = config.addr();
    log::info!("Using the {} profile", config.profile);
    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn summarize_once(
    config: ServerConfig,
    text: Option<String>,
    overrides: LengthOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match text {
        Some(text) => text,
        None => {
            eprintln!("Enter the text to summarize (end with Ctrl+D):");
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if text.trim().is_empty() {
        return Err("Empty text provided".into());
    }

    let mut model = T5Summarizer::load(&config.model)?;
    let settings = config.profile.settings().resolve(overrides);
    let summary = pipeline::summarize_text(&mut model, &text, &settings)?;
    println!("{}", summary);

    Ok(())
}
