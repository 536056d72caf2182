use argh::FromArgs;
use serde_json::{Value, json};
use std::path::PathBuf;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5000;

#[derive(FromArgs)]
/// Client for the summarization API
struct ClientArgs {
    /// the host to connect to
    #[argh(option, default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "health", "summarize" or "batch"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Health(HealthCommand),
    Summarize(SummarizeCommand),
    Batch(BatchCommand),
}

#[derive(FromArgs)]
/// Check that the server is up
#[argh(subcommand, name = "health")]
struct HealthCommand {}

#[derive(FromArgs)]
/// Summarize one text
#[argh(subcommand, name = "summarize")]
struct SummarizeCommand {
    /// the text to summarize
    #[argh(option, short = 't')]
    text: Option<String>,

    /// read the text from a file instead
    #[argh(option, short = 'f')]
    file: Option<PathBuf>,

    /// maximum summary length in tokens
    #[argh(option)]
    max_length: Option<usize>,

    /// minimum summary length in tokens
    #[argh(option)]
    min_length: Option<usize>,
}

#[derive(FromArgs)]
/// Summarize several texts in one request
#[argh(subcommand, name = "batch")]
struct BatchCommand {
    /// a text to summarize, repeat for more
    #[argh(option, short = 't')]
    text: Vec<String>,

    /// maximum summary length in tokens
    #[argh(option)]
    max_length: Option<usize>,

    /// minimum summary length in tokens
    #[argh(option)]
    min_length: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let response = match args.command {
        ClientCommands::Health(_) => client.get(format!("http://{}/health", addr)).send().await?,
        ClientCommands::Summarize(cmd) => {
            let text = match (cmd.text, cmd.file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => return Err("either --text or --file is required".into()),
            };
            let mut payload = json!({ "text": text });
            with_lengths(&mut payload, cmd.max_length, cmd.min_length);

            client
                .post(format!("http://{}/summarize", addr))
                .json(&payload)
                .send()
                .await?
        }
        ClientCommands::Batch(cmd) => {
            let mut payload = json!({ "texts": cmd.text });
            with_lengths(&mut payload, cmd.max_length, cmd.min_length);

            client
                .post(format!("http://{}/batch_summarize", addr))
                .json(&payload)
                .send()
                .await?
        }
    };

    let status = response.status();
    let result = response.json::<Value>().await?;
    println!("Status: {}", status);
    println!("Result: {}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn with_lengths(payload: &mut Value, max_length: Option<usize>, min_length: Option<usize>) {
    if let Some(max_length) = max_length {
        payload["max_length"] = json!(max_length);
    }
    if let Some(min_length) = min_length {
        payload["min_length"] = json!(min_length);
    }
}
