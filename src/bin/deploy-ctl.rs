use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "deploy-ctl")]
#[command(about = "Management CLI for deploy-sync", long_about = None)]
struct Cli {
    #[arg(short, long, env = "DEPLOY_SYNC_ADMIN_URL", default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "DEPLOY_SYNC_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the running configuration version and policy
    Status,
    /// Ask the authority for its latest version and apply it if new
    Refresh,
    /// Apply a specific configuration version
    Update {
        /// Base URL of the configuration API holding the version
        #[arg(long)]
        api_url: String,
        /// Configuration id
        #[arg(long)]
        config_id: String,
        /// Configuration version id
        #[arg(long)]
        version_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Refresh => client.get(format!("{}/config/refresh", cli.url)),
        Commands::Update {
            api_url,
            config_id,
            version_id,
        } => client.put(format!("{}/config/update", cli.url)).json(&json!({
            "url": api_url,
            "instance_configuration_id": config_id,
            "instance_configuration_version_id": version_id,
        })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();

    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
