use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the edge gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000", env = "GATEWAY_URL")]
    url: String,

    /// Sent as a bearer token on proxied admin calls.
    #[arg(short, long, env = "GATEWAY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway liveness
    Health,
    /// Aggregated health of every backend service
    Services,
    /// Performance report from the observability service
    Report,
    /// Audit log from the orchestration engine
    Audit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Health => "/health",
        Commands::Services => "/health/services",
        Commands::Report => "/admin/report",
        Commands::Audit => "/admin/audit",
    };

    let mut request = client.get(format!("{}{}", cli.url.trim_end_matches('/'), path));
    if let Some(token) = &cli.token {
        request = request.bearer_auth(token);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let service = res
        .headers()
        .get("x-upstream-service")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    if let Some(service) = service {
        eprintln!("answered by {}", service);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
