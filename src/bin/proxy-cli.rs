use clap::{Parser, Subcommand};
use reqwest::redirect::Policy;
use serde_json::json;

use path_proxy::{decode, encode, TargetOrigin};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Token and link tooling for path-proxy", long_about = None)]
struct Cli {
    /// Base URL of a running proxy.
    #[arg(short, long, default_value = "http://localhost:3000")]
    base: String,

    /// Proxy path prefix.
    #[arg(short, long, default_value = "proxy")]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token for a target URL
    Encode { url: String },
    /// Decode a token and print the target as JSON
    Decode { token: String },
    /// Print the full proxy link for a target URL
    Link { url: String },
    /// GET a target through the proxy and show status and headers (redirects not followed)
    Fetch { url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { url } => {
            let target = TargetOrigin::parse(&url)?;
            println!("{}", encode(&target));
        }
        Commands::Decode { token } => {
            let target = decode(&token)?;
            let out = json!({
                "url": target.as_str(),
                "scheme": target.scheme(),
                "host": target.hostname(),
                "port": target.as_url().port_or_known_default(),
                "path": target.path(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Link { url } => {
            println!("{}", proxy_link(&cli.base, &cli.prefix, &url)?);
        }
        Commands::Fetch { url } => {
            let link = proxy_link(&cli.base, &cli.prefix, &url)?;
            let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
            let res = client.get(&link).send().await?;

            println!("GET {}", link);
            println!("{}", res.status());
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
        }
    }

    Ok(())
}

fn proxy_link(base: &str, prefix: &str, url: &str) -> Result<String, Box<dyn std::error::Error>> {
    let target = TargetOrigin::parse(url)?;
    Ok(format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        prefix.trim_matches('/'),
        encode(&target)
    ))
}
