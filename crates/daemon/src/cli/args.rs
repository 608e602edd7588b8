pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "relfs")]
#[command(about = "Browse a repository's release assets with ordinary file tools", version)]
pub struct Args {
    /// GitHub API base URL (override for GitHub Enterprise)
    #[arg(long, global = true, default_value = "https://api.github.com")]
    pub api_url: Url,

    /// Access token for private repositories and higher rate limits
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
