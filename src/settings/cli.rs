use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "shop-access", about = "Access tokens and sessions for the shop API")]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(long)]
    pub settings: Option<String>,
}
