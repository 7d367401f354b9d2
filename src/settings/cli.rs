use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "warden", about = "Authentication and session service")]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
