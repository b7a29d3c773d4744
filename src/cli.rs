use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linguabot")]
#[command(author, version, about = "Multilingual Telegram bot: broadcasts, channel gate and user registry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Apply database migrations and exit
    Migrate {
        /// Database file, defaults to DB_PATH
        #[arg(long)]
        db_path: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
