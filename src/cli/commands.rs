use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "apibridge")]
#[command(author, version, about = "Expose OpenAPI operations as callable tools", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to config/$CONFIG_ENV)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import every configured API and list the merged tools
    Tools {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Import a single API description and print its tool descriptors
    Inspect {
        namespace: String,

        /// File path or http(s) URL of the description
        spec: String,

        #[arg(long)]
        server_url: Option<String>,
    },

    /// Call one tool of the configured APIs
    Call {
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
