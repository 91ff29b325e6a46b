use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the recommendation backend.
    #[arg(long, env = "BACKEND_URL", default_value = "http://127.0.0.1:4000")]
    pub backend_url: String,

    /// Run the placeholder mock backend endpoint instead of the chat prompt.
    #[arg(long, env = "MOCK_SERVER", default_value = "false")]
    pub mock_server: bool,

    /// Host address and port for the mock endpoint to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Fixed processing delay for the mock endpoint, in milliseconds.
    #[arg(long, env = "MOCK_DELAY_MS", default_value = "1000")]
    pub mock_delay_ms: u64,

    /// Conversation history store type (file, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Directory for the file history store.
    #[arg(long, env = "HISTORY_PATH", default_value = ".card-advisor")]
    pub history_path: String,
}
