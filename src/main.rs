use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::error::Error;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use card_advisor::cli::Args;
use card_advisor::client::AdvisorClient;
use card_advisor::history::create_store;
use card_advisor::models::chat::{ConversationTurn, Role};
use card_advisor::models::stream::CardsData;
use card_advisor::server;
use card_advisor::session::{CancelSignal, ChatSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("History Store Type: {}", args.history_type);
    info!("History Path: {}", args.history_path);
    info!("Mock Server Mode: {}", args.mock_server);
    if args.mock_server {
        info!("Server Address: {}", args.server_addr);
        info!("Mock Delay (ms): {}", args.mock_delay_ms);
    }
    info!("--------------------------");

    if args.mock_server {
        return server::run(&args).await;
    }

    run_chat(&args).await
}

async fn run_chat(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = create_store(args)?;
    let client = AdvisorClient::new(&args.backend_url);
    let mut session = ChatSession::new(client, store).await;

    for turn in session.turns() {
        print_turn(turn);
    }
    println!("(/cards shows recommendations, /clear resets, /quit exits; Ctrl-C cancels a running request)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear().await;
                println!("Conversation cleared.");
            }
            "/cards" => {
                let cards = match session.latest_cards().await {
                    Some(cards) => Some(cards),
                    None => session.load_last_cards().await,
                };
                match cards {
                    Some(cards) => print_cards(&cards),
                    None => println!("No recommendations yet."),
                }
            }
            query => submit_query(&mut session, query).await,
        }
    }

    Ok(())
}

async fn submit_query(session: &mut ChatSession, query: &str) {
    let (signal, cancel) = CancelSignal::new();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    println!();
    let mut printed = String::new();
    let on_update = |turn: &ConversationTurn| {
        match incremental_suffix(&printed, &turn.content) {
            Some(suffix) => print!("{}", suffix),
            // Terminal text replaced the accumulated content.
            None => print!("\n{}", turn.content),
        }
        printed = turn.content.clone();
        let _ = std::io::stdout().flush();
    };

    session.submit(query, cancel, on_update).await;
    watcher.abort();
    println!("\n");

    if let Some(cards) = session.turns().last().and_then(|t| t.cards.as_ref()) {
        println!("({} recommendations received; use /cards to view them)", cards.matches.len());
    }
}

/// The not-yet-printed tail of `content`, or `None` when the turn text was
/// replaced outright (cancellation or failure) and must be reprinted whole.
/// Byte offsets into the old text are never used to slice the new one.
fn incremental_suffix<'a>(printed: &str, content: &'a str) -> Option<&'a str> {
    content.strip_prefix(printed)
}

fn print_turn(turn: &ConversationTurn) {
    let who = match turn.role {
        Role::User => "You",
        Role::Assistant => "Advisor",
    };
    println!("{} [{}]:", who, turn.timestamp.format("%H:%M"));
    println!("{}\n", turn.content);
}

fn print_cards(cards: &CardsData) {
    if !cards.explanation.is_empty() {
        println!("{}\n", cards.explanation);
    }
    for card in &cards.matches {
        println!("{} ({})", card.card_name, card.bank);
        if !card.reward_rate.is_empty() {
            println!("  Rewards: {}", card.reward_rate);
        }
        if !card.annual_fee_display.is_empty() {
            println!("  Annual fee: {}", card.annual_fee_display);
        }
        if let Some(offer) = &card.welcome_offer {
            println!("  Welcome offer: {}", offer);
        }
        if !card.summary.is_empty() {
            println!("  {}", card.summary);
        }
        if !card.relevant_features.is_empty() {
            println!("  Highlights: {}", card.relevant_features.join(", "));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::incremental_suffix;
    use card_advisor::assembler::FAILURE_MESSAGE;

    #[test]
    fn appended_text_yields_only_the_new_suffix() {
        assert_eq!(incremental_suffix("", "ab"), Some("ab"));
        assert_eq!(incremental_suffix("ab", "abc"), Some("c"));
        assert_eq!(incremental_suffix("abc", "abc"), Some(""));
    }

    #[test]
    fn replacement_text_is_reprinted_not_sliced() {
        // An accumulated "ab" replaced by the longer failure text: slicing
        // the new text at byte 2 would land inside the leading '❌'.
        assert_eq!(incremental_suffix("ab", FAILURE_MESSAGE), None);
        assert_eq!(incremental_suffix("partial answer", "Request cancelled"), None);
    }
}
