use std::{
    io::{
        self,
        BufRead,
        Write,
    },
    sync::mpsc::{
        self,
        RecvTimeoutError,
    },
    thread,
    time::Duration,
};

use clap::{
    Parser,
    ValueEnum,
};
use flashdeck::{
    proposal::{
        ChatMessage,
        Role,
    },
    AcceptPolicy,
    ApiClient,
    CardField,
    ClientSettings,
    EditSession,
    FlashdeckError,
    LoadState,
    SaveStatus,
};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const EXIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AcceptMode {
    FirstOnly,
    All,
}

#[derive(Parser)]
#[command(name = "flashdeck")]
#[command(about = "Edit flashcard decks with AI-proposed changes")]
#[command(version)]
struct Cli {
    /// Deck to open for editing
    #[arg(long)]
    deck: Option<u64>,

    /// List your decks and exit
    #[arg(long)]
    list: bool,

    /// Delete a deck and exit
    #[arg(long, conflicts_with_all = ["deck", "list"])]
    delete: Option<u64>,

    /// Backend base URL (overrides settings and FLASHDECK_API_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token (overrides settings and FLASHDECK_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Which proposed commands an approval accepts
    #[arg(long, value_enum, conflicts_with = "accept_indexes")]
    accept: Option<AcceptMode>,

    /// Explicit command indexes an approval accepts, e.g. 0,2
    #[arg(long, value_delimiter = ',')]
    accept_indexes: Option<Vec<usize>>,

    /// Persist the effective settings before starting
    #[arg(long)]
    save_settings: bool,
}

fn main() -> Result<(), FlashdeckError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = ClientSettings::load();
    settings.apply_overrides(cli.base_url.clone(), cli.token.clone());
    if let Some(indexes) = cli.accept_indexes.clone() {
        settings.acceptance = AcceptPolicy::Indexes(indexes);
    } else if let Some(mode) = cli.accept {
        settings.acceptance = match mode {
            AcceptMode::FirstOnly => AcceptPolicy::FirstOnly,
            AcceptMode::All => AcceptPolicy::All,
        };
    }
    if cli.save_settings {
        settings.save()?;
    }

    let api = ApiClient::new(&settings.api)?;

    if cli.list {
        return list_decks(&api);
    }
    if let Some(deck_id) = cli.delete {
        return delete_deck(&api, deck_id);
    }

    let Some(deck_id) = cli.deck else {
        eprintln!("Pass --deck <ID> to edit a deck, or --list to see your decks.");
        return Ok(());
    };

    let mut session = EditSession::open(api, deck_id, settings.acceptance.clone())?;
    run(&mut session)
}

fn list_decks(api: &ApiClient) -> Result<(), FlashdeckError> {
    let runtime = tokio::runtime::Runtime::new()?;
    let decks = runtime.block_on(api.list_decks())?;

    if decks.is_empty() {
        println!("No decks yet.");
    }
    for deck in decks {
        println!("{:>5}  {} ({} cards)", deck.id, deck.name, deck.cards.len());
    }
    Ok(())
}

fn delete_deck(api: &ApiClient, deck_id: u64) -> Result<(), FlashdeckError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api.delete_deck(deck_id))?;
    println!("Deleted deck {deck_id}.");
    Ok(())
}

/// Feeds stdin lines to the event loop so backend lanes keep progressing while the user types.
fn spawn_line_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

/// What the terminal has already shown, so polling only prints changes.
struct Screen {
    messages: usize,
    load_state: Option<LoadState>,
    save_status: SaveStatus,
}

impl Screen {
    fn refresh(&mut self, session: &EditSession) {
        if self.load_state.as_ref() != Some(session.load_state()) {
            print_load_state(session);
            self.load_state = Some(session.load_state().clone());
        }
        if &self.save_status != session.save_status() {
            print_save_status(session);
            self.save_status = session.save_status().clone();
        }
        self.messages = print_new_messages(session, self.messages);
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

fn run(session: &mut EditSession) -> Result<(), FlashdeckError> {
    let lines = spawn_line_reader();
    let mut screen = Screen { messages: 0, load_state: None, save_status: SaveStatus::Idle };

    screen.refresh(session);
    prompt()?;

    loop {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                let line = line.trim_end_matches('\r');
                if line.trim() == ":quit" {
                    break;
                }
                if session.is_ready() || matches!(line.trim(), ":retry" | ":help") {
                    handle_line(session, line);
                } else {
                    println!("Deck is not loaded. Use :retry or :quit.");
                }
                screen.refresh(session);
                prompt()?;
            }
            Err(RecvTimeoutError::Timeout) => {
                if session.poll() {
                    println!();
                    screen.refresh(session);
                    prompt()?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                session.settle(EXIT_TIMEOUT);
                screen.refresh(session);
                break;
            }
        }
    }

    Ok(())
}

fn handle_line(session: &mut EditSession, line: &str) {
    let (command, rest) = match line.trim().split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line.trim(), ""),
    };

    match command {
        ":help" => print_help(),
        ":retry" => session.retry_load(),
        ":accept" => match parse_policy(rest) {
            Some(policy) => session.set_acceptance(policy),
            None if rest.is_empty() => println!("Approvals accept {}.", describe_policy(session.acceptance())),
            None => println!("Use :accept first, :accept all or :accept 0,2."),
        },
        ":cards" => print_cards(session),
        ":name" => session.set_name(rest),
        ":desc" => session.set_description(rest),
        ":add" => {
            session.add_card();
            if let Some((question, answer)) = rest.split_once('|') {
                let index = session.cards().len() - 1;
                session.edit_card(index, CardField::Question, question.trim());
                session.edit_card(index, CardField::Answer, answer.trim());
            }
        }
        ":rm" => match parse_position(rest) {
            Some(index) if session.remove_card(index).is_some() => {}
            _ => println!("No such card."),
        },
        ":q" | ":a" => {
            let field = if command == ":q" { CardField::Question } else { CardField::Answer };
            let (position, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let edited = parse_position(position)
                .is_some_and(|index| session.edit_card(index, field, text.trim()));
            if !edited {
                println!("No such card.");
            }
        }
        ":save" => session.save(),
        ":dismiss" => session.dismiss_save_status(),
        ":preview" => match pending_id(session, rest) {
            Some(id) => print_preview(session, &id),
            None => println!("No pending proposal."),
        },
        ":approve" => match pending_id(session, rest) {
            Some(id) if session.approve(&id) => {}
            _ => println!("Nothing to approve."),
        },
        ":deny" => match pending_id(session, rest) {
            Some(id) if session.deny(&id) => {}
            _ => println!("Nothing to deny."),
        },
        ":reverse" => match applied_id(session, rest) {
            Some(id) if session.reverse(&id) => {}
            _ => println!("Nothing to reverse."),
        },
        _ if command.starts_with(':') => println!("Unknown command {command}. Try :help."),
        _ => {
            session.submit_message(line);
        }
    }
}

/// 1-based position as typed by the user, returned zero-based.
fn parse_position(text: &str) -> Option<usize> {
    text.trim().parse::<usize>().ok().filter(|&n| n > 0).map(|n| n - 1)
}

fn parse_policy(text: &str) -> Option<AcceptPolicy> {
    match text {
        "" => None,
        "first" => Some(AcceptPolicy::FirstOnly),
        "all" => Some(AcceptPolicy::All),
        _ => text
            .split(',')
            .map(|index| index.trim().parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()
            .map(AcceptPolicy::Indexes),
    }
}

fn describe_policy(policy: &AcceptPolicy) -> String {
    match policy {
        AcceptPolicy::FirstOnly => "the first command only".to_string(),
        AcceptPolicy::All => "every command".to_string(),
        AcceptPolicy::Indexes(indexes) => format!("commands {indexes:?}"),
    }
}

fn pending_id(session: &EditSession, prefix: &str) -> Option<String> {
    let store = session.proposals();
    if prefix.is_empty() {
        return store.latest_pending().map(|p| p.proposal_id.clone());
    }
    matching_id(session, prefix)
}

fn applied_id(session: &EditSession, prefix: &str) -> Option<String> {
    let store = session.proposals();
    if prefix.is_empty() {
        return store.latest_applied().map(|p| p.proposal_id.clone());
    }
    matching_id(session, prefix)
}

fn matching_id(session: &EditSession, prefix: &str) -> Option<String> {
    session
        .proposals()
        .messages()
        .iter()
        .rev()
        .filter_map(|m| m.proposal_id.as_ref())
        .find(|id| id.starts_with(prefix))
        .cloned()
}

fn print_help() {
    println!(
        "Type a message to ask for changes, or:\n\
         :cards                 list cards\n\
         :add [question | answer]\n\
         :rm N                  remove card N\n\
         :q N text / :a N text  set question / answer of card N\n\
         :name text / :desc text\n\
         :accept [first|all|0,2]  which proposed commands an approval accepts\n\
         :save / :dismiss\n\
         :preview [id]          preview a pending proposal\n\
         :approve [id] / :deny [id] / :reverse [id]\n\
         :retry / :quit"
    );
}

fn print_load_state(session: &EditSession) {
    match session.load_state() {
        LoadState::Loading => println!("Loading deck..."),
        LoadState::Ready => {
            println!(
                "Editing \"{}\" ({} cards). Type :help for commands.",
                session.name(),
                session.cards().len()
            );
            if !session.description().is_empty() {
                println!("{}", session.description());
            }
        }
        LoadState::Failed(message) => println!("Error Loading Deck: {message}\nUse :retry to try again."),
    }
}

fn print_save_status(session: &EditSession) {
    match session.save_status() {
        SaveStatus::Saved { at } => println!("Saved at {}.", at.format("%H:%M:%S")),
        SaveStatus::Failed(message) => println!("{message} (:dismiss to hide)"),
        SaveStatus::Saving => println!("Saving..."),
        SaveStatus::Idle => {}
    }
}

fn print_cards(session: &EditSession) {
    if session.cards().is_empty() {
        println!("No cards.");
    }
    for (index, card) in session.cards().iter().enumerate() {
        println!("{:>3}. Q: {}\n     A: {}", index + 1, card.question, card.answer);
    }
}

fn print_preview(session: &EditSession, proposal_id: &str) {
    for change in session.preview(proposal_id).unwrap_or_default() {
        println!("{change}");
    }
}

fn print_new_messages(session: &EditSession, shown: usize) -> usize {
    let messages = session.proposals().messages();
    for message in messages.iter().skip(shown) {
        print_message(session, message);
    }
    messages.len()
}

fn print_message(session: &EditSession, message: &ChatMessage) {
    if message.role == Role::User {
        return;
    }
    println!("assistant: {}", message.content);

    if let Some(id) = &message.proposal_id {
        if message.visual_state.show_buttons && !message.visual_state.is_applied {
            print_preview(session, id);
            let short: String = id.chars().take(8).collect();
            println!("(proposal {short}: :approve or :deny)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_command_parses_policies() {
        assert_eq!(parse_policy("first"), Some(AcceptPolicy::FirstOnly));
        assert_eq!(parse_policy("all"), Some(AcceptPolicy::All));
        assert_eq!(parse_policy("0, 2"), Some(AcceptPolicy::Indexes(vec![0, 2])));
        assert_eq!(parse_policy("two"), None);
        assert_eq!(parse_policy(""), None);
    }
}
