//! Classification of inbound text into bot commands.
//!
//! Every rule lives here, in priority order; the dispatcher only executes
//! the result.

use crate::session::Session;

/// Words that open (or reopen) the main menu.
const GREETINGS: &[&str] = &["oi", "olá", "ola", "menu", "bom dia", "boa tarde", "boa noite"];

/// Words asking to end the conversation.
const EXIT_WORDS: &[&str] = &["sair", "parar"];

const CONFIRM_WORD: &str = "sim";

/// Entries of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Seller,
    Billing,
    Careers,
    Offers,
    StoreLocation,
    Catalogs,
}

impl MenuOption {
    /// Option for the exact text `"1"`..`"6"`.
    fn from_key(text: &str) -> Option<Self> {
        Some(match text {
            "1" => Self::Seller,
            "2" => Self::Billing,
            "3" => Self::Careers,
            "4" => Self::Offers,
            "5" => Self::StoreLocation,
            "6" => Self::Catalogs,
            _ => return None,
        })
    }
}

/// What an inbound text asks for, given the contact's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Greeting,
    Terminate,
    ConfirmTerminate,
    /// Menu digit sent before greeting.
    NeedsGreeting,
    /// `0` while choosing a catalog.
    CatalogAll,
    /// One-based catalog position.
    CatalogSelect(usize),
    InvalidSelection,
    Menu(MenuOption),
    /// A number that is not a menu entry.
    InvalidOption,
    /// Free text outside any flow; gets no reply.
    Unrecognized,
}

/// Session facts the classifier depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    pub started: bool,
    /// Size of the pending catalog selection, if the contact is choosing one.
    pub pending_catalogs: Option<usize>,
}

impl ClassifyContext {
    pub fn of(session: &Session) -> Self {
        Self {
            started: session.started_by_client(),
            pending_catalogs: session.pending_catalogs().map(|s| s.len()),
        }
    }
}

/// Classify a message body. First matching rule wins.
pub fn classify(body: &str, ctx: ClassifyContext) -> Command {
    let text = body.trim().to_lowercase();
    let text = text.as_str();

    if GREETINGS.contains(&text) {
        return Command::Greeting;
    }
    if EXIT_WORDS.contains(&text) {
        return Command::Terminate;
    }
    if text == CONFIRM_WORD {
        return Command::ConfirmTerminate;
    }
    if !ctx.started && MenuOption::from_key(text).is_some() {
        return Command::NeedsGreeting;
    }

    if let Some(len) = ctx.pending_catalogs {
        if text == "0" {
            return Command::CatalogAll;
        }
        return match text.parse::<usize>() {
            Ok(position) if (1..=len).contains(&position) => Command::CatalogSelect(position),
            _ => Command::InvalidSelection,
        };
    }

    match MenuOption::from_key(text) {
        Some(option) => Command::Menu(option),
        None if is_number(text) => Command::InvalidOption,
        None => Command::Unrecognized,
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
