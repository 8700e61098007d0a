use std::env::current_dir;
use std::io::Write;

use anyhow::Error;
use console::Term;
use dialoguer::Input;

use crate::wretch::WretchWebConnector;
use crate::wretch::io::Config;
use crate::wretch::sender::RequestSender;

/// The name of the cargo package.
const NAME: &str = env!("CARGO_PKG_NAME");

/// The version of the cargo package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The authors who created the package.
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Most albums the site lists on one page.
const MAX_ALBUMS_PER_PAGE: usize = 20;

/// A command typed at the album menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    ChangeAccount,
    Help,
    Quit,
    GoToPage,
    /// Zero-based index of the album to download.
    Download(usize),
    Unknown,
}

impl Command {
    /// Parses a line typed at the menu. Album numbers start at 1 and must be listed on the page.
    fn parse(input: &str, album_count: usize) -> Self {
        match input.trim().to_lowercase().as_str() {
            "a" => Command::ChangeAccount,
            "h" => Command::Help,
            "q" => Command::Quit,
            "p" => Command::GoToPage,
            other => match other.parse::<usize>() {
                Ok(n) if (1..=album_count.min(MAX_ALBUMS_PER_PAGE)).contains(&n) => Command::Download(n - 1),
                _ => Command::Unknown,
            },
        }
    }
}

/// How a browsing session ended.
enum SessionEnd {
    ChangeAccount,
    Quit,
}

/// A program class that handles the flow of the downloader user experience and steps of execution.
pub(crate) struct Program;

impl Program {
    /// Creates a new instance of the program.
    pub(crate) fn new() -> Self {
        Self
    }

    /// Runs the downloader program.
    pub(crate) fn run(&self) -> Result<(), Error> {
        Term::stdout().set_title("Wretch downloader");
        trace!("Starting wretch downloader...");
        trace!("Program Name: {}", NAME);
        trace!("Program Version: {}", VERSION);
        trace!("Program Authors: {}", AUTHORS);
        let current_dir_path = current_dir().map_err(|e| {
            error!("Unable to get working directory: {}", e);
            anyhow::anyhow!("Failed to get working directory: {}", e)
        })?;
        trace!("Program Working Directory: {}", current_dir_path.display());

        // Check the config file and ensures that it is created.
        trace!("Checking if config file exists...");
        if !Config::config_exists() {
            trace!("Config file doesn't exist...");
            info!("Creating config file...");
            Config::create_config()?;
        }

        let config = Config::get();
        let request_sender = RequestSender::new(config.user_agent(), config.request_timeout())?;
        trace!("Request sender created for host {}", config.host());

        println!("- WretchDL v{} by {}.", VERSION, AUTHORS);
        loop {
            let Some(mut connector) = self.connect(&request_sender) else {
                break;
            };
            match self.browse(&mut connector) {
                SessionEnd::ChangeAccount => continue,
                SessionEnd::Quit => break,
            }
        }

        info!("Quit!");
        Ok(())
    }

    /// Asks for an account until its first album page can be listed, `None` when the terminal
    /// can't be read.
    fn connect(&self, request_sender: &RequestSender) -> Option<WretchWebConnector> {
        loop {
            let account: String = match Input::new()
                .with_prompt("\nPlease input Wretch account name")
                .interact_text()
            {
                Ok(account) => account,
                Err(err) => {
                    warn!("Failed to get user input: {}", err);
                    return None;
                }
            };

            let account = account.trim();
            if account.is_empty() {
                continue;
            }

            match WretchWebConnector::connect(request_sender, account) {
                Ok(connector) => return Some(connector),
                Err(err) => error!("=> Error: {}", err),
            }
        }
    }

    /// Runs the album menu for one account.
    fn browse(&self, connector: &mut WretchWebConnector) -> SessionEnd {
        connector.show_albums();
        // Last album downloaded, shown in the prompt.
        let mut last = 0;

        loop {
            let prompt = format!("({}):p{}:{}>> ", connector.account(), connector.page(), last);
            let Some(input) = self.read_line(&prompt) else {
                return SessionEnd::Quit;
            };

            match Command::parse(&input, connector.albums().len()) {
                Command::ChangeAccount => return SessionEnd::ChangeAccount,
                Command::Help => {
                    self.show_help();
                    continue;
                }
                Command::Quit => return SessionEnd::Quit,
                Command::GoToPage => {
                    let page = self.read_line("Go to Page: ").and_then(|p| p.trim().parse::<u32>().ok());
                    match page {
                        Some(page) => match connector.go_to_page(page) {
                            Ok(()) => last = 0,
                            Err(err) => error!("=> Error: {}", err),
                        },
                        None => println!("=> ?"),
                    }
                    connector.show_albums();
                    continue;
                }
                Command::Download(index) => {
                    last = index + 1;
                    if let Err(err) = connector.download_album(index) {
                        error!("=> Error: {:#}", err);
                    }
                }
                Command::Unknown => println!("=> ?"),
            }

            connector.show_albums();
        }
    }

    /// Prints `prompt` and reads one line, `None` when the terminal can't be read.
    fn read_line(&self, prompt: &str) -> Option<String> {
        let term = Term::stdout();
        print!("{}", prompt);
        std::io::stdout().flush().unwrap_or(());

        match term.read_line() {
            Ok(input) => Some(input),
            Err(err) => {
                warn!("Failed to get user input: {}", err);
                None
            }
        }
    }

    fn show_help(&self) {
        println!("Help:");
        println!("   Keyin 'a' : Changes the Wretch account name.");
        println!("   Keyin 'h' : Show help.");
        println!("   Keyin 'p' : Go to Page.");
        println!("   Keyin 'q' : Quit App.");
        println!("   Keyin album book number(1~{}) : Download album book.", MAX_ALBUMS_PER_PAGE);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(Command::parse("a", 3), Command::ChangeAccount);
        assert_eq!(Command::parse("H", 3), Command::Help);
        assert_eq!(Command::parse(" q \n", 3), Command::Quit);
        assert_eq!(Command::parse("P", 3), Command::GoToPage);
    }

    #[test]
    fn album_numbers_must_be_listed() {
        assert_eq!(Command::parse("1", 3), Command::Download(0));
        assert_eq!(Command::parse("3", 3), Command::Download(2));
        assert_eq!(Command::parse("4", 3), Command::Unknown);
        assert_eq!(Command::parse("0", 3), Command::Unknown);
        assert_eq!(Command::parse("21", 40), Command::Unknown);
        assert_eq!(Command::parse("x", 3), Command::Unknown);
    }
}
