use std::fmt;
use std::io::Write as _;

use quiz_core::{QuestionType, QuizId};
use services::{AppServices, ProgressStoreError, PullOutcome, SessionPosition};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    /// Dashboard position (1-based) or quiz id.
    Open(String),
    /// Option number as shown (1-based).
    Pick(usize),
    Submit,
    Next,
    Previous,
    Review,
    StopReview,
    Restart,
    Leave,
    Explain,
    Status,
    Theme,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    MissingArgument { command: &'static str },
    InvalidOption { raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::MissingArgument { command } => write!(f, "{command} needs an argument"),
            CommandError::InvalidOption { raw } => write!(f, "not an option number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match head {
            "list" | "ls" => Command::List,
            "open" | "o" => Command::Open(
                arg.ok_or(CommandError::MissingArgument { command: "open" })?
                    .to_owned(),
            ),
            "pick" | "p" => {
                let raw = arg.ok_or(CommandError::MissingArgument { command: "pick" })?;
                Command::Pick(parse_option(raw)?)
            }
            "submit" | "s" => Command::Submit,
            "next" | "n" => Command::Next,
            "prev" | "back" | "b" => Command::Previous,
            "review" => Command::Review,
            "stop" => Command::StopReview,
            "restart" => Command::Restart,
            "leave" | "home" => Command::Leave,
            "explain" | "why" => Command::Explain,
            "status" => Command::Status,
            "theme" => Command::Theme,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            raw if raw.chars().all(|c| c.is_ascii_digit()) => Command::Pick(parse_option(raw)?),
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }
}

fn parse_option(raw: &str) -> Result<usize, CommandError> {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| CommandError::InvalidOption { raw: raw.to_owned() })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented front end over `AppServices`.
pub struct Driver {
    services: AppServices,
}

impl Driver {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }

    #[must_use]
    pub fn services(&self) -> &AppServices {
        &self.services
    }

    /// Read commands from stdin until `quit` or end of input, then flush sync.
    pub async fn run_stdin(&mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if let Some(advisory) = self.services.sync().status().error {
            println!("! {advisory}");
        }
        if self.services.pull_outcome() == PullOutcome::MergedNotSaved {
            println!("! synced progress could not be saved on this device");
        }
        self.print_dashboard();

        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(command)) => {
                    if self.handle(command).await == Flow::Quit {
                        break;
                    }
                }
                Err(err) => println!("{err}"),
            }
        }

        self.services.shutdown().await;
        Ok(())
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        let outcome = match command {
            Command::Quit => return Flow::Quit,
            Command::Help => {
                print_help();
                return Flow::Continue;
            }
            Command::List => {
                self.print_dashboard();
                return Flow::Continue;
            }
            Command::Status => {
                self.print_status();
                return Flow::Continue;
            }
            Command::Theme => {
                match self.services.preferences().toggle_dark_mode().await {
                    Ok(true) => println!("theme: dark"),
                    Ok(false) => println!("theme: light"),
                    Err(err) => println!("could not save theme: {err}"),
                }
                return Flow::Continue;
            }
            Command::Open(target) => self.open(&target).await,
            Command::Pick(option) => self.pick(option).await,
            Command::Submit => self.submit().await,
            Command::Next => self.services.session_mut().next().await,
            Command::Previous => self.services.session_mut().previous().await,
            Command::Review => {
                self.services.session_mut().start_review();
                Ok(())
            }
            Command::StopReview => {
                self.services.session_mut().stop_review();
                Ok(())
            }
            Command::Restart => self.services.session_mut().restart().await,
            Command::Leave => {
                self.services.session_mut().leave_quiz();
                self.print_dashboard();
                return Flow::Continue;
            }
            Command::Explain => {
                match self.services.ask_explanation().await {
                    Some(text) => println!("AI: {text}"),
                    None => println!("submit an answer first"),
                }
                return Flow::Continue;
            }
        };

        if let Err(err) = outcome {
            warn!(error = %err, "local progress write failed");
            println!("! progress could not be saved on this device: {err}");
        }
        self.print_view();
        Flow::Continue
    }

    async fn open(&mut self, target: &str) -> Result<(), ProgressStoreError> {
        let dashboard = self.services.session().dashboard();
        let quiz_id = target
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| dashboard.get(idx))
            .map_or_else(|| QuizId::new(target), |entry| entry.quiz.id.clone());

        if !self.services.session_mut().select_quiz(&quiz_id).await? {
            println!("no quiz named {target}");
        }
        Ok(())
    }

    async fn pick(&mut self, option: usize) -> Result<(), ProgressStoreError> {
        if !self.services.session_mut().select(option).await? {
            println!("(nothing changed)");
        }
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ProgressStoreError> {
        match self.services.session_mut().submit().await? {
            Some(true) => println!("Correct!"),
            Some(false) => println!("Incorrect."),
            None => println!("pick an option first"),
        }
        Ok(())
    }

    fn print_dashboard(&self) {
        let progress = self.services.session().progress();
        println!(
            "Score {}/{} answered",
            progress.score(),
            progress.total_answered()
        );
        for (n, entry) in self.services.session().dashboard().iter().enumerate() {
            let mark = if entry.completed { "✓" } else { " " };
            println!(
                "{mark} {}. {} ({} questions) [{}]",
                n + 1,
                entry.quiz.title,
                entry.quiz.question_count,
                entry.quiz.id
            );
        }
    }

    fn print_status(&self) {
        let status = self.services.sync().status();
        let progress = self.services.session().progress();
        println!(
            "score {}/{}, completed quizzes: {}",
            progress.score(),
            progress.total_answered(),
            progress.completed_quizzes().len()
        );
        match status.last_synced_at {
            Some(at) => println!("last synced: {}", at.to_rfc3339()),
            None => println!("last synced: never"),
        }
        if status.in_flight {
            println!("sync in progress");
        }
        if let Some(error) = status.error {
            println!("! {error}");
        }
    }

    fn print_view(&self) {
        let session = self.services.session();
        if session.active_quiz().is_none() {
            return;
        }

        if session.is_showing_results() {
            if let Some(summary) = session.summary() {
                println!(
                    "Results: {}/{} correct ({}%)",
                    summary.correct, summary.total, summary.accuracy_percent
                );
                if summary.has_mistakes() {
                    println!(
                        "`review` to revisit {} mistake(s), `restart` or `leave`",
                        summary.mistakes
                    );
                } else {
                    println!("`restart` or `leave`");
                }
            }
            return;
        }

        let Some(question) = session.current_question() else {
            println!("Nothing to review. `next` to return to results.");
            return;
        };
        if let Some(position) = session.position() {
            let label = if position.review { "Review" } else { "Question" };
            println!(
                "{label} {}/{} ({}%) · {}",
                position.current,
                position.total,
                position.percent(),
                question.category
            );
            if let Some(hint) = finish_hint(position) {
                println!("{hint}");
            }
        }
        println!("{}", question.text);
        if question.kind == QuestionType::Multiple {
            println!("(select all that apply)");
        }

        let result = session.current_result();
        for (idx, option) in question.options.iter().enumerate() {
            let picked = result.selected_indices().contains(&idx);
            let correct = question.correct_indices.contains(&idx);
            let marker = match (result.submitted(), picked, correct) {
                (true, _, true) => "+",
                (true, true, false) => "x",
                (_, true, _) => "*",
                _ => " ",
            };
            println!(" [{marker}] {}. {option}", idx + 1);
        }

        if result.submitted() {
            if let Some(explanation) = &question.explanation {
                println!("{explanation}");
            }
            if let Some(ai) = session.explanation() {
                println!("AI: {ai}");
            }
        }
    }
}

fn finish_hint(position: SessionPosition) -> Option<&'static str> {
    if !position.is_last() {
        return None;
    }
    Some(if position.review {
        "(last mistake: `next` ends the review)"
    } else {
        "(last question: `next` shows results)"
    })
}

fn print_help() {
    println!("list                 show quizzes");
    println!("open <n|id>          start or resume a quiz");
    println!("pick <n> | <n>       select / toggle option n");
    println!("submit               grade the current question");
    println!("next, prev           move between questions");
    println!("review, stop         walk through mistakes / back to results");
    println!("restart, leave       clear this quiz / back to the list");
    println!("explain              ask the AI tutor about the graded question");
    println!("status, theme, quit");
}
