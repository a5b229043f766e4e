//! Line-based terminal interface for the research workflow
//!
//! Renders the current stage, reads commands and research details from an
//! input stream and forwards them to the [`WorkflowRunner`]. Reading and
//! writing go through generic streams so the whole loop can be driven from
//! tests.

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::constants::HELP_TEMPLATE;
use crate::export::{self, ExportError};
use crate::llm::Generator;
use crate::workflow::{ResearchInput, Stage, WorkflowError, WorkflowRunner};

/// Commands accepted at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Approve,
    Reject,
    Retry,
    New,
    Export,
    Show,
    Help,
    Quit,
}

impl Command {
    /// Parse a command line; a leading `/` is optional
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim().trim_start_matches('/').to_ascii_lowercase();
        match word.as_str() {
            "approve" | "a" | "y" | "yes" => Some(Command::Approve),
            "reject" | "r" | "n" | "no" => Some(Command::Reject),
            "retry" => Some(Command::Retry),
            "new" => Some(Command::New),
            "export" => Some(Command::Export),
            "show" => Some(Command::Show),
            "help" | "?" => Some(Command::Help),
            "quit" | "exit" | "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Interactive front-end over a workflow runner
pub struct TerminalInterface<G, R, W> {
    runner: WorkflowRunner<G>,
    input: R,
    out: W,
    output_dir: PathBuf,
    /// Research details supplied up front, used for the first submission
    preset: Option<ResearchInput>,
}

impl<G: Generator, R: BufRead, W: Write> TerminalInterface<G, R, W> {
    pub fn new(runner: WorkflowRunner<G>, input: R, out: W, output_dir: PathBuf) -> Self {
        Self {
            runner,
            input,
            out,
            output_dir,
            preset: None,
        }
    }

    /// Submit these details instead of asking for them the first time
    pub fn with_research_input(mut self, input: ResearchInput) -> Self {
        self.preset = Some(input);
        self
    }

    pub fn runner(&self) -> &WorkflowRunner<G> {
        &self.runner
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run until the user quits or the input ends
    pub async fn run(&mut self) -> io::Result<()> {
        self.heading("AI Research Agent for Chemists")?;
        self.note("Type 'help' for the list of commands.")?;

        loop {
            if self.runner.session().stage == Stage::InputDetails {
                let input = match self.preset.take() {
                    Some(input) => input,
                    None => match self.read_research_input()? {
                        Some(ResearchDetails::Input(input)) => input,
                        Some(ResearchDetails::Command(command)) => {
                            if !self.handle(command).await? {
                                return Ok(());
                            }
                            continue;
                        }
                        None => return Ok(()),
                    },
                };
                self.note("Generating research ideas...")?;
                let result = self.runner.submit(input).await;
                self.report(result)?;
                continue;
            }

            self.render()?;
            let Some(line) = self.read_line("> ")? else {
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Some(command) => {
                    if !self.handle(command).await? {
                        return Ok(());
                    }
                }
                None => self.warn(&format!(
                    "Unknown command '{}'. Type 'help' for the list of commands.",
                    line.trim()
                ))?,
            }
        }
    }

    /// Execute a command; returns false when the interface should exit
    async fn handle(&mut self, command: Command) -> io::Result<bool> {
        debug!(?command, stage = %self.runner.session().stage, "Handling command");

        let result = match command {
            Command::Quit => return Ok(false),
            Command::Help => {
                self.plain(HELP_TEMPLATE)?;
                return Ok(true);
            }
            Command::Show => {
                let snapshot = serde_json::to_string_pretty(self.runner.session())?;
                self.plain(&snapshot)?;
                return Ok(true);
            }
            Command::Export => {
                self.export()?;
                return Ok(true);
            }
            Command::Approve => {
                self.note("Working...")?;
                self.runner.approve().await
            }
            Command::Reject => {
                self.note("Working...")?;
                self.runner.reject().await
            }
            Command::Retry => {
                self.note("Working...")?;
                self.runner.retry().await
            }
            Command::New => self.runner.start_new().await,
        };

        self.report(result)?;
        Ok(true)
    }

    fn render(&mut self) -> io::Result<()> {
        let session = self.runner.session().clone();
        let stage = session.stage;
        self.heading(&format!("Step {}/5: {}", stage.number(), stage.title()))?;

        if let Some(idea) = session.approved_idea.as_deref() {
            if stage != Stage::ReviewIdeas {
                self.labelled("Approved idea", idea)?;
            }
        }

        match stage {
            Stage::InputDetails => {}
            Stage::ReviewIdeas => {
                if let Some(idea) = session.current_idea() {
                    self.labelled(
                        &format!("Idea {} of {}", session.idea_index + 1, session.ideas.len()),
                        idea,
                    )?;
                }
                self.note("approve to continue with this idea, reject to see the next one")?;
            }
            Stage::LiteratureSummary | Stage::PropertiesPrediction | Stage::FinalCompilation => {
                let output = stage
                    .generation()
                    .and_then(|kind| session.output(kind).map(str::to_string));
                match output {
                    Some(text) => self.plain(&text)?,
                    None => self.warn("Nothing generated yet. Type 'retry' to generate it.")?,
                }
                let hint = match stage {
                    Stage::FinalCompilation => "export to save the proposal as PDF, new to start over",
                    Stage::LiteratureSummary => "approve, reject (next idea), or export the summary as PDF",
                    _ => "approve to compile the proposal, reject to redo the literature summary",
                };
                self.note(hint)?;
            }
        }

        self.out.flush()
    }

    /// Ask for topic, goal and data; previous values are kept for blank answers
    fn read_research_input(&mut self) -> io::Result<Option<ResearchDetails>> {
        let session = self.runner.session();
        let previous = session.input.clone();
        let step = format!(
            "Step {}/5: {}",
            Stage::InputDetails.number(),
            Stage::InputDetails.title()
        );
        self.heading(&step)?;
        if previous.is_some() {
            self.note("Press Enter to keep the previous value of a field.")?;
        }

        let previous = previous.unwrap_or_default();
        let fields = [
            ("Research topic", previous.topic),
            ("Research goal", previous.goal),
            ("Available data", previous.data),
        ];

        let mut values = Vec::with_capacity(fields.len());
        for (label, old) in fields {
            let Some(line) = self.read_line(&format!("{}: ", label))? else {
                return Ok(None);
            };
            // Commands must be prefixed here, details are free text
            if line.trim_start().starts_with('/') {
                if let Some(command) = Command::parse(&line) {
                    return Ok(Some(ResearchDetails::Command(command)));
                }
            }
            let value = line.trim();
            values.push(if value.is_empty() { old } else { value.to_string() });
        }

        let [topic, goal, data]: [String; 3] = values
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "incomplete research details"))?;
        Ok(Some(ResearchDetails::Input(ResearchInput::new(topic, goal, data))))
    }

    fn export(&mut self) -> io::Result<()> {
        let session = self.runner.session();
        let document = if session.stage == Stage::FinalCompilation {
            export::proposal_document(session)
        } else {
            export::summary_document(session)
        };

        match document.and_then(|doc| doc.write_to(&self.output_dir)) {
            Ok(path) => self.note(&format!("Saved {}", path.display())),
            Err(ExportError::NotReady(what)) => self.warn(&format!("Nothing to export: {}", what)),
            Err(e) => self.error(&format!("Export failed: {}", e)),
        }
    }

    fn report(&mut self, result: Result<(), WorkflowError>) -> io::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(WorkflowError::ExhaustedIdeas) => {
                self.warn(&WorkflowError::ExhaustedIdeas.to_string())?;
                self.note("Submit the details again to generate a fresh list.")
            }
            Err(e @ WorkflowError::Generation { .. }) => {
                self.error(&e.to_string())?;
                self.note("Type 'retry' to try again.")
            }
            Err(e) => self.warn(&e.to_string()),
        }
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        queue!(
            self.out,
            SetForegroundColor(Color::Green),
            Print(prompt),
            ResetColor
        )?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn heading(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            Print("\n"),
            SetForegroundColor(Color::Cyan),
            SetAttribute(Attribute::Bold),
            Print(text),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\n")
        )
    }

    fn labelled(&mut self, label: &str, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            SetAttribute(Attribute::Bold),
            Print(format!("{}: ", label)),
            SetAttribute(Attribute::Reset),
            Print(text),
            Print("\n")
        )
    }

    fn plain(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print(text.trim_end()), Print("\n"))
    }

    fn note(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            SetForegroundColor(Color::DarkGrey),
            Print(text),
            ResetColor,
            Print("\n")
        )?;
        self.out.flush()
    }

    fn warn(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            SetForegroundColor(Color::Yellow),
            Print(format!("⚠️ {}", text)),
            ResetColor,
            Print("\n")
        )
    }

    fn error(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            SetForegroundColor(Color::Red),
            Print(format!("❌ {}", text)),
            ResetColor,
            Print("\n")
        )
    }
}

/// Answer to the research-details prompt
enum ResearchDetails {
    Input(ResearchInput),
    Command(Command),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{async_trait, LlmError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct QueuedGenerator {
        replies: Mutex<VecDeque<&'static str>>,
    }

    impl QueuedGenerator {
        fn new(replies: &[&'static str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl Generator for QueuedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| LlmError::ApiError("no reply queued".to_string()))
        }

        fn name(&self) -> &str {
            "queued"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("research-agent-ui-{}", uuid::Uuid::new_v4()))
    }

    fn interface(
        replies: &[&'static str],
        script: &'static str,
        dir: PathBuf,
    ) -> TerminalInterface<QueuedGenerator, &'static [u8], Vec<u8>> {
        let runner = WorkflowRunner::new(QueuedGenerator::new(replies));
        TerminalInterface::new(runner, script.as_bytes(), Vec::new(), dir)
    }

    fn printed(ui: &TerminalInterface<QueuedGenerator, &'static [u8], Vec<u8>>) -> String {
        String::from_utf8_lossy(ui.output()).into_owned()
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("approve"), Some(Command::Approve));
        assert_eq!(Command::parse(" /Reject \n"), Some(Command::Reject));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("?"), Some(Command::Help));
        assert_eq!(Command::parse("approve it"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn test_full_session_with_export() {
        let dir = temp_dir();
        let mut ui = interface(
            &["1. Foo\n2. Bar", "summary text", "properties text", "overview text"],
            "Catalysis\nDegrade PET\nMOF screening\nreject\napprove\napprove\napprove\nexport\nquit\n",
            dir.clone(),
        );

        ui.run().await.unwrap();

        let session = ui.runner().session();
        assert_eq!(session.stage, Stage::FinalCompilation);
        assert_eq!(session.approved_idea.as_deref(), Some("Bar"));

        let output = printed(&ui);
        assert!(output.contains("Idea 1 of 2"));
        assert!(output.contains("Idea 2 of 2"));
        assert!(output.contains("overview text"));

        let pdf = std::fs::read(dir.join("research_proposal.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() {
        let mut ui = interface(&[], "Catalysis\n\nMOF screening\n/quit\n", temp_dir());

        ui.run().await.unwrap();

        assert_eq!(ui.runner().session().stage, Stage::InputDetails);
        assert!(printed(&ui).contains("missing: goal"));
    }

    #[tokio::test]
    async fn test_generation_failure_suggests_retry() {
        let mut ui = interface(
            &["1. Foo", "⚠️ Error: quota exceeded", "summary text"],
            "Catalysis\nDegrade PET\nMOF screening\napprove\nretry\nquit\n",
            temp_dir(),
        );

        ui.run().await.unwrap();

        let output = printed(&ui);
        assert!(output.contains("Failed to generate literature summary"));
        assert!(output.contains("Type 'retry' to try again."));
        assert_eq!(
            ui.runner().session().literature_summary.as_deref(),
            Some("summary text")
        );
    }

    #[tokio::test]
    async fn test_exhausted_ideas_keep_previous_details() {
        let mut ui = interface(
            &["1. Foo", "1. Fresh idea"],
            "Catalysis\nDegrade PET\nMOF screening\nreject\n\n\n\nquit\n",
            temp_dir(),
        );

        ui.run().await.unwrap();

        let session = ui.runner().session();
        assert!(printed(&ui).contains("No more ideas to review"));
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.ideas, vec!["Fresh idea"]);
        assert_eq!(session.input.as_ref().map(|i| i.topic.as_str()), Some("Catalysis"));
    }

    #[tokio::test]
    async fn test_preset_input_and_show() {
        let runner = WorkflowRunner::new(QueuedGenerator::new(&["1. Foo"]));
        let mut ui = TerminalInterface::new(runner, "show\nexport\n".as_bytes(), Vec::new(), temp_dir())
            .with_research_input(ResearchInput::new("Catalysis", "Degrade PET", "MOF screening"));

        ui.run().await.unwrap();

        let output = String::from_utf8_lossy(ui.output()).into_owned();
        assert!(output.contains("\"stage\": \"review_ideas\""));
        assert!(output.contains("Nothing to export"));
    }
}
