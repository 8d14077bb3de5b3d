use crate::{
    config::Config,
    orchestrator::{Patrick, PushOutcome},
    persona,
    session_log::{Mood, SessionLog, SessionStats},
    ui::{truncate, PatrickUI, TerminalHandler},
};
use anyhow::{bail, Result};
use colored::Colorize;
use std::time::Instant;
use tracing::info;

/// Options of the `push` subcommand.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Overrides the configured attempt budget.
    pub attempts: Option<u32>,
    /// Accept every solution without asking.
    pub auto: bool,
}

/// Routes each subcommand to the orchestrator and renders the result.
pub struct CommandRouter {
    config: Config,
    ui: PatrickUI,
    verbose: bool,
}

impl CommandRouter {
    pub fn new(config: Config, verbose: bool) -> Self {
        Self {
            config,
            ui: PatrickUI::new(verbose),
            verbose,
        }
    }

    fn require_problem(problem: &str, command: &str) -> Result<()> {
        if problem.trim().is_empty() {
            bail!(
                "Please provide a problem!\nUsage: patrick {} \"your problem here\"",
                command
            );
        }
        Ok(())
    }

    pub async fn push(&self, problem: &str, options: PushOptions) -> Result<PushOutcome> {
        Self::require_problem(problem, "push")?;
        info!("Processing push for: {}", truncate(problem, 80));

        let mut patrick = Patrick::from_config(&self.config)?;
        if let Some(attempts) = options.attempts {
            patrick = patrick.max_attempts(attempts);
        }
        let max_attempts = patrick.get_max_attempts();

        self.ui
            .show_push_header(problem, max_attempts, persona::random_quote());

        let mut handler = TerminalHandler::stdio(self.verbose, options.auto, max_attempts);
        let start = Instant::now();
        let outcome = patrick.push(problem, Some(&mut handler)).await;

        self.ui.show_outcome(&outcome, start.elapsed());
        Ok(outcome)
    }

    pub async fn quick(&self, problem: &str) -> Result<String> {
        Self::require_problem(problem, "quick")?;
        info!("Processing quick push for: {}", truncate(problem, 80));

        let patrick = Patrick::from_config(&self.config)?;
        println!("{}", "\n🌟 Patrick Quick Mode - One dumb shot!\n".bright_magenta());

        let solution = patrick.quick_push(problem).await?;
        self.ui.show_quick_solution(&solution);
        Ok(solution)
    }

    pub async fn compare(&self, problem: &str) -> Result<()> {
        Self::require_problem(problem, "compare")?;
        info!("Processing comparison for: {}", truncate(problem, 80));

        let patrick = Patrick::from_config(&self.config)?;
        println!(
            "{}",
            "\n🥊 SMART CLAUDE vs PATRICK - FIGHT!\n".bright_magenta().bold()
        );
        println!("{}", "🧠 Running comparison...\n".bright_cyan());

        let comparison = patrick.compare(problem).await;
        self.ui.show_comparison(&comparison);
        Ok(())
    }

    pub fn stats(&self) -> Result<()> {
        let log = SessionLog::new(self.config.log_dir()?);
        info!("Reading session logs from {}", log.dir().display());

        let records = log.load_records()?;
        let stats = SessionStats::from_records(&records);
        let mood = Mood::from_recent(&records);
        self.ui.show_stats(&stats, mood);
        Ok(())
    }
}
