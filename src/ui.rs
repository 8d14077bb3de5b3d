//! Terminal rendering for the `patrick` binary.
//!
//! Every output method has a `_with_io` variant taking an explicit writer (and
//! reader, for prompts) so it can be tested against in-memory buffers; the
//! plain variants write to stdout.

use crate::orchestrator::{Comparison, PushEvent, PushEventHandler, PushOutcome};
use crate::session_log::{Mood, SessionStats};
use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::time::Duration;
use tracing::{info, warn};

const RULE_WIDTH: usize = 50;

/// Formats a duration the way a human reads it: `850ms`, `3.2s`, `2m 5s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

/// Formats a token count: `950`, `12.3K`, `4.5M`.
pub fn format_tokens(tokens: u64) -> String {
    if tokens < 1000 {
        tokens.to_string()
    } else if tokens < 1_000_000 {
        format!("{:.1}K", tokens as f64 / 1000.0)
    } else {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    }
}

/// Shortens `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Renders Patrick's output.
pub struct PatrickUI {
    verbose: bool,
}

impl PatrickUI {
    /// Creates a new `PatrickUI`.
    ///
    /// # Arguments
    ///
    /// * `verbose` - If true, token counts are shown
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    // =========================================================================
    // Core methods with I/O injection (testable)
    // =========================================================================

    /// Writes one line of Patrick speech.
    pub fn speak_with_io<W: Write>(&self, message: &str, output: &mut W) -> Result<()> {
        writeln!(
            output,
            "{}",
            format!("\n🌟 Patrick: \"{}\"", message).bright_magenta()
        )?;
        Ok(())
    }

    fn banner_with_io<W: Write>(&self, title: &str, output: &mut W) -> Result<()> {
        writeln!(output, "{}", format!("\n{}", "═".repeat(46)).bright_magenta())?;
        writeln!(output, "{}", format!("  {}", title).bright_magenta().bold())?;
        writeln!(output, "{}", "═".repeat(46).bright_magenta())?;
        Ok(())
    }

    pub fn show_push_header_with_io<W: Write>(
        &self,
        problem: &str,
        max_attempts: u32,
        quote: &str,
        output: &mut W,
    ) -> Result<()> {
        self.banner_with_io("PATRICK PUSH PROTOCOL - DUMB MODE! 🌟", output)?;
        self.speak_with_io(quote, output)?;
        writeln!(output, "{}", format!("\n📋 Problem: {}", problem).bright_cyan())?;
        writeln!(
            output,
            "{}",
            "🧠 Mode: ANTI-INTELLIGENCE (Patrick Mode)".bright_magenta()
        )?;
        writeln!(
            output,
            "{}",
            format!("🔄 Maximum attempts: {}", max_attempts).dimmed()
        )?;
        Ok(())
    }

    /// Renders a notification event. [`PushEvent::AskSatisfaction`] is handled
    /// by [`Self::prompt_satisfaction_with_io`] and writes nothing here.
    pub fn render_event_with_io<W: Write>(
        &self,
        event: &PushEvent,
        max_attempts: u32,
        output: &mut W,
    ) -> Result<()> {
        match event {
            PushEvent::AttemptStart { attempt, cue } => {
                writeln!(output, "{}", format!("\n{}", "=".repeat(RULE_WIDTH)).dimmed())?;
                writeln!(
                    output,
                    "{}",
                    format!(
                        "🎯 Attempt {}/{} - Trying dumb solution...",
                        attempt, max_attempts
                    )
                    .bright_yellow()
                )?;
                writeln!(output, "{}", "=".repeat(RULE_WIDTH).dimmed())?;
                self.speak_with_io(cue, output)?;
            }
            PushEvent::Solution { text, tokens, .. } => {
                writeln!(output, "{}", "\n📝 Patrick's Solution:".bright_green())?;
                writeln!(output, "{}", text)?;
                if self.verbose {
                    writeln!(
                        output,
                        "{}",
                        format!("\n💭 Tokens used: {}", tokens).dimmed()
                    )?;
                }
            }
            PushEvent::Error { attempt, message } => {
                writeln!(
                    output,
                    "{}",
                    format!("\n❌ Attempt {} failed: {}", attempt, message).bright_red()
                )?;
                self.speak_with_io("My brain just spilled like milk...", output)?;
            }
            PushEvent::RateLimit { delay_secs } => {
                writeln!(
                    output,
                    "{}",
                    format!("\n⏸️  Rate limited - waiting {} seconds...", delay_secs)
                        .bright_yellow()
                )?;
                self.speak_with_io("I need a snack break!", output)?;
            }
            PushEvent::AskSatisfaction { .. } => {}
        }
        Ok(())
    }

    /// Asks whether the last solution worked.
    ///
    /// `y` or `yes` in any case counts as yes. Anything else, including end
    /// of input, counts as no.
    pub fn prompt_satisfaction_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        write!(output, "{}", "\n✅ Did this work? (y/n): ".bright_green())?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim().to_lowercase();
        let satisfied = answer == "y" || answer == "yes";

        if satisfied {
            info!("User accepted the solution");
            self.speak_with_io("I helped! I'm helping!", output)?;
        } else {
            self.speak_with_io("Tartar sauce! Let me try something else...", output)?;
        }
        Ok(satisfied)
    }

    pub fn show_outcome_with_io<W: Write>(
        &self,
        outcome: &PushOutcome,
        elapsed: Duration,
        output: &mut W,
    ) -> Result<()> {
        writeln!(output, "{}", format!("\n{}", "=".repeat(RULE_WIDTH)).dimmed())?;
        if outcome.solved {
            writeln!(output, "{}", "🏆 PROBLEM SOLVED!".bright_green().bold())?;
            self.speak_with_io("The dumb solution worked!", output)?;
            writeln!(
                output,
                "{}",
                format!("\n⚡ Time: {}", format_duration(elapsed)).bright_cyan()
            )?;
            writeln!(
                output,
                "{}",
                format!("🔄 Attempts: {}", outcome.attempts).bright_cyan()
            )?;
            if self.verbose {
                writeln!(
                    output,
                    "{}",
                    format!("💭 Total tokens: {}", outcome.total_tokens).dimmed()
                )?;
            }
        } else {
            writeln!(output, "{}", "🤔 Reached max attempts".bright_yellow())?;
            self.speak_with_io("Maybe we need to be even DUMBER?", output)?;
            if let Some(solution) = &outcome.solution {
                writeln!(output, "{}", "\n💡 Best solution found:".bright_cyan())?;
                writeln!(output, "{}", solution)?;
            }
        }
        writeln!(output, "{}", format!("{}\n", "=".repeat(RULE_WIDTH)).dimmed())?;
        Ok(())
    }

    pub fn show_quick_solution_with_io<W: Write>(
        &self,
        solution: &str,
        output: &mut W,
    ) -> Result<()> {
        writeln!(output, "{}", "📝 Solution:".bright_green())?;
        writeln!(output, "{}\n", solution)?;
        Ok(())
    }

    pub fn show_comparison_with_io<W: Write>(
        &self,
        comparison: &Comparison,
        output: &mut W,
    ) -> Result<()> {
        writeln!(output, "{}", "📊 SMART CLAUDE:".purple())?;
        writeln!(
            output,
            "{}",
            format!("⏱️  Time: {}", format_duration(comparison.baseline_elapsed)).dimmed()
        )?;
        writeln!(output, "{}", comparison.baseline)?;

        writeln!(output, "{}", format!("\n{}\n", "-".repeat(RULE_WIDTH)).dimmed())?;

        writeln!(output, "{}", "🌟 PATRICK MODE:".bright_magenta())?;
        writeln!(
            output,
            "{}",
            format!("⏱️  Time: {}", format_duration(comparison.degraded_elapsed)).dimmed()
        )?;
        writeln!(output, "{}", comparison.degraded)?;

        writeln!(output, "{}", format!("\n{}", "=".repeat(RULE_WIDTH)).dimmed())?;

        match comparison.speedup() {
            Some(speedup) => {
                writeln!(
                    output,
                    "{}",
                    format!("\n🏆 PATRICK WINS! {:.1}x faster!", speedup).bright_green()
                )?;
                self.speak_with_io("I'm helping! I'm helping!", output)?;
            }
            None => {
                writeln!(
                    output,
                    "{}",
                    "\n🧠 Smart Claude was faster this time".purple()
                )?;
                self.speak_with_io("Is this the Krusty Krab?", output)?;
            }
        }
        Ok(())
    }

    pub fn show_stats_with_io<W: Write>(
        &self,
        stats: &SessionStats,
        mood: Mood,
        output: &mut W,
    ) -> Result<()> {
        if stats.total_problems == 0 {
            writeln!(output, "{}", "\n📊 No stats available yet".bright_yellow())?;
            self.speak_with_io("We haven't helped anyone yet!", output)?;
            return Ok(());
        }

        self.banner_with_io("PATRICK STATS - I HELPED! 🌟", output)?;
        writeln!(
            output,
            "{}",
            format!("\n📊 Total problems pushed: {}", stats.total_problems).bright_cyan()
        )?;
        writeln!(
            output,
            "{}",
            format!(
                "✅ Successfully solved: {} ({}%)",
                stats.solved,
                stats.success_rate_percent()
            )
            .bright_green()
        )?;
        writeln!(
            output,
            "{}",
            format!("🔄 Average attempts: {:.1}", stats.average_attempts()).bright_yellow()
        )?;
        writeln!(
            output,
            "{}",
            format!("💭 Total tokens used: {}", format_tokens(stats.total_tokens)).dimmed()
        )?;
        writeln!(output, "{}", format!("😀 Mood: {}", mood.as_str()).dimmed())?;
        self.speak_with_io(
            &format!("I helped {} times with dumb solutions!", stats.solved),
            output,
        )?;
        Ok(())
    }

    // =========================================================================
    // Convenience methods using standard I/O
    // =========================================================================

    pub fn show_push_header(&self, problem: &str, max_attempts: u32, quote: &str) {
        let _ = self.show_push_header_with_io(problem, max_attempts, quote, &mut io::stdout());
    }

    pub fn show_outcome(&self, outcome: &PushOutcome, elapsed: Duration) {
        let _ = self.show_outcome_with_io(outcome, elapsed, &mut io::stdout());
    }

    pub fn show_quick_solution(&self, solution: &str) {
        let _ = self.show_quick_solution_with_io(solution, &mut io::stdout());
    }

    pub fn show_comparison(&self, comparison: &Comparison) {
        let _ = self.show_comparison_with_io(comparison, &mut io::stdout());
    }

    pub fn show_stats(&self, stats: &SessionStats, mood: Mood) {
        let _ = self.show_stats_with_io(stats, mood, &mut io::stdout());
    }
}

/// [`PushEventHandler`] for an interactive terminal session.
///
/// Renders every event and, unless `auto` is set, asks the user whether each
/// solution worked.
pub struct TerminalHandler<R = BufReader<Stdin>, W = Stdout> {
    ui: PatrickUI,
    auto: bool,
    max_attempts: u32,
    input: R,
    output: W,
}

impl TerminalHandler {
    pub fn stdio(verbose: bool, auto: bool, max_attempts: u32) -> Self {
        Self::with_io(
            PatrickUI::new(verbose),
            auto,
            max_attempts,
            BufReader::new(io::stdin()),
            io::stdout(),
        )
    }
}

impl<R, W> TerminalHandler<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn with_io(ui: PatrickUI, auto: bool, max_attempts: u32, input: R, output: W) -> Self {
        Self {
            ui,
            auto,
            max_attempts,
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self) -> bool {
        if self.auto {
            let _ = writeln!(
                self.output,
                "{}",
                "\n🤖 Auto mode: Assuming success".bright_green()
            );
            return true;
        }
        match self
            .ui
            .prompt_satisfaction_with_io(&mut self.input, &mut self.output)
        {
            Ok(satisfied) => satisfied,
            Err(e) => {
                warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl<R, W> PushEventHandler for TerminalHandler<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    async fn handle(&mut self, event: PushEvent) -> bool {
        if let PushEvent::AskSatisfaction { .. } = event {
            return self.ask();
        }
        if let Err(e) = self
            .ui
            .render_event_with_io(&event, self.max_attempts, &mut self.output)
        {
            warn!("Failed to render event: {}", e);
        }
        false
    }
}
