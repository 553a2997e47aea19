//! CLI output formatting utilities.

use crate::a2a::{AgentCard, Event, Part};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one tool call made during a conversation turn.
    pub fn step(tool: &str, succeeded: bool) {
        let mark = if succeeded {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {}", style(format!("[{}]", tool)).dim(), mark);
    }

    /// Print an agent card.
    pub fn card(card: &AgentCard) {
        Output::header(&card.name);
        println!("{}", card.description);
        println!();
        Output::kv("URL", &card.url);
        Output::kv("Version", &card.version);
        Output::kv("Protocol", &card.protocol_version);
        Output::kv("Streaming", &card.capabilities.streaming.to_string());
        Output::kv("Input modes", &card.default_input_modes.join(", "));
        Output::kv("Output modes", &card.default_output_modes.join(", "));

        if !card.skills.is_empty() {
            println!();
            println!("Skills:");
            for skill in &card.skills {
                Output::list_item(&format!(
                    "{} ({}): {}",
                    style(&skill.name).bold(),
                    skill.id,
                    skill.description
                ));
                for example in &skill.examples {
                    println!("      {}", style(format!("e.g. \"{}\"", example)).dim());
                }
            }
        }
    }

    /// Print one streamed A2A event.
    pub fn event(event: &Event) {
        match event {
            Event::Task(task) => {
                println!(
                    "{} task {} [{}]",
                    style("task").cyan(),
                    style(&task.id).dim(),
                    task.status.state
                );
            }
            Event::Message(message) => {
                println!("{} {}", style("message").green(), message.text());
            }
            Event::StatusUpdate(update) => {
                let text = update
                    .status
                    .message
                    .as_ref()
                    .map(|m| m.text())
                    .unwrap_or_default();
                let marker = if update.is_final { " (final)" } else { "" };
                println!(
                    "{} {}{} {}",
                    style("status").yellow(),
                    update.status.state,
                    marker,
                    text
                );
            }
            Event::ArtifactUpdate(update) => {
                let name = update.artifact.name.as_deref().unwrap_or("artifact");
                let text: Vec<&str> = update.artifact.parts.iter().filter_map(Part::as_text).collect();
                println!("{} {}: {}", style("artifact").magenta(), name, text.join(""));
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
