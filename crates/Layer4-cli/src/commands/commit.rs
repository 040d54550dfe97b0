//! `commitforge commit`

use super::Outcome;
use crate::app::AppContext;
use crate::terminal::{LineInput, Terminal};
use commitforge_core::{MessageGenerator, Vcs};
use commitforge_foundation::TaskKind;
use crossterm::style::Color;

const STYLE_HINT_COMMITS: usize = 10;

pub async fn run(ctx: &AppContext, yes: bool) -> anyhow::Result<Outcome> {
    let mut term = Terminal::new();

    let diff = ctx.git.diff(true, &[])?;
    if diff.trim().is_empty() {
        term.plain("Nothing staged. Stage changes with `git add` first, or use `commitforge compose --all`.");
        return Ok(Outcome::NothingToDo);
    }

    let selector = ctx.selector(TaskKind::Message);
    term.line(Color::DarkGrey, &format!("Generating message with {selector}..."));

    let generator = MessageGenerator::new(ctx.gateway.clone(), selector, ctx.max_diff_chars());
    let mut message = generator
        .generate(&diff, &ctx.recent_subjects(STYLE_HINT_COMMITS))
        .await?;

    if !yes && term.is_interactive() {
        loop {
            term.plain("");
            term.heading(&message);
            term.plain("");
            match term.read_line("Commit? [Y/n/e(dit)] ")? {
                LineInput::Interrupt => return Ok(Outcome::Interrupted),
                LineInput::Escape => {
                    term.plain("Cancelled. Nothing was committed.");
                    return Ok(Outcome::Cancelled);
                }
                LineInput::Line(answer) => match answer.trim().to_ascii_lowercase().as_str() {
                    "" | "y" | "yes" => break,
                    "n" | "no" => {
                        term.plain("Cancelled. Nothing was committed.");
                        return Ok(Outcome::Cancelled);
                    }
                    "e" | "edit" => match term.read_line("Message: ")? {
                        LineInput::Line(edited) if !edited.trim().is_empty() => {
                            message = edited.trim().to_string();
                        }
                        LineInput::Interrupt => return Ok(Outcome::Interrupted),
                        _ => {}
                    },
                    _ => term.line(Color::DarkGrey, "Please answer y, n or e."),
                },
            }
        }
    }

    let hash = ctx.git.commit(&message)?;
    term.styled(Color::Green, "✓ ");
    term.styled(Color::Yellow, &format!("{hash} "));
    term.plain(message.lines().next().unwrap_or_default());
    Ok(Outcome::Done)
}
