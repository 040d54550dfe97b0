//! `commitforge deslop`

use super::Outcome;
use crate::app::AppContext;
use crate::terminal::Terminal;
use commitforge_core::PatchWorkflow;
use commitforge_foundation::TaskKind;
use crossterm::style::Color;
use tracing::warn;

pub async fn run(
    ctx: &AppContext,
    base: Option<&str>,
    prompt: Option<&str>,
    yes: bool,
) -> anyhow::Result<Outcome> {
    let mut term = Terminal::new();
    let selector = ctx.selector(TaskKind::Cleanup);
    let workflow = PatchWorkflow::new(&ctx.git, ctx.gateway.clone(), selector.clone(), ctx.max_diff_chars());

    let base_ref = workflow.resolve_base_ref(base);
    let inputs = workflow.collect_inputs(&base_ref)?;
    if inputs.staged_diff.trim().is_empty() {
        term.plain("Nothing staged. Stage the changes to clean up first.");
        return Ok(Outcome::NothingToDo);
    }

    term.line(
        Color::DarkGrey,
        &format!("Reviewing staged changes against {base_ref} with {selector}..."),
    );
    let Some(session) = workflow.generate(&inputs, prompt).await? else {
        term.line(Color::Green, "No cleanup needed.");
        return Ok(Outcome::Done);
    };

    term.plain("");
    term.heading(&session.summary);
    term.plain("");
    term.diff(&session.patch);
    term.plain("");

    let applied = workflow.apply(&session)?;
    term.line(
        Color::Green,
        &format!("Patch applied; {} staged file(s) kept staged.", applied.restaged().len()),
    );
    if !applied.released().is_empty() {
        term.line(
            Color::DarkGrey,
            &format!("Also edited, left unstaged: {}", applied.released().join(", ")),
        );
    }

    if yes || !term.is_interactive() {
        applied.accept();
        return Ok(Outcome::Done);
    }

    match term.confirm("Keep the cleanup?", true)? {
        Some(true) => {
            applied.accept();
            term.line(Color::Green, "Cleanup kept.");
            Ok(Outcome::Done)
        }
        answer => {
            let interrupted = answer.is_none();
            if let Err(e) = workflow.revert(applied) {
                warn!(error = %e, "revert failed");
                return Err(e.into());
            }
            term.plain("Cleanup reverted; the staged changes are as before.");
            Ok(if interrupted {
                Outcome::Interrupted
            } else {
                Outcome::Cancelled
            })
        }
    }
}
