//! `commitforge compose`

use super::Outcome;
use crate::app::AppContext;
use crate::terminal::Terminal;
use async_trait::async_trait;
use commitforge_core::{
    extract_changes, ChangeIndex, ChangeScope, CommittedDraft, DraftSet, ProposalSynthesizer,
    Regenerate, ReviewOutcome, ReviewPrompter, RevisionLoop, SequentialApplier, SynthesisError,
    Vcs,
};
use commitforge_foundation::TaskKind;
use crossterm::style::Color;
use std::cell::RefCell;
use tracing::info;

const STYLE_HINT_COMMITS: usize = 10;

/// Re-runs the synthesizer with the inputs of the first request
struct SameInputs<'a> {
    synthesizer: &'a ProposalSynthesizer,
    changes: &'a ChangeIndex,
    instructions: Option<&'a str>,
}

#[async_trait]
impl Regenerate for SameInputs<'_> {
    async fn regenerate(&self) -> Result<DraftSet, SynthesisError> {
        self.synthesizer
            .synthesize(self.changes, self.instructions)
            .await
    }
}

pub async fn run(
    ctx: &AppContext,
    all: bool,
    yes: bool,
    instructions: Option<&str>,
) -> anyhow::Result<Outcome> {
    let mut term = Terminal::new();

    let scope = if all {
        ctx.git.add_all()?;
        ChangeScope::Staged
    } else if ctx.git.status()?.has_staged() {
        ChangeScope::Staged
    } else {
        ChangeScope::WorkingTree
    };

    let changes = extract_changes(&ctx.git, scope)?;
    if changes.is_empty() {
        term.plain("No changes to compose.");
        return Ok(Outcome::NothingToDo);
    }

    let selector = ctx.selector(TaskKind::Grouping);
    let synthesizer = ProposalSynthesizer::new(ctx.gateway.clone(), selector.clone(), ctx.max_diff_chars())
        .with_style_hints(ctx.recent_subjects(STYLE_HINT_COMMITS));

    term.line(
        Color::DarkGrey,
        &format!(
            "Analyzing {} file{} (+{} -{}) with {}...",
            changes.len(),
            if changes.len() == 1 { "" } else { "s" },
            changes.total_additions(),
            changes.total_deletions(),
            selector
        ),
    );
    let drafts = synthesizer.synthesize(&changes, instructions).await?;

    let interactive = !yes && !ctx.config.compose().auto_apply && term.is_interactive();
    if !interactive {
        term.show_drafts(&drafts, &changes);
    }

    let regenerator = SameInputs {
        synthesizer: &synthesizer,
        changes: &changes,
        instructions,
    };
    let outcome = RevisionLoop::run(drafts, &changes, &mut term, &regenerator, interactive).await?;

    let drafts = match outcome {
        ReviewOutcome::Apply(drafts) => drafts,
        ReviewOutcome::Cancelled if term.interrupted() => return Ok(Outcome::Interrupted),
        ReviewOutcome::Cancelled => {
            term.plain("Cancelled. Nothing was committed.");
            return Ok(Outcome::Cancelled);
        }
    };

    let term = RefCell::new(term);
    let progress = |index: usize, total: usize, commit: &CommittedDraft| {
        let mut term = term.borrow_mut();
        term.styled(Color::Green, &format!("✓ [{}/{}] ", index + 1, total));
        term.styled(Color::Yellow, &format!("{} ", commit.hash));
        term.plain(commit.message.lines().next().unwrap_or_default());
    };

    let committed = SequentialApplier::new(&ctx.git)
        .with_observer(&progress)
        .apply(&drafts, &changes)?;

    info!(commits = committed.len(), "compose finished");
    term.borrow_mut().line(
        Color::Green,
        &format!("Created {} commit{}.", committed.len(), if committed.len() == 1 { "" } else { "s" }),
    );
    Ok(Outcome::Done)
}
