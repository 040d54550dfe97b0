//! Terminal prompts
//!
//! 라인 단위 입력 + crossterm 스타일 출력.
//! - TTY: raw mode 로 키 입력을 읽어 Ctrl-C / Esc 를 직접 처리
//! - 파이프 입력: 표준 입력 한 줄씩 (EOF = 취소)

use commitforge_core::{ChangeIndex, DraftSet, ReviewAction, ReviewError, ReviewPrompter};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal,
};
use std::io::{self, BufRead, IsTerminal, Write};

/// What a line prompt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Line(String),
    /// Esc or end of input
    Escape,
    /// Ctrl-C / Ctrl-D
    Interrupt,
}

/// Leaves raw mode on drop, including early returns
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub struct Terminal {
    stdout: io::Stdout,
    interactive: bool,
    interrupted: bool,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            interactive: io::stdin().is_terminal(),
            interrupted: false,
        }
    }

    /// Whether prompts can be answered by a person
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Set once the user pressed Ctrl-C at a prompt
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    // ========================================================================
    // Output
    // ========================================================================

    pub fn styled(&mut self, color: Color, text: &str) {
        let _ = execute!(
            self.stdout,
            SetForegroundColor(color),
            Print(text),
            ResetColor
        );
    }

    pub fn line(&mut self, color: Color, text: &str) {
        self.styled(color, text);
        let _ = execute!(self.stdout, Print("\n"));
    }

    pub fn plain(&mut self, text: &str) {
        let _ = execute!(self.stdout, Print(text), Print("\n"));
    }

    pub fn heading(&mut self, text: &str) {
        let _ = execute!(
            self.stdout,
            SetAttribute(Attribute::Bold),
            Print(text),
            SetAttribute(Attribute::Reset),
            Print("\n")
        );
    }

    /// Unified diff with +/- coloring
    pub fn diff(&mut self, patch: &str) {
        for line in patch.lines() {
            let color = if line.starts_with("+++") || line.starts_with("---") {
                Color::White
            } else if line.starts_with('+') {
                Color::Green
            } else if line.starts_with('-') {
                Color::Red
            } else if line.starts_with("@@") {
                Color::Cyan
            } else if line.starts_with("diff --git") {
                Color::Yellow
            } else {
                Color::Reset
            };
            self.line(color, line);
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn read_line(&mut self, prompt: &str) -> io::Result<LineInput> {
        self.styled(Color::Yellow, prompt);
        self.stdout.flush()?;

        let input = if self.interactive {
            self.read_line_raw()?
        } else {
            let mut buf = String::new();
            match io::stdin().lock().read_line(&mut buf)? {
                0 => LineInput::Escape,
                _ => LineInput::Line(buf.trim_end_matches(['\r', '\n']).to_string()),
            }
        };

        if input == LineInput::Interrupt {
            self.interrupted = true;
        }
        Ok(input)
    }

    fn read_line_raw(&mut self) -> io::Result<LineInput> {
        let _raw = RawMode::enable()?;
        let mut input = String::new();

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('c') | KeyCode::Char('d')
                    if key.modifiers.contains(KeyModifiers::CONTROL) =>
                {
                    execute!(self.stdout, Print("\r\n"))?;
                    return Ok(LineInput::Interrupt);
                }
                KeyCode::Enter => {
                    execute!(self.stdout, Print("\r\n"))?;
                    return Ok(LineInput::Line(input));
                }
                KeyCode::Esc => {
                    execute!(self.stdout, Print("\r\n"))?;
                    return Ok(LineInput::Escape);
                }
                KeyCode::Backspace => {
                    if input.pop().is_some() {
                        execute!(self.stdout, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    }
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    execute!(self.stdout, Print(c))?;
                }
                _ => {}
            }
        }
    }

    /// Yes/no question; `None` when interrupted
    pub fn confirm(&mut self, question: &str, default: bool) -> io::Result<Option<bool>> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            match self.read_line(&format!("{question} {hint} "))? {
                LineInput::Interrupt => return Ok(None),
                LineInput::Escape => return Ok(Some(false)),
                LineInput::Line(answer) => match answer.trim().to_ascii_lowercase().as_str() {
                    "" => return Ok(Some(default)),
                    "y" | "yes" => return Ok(Some(true)),
                    "n" | "no" => return Ok(Some(false)),
                    _ => self.line(Color::DarkGrey, "Please answer y or n."),
                },
            }
        }
    }
}

// ============================================================================
// Review prompts
// ============================================================================

const ACTION_HELP: &str = "[a] apply all  [e N] edit message  [v N] view  [r] regenerate  [q] cancel";

/// `a`, `e 2`, `v 1`, `r`, `q`; indexes are 1-based on screen
pub fn parse_action(input: &str) -> Option<ReviewAction> {
    let mut parts = input.split_whitespace();
    let command = parts.next()?.to_ascii_lowercase();
    let index = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n - 1);

    match (command.as_str(), index) {
        ("a" | "apply", None) => Some(ReviewAction::ApplyAll),
        ("r" | "regenerate", None) => Some(ReviewAction::Regenerate),
        ("q" | "quit" | "cancel", None) => Some(ReviewAction::Cancel),
        ("e" | "edit", Some(i)) => Some(ReviewAction::EditMessage(i)),
        ("v" | "view", Some(i)) => Some(ReviewAction::ViewDraft(i)),
        _ => None,
    }
}

/// New subject replaces the first line; the body is kept
fn replace_subject(current: &str, subject: &str) -> String {
    match current.split_once('\n') {
        Some((_, body)) if !body.trim().is_empty() => format!("{}\n{}", subject.trim(), body),
        _ => subject.trim().to_string(),
    }
}

impl ReviewPrompter for Terminal {
    fn show_drafts(&mut self, drafts: &DraftSet, changes: &ChangeIndex) {
        self.plain("");
        self.heading(&format!(
            "Proposed {} commit{} for {} file{}",
            drafts.len(),
            if drafts.len() == 1 { "" } else { "s" },
            changes.len(),
            if changes.len() == 1 { "" } else { "s" },
        ));
        if let Some(rationale) = &drafts.rationale {
            self.line(Color::DarkGrey, rationale);
        }

        for (i, (draft, summary)) in drafts
            .iter()
            .zip(drafts.summary_lines(changes))
            .enumerate()
        {
            self.styled(Color::Cyan, &format!("{:>3}. ", i + 1));
            self.styled(Color::Reset, draft.subject());
            self.styled(
                Color::DarkGrey,
                &format!("  ({} files, ", summary.files),
            );
            self.styled(Color::Green, &format!("+{}", summary.additions));
            self.styled(Color::DarkGrey, " ");
            self.styled(Color::Red, &format!("-{}", summary.deletions));
            self.line(Color::DarkGrey, ")");
            for file in &draft.files {
                self.line(Color::DarkGrey, &format!("       {file}"));
            }
        }
        self.plain("");
    }

    fn choose_action(&mut self, _drafts: &DraftSet) -> Result<ReviewAction, ReviewError> {
        if self.interrupted {
            return Ok(ReviewAction::Interrupt);
        }
        loop {
            self.line(Color::DarkGrey, ACTION_HELP);
            match self.read_line("> ")? {
                LineInput::Interrupt => return Ok(ReviewAction::Interrupt),
                LineInput::Escape => return Ok(ReviewAction::Cancel),
                LineInput::Line(input) => match parse_action(&input) {
                    Some(action) => return Ok(action),
                    None => self.line(Color::Red, &format!("Unknown choice: {}", input.trim())),
                },
            }
        }
    }

    fn edit_message(&mut self, current: &str) -> Result<Option<String>, ReviewError> {
        self.line(
            Color::DarkGrey,
            &format!("Current: {}", current.lines().next().unwrap_or_default()),
        );
        match self.read_line("New subject (empty keeps it): ")? {
            LineInput::Line(subject) if !subject.trim().is_empty() => {
                Ok(Some(replace_subject(current, &subject)))
            }
            _ => Ok(None),
        }
    }

    fn show_draft(&mut self, index: usize, drafts: &DraftSet, changes: &ChangeIndex) {
        let Some(draft) = drafts.get(index) else {
            return;
        };
        self.plain("");
        self.heading(&format!("Draft {} ({})", index + 1, draft.id));
        self.plain(&draft.message);
        if let Some(reasoning) = &draft.reasoning {
            self.line(Color::DarkGrey, &format!("Why: {reasoning}"));
        }
        self.plain("");
        for file in &draft.files {
            match changes.get(file) {
                Some(record) if !record.diff.is_empty() => self.diff(&record.diff),
                Some(record) => self.line(
                    Color::DarkGrey,
                    &format!("{} ({})", record.path, record.status),
                ),
                None => self.line(Color::DarkGrey, file),
            }
        }
        self.plain("");
    }

    fn show_error(&mut self, message: &str) {
        self.line(Color::Red, message);
    }
}
