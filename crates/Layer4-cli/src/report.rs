//! Error reporting with next steps

use commitforge_core::{ApplyError, GitError, PatchError, SynthesisError};
use commitforge_provider::ProviderError;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

const AUTH_HINT: &str = "Check the API key (ANTHROPIC_API_KEY / OPENAI_API_KEY) or the `providers` section of settings.json.";

/// Actionable follow-up for the errors the user can do something about
pub fn hint_for(err: &anyhow::Error) -> Option<String> {
    if let Some(err) = err.downcast_ref::<GitError>() {
        return match err {
            GitError::GitNotFound => Some("Install git and make sure it is on PATH.".into()),
            GitError::NotARepository(_) => Some("Run commitforge inside a git repository.".into()),
            GitError::NothingToCommit => Some("Stage changes with `git add` first.".into()),
            _ => None,
        };
    }

    if let Some(err) = err.downcast_ref::<SynthesisError>() {
        return match err {
            SynthesisError::Authentication(_) => Some(AUTH_HINT.into()),
            SynthesisError::MalformedReply(_) | SynthesisError::EmptyReply => Some(
                "Nothing was changed. Run the command again or pick another model with --model.".into(),
            ),
            SynthesisError::Provider(inner) => provider_hint(inner),
            SynthesisError::NoChanges => None,
        };
    }

    if let Some(err) = err.downcast_ref::<ApplyError>() {
        return match err {
            ApplyError::Partial { committed, total, .. } => Some(format!(
                "{committed} of {total} commits were created and are kept. \
                 The remaining changes are still in the working tree; stage and commit them manually."
            )),
            _ => None,
        };
    }

    if let Some(err) = err.downcast_ref::<PatchError>() {
        return match err {
            PatchError::Authentication(_) => Some(AUTH_HINT.into()),
            PatchError::Provider(inner) => provider_hint(inner),
            PatchError::ApplyFailed(_) | PatchError::ReverseFailed(_) | PatchError::Restage(_) => Some(
                "The working tree was left as is. Inspect `git diff` and `git diff --cached` before continuing.".into(),
            ),
            PatchError::Malformed(_) => Some("Nothing was changed. Run deslop again for a new patch.".into()),
            _ => None,
        };
    }

    None
}

fn provider_hint(err: &ProviderError) -> Option<String> {
    match err {
        ProviderError::NotConfigured(_) => Some(
            "Add the provider to settings.json or choose another with --provider.".into(),
        ),
        ProviderError::ModelNotAvailable(_) => {
            Some("Pick an available model with --model or `commitforge config set-model`.".into())
        }
        ProviderError::Network(_) => Some("Check the network connection or the provider base_url.".into()),
        _ => None,
    }
}

pub fn print_error(err: &anyhow::Error) {
    let mut stderr = std::io::stderr();
    let _ = execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("error: "),
        ResetColor,
        Print(format!("{err}\n"))
    );
    for cause in err.chain().skip(1) {
        let _ = execute!(stderr, Print(format!("  caused by: {cause}\n")));
    }
    if let Some(hint) = hint_for(err) {
        let _ = execute!(
            stderr,
            SetForegroundColor(Color::Yellow),
            Print("hint: "),
            ResetColor,
            Print(format!("{hint}\n"))
        );
    }
}
