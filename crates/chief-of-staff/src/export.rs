//! Markdown export of the conversation

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{ConversationTurn, Role};

/// Render the transcript as a Markdown document
pub fn render_markdown(turns: &[ConversationTurn], generated_at: DateTime<Local>) -> String {
    let mut out = String::from("# AI Chief of Staff Analysis\n\n");
    out.push_str(&format!(
        "**Date:** {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str("---\n\n");

    for turn in turns {
        let heading = match turn.role {
            Role::User => "Question",
            Role::Assistant => "Analysis",
        };
        out.push_str(&format!("## {}:\n{}\n\n", heading, turn.content));
        out.push_str("---\n\n");
    }

    out
}

/// File name used when the user does not pick one
pub fn default_filename(generated_at: DateTime<Local>) -> String {
    format!(
        "chief_of_staff_analysis_{}.md",
        generated_at.format("%Y%m%d_%H%M")
    )
}

/// Write the transcript to `target`.
///
/// A directory target (or `None`, meaning `default_dir`) gets the default
/// file name. Returns the path written.
pub fn write_markdown(
    turns: &[ConversationTurn],
    target: Option<&Path>,
    default_dir: &Path,
) -> Result<PathBuf> {
    if turns.is_empty() {
        return Err(Error::export("conversation is empty"));
    }

    let now = Local::now();
    let path = match target {
        Some(path) if path.is_dir() => path.join(default_filename(now)),
        Some(path) => path.to_path_buf(),
        None => default_dir.join(default_filename(now)),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_markdown(turns, now))?;
    tracing::info!("Exported {} turns to {}", turns.len(), path.display());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 0).unwrap()
    }

    #[test]
    fn test_render_layout() {
        let turns = vec![
            ConversationTurn::user("Should we enter enterprise?"),
            ConversationTurn::assistant("Not yet."),
        ];
        let md = render_markdown(&turns, fixed_time());

        assert_eq!(
            md,
            "# AI Chief of Staff Analysis\n\n**Date:** 2025-03-14 09:05\n\n---\n\n\
             ## Question:\nShould we enter enterprise?\n\n---\n\n\
             ## Analysis:\nNot yet.\n\n---\n\n"
        );
    }

    #[test]
    fn test_default_filename() {
        assert_eq!(
            default_filename(fixed_time()),
            "chief_of_staff_analysis_20250314_0905.md"
        );
    }

    #[test]
    fn test_write_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let turns = vec![ConversationTurn::user("hi")];

        let path = write_markdown(&turns, None, dir.path()).unwrap();
        assert!(path.starts_with(dir.path()));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Question:\nhi"));

        let explicit = dir.path().join("out").join("board.md");
        let path = write_markdown(&turns, Some(&explicit), dir.path()).unwrap();
        assert_eq!(path, explicit);
        assert!(explicit.is_file());
    }

    #[test]
    fn test_empty_conversation_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_markdown(&[], None, dir.path()).is_err());
    }
}
