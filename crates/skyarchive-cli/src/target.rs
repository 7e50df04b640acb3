//! Archive target parsing and the interactive prompt.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// A profile to archive, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Did(String),
    Handle(String),
}

impl Target {
    /// Accepts `did:...` identifiers verbatim; handles are trimmed, stripped
    /// of a leading `@`, and lowercased.
    pub(crate) fn parse(raw: &str) -> anyhow::Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with("did:") {
            return Ok(Target::Did(trimmed.to_owned()));
        }
        let handle = trimmed.trim_start_matches('@').to_lowercase();
        if handle.is_empty() {
            anyhow::bail!("no handle or DID given");
        }
        if handle.chars().any(char::is_whitespace) {
            anyhow::bail!("'{handle}' is not a valid handle");
        }
        Ok(Target::Handle(handle))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Did(did) => f.write_str(did),
            Target::Handle(handle) => write!(f, "@{handle}"),
        }
    }
}

/// Asks for a target on stdin.
pub(crate) async fn prompt_for_target() -> anyhow::Result<Target> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Enter the handle or DID of the profile to archive: ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read target from stdin")?;
    Target::parse(&line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_is_kept_verbatim() {
        assert_eq!(
            Target::parse(" did:plc:AbC123 ").unwrap(),
            Target::Did("did:plc:AbC123".to_owned())
        );
    }

    #[test]
    fn handle_is_normalized() {
        assert_eq!(
            Target::parse("@Alice.Bsky.Social\n").unwrap(),
            Target::Handle("alice.bsky.social".to_owned())
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(Target::parse("   ").is_err());
        assert!(Target::parse("@").is_err());
    }

    #[test]
    fn handle_with_spaces_is_rejected() {
        assert!(Target::parse("alice bsky").is_err());
    }

    #[test]
    fn display_marks_handles() {
        assert_eq!(Target::Handle("a.test".to_owned()).to_string(), "@a.test");
        assert_eq!(Target::Did("did:plc:x".to_owned()).to_string(), "did:plc:x");
    }
}
