//! Command-line front end — a line-oriented REPL over the card store.
//!
//! Commands:
//!
//! ```text
//! list
//! show <id>
//! add <title> [| notes [| image [| extra,extra...]]]
//! edit <id> [title] [| notes [| image [| extra,extra...]]]
//! rm <id>
//! help
//! quit
//! ```
//!
//! `edit` keeps any segment that is not given. An empty title also keeps the
//! current one; an empty later segment clears it.

use std::fmt::Write as _;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::cards::model::{Card, CardDraft, CardId, DraftError};
use crate::error::DatabaseError;
use crate::store::CardStore;

pub const HELP: &str = "\
commands:
  list                                   all cards, newest first
  show <id>                              one card with its media
  add <title> [| notes [| image [| extra,extra...]]]
  edit <id> [title] [| notes [| image [| extra,extra...]]]
  rm <id>                                delete a card
  help
  quit";

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show(CardId),
    Add(DraftSegments),
    Edit(CardId, DraftSegments),
    Remove(CardId),
    Help,
    Quit,
}

/// The `|`-separated segments of an add/edit line. `None` = not given.
///
/// A blank title counts as not given, so `edit <id>` never wipes the title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSegments {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub image_uri: Option<String>,
    pub extra_media: Option<Vec<String>>,
}

impl DraftSegments {
    fn parse(rest: &str) -> Self {
        let mut parts = rest.split('|').map(str::trim);
        let title = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let notes = parts.next().map(str::to_string);
        let image_uri = parts.next().map(str::to_string);
        let extra_media = parts.next().map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });
        Self {
            title,
            notes,
            image_uri,
            extra_media,
        }
    }

    /// Overlay the given segments onto `draft`.
    fn apply(self, draft: &mut CardDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(notes) = self.notes {
            draft.notes = notes;
        }
        if let Some(image) = self.image_uri {
            if image.is_empty() {
                draft.clear_image();
            } else {
                draft.image_uri = Some(image);
            }
        }
        if let Some(extra) = self.extra_media {
            draft.extra_media_uris.clear();
            for uri in extra {
                draft.push_extra(uri);
            }
        }
    }
}

/// Errors from parsing or running a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid card id: {0}")]
    InvalidId(String),

    #[error("Card {0} not found")]
    NotFound(CardId),

    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn parse_id(raw: Option<&str>) -> Result<CardId, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument("id"))?;
    raw.parse()
        .map_err(|_| CommandError::InvalidId(raw.to_string()))
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(v, r)| (v, r.trim()))
        .unwrap_or((line, ""));

    match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => Ok(Command::List),
        "show" => Ok(Command::Show(parse_id(rest.split_whitespace().next())?)),
        "add" => Ok(Command::Add(DraftSegments::parse(rest))),
        "edit" => {
            let (id, rest) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            let id = parse_id(Some(id).filter(|s| !s.is_empty()))?;
            Ok(Command::Edit(id, DraftSegments::parse(rest.trim())))
        }
        "rm" | "delete" => Ok(Command::Remove(parse_id(rest.split_whitespace().next())?)),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn format_summary(card: &Card) -> String {
    let mut line = format!(
        "#{}  {}  {}",
        card.id,
        card.created_at.format("%Y-%m-%d %H:%M"),
        if card.title.is_empty() { "(no title)" } else { card.title.as_str() }
    );
    if !card.extra_media_uris.is_empty() {
        let _ = write!(line, "  (+{} media)", card.extra_media_uris.len());
    }
    line
}

fn format_detail(card: &Card) -> String {
    let mut out = format_summary(card);
    let _ = write!(out, "\n  notes: {}", card.notes.as_deref().unwrap_or("(none)"));
    let _ = write!(out, "\n  image: {}", card.image_uri.as_deref().unwrap_or("(none)"));
    for (uri, kind) in card.extra_media() {
        let _ = write!(out, "\n  extra: {uri} [{kind:?}]");
    }
    out
}

/// Run a single command and render its output.
pub async fn execute(store: &CardStore, command: Command) -> Result<String, CommandError> {
    match command {
        Command::List => {
            let cards = store.fetch_all().await?;
            if cards.is_empty() {
                return Ok("no cards yet".to_string());
            }
            Ok(cards.iter().map(format_summary).collect::<Vec<_>>().join("\n"))
        }
        Command::Show(id) => match store.fetch_by_id(id).await? {
            Some(card) => Ok(format_detail(&card)),
            None => Err(CommandError::NotFound(id)),
        },
        Command::Add(segments) => {
            let mut draft = CardDraft::default();
            segments.apply(&mut draft);
            let id = store.create(&draft.into_fields()?).await?;
            Ok(format!("created card {id}"))
        }
        Command::Edit(id, segments) => {
            let card = store
                .fetch_by_id(id)
                .await?
                .ok_or(CommandError::NotFound(id))?;
            let mut draft = CardDraft::from_card(&card);
            segments.apply(&mut draft);
            store.update(id, &draft.into_fields()?).await?;
            Ok(format!("updated card {id}"))
        }
        Command::Remove(id) => {
            if store.delete(id).await? {
                Ok(format!("deleted card {id}"))
            } else {
                Err(CommandError::NotFound(id))
            }
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

/// Read commands from `input` until EOF or `quit`, writing results to `output`.
///
/// Command errors are reported and the loop continues.
pub async fn run<R, W>(store: &CardStore, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let result = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(store, command).await,
            Err(e) => Err(e),
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "Command failed");
                format!("error: {e}")
            }
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreLocation;

    async fn test_store() -> CardStore {
        let store = CardStore::new(StoreLocation::Memory);
        store.init().await.unwrap();
        store
    }

    async fn run_script(store: &CardStore, script: &str) -> String {
        let mut out = Vec::new();
        run(store, script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("list").unwrap(), Command::List);
        assert_eq!(parse_command("  LS ").unwrap(), Command::List);
        assert_eq!(parse_command("show 3").unwrap(), Command::Show(CardId(3)));
        assert_eq!(parse_command("rm 7").unwrap(), Command::Remove(CardId(7)));
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn parse_add_segments() {
        let cmd = parse_command("add Trip | notes | file://a.jpg | file://b.jpg, file://c.mp4").unwrap();
        assert_eq!(
            cmd,
            Command::Add(DraftSegments {
                title: Some("Trip".into()),
                notes: Some("notes".into()),
                image_uri: Some("file://a.jpg".into()),
                extra_media: Some(vec!["file://b.jpg".into(), "file://c.mp4".into()]),
            })
        );

        let title_only = parse_command("add Trip").unwrap();
        assert_eq!(
            title_only,
            Command::Add(DraftSegments {
                title: Some("Trip".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn parse_edit_and_errors() {
        match parse_command("edit 1 Trip v2 | | | ").unwrap() {
            Command::Edit(id, seg) => {
                assert_eq!(id, CardId(1));
                assert_eq!(seg.title.as_deref(), Some("Trip v2"));
                assert_eq!(seg.notes.as_deref(), Some(""));
                assert_eq!(seg.extra_media, Some(Vec::new()));
            }
            other => panic!("unexpected {other:?}"),
        }

        match parse_command("edit 4").unwrap() {
            Command::Edit(id, seg) => {
                assert_eq!(id, CardId(4));
                assert_eq!(seg, DraftSegments::default());
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_command("edit 4 | new notes").unwrap() {
            Command::Edit(_, seg) => {
                assert_eq!(seg.title, None);
                assert_eq!(seg.notes.as_deref(), Some("new notes"));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(parse_command("show"), Err(CommandError::MissingArgument("id"))));
        assert!(matches!(parse_command("edit"), Err(CommandError::MissingArgument("id"))));
        assert!(matches!(parse_command("rm x"), Err(CommandError::InvalidId(_))));
        assert!(matches!(parse_command("frobnicate"), Err(CommandError::Unknown(_))));
    }

    #[tokio::test]
    async fn add_show_edit_remove() {
        let store = test_store().await;

        let out = run_script(
            &store,
            "add Trip | notes | file://a.jpg | file://b.jpg,file://c.mp4\nshow 1\n",
        )
        .await;
        assert!(out.contains("created card 1"));
        assert!(out.contains("extra: file://b.jpg [Image]"));
        assert!(out.contains("extra: file://c.mp4 [Video]"));

        let out = run_script(&store, "edit 1 Trip v2 | notes | file://a.jpg | \nshow 1\n").await;
        assert!(out.contains("updated card 1"));
        let card = store.fetch_by_id(CardId(1)).await.unwrap().unwrap();
        assert_eq!(card.title, "Trip v2");
        assert!(card.extra_media_uris.is_empty());

        let out = run_script(&store, "rm 1\nrm 1\nlist\n").await;
        assert!(out.contains("deleted card 1"));
        assert!(out.contains("error: Card 1 not found"));
        assert!(out.contains("no cards yet"));
    }

    #[tokio::test]
    async fn edit_keeps_segments_not_given() {
        let store = test_store().await;
        run_script(&store, "add Trip | notes | file://a.jpg | file://b.jpg\n").await;
        run_script(&store, "edit 1 Renamed\n").await;

        let card = store.fetch_by_id(CardId(1)).await.unwrap().unwrap();
        assert_eq!(card.title, "Renamed");
        assert_eq!(card.notes.as_deref(), Some("notes"));
        assert_eq!(card.image_uri.as_deref(), Some("file://a.jpg"));
        assert_eq!(card.extra_media_uris, vec!["file://b.jpg"]);
    }

    #[tokio::test]
    async fn edit_without_title_keeps_title() {
        let store = test_store().await;
        run_script(&store, "add Trip | notes | file://a.jpg | file://b.jpg\n").await;

        let out = run_script(&store, "edit 1\nedit 1 | fresh notes\n").await;
        assert_eq!(out.matches("updated card 1").count(), 2);

        let card = store.fetch_by_id(CardId(1)).await.unwrap().unwrap();
        assert_eq!(card.title, "Trip");
        assert_eq!(card.notes.as_deref(), Some("fresh notes"));
        assert_eq!(card.image_uri.as_deref(), Some("file://a.jpg"));
        assert_eq!(card.extra_media_uris, vec!["file://b.jpg"]);
    }

    #[tokio::test]
    async fn empty_draft_is_reported() {
        let store = test_store().await;
        let out = run_script(&store, "add  |  \nlist\n").await;
        assert!(out.contains("error: Please enter at least a title or main image"));
        assert!(out.contains("no cards yet"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let store = test_store().await;
        let out = run_script(&store, "quit\nadd Never\n").await;
        assert!(out.is_empty());
        assert!(store.fetch_all().await.unwrap().is_empty());
    }
}
