use clap::Subcommand;
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::store::{ContentStore, TriggerStore};

#[derive(Subcommand, Debug)]
pub(crate) enum AdminCommand {
    /// Manage trigger words
    #[command(subcommand)]
    Trigger(TriggerCommand),
    /// Manage responses attached to a trigger
    #[command(subcommand)]
    Response(ResponseCommand),
    /// Manage broadcast content (jokes)
    #[command(subcommand)]
    Content(ContentCommand),
}

#[derive(Subcommand, Debug)]
pub(crate) enum TriggerCommand {
    /// List triggers with their responses
    List,
    Add { value: String },
    /// Delete a trigger and all its responses
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ResponseCommand {
    List { trigger_id: i64 },
    Add { trigger_id: i64, text: String },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ContentCommand {
    List,
    Add { text: String },
    Delete { id: i64 },
}

#[derive(Serialize)]
struct Deleted<'a> {
    deleted: &'a str,
    id: i64,
}

fn to_json(value: &impl Serialize) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run one administrative command against the stores and render the result as pretty JSON.
pub(crate) fn run_admin(
    triggers: &dyn TriggerStore,
    content: &dyn ContentStore,
    cmd: AdminCommand,
) -> Result<String, AppError> {
    match cmd {
        AdminCommand::Trigger(TriggerCommand::List) => to_json(&triggers.list_all()?),
        AdminCommand::Trigger(TriggerCommand::Add { value }) => {
            let trigger = triggers.create(&value)?;
            info!(trigger_id = trigger.id, value = %trigger.value, "Trigger added");
            to_json(&trigger)
        }
        AdminCommand::Trigger(TriggerCommand::Delete { id }) => {
            triggers.delete(id)?;
            info!(trigger_id = id, "Trigger deleted");
            to_json(&Deleted { deleted: "trigger", id })
        }
        AdminCommand::Response(ResponseCommand::List { trigger_id }) => {
            to_json(&triggers.responses_for(trigger_id)?)
        }
        AdminCommand::Response(ResponseCommand::Add { trigger_id, text }) => {
            let response = triggers.add_response(trigger_id, &text)?;
            info!(trigger_id, response_id = response.id, "Response added");
            to_json(&response)
        }
        AdminCommand::Response(ResponseCommand::Delete { id }) => {
            triggers.delete_response(id)?;
            to_json(&Deleted { deleted: "response", id })
        }
        AdminCommand::Content(ContentCommand::List) => to_json(&content.list()?),
        AdminCommand::Content(ContentCommand::Add { text }) => {
            let item = content.add(&text)?;
            info!(content_id = item.id, "Content item added");
            to_json(&item)
        }
        AdminCommand::Content(ContentCommand::Delete { id }) => {
            content.delete(id)?;
            to_json(&Deleted { deleted: "content", id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::store::SqliteStore;
    use clap::Parser;
    use serde_json::Value;

    fn parse(argv: &[&str]) -> AdminCommand {
        let mut full = vec!["jokebot"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap().command.unwrap()
    }

    fn run(store: &SqliteStore, argv: &[&str]) -> Result<Value, AppError> {
        let out = run_admin(store, store, parse(argv))?;
        Ok(serde_json::from_str(&out).unwrap())
    }

    #[test]
    fn test_parse_subcommands() {
        assert!(matches!(
            parse(&["trigger", "add", "привет"]),
            AdminCommand::Trigger(TriggerCommand::Add { value }) if value == "привет"
        ));
        assert!(matches!(
            parse(&["response", "add", "3", "Привет!"]),
            AdminCommand::Response(ResponseCommand::Add { trigger_id: 3, .. })
        ));
        assert!(matches!(
            parse(&["content", "delete", "7"]),
            AdminCommand::Content(ContentCommand::Delete { id: 7 })
        ));
    }

    #[test]
    fn test_no_subcommand_means_run_bot() {
        let args = Args::try_parse_from(["jokebot", "--account", "+1"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_trigger_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = run(&store, &["trigger", "add", "привет"]).unwrap();
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["value"], "привет");

        run(&store, &["response", "add", &id.to_string(), "Здравствуйте!"]).unwrap();
        let listed = run(&store, &["trigger", "list"]).unwrap();
        assert_eq!(listed[0]["responses"][0]["text"], "Здравствуйте!");

        let responses = run(&store, &["response", "list", &id.to_string()]).unwrap();
        assert_eq!(responses.as_array().unwrap().len(), 1);

        let deleted = run(&store, &["trigger", "delete", &id.to_string()]).unwrap();
        assert_eq!(deleted["deleted"], "trigger");
        assert_eq!(run(&store, &["trigger", "list"]).unwrap(), serde_json::json!([]));
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        run(&store, &["trigger", "add", "привет"]).unwrap();
        let err = run(&store, &["trigger", "add", "привет"]).unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[test]
    fn test_response_for_missing_trigger() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = run(&store, &["response", "add", "99", "text"]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_content_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let item = run(&store, &["content", "add", "Колобок повесился"]).unwrap();
        let id = item["id"].as_i64().unwrap();
        assert_eq!(run(&store, &["content", "list"]).unwrap()[0]["text"], "Колобок повесился");
        run(&store, &["content", "delete", &id.to_string()]).unwrap();
        let err = run(&store, &["content", "delete", &id.to_string()]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_empty_content_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = run(&store, &["content", "add", "  "]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
