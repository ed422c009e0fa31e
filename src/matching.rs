use crate::config::{ReservedAction, ReservedPhrase};
use crate::error::AppError;
use crate::store::{Trigger, TriggerStore};

/// First trigger (in slice order) whose lower-cased value occurs in `lowered_text`.
///
/// A trigger without responses still wins the match; callers get it back and
/// send nothing. Kept for compatibility with existing trigger sets.
pub(crate) fn first_match<'a>(triggers: &'a [Trigger], lowered_text: &str) -> Option<&'a Trigger> {
    triggers.iter().find(|t| {
        let value = t.value.to_lowercase();
        !value.is_empty() && lowered_text.contains(value.as_str())
    })
}

/// Look up the matching trigger against the current store contents.
/// `lowered_text` must already be lower-cased.
pub(crate) fn find_match(
    store: &dyn TriggerStore,
    lowered_text: &str,
) -> Result<Option<Trigger>, AppError> {
    let triggers = store.list_all()?;
    Ok(first_match(&triggers, lowered_text).cloned())
}

pub(crate) fn match_reserved(phrases: &[ReservedPhrase], lowered_text: &str) -> Option<ReservedAction> {
    phrases
        .iter()
        .find(|p| lowered_text.contains(p.phrase.as_str()))
        .map(|p| p.action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockTriggerStore, Response};

    fn trigger(id: i64, value: &str, responses: &[&str]) -> Trigger {
        Trigger {
            id,
            value: value.to_string(),
            responses: responses
                .iter()
                .enumerate()
                .map(|(i, text)| Response {
                    id: id * 100 + i as i64,
                    trigger_id: id,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_case_insensitive_substring() {
        let triggers = vec![trigger(1, "ПРИВЕТ", &["hi"])];
        let found = first_match(&triggers, "ну привет, бот").unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn test_first_match_wins() {
        let triggers = vec![
            trigger(1, "кот", &["мяу"]),
            trigger(2, "котлета", &["вкусно"]),
        ];
        // both match; earlier one in store order wins
        assert_eq!(first_match(&triggers, "хочу котлету и котлета").unwrap().id, 1);
    }

    #[test]
    fn test_no_match() {
        let triggers = vec![trigger(1, "привет", &["hi"])];
        assert!(first_match(&triggers, "пока").is_none());
    }

    #[test]
    fn test_empty_response_trigger_still_matches_and_shadows() {
        let triggers = vec![
            trigger(1, "погода", &[]),
            trigger(2, "какая", &["такая"]),
        ];
        let found = first_match(&triggers, "какая погода сегодня").unwrap();
        assert_eq!(found.id, 1);
        assert!(found.responses.is_empty());
    }

    #[test]
    fn test_blank_value_never_matches() {
        let triggers = vec![trigger(1, "", &["x"])];
        assert!(first_match(&triggers, "anything").is_none());
    }

    #[test]
    fn test_find_match_reads_store() {
        let mut store = MockTriggerStore::new();
        store
            .expect_list_all()
            .times(1)
            .returning(|| Ok(vec![trigger(3, "Анекдот", &["a"])]));
        let found = find_match(&store, "расскажи анекдот").unwrap().unwrap();
        assert_eq!(found.value, "Анекдот");
    }

    #[test]
    fn test_find_match_propagates_store_error() {
        let mut store = MockTriggerStore::new();
        store
            .expect_list_all()
            .returning(|| Err(AppError::Store(rusqlite::Error::InvalidQuery)));
        assert!(matches!(
            find_match(&store, "hi").unwrap_err(),
            AppError::Store(_)
        ));
    }

    #[test]
    fn test_match_reserved_in_order() {
        let phrases = vec![
            ReservedPhrase {
                phrase: "какая погода".to_string(),
                action: ReservedAction::Weather,
            },
            ReservedPhrase {
                phrase: "хочу анекдот".to_string(),
                action: ReservedAction::RandomContent,
            },
        ];
        assert_eq!(
            match_reserved(&phrases, "скажи, какая погода?"),
            Some(ReservedAction::Weather)
        );
        assert_eq!(
            match_reserved(&phrases, "какая погода? хочу анекдот"),
            Some(ReservedAction::Weather)
        );
        assert_eq!(
            match_reserved(&phrases, "очень хочу анекдот"),
            Some(ReservedAction::RandomContent)
        );
        assert_eq!(match_reserved(&phrases, "привет"), None);
    }
}
