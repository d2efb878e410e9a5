use rand::rng;
use rand::seq::SliceRandom;
use tracing::warn;

use mathquest_core::model::{Question, QuestionRecord};

/// Validate raw practice records, skipping the malformed ones with a warning.
pub fn validate_questions(records: Vec<QuestionRecord>) -> Vec<Question> {
    records
        .into_iter()
        .filter_map(|record| match Question::try_from(record) {
            Ok(question) => Some(question),
            Err(err) => {
                warn!(error = %err, "skipping malformed practice question");
                None
            }
        })
        .collect()
}

pub(crate) fn maybe_shuffle<T>(items: &mut [T], shuffle: bool) {
    if shuffle {
        let mut rng = rng();
        items.shuffle(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathquest_core::model::QuestionId;

    fn record(id: u64, kind: &str) -> QuestionRecord {
        QuestionRecord {
            id: QuestionId::new(id),
            prompt: "Leave 2 in the box".into(),
            kind: kind.into(),
            start_in_box: Some(5),
            target_in_box: Some(2),
            ..QuestionRecord::default()
        }
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut broken = record(2, "box");
        broken.target_in_box = None;
        let questions = validate_questions(vec![record(1, "box"), broken, record(3, "juggle")]);
        let ids: Vec<_> = questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![QuestionId::new(1)]);
    }

    #[test]
    fn shuffle_keeps_every_item() {
        let mut items: Vec<u32> = (0..20).collect();
        maybe_shuffle(&mut items, true);
        items.sort_unstable();
        assert_eq!(items, (0..20).collect::<Vec<_>>());

        let mut fixed = vec![3, 1, 2];
        maybe_shuffle(&mut fixed, false);
        assert_eq!(fixed, vec![3, 1, 2]);
    }
}
