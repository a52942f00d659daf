//! Display order of a round's submissions.
//!
//! While a round is open the list is shuffled with a generator seeded from the round id, so list
//! position says nothing about who submitted what, yet every viewer sees the same order on every
//! render. Finished rounds are shown by points.

use crate::models::{Phase, RoundId, Submission, SubmissionType};

/// Linear congruential generator. Reproducible by construction, not meant to be unpredictable.
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    const MULTIPLIER: u64 = 9301;
    const INCREMENT: u64 = 49297;
    const MODULUS: u64 = 233280;

    pub fn new(seed: u64) -> SeededRng {
        SeededRng { state: seed }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * Self::MULTIPLIER + Self::INCREMENT) % Self::MODULUS;
        self.state as f64 / Self::MODULUS as f64
    }

    /// Fisher-Yates from the back.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i + 1) as f64) as usize;
            items.swap(i, j);
        }
    }
}

/// 32-bit `h * 31 + byte` string hash, made non-negative.
pub fn string_hash(value: &str) -> u64 {
    let hash = value
        .bytes()
        .fold(0i32, |hash, byte| {
            (hash << 5).wrapping_sub(hash).wrapping_add(byte as i32)
        });

    hash.unsigned_abs() as u64
}

pub fn round_seed(round_id: RoundId) -> u64 {
    string_hash(&round_id.to_string())
}

/// Orders `submissions` for display in a round that is in `phase`.
pub fn display_order(
    round_id: RoundId,
    phase: Phase,
    mut submissions: Vec<Submission>,
) -> Vec<Submission> {
    if phase == Phase::Finished {
        // Stable, so equal points stay in the order they came in.
        submissions.sort_by_key(|s| std::cmp::Reverse(s.points.unwrap_or(0)));
        return submissions;
    }

    let (mut files, mut links): (Vec<_>, Vec<_>) = submissions
        .into_iter()
        .partition(|s| s.submission_type == SubmissionType::File);

    let seed = round_seed(round_id);
    for group in [&mut files, &mut links] {
        group.sort_by_key(|s| s.id);
        SeededRng::new(seed).shuffle(group);
    }

    files.extend(links);
    files
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::models::{types::UtcDateTime, SubmissionId, UserId};

    fn submission(id: u64, submission_type: SubmissionType, points: Option<i64>) -> Submission {
        Submission {
            id: SubmissionId(id),
            round_id: RoundId(1),
            submitter: UserId(id),
            submission_type,
            title: format!("Song {id}"),
            artist: "Artist".to_string(),
            source: format!("source-{id}"),
            duration_seconds: Some(200.0),
            points,
            rank: None,
            submitted_at: UtcDateTime::now(),
        }
    }

    fn files(ids: impl IntoIterator<Item = u64>) -> Vec<Submission> {
        ids.into_iter()
            .map(|id| submission(id, SubmissionType::File, None))
            .collect()
    }

    fn ids(submissions: &[Submission]) -> Vec<u64> {
        submissions.iter().map(|s| s.id.0).collect()
    }

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("1"), 49);
        assert_eq!(string_hash("42"), 1662);
    }

    #[test]
    fn shuffle_is_seeded() {
        let mut items: Vec<u64> = (1..=8).collect();
        SeededRng::new(49).shuffle(&mut items);
        assert_eq!(items, vec![7, 3, 6, 1, 8, 4, 5, 2]);
    }

    #[test]
    fn open_round_order_is_reproducible() {
        let first = display_order(RoundId(42), Phase::Voting, files(1..=8));
        let second = display_order(RoundId(42), Phase::Voting, files((1..=8).rev()));

        assert_eq!(ids(&first), vec![3, 8, 6, 2, 1, 5, 7, 4]);
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(
            ids(&display_order(RoundId(42), Phase::Submissions, files(1..=8))),
            ids(&first)
        );
    }

    #[test]
    fn different_rounds_shuffle_differently() {
        let one = display_order(RoundId(1), Phase::Voting, files(1..=8));
        let two = display_order(RoundId(2), Phase::Voting, files(1..=8));

        assert_eq!(ids(&one), vec![7, 3, 6, 1, 8, 4, 5, 2]);
        assert_eq!(ids(&two), vec![5, 6, 7, 1, 3, 8, 4, 2]);
    }

    #[test]
    fn files_come_before_links() {
        let mut submissions = files(1..=3);
        submissions.insert(0, submission(10, SubmissionType::Youtube, None));
        submissions.insert(2, submission(11, SubmissionType::Youtube, None));
        submissions.push(submission(12, SubmissionType::Youtube, None));

        let ordered = display_order(RoundId(42), Phase::Voting, submissions);

        assert!(ordered[..3]
            .iter()
            .all(|s| s.submission_type == SubmissionType::File));
        assert_eq!(ids(&ordered[3..]), vec![10, 12, 11]);
    }

    #[test]
    fn finished_round_is_ordered_by_points() {
        let submissions = vec![
            submission(1, SubmissionType::File, Some(1)),
            submission(2, SubmissionType::Youtube, Some(5)),
            submission(3, SubmissionType::File, Some(-2)),
            submission(4, SubmissionType::File, Some(5)),
        ];

        let ordered = display_order(RoundId(1), Phase::Finished, submissions);
        assert_eq!(ids(&ordered), vec![2, 4, 1, 3]);
    }
}
