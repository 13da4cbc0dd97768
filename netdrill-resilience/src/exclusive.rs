//! Key-exclusive wave scheduling
//!
//! Requests that touch the same private key must never run at the same time.
//! An ordered batch is cut into consecutive waves: a request joins the
//! current wave unless it shares a key with a request already in it, in which
//! case a new wave starts with that request.

use std::collections::HashSet;
use std::hash::Hash;
use std::ops::Range;

/// Partition an ordered batch into consecutive key-disjoint waves.
///
/// `key_sets[i]` lists the keys used by request `i`. Repeated keys within a
/// single request do not conflict with themselves, so every wave holds at
/// least one request and the returned ranges cover `0..key_sets.len()`.
pub fn partition_waves<K, S>(key_sets: &[S]) -> Vec<Range<usize>>
where
    K: Eq + Hash,
    S: AsRef<[K]>,
{
    let mut waves = Vec::new();
    let mut used: HashSet<&K> = HashSet::new();
    let mut start = 0;

    for (index, keys) in key_sets.iter().enumerate() {
        let keys = keys.as_ref();
        if index > start && keys.iter().any(|key| used.contains(key)) {
            waves.push(start..index);
            used.clear();
            start = index;
        }
        used.extend(keys.iter());
    }

    if start < key_sets.len() {
        waves.push(start..key_sets.len());
    }

    waves
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_disjoint_requests_form_one_wave() {
        let sets = vec![vec!["a"], vec!["b"], vec!["c", "d"]];
        assert_eq!(partition_waves(&sets), vec![0..3]);
    }

    #[test]
    fn test_shared_key_starts_new_wave() {
        let sets = vec![vec!["a"], vec!["b"], vec!["a", "c"], vec!["d"], vec!["c"]];
        assert_eq!(partition_waves(&sets), vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_request_repeating_its_own_key() {
        let sets = vec![vec!["a", "a"], vec!["a"]];
        assert_eq!(partition_waves(&sets), vec![0..1, 1..2]);
    }

    #[test]
    fn test_empty_batch() {
        let sets: Vec<Vec<&str>> = vec![];
        assert!(partition_waves(&sets).is_empty());
    }

    proptest! {
        #[test]
        fn test_waves_are_exclusive_and_greedy(
            sets in prop::collection::vec(prop::collection::vec(0u8..6, 0..3), 0..20)
        ) {
            let waves = partition_waves(&sets);

            // Consecutive cover of the whole batch
            let mut next = 0;
            for wave in &waves {
                prop_assert_eq!(wave.start, next);
                prop_assert!(wave.end > wave.start);
                next = wave.end;
            }
            prop_assert_eq!(next, sets.len());

            for (position, wave) in waves.iter().enumerate() {
                // No two requests of a wave share a key
                for i in wave.clone() {
                    for j in (i + 1)..wave.end {
                        prop_assert!(sets[i].iter().all(|k| !sets[j].contains(k)));
                    }
                }
                // A wave only ends because the next request conflicts with it
                if position + 1 < waves.len() {
                    let blocker = &sets[wave.end];
                    let conflicts = wave.clone().any(|i| sets[i].iter().any(|k| blocker.contains(k)));
                    prop_assert!(conflicts);
                }
            }
        }
    }
}
