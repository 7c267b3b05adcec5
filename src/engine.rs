//! Counting engine
//!
//! Pure combinatorics: how many ordered sequences of daily doses, each dose
//! 1 or 2 units, sum exactly to n? These are the compositions of n with
//! parts in {1, 2}, so count(n) = count(n-1) + count(n-2) with count(0) = 1
//! (the empty schedule) and count(1) = 1. That is the Fibonacci sequence
//! shifted by one: count(n) = F(n+1) with F(1) = F(2) = 1.
//!
//! The recurrence is evaluated iteratively, so a single call is O(n) and
//! never at risk of blowing the hosting environment's response ceiling.
//! The synchronous/deferred split at [`SYNC_THRESHOLD`] is kept anyway:
//! it is the service's published behavioral boundary, and cache entries
//! are only ever populated synchronously for n at or below it.

/// Largest pill count computed inline on the request path.
///
/// Requests above this are handed to the deferred worker. Changing this
/// value changes which cache entries the service itself ever writes.
pub const SYNC_THRESHOLD: u32 = 43;

/// Largest pill count the service accepts at all.
pub const MAX_PILLS: u32 = 47;

/// Number of dose schedules (ordered 1/2-unit sequences) summing to `n`.
///
/// count(0) is 1 (the empty schedule). Exact for n <= 92, the largest n
/// whose count fits in u64; larger n overflows. Every caller in this crate
/// bounds n by [`MAX_PILLS`], whose count is 4_807_526_976 -- the reason
/// the return type is u64 in the first place.
pub fn count(n: u32) -> u64 {
    let (mut prev, mut curr) = (1u64, 1u64);
    for _ in 0..n {
        let next = prev + curr;
        prev = curr;
        curr = next;
    }
    prev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_cases() {
        assert_eq!(count(0), 1);
        assert_eq!(count(1), 1);
    }

    #[test]
    fn test_small_counts_follow_recurrence() {
        assert_eq!(count(2), 2);
        assert_eq!(count(3), 3);
        assert_eq!(count(4), 5);
        assert_eq!(count(5), 8);
        assert_eq!(count(10), 89);
    }

    #[test]
    fn test_recurrence_holds_across_domain() {
        for n in 2..=MAX_PILLS {
            assert_eq!(count(n), count(n - 1) + count(n - 2), "failed at n={}", n);
        }
    }

    #[test]
    fn test_threshold_and_domain_edge_values() {
        // count(43) and count(47) are the boundary values the policy
        // decisions hinge on; pin them explicitly.
        assert_eq!(count(SYNC_THRESHOLD), 701_408_733);
        assert_eq!(count(MAX_PILLS), 4_807_526_976);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(count(30), count(30));
        assert_eq!(count(47), count(47));
    }

    #[test]
    fn test_largest_representable_count() {
        // n = 92 is the last value whose count fits in u64; the documented
        // practical domain ends here.
        assert_eq!(count(92), 12_200_160_415_121_876_738);
    }
}
