/// Group consecutive equal items into runs, preserving order
///
/// ```
/// use throttle_queue::util::group;
///
/// assert_eq!(group(&[1, 1, 2, 1, 1, 1]), vec![vec![1, 1], vec![2], vec![1, 1, 1]]);
/// ```
pub fn group<T: PartialEq + Clone>(items: &[T]) -> Vec<Vec<T>> {
    items.chunk_by(|a, b| a == b).map(<[T]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single() {
        assert!(group::<u8>(&[]).is_empty());
        assert_eq!(group(&["x"]), vec![vec!["x"]]);
    }

    #[test]
    fn test_no_repeats() {
        assert_eq!(group(&['a', 'b', 'c']), vec![vec!['a'], vec!['b'], vec!['c']]);
    }
}
