/// Split `s` on `separator` into at most `limit` pieces
///
/// The last piece keeps the remainder of the string, separators included.
/// A `limit` of 0 is treated as 1.
///
/// ```
/// use throttle_queue::util::split;
///
/// assert_eq!(split("SET key some value", " ", 3), vec!["SET", "key", "some value"]);
/// assert_eq!(split("a,b", ",", 5), vec!["a", "b"]);
/// ```
pub fn split<'a>(s: &'a str, separator: &str, limit: usize) -> Vec<&'a str> {
    s.splitn(limit.max(1), separator).collect()
}
