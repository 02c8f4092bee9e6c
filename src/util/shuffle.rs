use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffle `items` in place and hand the slice back for chaining
pub fn randomize<T>(items: &mut [T]) -> &mut [T] {
    randomize_with(items, &mut rand::thread_rng())
}

/// [`randomize`] with a caller-supplied RNG
pub fn randomize_with<'a, T, R: Rng + ?Sized>(items: &'a mut [T], rng: &mut R) -> &'a mut [T] {
    items.shuffle(rng);
    items
}

/// Shuffled copy of `items`; the original order is left untouched
///
/// Only the slice is copied, the elements are cloned shallowly.
pub fn safe_randomize<T: Clone>(items: &[T]) -> Vec<T> {
    let mut copy = items.to_vec();
    randomize(&mut copy);
    copy
}
