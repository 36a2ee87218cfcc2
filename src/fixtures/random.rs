use rand::Rng;
use rand::seq::SliceRandom;

/// Picks up to `count` distinct candidates, uniformly. Fewer come back only
/// when there are fewer candidates.
pub fn pick_distinct<R, T>(rng: &mut R, candidates: &[T], count: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    T: Clone,
{
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

/// Picks between `min` and `max` distinct candidates. Both bounds are
/// clamped to the number of candidates.
pub fn pick_between<R, T>(rng: &mut R, candidates: &[T], min: usize, max: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    T: Clone,
{
    if candidates.is_empty() {
        return Vec::new();
    }

    let clamped_min = min.min(candidates.len());
    let clamped_max = max.min(candidates.len()).max(clamped_min);

    let count = if clamped_min == clamped_max {
        clamped_min
    } else {
        rng.random_range(clamped_min..=clamped_max)
    };

    pick_distinct(rng, candidates, count)
}

pub fn pick_one<'a, R, T>(rng: &mut R, candidates: &'a [T]) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        None
    } else {
        Some(&candidates[rng.random_range(0..candidates.len())])
    }
}

/// True with `percent` in 100 odds.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, percent: u32) -> bool {
    rng.random_ratio(percent.min(100), 100)
}
