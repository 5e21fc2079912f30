/// Iteration cap used when the algorithm is not in [`DEFAULT_ITERATIONS`].
pub const FALLBACK_ITERATIONS: usize = 30;

/// Per-algorithm iteration caps applied when the caller leaves
/// `max_iteration` on auto.
pub const DEFAULT_ITERATIONS: [(&str, usize); 6] = [
    ("nr", 10),
    ("iwamoto_nr", 10),
    ("bfsw", 100),
    ("gs", 1000),
    ("fdbx", 30),
    ("fdxb", 30),
];

/// Effective iteration cap for a run. An explicit value is returned as is;
/// range checks belong to the request boundary.
pub fn resolve(algorithm: &str, explicit: Option<usize>) -> usize {
    explicit.unwrap_or_else(|| {
        DEFAULT_ITERATIONS
            .iter()
            .find(|(name, _)| *name == algorithm)
            .map_or(FALLBACK_ITERATIONS, |(_, n)| *n)
    })
}
