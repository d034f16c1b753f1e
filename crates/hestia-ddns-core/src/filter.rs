//! Exclusion filtering applied to the inventory before any network work

/// Keep the items whose key is not listed in `excluded`
///
/// Matching is whole-name equality, ignoring ASCII case; no glob or suffix
/// semantics. Order is preserved and the input is left untouched.
pub fn filter_excluded<T, S, F>(items: &[T], excluded: &[S], key: F) -> Vec<T>
where
    T: Clone,
    S: AsRef<str>,
    F: Fn(&T) -> &str,
{
    if excluded.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| {
            let key = key(item);
            !excluded.iter().any(|name| name.as_ref().eq_ignore_ascii_case(key))
        })
        .cloned()
        .collect()
}

/// [`filter_excluded`] keyed by the item itself
pub fn filter_excluded_names<S, E>(names: &[S], excluded: &[E]) -> Vec<S>
where
    S: AsRef<str> + Clone,
    E: AsRef<str>,
{
    filter_excluded(names, excluded, |name| name.as_ref())
}
