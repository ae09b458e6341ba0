/// Most frequent value of a sequence
///
/// Absent values are excluded. Ties go to the value encountered first, so
/// callers feed records in instance order to get a deterministic answer.
pub fn most_frequent<T, I>(values: I) -> Option<T>
where
    T: PartialEq,
    I: IntoIterator<Item = Option<T>>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values.into_iter().flatten() {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Most frequent value among those accepted by `keep`
pub fn most_frequent_where<T, I>(values: I, keep: impl Fn(&T) -> bool) -> Option<T>
where
    T: PartialEq,
    I: IntoIterator<Item = Option<T>>,
{
    most_frequent(values.into_iter().map(|v| v.filter(|v| keep(v))))
}
