/// Academic programmes offered by the college, in display order.
pub const DEPARTMENTS: &[&str] = &[
    "B.A. Tamil",
    "B.A. English",
    "B.A. History",
    "B.A. Economics",
    "B.Com",
    "B.Com (CA)",
    "BBA",
    "BCA",
    "B.Sc. Mathematics",
    "B.Sc. Physics",
    "B.Sc. Chemistry",
    "B.Sc. Computer Science",
    "B.Sc. Zoology",
];

pub fn is_known(department: &str) -> bool {
    DEPARTMENTS.contains(&department)
}

/// Known departments first, then any extra names found in `seen`, sorted.
pub fn with_extras<'a, I>(seen: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut extras: Vec<String> = seen
        .into_iter()
        .filter(|d| !d.is_empty() && !is_known(d))
        .map(str::to_string)
        .collect();
    extras.sort();
    extras.dedup();

    DEPARTMENTS
        .iter()
        .map(|d| d.to_string())
        .chain(extras)
        .collect()
}
