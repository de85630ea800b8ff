//! Column header and file name normalization

/// Characters that separate words in CMS headers ("Hospital/Name").
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Map a raw CSV header to a lowercase snake_case identifier.
///
/// Steps: lowercase, treat `/` and `\` as spaces, drop everything that is not
/// alphanumeric, `_` or whitespace, trim, then join the remaining words with
/// single underscores.
///
/// Total and idempotent. Distinct headers may collide ("ID#" and "ID" both
/// become "id"); callers get no deduplication.
///
/// ```
/// use hds_ingest::normalize::normalize_header;
///
/// assert_eq!(normalize_header(" Patient ID# "), "patient_id");
/// assert_eq!(normalize_header("Hospital/Name"), "hospital_name");
/// ```
pub fn normalize_header(raw: &str) -> String {
    // Lowercase first: some uppercase letters lower to a letter plus a
    // combining mark, which the filter below would otherwise treat unevenly.
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Output file name for a dataset title: spaces and path separators become
/// underscores and `.csv` is appended. Different titles can map to the same
/// name; the later write wins.
pub fn output_file_name(title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| if c == ' ' || SEPARATORS.contains(&c) { '_' } else { c })
        .collect();
    format!("{}.csv", safe)
}
