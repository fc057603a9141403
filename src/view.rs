use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::models::{JobRecord, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: JobStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }

    /// all → applied → interview → offer → rejected → all
    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(JobStatus::Applied),
            StatusFilter::Only(JobStatus::Applied) => StatusFilter::Only(JobStatus::Interview),
            StatusFilter::Only(JobStatus::Interview) => StatusFilter::Only(JobStatus::Offer),
            StatusFilter::Only(JobStatus::Offer) => StatusFilter::Only(JobStatus::Rejected),
            StatusFilter::Only(JobStatus::Rejected) => StatusFilter::All,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest applied date first.
    #[default]
    Date,
    Company,
}

impl SortKey {
    pub fn toggle(&self) -> Self {
        match self {
            SortKey::Date => SortKey::Company,
            SortKey::Company => SortKey::Date,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Date => f.write_str("date"),
            SortKey::Company => f.write_str("company"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" | "newest" => Ok(SortKey::Date),
            "company" => Ok(SortKey::Company),
            _ => Err(format!("Invalid sort key '{}'. Expected: date, company", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub status: StatusFilter,
    pub search: String,
    pub sort: SortKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub applied: usize,
    pub interview: usize,
    pub offer: usize,
    pub rejected: usize,
}

/// Filtered, searched and sorted projection of `records`. The input is
/// never reordered; both sorts are stable, so equal keys keep insertion order.
pub fn view<'a>(records: &'a [JobRecord], query: &ViewQuery) -> Vec<&'a JobRecord> {
    let needle = query.search.to_lowercase();

    let mut out: Vec<&JobRecord> = records
        .iter()
        .filter(|r| query.status.matches(r.status))
        .filter(|r| {
            needle.is_empty()
                || r.company.to_lowercase().contains(&needle)
                || r.role.to_lowercase().contains(&needle)
        })
        .collect();

    match query.sort {
        SortKey::Date => out.sort_by(|a, b| b.applied_date.cmp(&a.applied_date)),
        SortKey::Company => out.sort_by(|a, b| compare_names(&a.company, &b.company)),
    }

    out
}

/// Collation-style ordering: base letters first (accents and case folded
/// away), then unaccented before accented, then lowercase before uppercase.
/// "Éclair" sorts between "Acme" and "Foo", and "alpha" precedes "Alpha".
fn compare_names(a: &str, b: &str) -> Ordering {
    let (ka, kb) = (CollationKey::new(a), CollationKey::new(b));
    ka.base
        .cmp(&kb.base)
        .then_with(|| ka.accented.cmp(&kb.accented))
        .then_with(|| ka.upper.cmp(&kb.upper))
        .then_with(|| a.cmp(b))
}

struct CollationKey {
    base: String,
    accented: String,
    upper: Vec<bool>,
}

impl CollationKey {
    fn new(name: &str) -> Self {
        let decomposed: Vec<char> = name.nfd().collect();
        let base = decomposed
            .iter()
            .filter(|c| !is_combining_mark(**c))
            .collect::<String>()
            .to_lowercase();
        let accented = decomposed.iter().collect::<String>().to_lowercase();
        let upper = decomposed
            .iter()
            .filter(|c| !is_combining_mark(**c))
            .map(|c| c.is_uppercase())
            .collect();
        Self { base, accented, upper }
    }
}

/// Counts over the whole collection, not the filtered view.
pub fn stats(records: &[JobRecord]) -> Stats {
    let mut stats = Stats {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        match record.status {
            JobStatus::Applied => stats.applied += 1,
            JobStatus::Interview => stats.interview += 1,
            JobStatus::Offer => stats.offer += 1,
            JobStatus::Rejected => stats.rejected += 1,
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn job(id: &str, company: &str, role: &str, status: JobStatus, day: u32) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            company: company.to_string(),
            role: role.to_string(),
            location: String::new(),
            salary: String::new(),
            url: String::new(),
            notes: String::new(),
            status,
            applied_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    fn ids(view: &[&JobRecord]) -> Vec<String> {
        view.iter().map(|r| r.id.clone()).collect()
    }

    fn sample() -> Vec<JobRecord> {
        vec![
            job("1", "Acme Corp", "Backend Engineer", JobStatus::Applied, 3),
            job("2", "Globex", "Data Scientist", JobStatus::Interview, 10),
            job("3", "Initech", "Platform Engineer", JobStatus::Offer, 7),
            job("4", "Umbrella", "Recruiter", JobStatus::Rejected, 1),
        ]
    }

    #[test]
    fn test_all_and_empty_search_is_noop_filter() {
        let records = sample();
        let mut got = ids(&view(&records, &ViewQuery::default()));
        got.sort();
        assert_eq!(got, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let records = sample();
        let query = ViewQuery {
            search: "acme".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &query)), vec!["1"]);

        let query = ViewQuery {
            search: "ENGINEER".to_string(),
            sort: SortKey::Company,
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &query)), vec!["1", "3"]);
    }

    #[test]
    fn test_status_filter_combines_with_search() {
        let records = sample();
        let query = ViewQuery {
            status: StatusFilter::Only(JobStatus::Offer),
            search: "engineer".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &query)), vec!["3"]);

        let query = ViewQuery {
            status: StatusFilter::Only(JobStatus::Applied),
            search: "globex".to_string(),
            ..Default::default()
        };
        assert!(view(&records, &query).is_empty());
    }

    #[test]
    fn test_sort_by_date_newest_first_with_stable_ties() {
        let records = vec![
            job("a", "X", "r", JobStatus::Applied, 5),
            job("b", "Y", "r", JobStatus::Applied, 9),
            job("c", "Z", "r", JobStatus::Applied, 5),
            job("d", "W", "r", JobStatus::Applied, 2),
        ];
        assert_eq!(ids(&view(&records, &ViewQuery::default())), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_sort_by_company() {
        let records = vec![
            job("z", "Zeta", "r", JobStatus::Applied, 1),
            job("a", "Acme", "r", JobStatus::Applied, 1),
            job("m", "Mid", "r", JobStatus::Applied, 1),
        ];
        let query = ViewQuery {
            sort: SortKey::Company,
            ..Default::default()
        };
        let companies: Vec<&str> = view(&records, &query).iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Acme", "Mid", "Zeta"]);
    }

    #[test]
    fn test_company_sort_ignores_case_lowercase_first() {
        let records = vec![
            job("1", "beta", "r", JobStatus::Applied, 1),
            job("2", "Alpha", "r", JobStatus::Applied, 1),
            job("3", "alpha", "r", JobStatus::Applied, 1),
        ];
        let query = ViewQuery {
            sort: SortKey::Company,
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &query)), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_company_sort_groups_accents_with_base_letter() {
        let records = vec![
            job("z", "Zeta", "r", JobStatus::Applied, 1),
            job("e", "Éclair", "r", JobStatus::Applied, 1),
            job("a", "Acme", "r", JobStatus::Applied, 1),
            job("f", "Foo", "r", JobStatus::Applied, 1),
        ];
        let query = ViewQuery {
            sort: SortKey::Company,
            ..Default::default()
        };
        let companies: Vec<&str> = view(&records, &query).iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Acme", "Éclair", "Foo", "Zeta"]);
    }

    #[test]
    fn test_unaccented_name_sorts_before_accented_twin() {
        assert_eq!(compare_names("Cafe", "Café"), Ordering::Less);
        assert_eq!(compare_names("café", "Cafe"), Ordering::Greater);
        assert_eq!(compare_names("Acme", "Acme"), Ordering::Equal);
    }

    #[test]
    fn test_view_does_not_mutate_input() {
        let records = sample();
        let before = records.clone();
        let query = ViewQuery {
            sort: SortKey::Company,
            search: "e".to_string(),
            ..Default::default()
        };
        let _ = view(&records, &query);
        assert_eq!(records, before);
    }

    #[test]
    fn test_stats_counts_full_collection() {
        let records = vec![
            job("1", "A", "r", JobStatus::Applied, 1),
            job("2", "B", "r", JobStatus::Applied, 1),
            job("3", "C", "r", JobStatus::Interview, 1),
            job("4", "D", "r", JobStatus::Offer, 1),
            job("5", "E", "r", JobStatus::Rejected, 1),
        ];
        assert_eq!(
            stats(&records),
            Stats {
                total: 5,
                applied: 2,
                interview: 1,
                offer: 1,
                rejected: 1,
            }
        );
        assert_eq!(stats(&[]), Stats::default());
    }

    #[test]
    fn test_filter_and_sort_parse() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "offer".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(JobStatus::Offer)
        );
        assert!("pending".parse::<StatusFilter>().is_err());
        assert_eq!("company".parse::<SortKey>().unwrap(), SortKey::Company);
        assert_eq!("newest".parse::<SortKey>().unwrap(), SortKey::Date);
    }

    #[test]
    fn test_filter_cycle_returns_to_all() {
        let mut filter = StatusFilter::All;
        for _ in 0..5 {
            filter = filter.next();
        }
        assert_eq!(filter, StatusFilter::All);
    }
}
