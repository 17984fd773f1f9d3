use std::cmp::Ordering;
use std::fmt;

/// A `major.minor.patch[-pre]` version as printed by the dotnet CLI and the release feed.
///
/// Missing or non-numeric components parse as `0`; parsing never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    pub fn parse(version: &str) -> Self {
        let version = version.trim();
        // Build metadata never takes part in ordering
        let version = version.split_once('+').map_or(version, |(v, _)| v);

        let (base, pre_release) = match version.split_once('-') {
            Some((base, tag)) if !tag.is_empty() => (base, Some(tag.to_string())),
            Some((base, _)) => (base, None),
            None => (version, None),
        };

        let mut numbers = base.split('.').map(leading_number);

        Self {
            major: numbers.next().unwrap_or(0),
            minor: numbers.next().unwrap_or(0),
            patch: numbers.next().unwrap_or(0),
            pre_release,
        }
    }

    pub fn triplet(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }
}

fn leading_number(segment: &str) -> u32 {
    let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(tag) = &self.pre_release {
            write!(f, "-{}", tag)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Part<'a> {
    Numeric(u64),
    Text(&'a str),
}

fn split_parts(tag: &str) -> Vec<Part<'_>> {
    tag.split(['.', '-'])
        .filter(|p| !p.is_empty())
        .map(|p| match p.parse::<u64>() {
            Ok(n) if p.chars().all(|c| c.is_ascii_digit()) => Part::Numeric(n),
            _ => Part::Text(p),
        })
        .collect()
}

fn compare_tags(a: &str, b: &str) -> Ordering {
    let a_parts = split_parts(a);
    let b_parts = split_parts(b);

    for (ap, bp) in a_parts.iter().zip(b_parts.iter()) {
        match ap.cmp(bp) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }

    // "preview.1" < "preview.1.2"; raw text breaks the remaining ties ("01" vs "1")
    a_parts
        .len()
        .cmp(&b_parts.len())
        .then_with(|| a.cmp(b))
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triplet().cmp(&other.triplet()).then_with(|| {
            match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                // A release sorts after every pre-release of the same triplet
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_tags(a, b),
            }
        })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    SemanticVersion::parse(a).cmp(&SemanticVersion::parse(b))
}
