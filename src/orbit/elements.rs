//! Two-line element sets and the ordered relay catalog

/// Reason a pair of element lines was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TleError {
    /// A line is shorter than the fixed 69-column layout
    TooShort { line: u8, len: usize },

    /// A line holds characters outside ASCII
    NonAscii { line: u8 },

    /// Line does not start with its line number
    BadLineNumber { line: u8 },

    /// Catalog number columns are not a number
    BadCatalogNumber { line: u8, field: String },

    /// The two lines describe different objects
    CatalogMismatch { line1: u32, line2: u32 },

    /// The elements belong to another object than the one requested
    UnexpectedCatalog { expected: u32, found: u32 },

    /// Modulo-10 checksum in column 69 does not match
    Checksum { line: u8, expected: u8, found: char },
}

impl std::fmt::Display for TleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { line, len } => {
                write!(f, "TLE line {} has {} columns, expected 69", line, len)
            }
            Self::NonAscii { line } => {
                write!(f, "TLE line {} contains non-ASCII characters", line)
            }
            Self::BadLineNumber { line } => {
                write!(f, "TLE line {} does not start with '{} '", line, line)
            }
            Self::BadCatalogNumber { line, field } => {
                write!(f, "TLE line {} has invalid catalog number {:?}", line, field)
            }
            Self::CatalogMismatch { line1, line2 } => {
                write!(
                    f,
                    "TLE lines disagree on catalog number ({} vs {})",
                    line1, line2
                )
            }
            Self::UnexpectedCatalog { expected, found } => {
                write!(f, "expected elements for #{}, got #{}", expected, found)
            }
            Self::Checksum {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "TLE line {} checksum is '{}', computed {}",
                    line, found, expected
                )
            }
        }
    }
}

impl std::error::Error for TleError {}

const TLE_LINE_LEN: usize = 69;

/// Validated two-line element set for one catalog object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalElements {
    catalog_id: u32,
    line1: String,
    line2: String,
}

impl OrbitalElements {
    /// Validate a pair of element lines.
    ///
    /// Trailing whitespace is ignored. The catalog number is read from the
    /// lines themselves.
    pub fn parse(line1: &str, line2: &str) -> Result<Self, TleError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        let id1 = check_line(line1, 1)?;
        let id2 = check_line(line2, 2)?;
        if id1 != id2 {
            return Err(TleError::CatalogMismatch {
                line1: id1,
                line2: id2,
            });
        }

        Ok(Self {
            catalog_id: id1,
            line1: line1.to_string(),
            line2: line2.to_string(),
        })
    }

    /// Validate lines that were requested for a specific catalog object
    pub fn parse_for(catalog_id: u32, line1: &str, line2: &str) -> Result<Self, TleError> {
        let elements = Self::parse(line1, line2)?;
        if elements.catalog_id != catalog_id {
            return Err(TleError::UnexpectedCatalog {
                expected: catalog_id,
                found: elements.catalog_id,
            });
        }
        Ok(elements)
    }

    pub fn catalog_id(&self) -> u32 {
        self.catalog_id
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }
}

fn check_line(line: &str, number: u8) -> Result<u32, TleError> {
    if !line.is_ascii() {
        return Err(TleError::NonAscii { line: number });
    }
    if line.len() < TLE_LINE_LEN {
        return Err(TleError::TooShort {
            line: number,
            len: line.len(),
        });
    }

    let bytes = line.as_bytes();
    if bytes[0] != b'0' + number || bytes[1] != b' ' {
        return Err(TleError::BadLineNumber { line: number });
    }

    let field = &line[2..7];
    let catalog_id = field
        .trim()
        .parse::<u32>()
        .map_err(|_| TleError::BadCatalogNumber {
            line: number,
            field: field.to_string(),
        })?;

    let expected = checksum(line);
    let found = bytes[TLE_LINE_LEN - 1] as char;
    if found.to_digit(10) != Some(expected as u32) {
        return Err(TleError::Checksum {
            line: number,
            expected,
            found,
        });
    }

    Ok(catalog_id)
}

/// Modulo-10 checksum over the first 68 columns: digits count their value, '-' counts 1
pub(crate) fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(TLE_LINE_LEN - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Ordered set of relays.
///
/// Order is significant: it fixes output column order and breaks ties when
/// two relays are equally good.
#[derive(Debug, Clone, Default)]
pub struct RelayCatalog {
    relays: Vec<OrbitalElements>,
}

impl RelayCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add elements; a catalog id already present keeps its position but takes the new lines
    pub fn insert(&mut self, elements: OrbitalElements) {
        match self
            .relays
            .iter_mut()
            .find(|existing| existing.catalog_id == elements.catalog_id)
        {
            Some(existing) => {
                log::debug!(
                    "Replacing duplicate elements for #{}",
                    elements.catalog_id
                );
                *existing = elements;
            }
            None => self.relays.push(elements),
        }
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrbitalElements> {
        self.relays.iter()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.relays.iter().map(|e| e.catalog_id).collect()
    }
}

impl FromIterator<OrbitalElements> for RelayCatalog {
    fn from_iter<I: IntoIterator<Item = OrbitalElements>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for elements in iter {
            catalog.insert(elements);
        }
        catalog
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const ISS_LINE1: &str =
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    pub const ISS_LINE2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    /// ISS elements relabelled with another catalog number (checksums fixed up)
    pub fn synthetic_lines(catalog_id: u32) -> (String, String) {
        let relabel = |line: &str| {
            let mut body = format!("{}{:05}{}", &line[..2], catalog_id, &line[7..68]);
            let sum = checksum(&body);
            body.push(char::from(b'0' + sum));
            body
        };
        (relabel(ISS_LINE1), relabel(ISS_LINE2))
    }

    pub fn synthetic_elements(catalog_id: u32) -> OrbitalElements {
        let (l1, l2) = synthetic_lines(catalog_id);
        OrbitalElements::parse(&l1, &l2).unwrap()
    }

    #[test]
    fn test_parse_iss() {
        let elements = OrbitalElements::parse(ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(elements.catalog_id(), 25544);
        assert_eq!(elements.line2(), ISS_LINE2);
    }

    #[test]
    fn test_trailing_whitespace_ignored() {
        let l1 = format!("{}  \r", ISS_LINE1);
        assert!(OrbitalElements::parse(&l1, ISS_LINE2).is_ok());
    }

    #[test]
    fn test_bad_checksum() {
        let mut l1 = ISS_LINE1[..68].to_string();
        l1.push('3');
        assert!(matches!(
            OrbitalElements::parse(&l1, ISS_LINE2),
            Err(TleError::Checksum { line: 1, expected: 7, .. })
        ));
    }

    #[test]
    fn test_swapped_lines_rejected() {
        assert_eq!(
            OrbitalElements::parse(ISS_LINE2, ISS_LINE1),
            Err(TleError::BadLineNumber { line: 1 })
        );
    }

    #[test]
    fn test_truncated_line() {
        assert!(matches!(
            OrbitalElements::parse(&ISS_LINE1[..40], ISS_LINE2),
            Err(TleError::TooShort { line: 1, len: 40 })
        ));
    }

    #[test]
    fn test_non_ascii_line() {
        // Same column count as a valid line, one column replaced by a non-ASCII digit
        let line2: String = ISS_LINE2
            .chars()
            .enumerate()
            .map(|(i, c)| if i == 20 { '٤' } else { c })
            .collect();
        assert_eq!(line2.chars().count(), 69);
        assert_eq!(
            OrbitalElements::parse(ISS_LINE1, &line2),
            Err(TleError::NonAscii { line: 2 })
        );
    }

    #[test]
    fn test_catalog_mismatch() {
        let (_, other2) = synthetic_lines(24793);
        assert_eq!(
            OrbitalElements::parse(ISS_LINE1, &other2),
            Err(TleError::CatalogMismatch {
                line1: 25544,
                line2: 24793
            })
        );
        assert_eq!(
            OrbitalElements::parse_for(24793, ISS_LINE1, ISS_LINE2),
            Err(TleError::UnexpectedCatalog {
                expected: 24793,
                found: 25544
            })
        );
    }

    #[test]
    fn test_catalog_keeps_first_position_on_duplicate() {
        let (l1, l2) = synthetic_lines(24795);
        let original = OrbitalElements::parse(&l1, &l2).unwrap();

        // Same object, different mean motion
        let mut raised = format!("{}14.34217000{}", &l2[..52], &l2[63..68]);
        raised.push(char::from(b'0' + checksum(&raised)));
        let updated = OrbitalElements::parse(&l1, &raised).unwrap();

        let catalog: RelayCatalog = vec![
            synthetic_elements(24793),
            original,
            synthetic_elements(24796),
            updated.clone(),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.ids(), vec![24793, 24795, 24796]);
        assert_eq!(catalog.iter().nth(1), Some(&updated));
    }
}
