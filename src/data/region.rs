//! Region Directory
//! Static code -> display name lookup, used only when rendering.

/// Known region codes and their display names, in the default load order.
const REGIONS: [(&str, &str); 11] = [
    ("Canada", "Canada"),
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("ON", "Ontario"),
    ("PEI", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
];

pub struct RegionDirectory;

impl RegionDirectory {
    /// Default region codes, national reference first.
    pub fn default_codes() -> Vec<String> {
        REGIONS.iter().map(|(code, _)| code.to_string()).collect()
    }

    /// Display name for a code. Unknown codes render as themselves.
    pub fn display_name(code: &str) -> &str {
        REGIONS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .unwrap_or(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(RegionDirectory::display_name("PEI"), "Prince Edward Island");
        assert_eq!(RegionDirectory::display_name("ON"), "Ontario");
        assert_eq!(RegionDirectory::display_name("YT"), "YT");
    }

    #[test]
    fn test_default_codes_start_with_national() {
        let codes = RegionDirectory::default_codes();
        assert_eq!(codes.len(), 11);
        assert_eq!(codes[0], "Canada");
    }
}
