use serde::Serialize;

/// The search form posted to the query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryCriteria {
    /// Root directory the file nodes must live under. Also used as the
    /// display root for list rows.
    pub node_path: String,
    /// Raw `key:value, key2:value2` filter text.
    pub property_filter: String,
}

impl QueryCriteria {
    pub fn new(node_path: impl Into<String>, property_filter: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            property_filter: property_filter.into(),
        }
    }

    /// Copy with surrounding whitespace removed from both inputs.
    pub fn normalized(&self) -> Self {
        Self {
            node_path: self.node_path.trim().to_string(),
            property_filter: self.property_filter.trim().to_string(),
        }
    }

    pub fn filter(&self) -> PropertyFilter {
        PropertyFilter::parse(&self.property_filter)
    }
}

/// Parsed view of a property filter, as the server will read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    pub pairs: Vec<(String, String)>,
    /// Fragments without a `:`; the server drops these silently.
    pub ignored: Vec<String>,
}

impl PropertyFilter {
    pub fn parse(raw: &str) -> Self {
        let mut filter = PropertyFilter::default();
        if raw.trim().is_empty() {
            return filter;
        }

        for fragment in raw.split(',') {
            // split on the first ':' only, values may contain more
            match fragment.split_once(':') {
                Some((key, value)) => {
                    filter
                        .pairs
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
                None => {
                    let trimmed = fragment.trim();
                    if !trimmed.is_empty() {
                        filter.ignored.push(trimmed.to_string());
                    }
                }
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Human readable summary, e.g. `company~toyota, phone~780`.
    pub fn describe(&self) -> String {
        if self.pairs.is_empty() {
            return "all records".to_string();
        }
        self.pairs
            .iter()
            .map(|(key, value)| format!("{}~{}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let filter = PropertyFilter::parse("company: Toyota , phone:780");
        assert_eq!(
            filter.pairs,
            vec![
                ("company".to_string(), "Toyota".to_string()),
                ("phone".to_string(), "780".to_string())
            ]
        );
        assert!(filter.ignored.is_empty());
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let filter = PropertyFilter::parse("filepath:C:\\Users\\termi");
        assert_eq!(filter.pairs[0].1, "C:\\Users\\termi");
    }

    #[test]
    fn test_parse_reports_ignored_fragments() {
        let filter = PropertyFilter::parse("toyota, category:dealer,  ");
        assert_eq!(filter.pairs.len(), 1);
        assert_eq!(filter.ignored, vec!["toyota".to_string()]);
    }

    #[test]
    fn test_empty_filter() {
        let filter = PropertyFilter::parse("   ");
        assert!(filter.is_empty());
        assert_eq!(filter.describe(), "all records");
    }

    #[test]
    fn test_normalized_trims_inputs() {
        let criteria = QueryCriteria::new("  C:\\Dropbox\\ ", " company:x ");
        let normalized = criteria.normalized();
        assert_eq!(normalized.node_path, "C:\\Dropbox\\");
        assert_eq!(normalized.property_filter, "company:x");
    }
}
