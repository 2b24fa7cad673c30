//! Label frequency ranking for donut charts and spoken summaries.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub value: u64,
}

/// Count occurrences of each label, most frequent first.
///
/// Labels with equal counts keep the order in which they were first seen.
pub fn count_labels<'a, I>(labels: I) -> Vec<LabelCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<LabelCount> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].value += 1,
            None => {
                index.insert(label, counts.len());
                counts.push(LabelCount {
                    label: label.to_string(),
                    value: 1,
                });
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.value.cmp(&a.value));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(label: &str, value: u64) -> LabelCount {
        LabelCount {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn test_ranked_descending() {
        let labels = ["car", "person", "car", "dog", "person", "car"];
        let counts = count_labels(labels);

        assert_eq!(counts, vec![pair("car", 3), pair("person", 2), pair("dog", 1)]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let labels = ["dog", "cat", "bird", "cat", "dog", "bird"];
        let counts = count_labels(labels);

        assert_eq!(counts, vec![pair("dog", 2), pair("cat", 2), pair("bird", 2)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(count_labels(Vec::<&str>::new()).is_empty());
    }

    #[test]
    fn test_donut_shape() {
        let json = serde_json::to_value(count_labels(["person"])).unwrap();
        assert_eq!(json, serde_json::json!([{"label": "person", "value": 1}]));
    }
}
