use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermsAggregation {
    pub name: String,
    pub buckets: Vec<Bucket>,
    pub sum_other_doc_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub doc_count: u64,
    pub sub_aggregations: Vec<TermsAggregation>,
}

const BUCKET_FIELDS: &[&str] = &["key", "key_as_string", "doc_count"];

impl TermsAggregation {
    /// Builds the terms aggregations found in an `aggregations` response
    /// object, recursing into each bucket. Other aggregation kinds (metrics,
    /// histograms, ...) are dropped.
    pub fn from_response(aggregations: &Value) -> Vec<TermsAggregation> {
        match aggregations.as_object() {
            Some(map) => from_map(map),
            None => Vec::new(),
        }
    }
}

fn from_map(map: &Map<String, Value>) -> Vec<TermsAggregation> {
    map.iter()
        .filter_map(|(name, aggregation)| terms(name, aggregation))
        .collect()
}

// A terms aggregation is the only bucket aggregation reporting sum_other_doc_count
fn terms(name: &str, aggregation: &Value) -> Option<TermsAggregation> {
    let sum_other_doc_count = aggregation.get("sum_other_doc_count")?.as_u64()?;
    let buckets = aggregation.get("buckets")?.as_array()?;

    Some(TermsAggregation {
        name: name.to_string(),
        buckets: buckets.iter().filter_map(bucket).collect(),
        sum_other_doc_count,
    })
}

fn bucket(value: &Value) -> Option<Bucket> {
    let map = value.as_object()?;
    let key = match map.get("key_as_string").or_else(|| map.get("key"))? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut sub = Map::new();
    for (name, agg) in map.iter().filter(|(k, _)| !BUCKET_FIELDS.contains(&k.as_str())) {
        sub.insert(name.clone(), agg.clone());
    }

    Some(Bucket {
        key,
        doc_count: map.get("doc_count").and_then(Value::as_u64).unwrap_or(0),
        sub_aggregations: from_map(&sub),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_terms_aggregations() {
        let response = json!({
            "country": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 4,
                "buckets": [
                    {
                        "key": "France",
                        "doc_count": 12,
                        "year": {
                            "doc_count_error_upper_bound": 0,
                            "sum_other_doc_count": 0,
                            "buckets": [{ "key": 2021, "doc_count": 12 }]
                        }
                    },
                    { "key": "Chile", "doc_count": 3 }
                ]
            },
            "avg_size": { "value": 3.2 },
            "by_date": { "buckets": [{ "key": 1, "doc_count": 1 }] }
        });

        let aggregations = TermsAggregation::from_response(&response);
        assert_eq!(aggregations.len(), 1);

        let country = &aggregations[0];
        assert_eq!(country.name, "country");
        assert_eq!(country.sum_other_doc_count, 4);
        assert_eq!(country.buckets.len(), 2);
        assert_eq!(country.buckets[0].key, "France");
        assert_eq!(country.buckets[0].doc_count, 12);
        assert!(country.buckets[1].sub_aggregations.is_empty());

        let year = &country.buckets[0].sub_aggregations[0];
        assert_eq!(year.name, "year");
        assert_eq!(year.buckets[0].key, "2021");
    }

    #[test]
    fn missing_aggregations_yield_nothing() {
        assert!(TermsAggregation::from_response(&Value::Null).is_empty());
        assert!(TermsAggregation::from_response(&json!({})).is_empty());
    }
}
