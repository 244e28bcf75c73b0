//! Aggregation templates stored in the cluster and run by id.

use crate::error::AppError;
use crate::search::SearchBackend;
use serde_json::Value;

pub const COUNTRY_YEAR_MONTH: &str = "country_year_month";
pub const YEAR_COUNTRY_MONTH: &str = "year_country_month";
pub const YEAR_MONTH: &str = "year_month";

pub const SEARCH_TEMPLATES: &[(&str, &str)] = &[
    (
        COUNTRY_YEAR_MONTH,
        include_str!("../../resources/search_templates/country_year_month.json"),
    ),
    (
        YEAR_COUNTRY_MONTH,
        include_str!("../../resources/search_templates/year_country_month.json"),
    ),
    (
        YEAR_MONTH,
        include_str!("../../resources/search_templates/year_month.json"),
    ),
];

/// Stores every bundled template, replacing earlier versions.
pub async fn load_all(backend: &dyn SearchBackend) -> Result<(), AppError> {
    for (id, source) in SEARCH_TEMPLATES {
        let source: Value = serde_json::from_str(source)?;
        backend.put_search_template(id, &source).await?;
        log::info!("Search template '{}' loaded", id);
    }
    Ok(())
}
