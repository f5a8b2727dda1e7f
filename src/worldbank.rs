// https://datahelpdesk.worldbank.org/knowledgebase/articles/889392-about-the-indicators-api-documentation

use std::sync::Arc;

use serde::Deserialize;

use crate::common;
use crate::common::{CountryConfig, IndicatorConfig, Observation, Source};

const API_ROOT: &str = "https://api.worldbank.org/v2";

const PER_PAGE: u32 = 500;

#[derive(Deserialize, Debug)]
pub struct WorldBankPage {
    pub page: Option<u32>,
    pub pages: Option<u32>,
    pub total: Option<u32>
}

#[derive(Deserialize, Debug)]
pub struct WorldBankRecord {
    #[serde(rename(deserialize = "countryiso3code"))]
    pub country_code: String,
    pub date: String,
    pub value: Option<f64>
}

// The World Bank API wraps its records in a two-element array: page
// metadata first, then the records (null when the query matched nothing).
// Error responses collapse to a single-element array and fail to decode.
pub type WorldBankResponse = (WorldBankPage, Option<Vec<WorldBankRecord>>);

/// Flattens one World Bank response into observation rows. Records for other
/// countries, non-annual dates, and null values contribute nothing.
pub fn collect_observations(records: &[WorldBankRecord], indicator_code: &str, indicator: &IndicatorConfig, country_code: &str, country: &CountryConfig) -> Vec<Observation> {
    let mut observations = Vec::new();

    for record in records {
        if record.country_code != country_code {
            continue;
        }

        let year = match common::capture_year(&record.date) {
            Some(y) => { y },
            None => { continue; }
        };

        if let Some(value) = record.value {
            observations.push(Observation {
                country_code: country_code.to_owned(),
                country: country.name.to_owned(),
                region: country.region.to_owned(),
                year,
                indicator_name: indicator.name.to_owned(),
                indicator_code: indicator_code.to_owned(),
                value,
                source: Source::WorldBank,
            });
        }
    }

    observations
}

pub fn process_indicator(indicator_code: &str, indicator: &IndicatorConfig, country_code: &str, country: &CountryConfig, http_connect_timeout: Arc<u64>, http_receive_timeout: Arc<u64>) -> Result<Vec<Observation>, String> {
    let target_url = format!(
        "{api_root}/country/{country}/indicator/{indicator}?format=json&date={start}:{end}&per_page={per_page}",
        api_root=API_ROOT,
        country=country_code,
        indicator=indicator_code,
        start=common::START_YEAR,
        end=common::END_YEAR,
        per_page=PER_PAGE
    );

    let response = common::request_with_retry(&target_url, http_connect_timeout, http_receive_timeout)?;

    let (page, records) = {
        let result = response.into_json_deserialize::<WorldBankResponse>();
        match result {
            Ok(j) => { j },
            Err(_) => {
                return Err(format!("Response from World Bank server is not valid JSON, or the structure has changed significantly. Target url: {}", target_url));
            }
        }
    };

    if let Some(pages) = page.pages {
        if pages > 1 {
            println!("Warning: World Bank response for {}/{} is paginated, there may be additional data available.", indicator_code, country_code);
        }
    }

    let records = match records {
        Some(r) => { r },
        None => { return Ok(Vec::new()); }
    };

    Ok(collect_observations(&records, indicator_code, indicator, country_code, country))
}

#[test]
fn test_collect_observations() {
    let body = r#"[
        {"page": 1, "pages": 1, "per_page": 500, "total": 4},
        [
            {"indicator": {"id": "SP.POP.TOTL", "value": "Population, total"}, "countryiso3code": "IND", "date": "2020", "value": 1396387127, "unit": "", "obs_status": "", "decimal": 0},
            {"indicator": {"id": "SP.POP.TOTL", "value": "Population, total"}, "countryiso3code": "IND", "date": "2019", "value": null, "unit": "", "obs_status": "", "decimal": 0},
            {"indicator": {"id": "SP.POP.TOTL", "value": "Population, total"}, "countryiso3code": "USA", "date": "2020", "value": 331501080, "unit": "", "obs_status": "", "decimal": 0},
            {"indicator": {"id": "SP.POP.TOTL", "value": "Population, total"}, "countryiso3code": "IND", "date": "2017", "value": 1354195680, "unit": "", "obs_status": "", "decimal": 0}
        ]
    ]"#;
    let (page, records): WorldBankResponse = serde_json::from_str(body).unwrap();
    let records = records.unwrap();

    assert_eq!(page.total, Some(4));
    assert_eq!(records.len(), 4);

    let indicator = IndicatorConfig {
        name: "Population".to_owned(),
        description: "Population, total".to_owned()
    };
    let country = CountryConfig {
        name: "India".to_owned(),
        region: "Asia".to_owned()
    };

    let observations = collect_observations(&records, "SP.POP.TOTL", &indicator, "IND", &country);

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].country, "India");
    assert_eq!(observations[0].country_code, "IND");
    assert_eq!(observations[0].year, 2020);
    assert!((observations[0].value - 1396387127.0).abs() < 1e-3);
    assert_eq!(observations[0].indicator_code, "SP.POP.TOTL");
    assert_eq!(observations[0].source, Source::WorldBank);
}

#[test]
fn test_empty_result_set() {
    let body = r#"[{"page": 1, "pages": 0, "per_page": 500, "total": 0}, null]"#;
    let (page, records): WorldBankResponse = serde_json::from_str(body).unwrap();

    assert_eq!(page.total, Some(0));
    assert!(records.is_none());
}

#[test]
fn test_error_body_fails_to_decode() {
    // invalid indicator codes produce a one-element array carrying a message
    let body = r#"[{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]"#;

    assert!(serde_json::from_str::<WorldBankResponse>(body).is_err());
}

#[test]
fn test_non_annual_dates_skipped() {
    let body = r#"[
        {"page": 1, "pages": 1, "per_page": 500, "total": 2},
        [
            {"countryiso3code": "THA", "date": "2020Q1", "value": 3.1},
            {"countryiso3code": "THA", "date": "2020", "value": 7189.04}
        ]
    ]"#;
    let (_, records): WorldBankResponse = serde_json::from_str(body).unwrap();
    let records = records.unwrap();

    let indicator = IndicatorConfig {
        name: "GNI per Capita".to_owned(),
        description: "GNI per capita, Atlas method (current US$)".to_owned()
    };
    let country = CountryConfig {
        name: "Thailand".to_owned(),
        region: "Asia".to_owned()
    };

    let observations = collect_observations(&records, "NY.GNP.PCAP.CD", &indicator, "THA", &country);

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].year, 2020);
}
