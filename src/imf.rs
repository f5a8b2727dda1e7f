use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::common;
use crate::common::{CountryConfig, IndicatorConfig, Observation, Source};

const DATAMAPPER_BASE_URL: &str = "https://www.imf.org/external/datamapper/api/v1";

#[derive(Deserialize, Debug)]
pub struct DataMapperResponse {
    // values[indicator][country][year label] = value
    pub values: Option<HashMap<String, HashMap<String, HashMap<String, Option<f64>>>>>
}

fn period_list() -> String {
    let years: Vec<String> = (common::START_YEAR..=common::END_YEAR).map(|year| year.to_string()).collect();
    years.join(",")
}

/// Flattens one DataMapper response into observation rows. An absent
/// indicator or country key means the series has no data, not an error.
pub fn collect_observations(parsed: &DataMapperResponse, indicator_code: &str, indicator: &IndicatorConfig, country_code: &str, country: &CountryConfig) -> Vec<Observation> {
    let mut observations = Vec::new();

    let series = parsed.values.as_ref()
        .and_then(|values| values.get(indicator_code))
        .and_then(|countries| countries.get(country_code));

    let series = match series {
        Some(s) => { s },
        None => { return observations; }
    };

    for (label, value) in series {
        let year = match common::capture_year(label) {
            Some(y) => { y },
            None => { continue; }
        };

        if let Some(value) = value {
            observations.push(Observation {
                country_code: country_code.to_owned(),
                country: country.name.to_owned(),
                region: country.region.to_owned(),
                year,
                indicator_name: indicator.name.to_owned(),
                indicator_code: indicator_code.to_owned(),
                value: *value,
                source: Source::IMF,
            });
        }
    }

    observations
}

pub fn process_indicator(indicator_code: &str, indicator: &IndicatorConfig, country_code: &str, country: &CountryConfig, http_connect_timeout: Arc<u64>, http_receive_timeout: Arc<u64>) -> Result<Vec<Observation>, String> {
    let target_url = format!(
        "{base_url}/{indicator}/{country}?periods={periods}",
        base_url=DATAMAPPER_BASE_URL,
        indicator=indicator_code,
        country=country_code,
        periods=period_list()
    );

    let response = common::request_with_retry(&target_url, http_connect_timeout, http_receive_timeout)?;

    let parsed = {
        let result = response.into_json_deserialize::<DataMapperResponse>();
        match result {
            Ok(j) => { j },
            Err(_) => {
                return Err(format!("Response from DataMapper server is not valid JSON, or the structure has changed significantly. Target url: {}", target_url));
            }
        }
    };

    Ok(collect_observations(&parsed, indicator_code, indicator, country_code, country))
}

#[test]
fn test_collect_observations() {
    let body = r#"{"values": {"NGDP_RPCH": {"BRA": {"2020": -4.06, "2021": 4.99}}}}"#;
    let parsed: DataMapperResponse = serde_json::from_str(body).unwrap();

    let indicator = IndicatorConfig {
        name: "GDP Growth Rate (Annual %)".to_owned(),
        description: "Real GDP growth rate, annual percentage change".to_owned()
    };
    let country = CountryConfig {
        name: "Brazil".to_owned(),
        region: "Latin America".to_owned()
    };

    let mut observations = collect_observations(&parsed, "NGDP_RPCH", &indicator, "BRA", &country);
    observations.sort_by_key(|observation| observation.year);

    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].country, "Brazil");
    assert_eq!(observations[0].country_code, "BRA");
    assert_eq!(observations[0].region, "Latin America");
    assert_eq!(observations[0].year, 2020);
    assert!((observations[0].value + 4.06).abs() < 1e-9);
    assert_eq!(observations[0].indicator_name, "GDP Growth Rate (Annual %)");
    assert_eq!(observations[0].indicator_code, "NGDP_RPCH");
    assert_eq!(observations[0].source, Source::IMF);
    assert_eq!(observations[1].year, 2021);
}

#[test]
fn test_out_of_period_years_skipped() {
    let body = r#"{"values": {"PCPIPCH": {"ARG": {"2017": 25.7, "2018": 34.3, "2025": 28.0}}}}"#;
    let parsed: DataMapperResponse = serde_json::from_str(body).unwrap();

    let indicator = IndicatorConfig {
        name: "Inflation Rate (CPI)".to_owned(),
        description: "Consumer Price Index, annual percentage change".to_owned()
    };
    let country = CountryConfig {
        name: "Argentina".to_owned(),
        region: "Latin America".to_owned()
    };

    let observations = collect_observations(&parsed, "PCPIPCH", &indicator, "ARG", &country);

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].year, 2018);
}

#[test]
fn test_null_values_skipped() {
    let body = r#"{"values": {"LUR": {"ETH": {"2019": null, "2020": 3.2}}}}"#;
    let parsed: DataMapperResponse = serde_json::from_str(body).unwrap();

    let indicator = IndicatorConfig {
        name: "Unemployment Rate".to_owned(),
        description: "Unemployment rate, percent".to_owned()
    };
    let country = CountryConfig {
        name: "Ethiopia".to_owned(),
        region: "Africa".to_owned()
    };

    let observations = collect_observations(&parsed, "LUR", &indicator, "ETH", &country);

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].year, 2020);
}

#[test]
fn test_absent_country_yields_no_rows() {
    let body = r#"{"values": {"NGDP_RPCH": {"MEX": {"2020": -8.35}}}}"#;
    let parsed: DataMapperResponse = serde_json::from_str(body).unwrap();

    let indicator = IndicatorConfig {
        name: "GDP Growth Rate (Annual %)".to_owned(),
        description: "Real GDP growth rate, annual percentage change".to_owned()
    };
    let country = CountryConfig {
        name: "Brazil".to_owned(),
        region: "Latin America".to_owned()
    };

    assert!(collect_observations(&parsed, "NGDP_RPCH", &indicator, "BRA", &country).is_empty());
}

#[test]
fn test_missing_values_key_yields_no_rows() {
    let parsed: DataMapperResponse = serde_json::from_str("{}").unwrap();

    let indicator = IndicatorConfig {
        name: "GDP Growth Rate (Annual %)".to_owned(),
        description: "Real GDP growth rate, annual percentage change".to_owned()
    };
    let country = CountryConfig {
        name: "Brazil".to_owned(),
        region: "Latin America".to_owned()
    };

    assert!(collect_observations(&parsed, "NGDP_RPCH", &indicator, "BRA", &country).is_empty());
}
