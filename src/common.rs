use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

pub const START_YEAR: i32 = 2018;
pub const END_YEAR: i32 = 2024;

pub const HTTP_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    IMF,
    WorldBank,
}

impl Serialize for Source {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer {
            match self {
                Source::IMF => { serializer.serialize_str("IMF") },
                Source::WorldBank => { serializer.serialize_str("World Bank") },
            }
        }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Source::IMF => { write!(f, "IMF") },
            Source::WorldBank => { write!(f, "World Bank") },
        }
    }
}

/// One (country, indicator, year) data point. Rows with no reported value
/// are never constructed; `value` is always a real number.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    #[serde(rename(serialize = "Country_Code"))]
    pub country_code: String,
    #[serde(rename(serialize = "Country"))]
    pub country: String,
    #[serde(rename(serialize = "Region"))]
    pub region: String,
    #[serde(rename(serialize = "Year"))]
    pub year: i32,
    #[serde(rename(serialize = "Indicator_Name"))]
    pub indicator_name: String,
    #[serde(rename(serialize = "Indicator_Code"))]
    pub indicator_code: String,
    #[serde(rename(serialize = "Value"))]
    pub value: f64,
    #[serde(rename(serialize = "Source"))]
    pub source: Source,
}

#[derive(Deserialize, Debug)]
pub struct CountryConfig {
    pub name: String,
    pub region: String
}

#[derive(Deserialize, Debug)]
pub struct IndicatorConfig {
    pub name: String,
    pub description: String
}

/// Accepts only plain four-digit year labels within the extraction period.
/// Quarterly and monthly labels ("2020Q1", "2020M01") are rejected.
pub fn capture_year(label: &str) -> Option<i32> {
    lazy_static! {
        static ref RE_YEAR_CAPTURE: Regex = Regex::new(r"^(?P<year>\d{4})$").unwrap();
    }

    match RE_YEAR_CAPTURE.captures(label) {
        Some(x) => {
            let year = x.name("year").unwrap().as_str().parse::<i32>().unwrap();
            if year >= START_YEAR && year <= END_YEAR {
                Some(year)
            } else {
                None
            }
        },
        None => { None }
    }
}

pub fn request_with_retry(target_url: &str, http_connect_timeout: Arc<u64>, http_receive_timeout: Arc<u64>) -> Result<ureq::Response, String> {
    let mut last_error = String::new();

    for attempt in 0..HTTP_ATTEMPTS {
        if attempt > 0 {
            thread::sleep(Duration::from_secs(1 << (attempt - 1)));
        }

        let response = ureq::get(target_url).timeout_connect(*http_connect_timeout).timeout_read(*http_receive_timeout).call();

        if let Some(error) = response.synthetic_error() {
            last_error = format!("Failed to retrieve data from URL {}. Error: {}", target_url, error);
            eprintln!("Request failed (attempt {}/{}): {}", attempt + 1, HTTP_ATTEMPTS, last_error);
            continue;
        }

        if !response.ok() {
            last_error = format!("Server returned HTTP status {} for URL {}", response.status(), target_url);
            eprintln!("Request failed (attempt {}/{}): {}", attempt + 1, HTTP_ATTEMPTS, last_error);
            continue;
        }

        return Ok(response);
    }

    Err(last_error)
}

#[test]
fn test_capture_year() {
    assert_eq!(capture_year("2020"), Some(2020));
    assert_eq!(capture_year("2018"), Some(START_YEAR));
    assert_eq!(capture_year("2024"), Some(END_YEAR));
    assert_eq!(capture_year("2017"), None);
    assert_eq!(capture_year("2025"), None);
    assert_eq!(capture_year("2020Q1"), None);
    assert_eq!(capture_year("2020M01"), None);
    assert_eq!(capture_year(""), None);
}

#[test]
fn test_source_display() {
    assert_eq!(format!("{}", Source::IMF), "IMF");
    assert_eq!(format!("{}", Source::WorldBank), "World Bank");
}
