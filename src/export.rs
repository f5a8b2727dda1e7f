use std::path::Path;

use crate::common::Observation;

/// Orders the merged table for export: country, then year, then indicator.
pub fn sort_observations(observations: &mut Vec<Observation>) {
    observations.sort_by(|a, b| {
        (&a.country, a.year, &a.indicator_name).cmp(&(&b.country, b.year, &b.indicator_name))
    });
}

pub fn write_csv(observations: &[Observation], path: &Path) -> Result<usize, String> {
    let mut writer = {
        match csv::Writer::from_path(path) {
            Ok(w) => { w },
            Err(e) => {
                return Err(format!("Failed to open output file {}: {}", path.display(), e));
            }
        }
    };

    for observation in observations {
        if let Err(e) = writer.serialize(observation) {
            return Err(format!("Failed to write record to {}: {}", path.display(), e));
        }
    }

    if let Err(e) = writer.flush() {
        return Err(format!("Failed to flush output file {}: {}", path.display(), e));
    }

    Ok(observations.len())
}

#[cfg(test)]
fn build_observation(country: &str, code: &str, year: i32, indicator: &str, value: f64) -> Observation {
    use crate::common::Source;

    Observation {
        country_code: code.to_owned(),
        country: country.to_owned(),
        region: "Latin America".to_owned(),
        year,
        indicator_name: indicator.to_owned(),
        indicator_code: "NGDP_RPCH".to_owned(),
        value,
        source: Source::IMF,
    }
}

#[test]
fn test_write_csv() {
    use std::fs;

    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join("economic_data_master_test.csv");

    let observations = vec![
        build_observation("Brazil", "BRA", 2020, "GDP Growth Rate (Annual %)", -4.06),
        build_observation("Mexico", "MEX", 2021, "GDP Growth Rate (Annual %)", 6.05),
    ];

    let rows = write_csv(&observations, &path).unwrap();
    assert_eq!(rows, 2);

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Country_Code,Country,Region,Year,Indicator_Name,Indicator_Code,Value,Source");
    assert_eq!(lines[1], "BRA,Brazil,Latin America,2020,GDP Growth Rate (Annual %),NGDP_RPCH,-4.06,IMF");
}

#[test]
fn test_sort_observations() {
    let mut observations = vec![
        build_observation("Mexico", "MEX", 2020, "Inflation Rate (CPI)", 3.4),
        build_observation("Brazil", "BRA", 2021, "GDP Growth Rate (Annual %)", 4.99),
        build_observation("Brazil", "BRA", 2020, "Inflation Rate (CPI)", 3.21),
        build_observation("Brazil", "BRA", 2020, "GDP Growth Rate (Annual %)", -4.06),
    ];

    sort_observations(&mut observations);

    assert_eq!(observations[0].country, "Brazil");
    assert_eq!(observations[0].year, 2020);
    assert_eq!(observations[0].indicator_name, "GDP Growth Rate (Annual %)");
    assert_eq!(observations[1].indicator_name, "Inflation Rate (CPI)");
    assert_eq!(observations[2].year, 2021);
    assert_eq!(observations[3].country, "Mexico");
}
