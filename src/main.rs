use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[macro_use]
extern crate lazy_static;
extern crate toml;
extern crate serde;
extern crate ureq;

use clap::{Arg, App};
use chrono::Local;

mod common;
use common::{CountryConfig, IndicatorConfig, Observation, Source};

mod export;
mod imf;
mod worldbank;

// courtesy pause between indicators, both APIs are rate limited
const RATE_LIMIT_PAUSE_MS: u64 = 1000;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    const DEFAULT_OUTPUT_DIR: &str = "data";
    const HTTP_CONNECT_TIMEOUT: &str = "30000";
    const HTTP_RECEIVE_TIMEOUT: &str = "30000";

    App::new("economic-data-acquisition")
    .author("Matthew Scheffel <matt@dataheck.com>")
    .about("Fetches economic indicators from the IMF and World Bank into PowerBI-ready CSV files")
    .arg(
        Arg::with_name("countries-config")
            .takes_value(true)
            .help("Location of the country list configuration")
            .default_value("config/countries.toml")
    )
    .arg(
        Arg::with_name("imf-config")
            .takes_value(true)
            .help("Location of the IMF indicator configuration")
            .default_value("config/imf.toml")
    )
    .arg(
        Arg::with_name("worldbank-config")
            .takes_value(true)
            .help("Location of the World Bank indicator configuration")
            .default_value("config/worldbank.toml")
    )
    .arg(
        Arg::with_name("output-dir")
            .short("o")
            .long("output-dir")
            .takes_value(true)
            .default_value(DEFAULT_OUTPUT_DIR)
            .help("Directory that timestamped CSV exports are written into")
    )
    .arg(
        Arg::with_name("indicator")
            .short("s")
            .long("indicator")
            .takes_value(true)
            .help("A specific indicator code to fetch")
    )
    .arg(
        Arg::with_name("http-connect-timeout")
            .long("http-connect-timeout")
            .takes_value(true)
            .default_value(HTTP_CONNECT_TIMEOUT)
            .help("HTTP connection timeout in milliseconds")
    )
    .arg(
        Arg::with_name("http-receive-timeout")
            .long("http-receive-timeout")
            .takes_value(true)
            .default_value(HTTP_RECEIVE_TIMEOUT)
            .help("HTTP receive timeout in milliseconds")
    )
}

fn main() {
    let matches = command_usage().get_matches();

    let countries: HashMap<String, CountryConfig> = toml::from_str(&fs::read_to_string(matches.value_of("countries-config").unwrap())
        .expect("Failed to read country config from filesystem"))
        .expect("Failed to parse country config TOML");

    let mut imf_config: HashMap<String, IndicatorConfig> = toml::from_str(&fs::read_to_string(matches.value_of("imf-config").unwrap())
        .expect("Failed to read IMF indicator config from filesystem"))
        .expect("Failed to parse IMF indicator config TOML");

    let mut worldbank_config: HashMap<String, IndicatorConfig> = toml::from_str(&fs::read_to_string(matches.value_of("worldbank-config").unwrap())
        .expect("Failed to read World Bank indicator config from filesystem"))
        .expect("Failed to parse World Bank indicator config TOML");

    if matches.is_present("indicator") {
        let code = matches.value_of("indicator").unwrap();

        if !imf_config.contains_key(code) && !worldbank_config.contains_key(code) {
            eprintln!("Indicator {} is not known to our configuration.", code);
            process::exit(1);
        }

        imf_config.retain(|key, _| key == code);
        worldbank_config.retain(|key, _| key == code);
    }

    let http_connect_timeout = Arc::new(matches.value_of("http-connect-timeout").unwrap().parse::<u64>().expect(&format!("Invalid http connect timeout specified: {}", matches.value_of("http-connect-timeout").unwrap())));
    let http_receive_timeout = Arc::new(matches.value_of("http-receive-timeout").unwrap().parse::<u64>().expect(&format!("Invalid http receive timeout specified: {}", matches.value_of("http-receive-timeout").unwrap())));

    let output_dir = Path::new(matches.value_of("output-dir").unwrap());

    // sorted iteration keeps request order, and therefore output row sets,
    // stable between runs
    let mut country_codes: Vec<&String> = countries.keys().collect();
    country_codes.sort();

    println!("Countries: {}", countries.len());
    println!("Time period: {}-{}", common::START_YEAR, common::END_YEAR);
    println!("IMF indicators: {}", imf_config.len());
    println!("World Bank indicators: {}", worldbank_config.len());

    let mut observations: Vec<Observation> = Vec::new();

    let mut imf_codes: Vec<&String> = imf_config.keys().collect();
    imf_codes.sort();

    println!("Fetching data from the IMF DataMapper API.");
    for indicator_code in imf_codes {
        let indicator = &imf_config[indicator_code];
        println!("Fetching {}.", indicator.name);

        for &country_code in &country_codes {
            let http_connect_timeout = http_connect_timeout.clone();
            let http_receive_timeout = http_receive_timeout.clone();

            let result = imf::process_indicator(indicator_code, indicator, country_code, &countries[country_code], http_connect_timeout, http_receive_timeout);

            match result {
                Ok(rows) => {
                    observations.extend(rows);
                },
                Err(e) => {
                    eprintln!("Failed to process DataMapper response for {}/{}: {}", indicator_code, country_code, e);
                }
            }
        }

        thread::sleep(Duration::from_millis(RATE_LIMIT_PAUSE_MS));
    }

    let mut worldbank_codes: Vec<&String> = worldbank_config.keys().collect();
    worldbank_codes.sort();

    println!("Fetching data from the World Bank API.");
    for indicator_code in worldbank_codes {
        let indicator = &worldbank_config[indicator_code];
        println!("Fetching {}.", indicator.name);

        for &country_code in &country_codes {
            let http_connect_timeout = http_connect_timeout.clone();
            let http_receive_timeout = http_receive_timeout.clone();

            let result = worldbank::process_indicator(indicator_code, indicator, country_code, &countries[country_code], http_connect_timeout, http_receive_timeout);

            match result {
                Ok(rows) => {
                    observations.extend(rows);
                },
                Err(e) => {
                    eprintln!("Failed to process World Bank response for {}/{}: {}", indicator_code, country_code, e);
                }
            }
        }

        thread::sleep(Duration::from_millis(RATE_LIMIT_PAUSE_MS));
    }

    if observations.is_empty() {
        println!("No data retrieved. Check API connectivity and the configured country codes.");
        return;
    }

    println!("Total records retrieved: {}", observations.len());

    export::sort_observations(&mut observations);

    if let Err(e) = fs::create_dir_all(output_dir) {
        eprintln!("Failed to create output directory {}: {}", output_dir.display(), e);
        process::exit(1);
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

    let master_path = output_dir.join(format!("economic_data_master_{}.csv", timestamp));
    match export::write_csv(&observations, &master_path) {
        Ok(rows) => {
            println!("Exported: {} ({} rows)", master_path.display(), rows);
        },
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }

    let imf_observations: Vec<Observation> = observations.iter().filter(|observation| observation.source == Source::IMF).cloned().collect();
    let worldbank_observations: Vec<Observation> = observations.iter().filter(|observation| observation.source == Source::WorldBank).cloned().collect();

    if !imf_observations.is_empty() {
        let path = output_dir.join(format!("imf_data_{}.csv", timestamp));
        match export::write_csv(&imf_observations, &path) {
            Ok(rows) => {
                println!("Exported: {} ({} rows)", path.display(), rows);
            },
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }

    if !worldbank_observations.is_empty() {
        let path = output_dir.join(format!("world_bank_data_{}.csv", timestamp));
        match export::write_csv(&worldbank_observations, &path) {
            Ok(rows) => {
                println!("Exported: {} ({} rows)", path.display(), rows);
            },
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }

    let distinct_countries: HashSet<&String> = observations.iter().map(|observation| &observation.country).collect();
    let distinct_indicators: HashSet<&String> = observations.iter().map(|observation| &observation.indicator_name).collect();
    let minimum_year = observations.iter().map(|observation| observation.year).min().unwrap();
    let maximum_year = observations.iter().map(|observation| observation.year).max().unwrap();

    println!("Total countries: {}", distinct_countries.len());
    println!("Total indicators: {}", distinct_indicators.len());
    println!("Year range: {} - {}", minimum_year, maximum_year);
    println!("Total data points: {}", observations.len());
    println!("Data extraction complete.");
}
