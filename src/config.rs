use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::{Path, PathBuf};

use crate::classify::ThresholdRegime;
use crate::time_utils::parse_yyyymmdd;

/// WRF simulation scenario the per-day files belong to.
///
/// The directory layout keys on the full scenario name while the file
/// names carry it without the trailing `3D` (`CTRL3D` -> `CTRL`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Current-climate control run
    Ctrl3d,
    /// Pseudo-global-warming run
    Pgw3d,
}

impl Scenario {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "CTRL3D" => Ok(Self::Ctrl3d),
            "PGW3D" => Ok(Self::Pgw3d),
            other => Err(format!(
                "invalid scenario '{}': expected CTRL3D or PGW3D",
                other
            )),
        }
    }

    /// Directory name under the data roots.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Ctrl3d => "CTRL3D",
            Self::Pgw3d => "PGW3D",
        }
    }

    /// Tag embedded in the per-day file names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            Self::Ctrl3d => "CTRL",
            Self::Pgw3d => "PGW",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Run configuration, passed explicitly into the drivers.
#[derive(Clone, Debug)]
pub struct Config {
    /// Simulation scenario selecting the input file tree
    pub scenario: Scenario,
    /// First calendar day to process (inclusive)
    pub start_date: NaiveDate,
    /// Last calendar day to process (inclusive)
    pub end_date: NaiveDate,
    /// Root of the derived-reflectivity file tree
    pub dbz_root: PathBuf,
    /// Root of the geopotential-height file tree
    pub z_root: PathBuf,
    /// Model (sigma) level index used for the C/S separation
    pub cs_level: usize,
    /// Horizontal grid spacing (km)
    pub grid_spacing_km: f64,
    /// Threshold regimes to classify storm modes under
    pub regimes: Vec<ThresholdRegime>,
    /// Worker threads for across-days parallelism (1 = sequential)
    pub num_threads: usize,
    /// Stop the whole range at the first failing day
    pub halt_on_error: bool,
    /// Append wall-clock accounting here after a run
    pub runtime_log: Option<PathBuf>,
    /// Per-timestep progress output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2013, 9, 13).expect("valid date");
        Self {
            scenario: Scenario::Ctrl3d,
            start_date: start,
            end_date: start,
            dbz_root: PathBuf::from("./data/dbz"),
            z_root: PathBuf::from("./data/Z"),
            cs_level: 12,
            grid_spacing_km: 4.0,
            regimes: vec![ThresholdRegime::Moderate, ThresholdRegime::Strong],
            num_threads: 1,
            halt_on_error: false,
            runtime_log: Some(PathBuf::from("./run_time.log")),
            verbose: false,
        }
    }
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Result<Self, String> {
        let app = Self::build_cli();
        let matches = app.try_get_matches().map_err(|e| e.to_string())?;

        let scenario = Scenario::parse(matches.get_one::<String>("scenario").unwrap())?;
        let start_date = parse_yyyymmdd(matches.get_one::<String>("start-date").unwrap())?;
        let end_date = parse_yyyymmdd(matches.get_one::<String>("end-date").unwrap())?;

        let regimes = match matches.get_one::<String>("regime").unwrap().as_str() {
            "both" => vec![ThresholdRegime::Moderate, ThresholdRegime::Strong],
            "moderate" => vec![ThresholdRegime::Moderate],
            "strong" => vec![ThresholdRegime::Strong],
            _ => return Err("invalid regime".to_string()),
        };

        let config = Self {
            scenario,
            start_date,
            end_date,
            dbz_root: PathBuf::from(matches.get_one::<String>("dbz-root").unwrap()),
            z_root: PathBuf::from(matches.get_one::<String>("z-root").unwrap()),
            cs_level: *matches.get_one::<usize>("cs-level").unwrap(),
            grid_spacing_km: *matches.get_one::<f64>("grid-spacing").unwrap(),
            regimes,
            num_threads: *matches.get_one::<usize>("threads").unwrap(),
            halt_on_error: matches.get_flag("halt-on-error"),
            runtime_log: Some(PathBuf::from(matches.get_one::<String>("runtime-log").unwrap())),
            verbose: matches.get_flag("verbose"),
        };

        config.validate()?;
        Ok(config)
    }

    fn build_cli() -> Command {
        Command::new("wrf_dbz_class")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Convective/stratiform and storm-mode classification for WRF-derived reflectivity")
            .arg(
                Arg::new("scenario")
                    .value_name("SCENARIO")
                    .help("WRF simulation scenario")
                    .value_parser(["CTRL3D", "PGW3D"])
                    .required(true),
            )
            .arg(
                Arg::new("start-date")
                    .value_name("YYYYMMDD")
                    .help("First day of the inclusive date range")
                    .required(true),
            )
            .arg(
                Arg::new("end-date")
                    .value_name("YYYYMMDD")
                    .help("Last day of the inclusive date range")
                    .required(true),
            )
            .arg(
                Arg::new("dbz-root")
                    .long("dbz-root")
                    .value_name("DIR")
                    .help("Root directory of the derived dBZ file tree")
                    .default_value("./data/dbz"),
            )
            .arg(
                Arg::new("z-root")
                    .long("z-root")
                    .value_name("DIR")
                    .help("Root directory of the geopotential height file tree")
                    .default_value("./data/Z"),
            )
            .arg(
                Arg::new("cs-level")
                    .long("cs-level")
                    .value_name("INDEX")
                    .help("Model level index used for the C/S separation")
                    .default_value("12")
                    .value_parser(value_parser!(usize)),
            )
            .arg(
                Arg::new("grid-spacing")
                    .long("grid-spacing")
                    .value_name("KM")
                    .help("Horizontal grid spacing in km")
                    .default_value("4.0")
                    .value_parser(value_parser!(f64)),
            )
            .arg(
                Arg::new("regime")
                    .long("regime")
                    .value_name("REGIME")
                    .help("Storm-mode threshold regime(s) to run")
                    .value_parser(["both", "moderate", "strong"])
                    .default_value("both"),
            )
            .arg(
                Arg::new("threads")
                    .short('j')
                    .long("threads")
                    .value_name("COUNT")
                    .help("Worker threads for across-days parallelism")
                    .default_value("1")
                    .value_parser(value_parser!(usize)),
            )
            .arg(
                Arg::new("halt-on-error")
                    .long("halt-on-error")
                    .help("Stop the whole range at the first failing day (requires --threads 1)")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("runtime-log")
                    .long("runtime-log")
                    .value_name("FILE")
                    .help("File the run-time accounting is appended to")
                    .default_value("./run_time.log"),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Per-timestep progress output")
                    .action(ArgAction::SetTrue),
            )
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.start_date > self.end_date {
            return Err(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            ));
        }
        if self.grid_spacing_km <= 0.0 {
            return Err("grid spacing must be positive".to_string());
        }
        if self.regimes.is_empty() {
            return Err("at least one threshold regime is required".to_string());
        }
        if self.num_threads == 0 {
            return Err("thread count must be at least 1".to_string());
        }
        // Fail-fast ordering is only meaningful when days run one at a
        // time; a parallel run would race past the first failure.
        if self.halt_on_error && self.num_threads > 1 {
            return Err("--halt-on-error requires sequential execution (--threads 1)".to_string());
        }
        Ok(())
    }

    /// Per-day derived-reflectivity file:
    /// `{dbz_root}/{SCENARIO}/{YYYY}/wrf3d_d01_{TAG}_dbz_{YYYYMMDD}.nc`
    pub fn dbz_path(&self, date: NaiveDate) -> PathBuf {
        self.day_path(&self.dbz_root, "dbz", date)
    }

    /// Per-day geopotential-height file:
    /// `{z_root}/{SCENARIO}/{YYYY}/wrf3d_d01_{TAG}_Z_{YYYYMMDD}.nc`
    pub fn z_path(&self, date: NaiveDate) -> PathBuf {
        self.day_path(&self.z_root, "Z", date)
    }

    fn day_path(&self, root: &Path, var_tag: &str, date: NaiveDate) -> PathBuf {
        root.join(self.scenario.dir_name())
            .join(date.format("%Y").to_string())
            .join(format!(
                "wrf3d_d01_{}_{}_{}.nc",
                self.scenario.file_tag(),
                var_tag,
                date.format("%Y%m%d")
            ))
    }
}
