//! Controller configuration.
//!
//! Every option is available both as a command-line flag and as a
//! `TARNFUI_*` environment variable. Raw values are validated into an
//! immutable [`ControllerConfig`] before any cluster access happens; any
//! violation is a [`ControllerError::InvalidConfig`] and the process refuses
//! to start.

use crate::error::ControllerError;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use clap::Parser;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;
use workload_client::WorkloadKind;

/// Default list page size used when walking workloads.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Command-line and environment options.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tarnfui",
    version,
    about = "Scales Kubernetes workloads to zero outside active hours and restores them afterwards"
)]
pub struct ControllerArgs {
    /// Start of the active window (HH:MM, local to --timezone)
    #[arg(long, env = "TARNFUI_STARTUP_TIME", default_value = "07:00")]
    pub startup_time: String,

    /// End of the active window, exclusive (HH:MM, local to --timezone)
    #[arg(long, env = "TARNFUI_SHUTDOWN_TIME", default_value = "19:00")]
    pub shutdown_time: String,

    /// Comma-separated active days (mon..sun, or 0-6 with 0 = Monday)
    #[arg(long, env = "TARNFUI_ACTIVE_DAYS", default_value = "mon,tue,wed,thu,fri")]
    pub active_days: String,

    /// IANA timezone all comparisons are made in
    #[arg(long, env = "TARNFUI_TIMEZONE", default_value = "UTC")]
    pub timezone: String,

    /// Seconds to sleep between reconciliation passes
    #[arg(long = "interval", env = "TARNFUI_RECONCILIATION_INTERVAL", default_value_t = 60)]
    pub reconciliation_interval: u64,

    /// Restrict the controller to one namespace (default: cluster-wide)
    #[arg(long, env = "TARNFUI_NAMESPACE")]
    pub namespace: Option<String>,

    /// Comma-separated workload kinds to manage
    #[arg(long, env = "TARNFUI_RESOURCE_TYPES", default_value = "deployments,statefulsets")]
    pub resource_types: String,

    /// Run one reconciliation pass and exit
    #[arg(long, env = "TARNFUI_RECONCILE_ONCE")]
    pub reconcile_once: bool,

    /// Workloads fetched per list call
    #[arg(long, env = "TARNFUI_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Workloads of one kind processed concurrently within a pass
    #[arg(long, env = "TARNFUI_PASS_CONCURRENCY", default_value_t = 1)]
    pub pass_concurrency: usize,

    /// Listen address for /metrics, /healthz and /readyz (empty disables)
    #[arg(long, env = "TARNFUI_METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: String,

    /// Instance name reported on events (defaults to the pod hostname)
    #[arg(long, env = "TARNFUI_REPORTING_INSTANCE")]
    pub reporting_instance: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, env = "TARNFUI_VERBOSE")]
    pub verbose: bool,
}

impl ControllerArgs {
    /// Default log filter when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// When and where workloads should be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub startup_time: NaiveTime,
    pub shutdown_time: NaiveTime,
    /// Sorted Monday first, no duplicates
    pub active_days: Vec<Weekday>,
    pub timezone: Tz,
    pub reconciliation_interval: Duration,
    pub namespace: Option<String>,
    /// Canonical kind order, no duplicates
    pub enabled_kinds: Vec<WorkloadKind>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            startup_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            shutdown_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            active_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            timezone: Tz::UTC,
            reconciliation_interval: Duration::from_secs(60),
            namespace: None,
            enabled_kinds: WorkloadKind::ALL.to_vec(),
        }
    }
}

impl ScheduleConfig {
    /// Checks the cross-field invariants.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.active_days.is_empty() {
            return Err(ControllerError::InvalidConfig("active days must not be empty".to_string()));
        }
        if self.startup_time == self.shutdown_time {
            return Err(ControllerError::InvalidConfig(format!(
                "startup time and shutdown time must differ (both {})",
                self.startup_time.format("%H:%M")
            )));
        }
        if self.reconciliation_interval.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "reconciliation interval must be greater than zero".to_string(),
            ));
        }
        if self.enabled_kinds.is_empty() {
            return Err(ControllerError::InvalidConfig("at least one resource type must be enabled".to_string()));
        }
        if matches!(self.namespace.as_deref(), Some("")) {
            return Err(ControllerError::InvalidConfig("namespace must not be empty when set".to_string()));
        }
        Ok(())
    }
}

/// Fully validated process configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub schedule: ScheduleConfig,
    pub page_size: u32,
    pub pass_concurrency: usize,
    pub reconcile_once: bool,
    pub metrics_addr: Option<SocketAddr>,
    pub reporting_instance: Option<String>,
}

impl TryFrom<ControllerArgs> for ControllerConfig {
    type Error = ControllerError;

    fn try_from(args: ControllerArgs) -> Result<Self, Self::Error> {
        let schedule = ScheduleConfig {
            startup_time: parse_time(&args.startup_time)?,
            shutdown_time: parse_time(&args.shutdown_time)?,
            active_days: parse_active_days(&args.active_days)?,
            timezone: parse_timezone(&args.timezone)?,
            reconciliation_interval: Duration::from_secs(args.reconciliation_interval),
            namespace: args.namespace.map(|ns| ns.trim().to_string()).filter(|ns| !ns.is_empty()),
            enabled_kinds: parse_kinds(&args.resource_types)?,
        };
        schedule.validate()?;

        if args.page_size == 0 {
            return Err(ControllerError::InvalidConfig("page size must be greater than zero".to_string()));
        }
        if args.pass_concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "pass concurrency must be greater than zero".to_string(),
            ));
        }

        let metrics_addr = match args.metrics_addr.trim() {
            "" => None,
            addr => Some(addr.parse::<SocketAddr>().map_err(|e| {
                ControllerError::InvalidConfig(format!("invalid metrics address '{}': {}", addr, e))
            })?),
        };

        let reporting_instance = args
            .reporting_instance
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|s| !s.is_empty());

        Ok(Self {
            schedule,
            page_size: args.page_size,
            pass_concurrency: args.pass_concurrency,
            reconcile_once: args.reconcile_once,
            metrics_addr,
            reporting_instance,
        })
    }
}

/// Parses a strict `HH:MM` time of day.
pub fn parse_time(value: &str) -> Result<NaiveTime, ControllerError> {
    let invalid = || ControllerError::InvalidConfig(format!("time must be in format HH:MM (00:00-23:59), got '{}'", value));

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hour) || !two_digits(minute) {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Parses a comma-separated day list.
///
/// Accepts English names (`mon`, `monday`) or numbers 0-6 with 0 = Monday.
pub fn parse_active_days(value: &str) -> Result<Vec<Weekday>, ControllerError> {
    let mut days = BTreeSet::new();
    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let day = match raw.parse::<u8>() {
            Ok(n) if n <= 6 => Weekday::try_from(n).map_err(|_| invalid_day(raw))?,
            Ok(_) => return Err(invalid_day(raw)),
            Err(_) => raw.parse::<Weekday>().map_err(|_| invalid_day(raw))?,
        };
        days.insert(day.num_days_from_monday());
    }

    let days: Vec<Weekday> = days
        .into_iter()
        .filter_map(|n| Weekday::try_from(n as u8).ok())
        .collect();
    if days.is_empty() {
        return Err(ControllerError::InvalidConfig("active days must not be empty".to_string()));
    }
    Ok(days)
}

fn invalid_day(raw: &str) -> ControllerError {
    ControllerError::InvalidConfig(format!(
        "invalid active day '{}': expected mon..sun or 0-6 (0 = Monday)",
        raw
    ))
}

/// Resolves an IANA timezone name.
pub fn parse_timezone(value: &str) -> Result<Tz, ControllerError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| ControllerError::InvalidConfig(format!("unknown timezone '{}'", value)))
}

/// Parses the enabled kinds into canonical order without duplicates.
pub fn parse_kinds(value: &str) -> Result<Vec<WorkloadKind>, ControllerError> {
    let mut kinds = BTreeSet::new();
    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = raw
            .parse::<WorkloadKind>()
            .map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;
        kinds.insert(kind);
    }
    if kinds.is_empty() {
        return Err(ControllerError::InvalidConfig("at least one resource type must be enabled".to_string()));
    }
    Ok(kinds.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> ControllerArgs {
        let mut argv = vec!["tarnfui"];
        argv.extend_from_slice(extra);
        ControllerArgs::parse_from(argv)
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("07:00").unwrap(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(parse_time("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("7").is_err());
        assert!(parse_time("aa:bb").is_err());
        assert!(parse_time("7:05").is_err());
        assert!(parse_time("07:5").is_err());
        assert!(parse_time("+7:00").is_err());
        assert!(parse_time("007:00").is_err());
    }

    #[test]
    fn test_parse_active_days_names_and_numbers() {
        assert_eq!(
            parse_active_days("fri, mon,wednesday").unwrap(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert_eq!(parse_active_days("0,6,0").unwrap(), vec![Weekday::Mon, Weekday::Sun]);
        assert!(parse_active_days("7").is_err());
        assert!(parse_active_days("funday").is_err());
        assert!(parse_active_days(" , ").is_err());
    }

    #[test]
    fn test_parse_kinds_dedups_into_canonical_order() {
        assert_eq!(
            parse_kinds("statefulsets,deployments,deployment").unwrap(),
            vec![WorkloadKind::Deployment, WorkloadKind::StatefulSet]
        );
        assert!(parse_kinds("cronjobs").is_err());
        assert!(parse_kinds("").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Paris").unwrap(), chrono_tz::Europe::Paris);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::try_from(args(&[])).unwrap();
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.pass_concurrency, 1);
        assert!(!config.reconcile_once);
        assert_eq!(config.metrics_addr, Some("0.0.0.0:8080".parse().unwrap()));
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::try_from(args(&[
            "--startup-time",
            "22:00",
            "--shutdown-time",
            "06:00",
            "--active-days",
            "sat,sun",
            "--timezone",
            "America/New_York",
            "--interval",
            "300",
            "--namespace",
            "staging",
            "--resource-types",
            "statefulsets",
            "--reconcile-once",
            "--metrics-addr",
            "",
        ]))
        .unwrap();

        assert_eq!(config.schedule.startup_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(config.schedule.active_days, vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(config.schedule.timezone, chrono_tz::America::New_York);
        assert_eq!(config.schedule.reconciliation_interval, Duration::from_secs(300));
        assert_eq!(config.schedule.namespace.as_deref(), Some("staging"));
        assert_eq!(config.schedule.enabled_kinds, vec![WorkloadKind::StatefulSet]);
        assert!(config.reconcile_once);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_equal_times_rejected() {
        let err = ControllerConfig::try_from(args(&["--startup-time", "08:00", "--shutdown-time", "08:00"]))
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ControllerConfig::try_from(args(&["--interval", "0"])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_page_size_and_concurrency_rejected() {
        assert!(ControllerConfig::try_from(args(&["--page-size", "0"])).is_err());
        assert!(ControllerConfig::try_from(args(&["--pass-concurrency", "0"])).is_err());
    }

    #[test]
    fn test_verbose_switch_sets_log_level() {
        assert_eq!(args(&[]).log_level(), "info");
        assert_eq!(args(&["--verbose"]).log_level(), "debug");
        assert_eq!(args(&["-v"]).log_level(), "debug");
    }

    #[test]
    fn test_blank_namespace_means_cluster_wide() {
        let config = ControllerConfig::try_from(args(&["--namespace", "  "])).unwrap();
        assert!(config.schedule.namespace.is_none());
    }
}
