use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use crate::catalog::{Catalog, CatalogError};
use crate::optimizer::LatticeConfig;

/// Source of raw configuration values, keyed by variable name.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            optimizer: OptimizerConfig::from_lookup(lookup),
            catalog: CatalogConfig::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "LATTICE_PACK_API_HOST";
    const PORT_VAR: &'static str = "LATTICE_PACK_API_PORT";

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let (bind_ip, display_host) = match lookup(Self::HOST_VAR) {
            Some(raw) => match raw.parse::<IpAddr>() {
                Ok(ip) => (ip, raw),
                Err(err) => {
                    log::warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::HOST_VAR,
                        raw,
                        err,
                        Self::DEFAULT_HOST
                    );
                    (Self::DEFAULT_HOST, Self::DEFAULT_HOST.to_string())
                }
            },
            None => (Self::DEFAULT_HOST, Self::DEFAULT_HOST.to_string()),
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    log::warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    log::warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for the lattice optimizer.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    lattice: LatticeConfig,
}

impl OptimizerConfig {
    const THICKNESS_VAR: &'static str = "LATTICE_PACK_THICKNESS";
    const EPSILON_VAR: &'static str = "LATTICE_PACK_EPSILON";

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let thickness = load_f64_with_warning(
            lookup,
            Self::THICKNESS_VAR,
            LatticeConfig::DEFAULT_THICKNESS,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted material thickness changes every cell size",
        );

        let epsilon = load_f64_with_warning(
            lookup,
            Self::EPSILON_VAR,
            LatticeConfig::DEFAULT_EPSILON,
            // Tolerances in the millimetre range would accept items that do not fit.
            |value| value > 0.0 && value < 0.1,
            "must be between 0 and 0.1",
            "Warning: Adjusted tolerance may accept or reject borderline cells",
        );

        let lattice = LatticeConfig::builder()
            .thickness(thickness)
            .epsilon(epsilon)
            .build();

        Self { lattice }
    }

    /// Returns the configured LatticeConfig.
    pub fn lattice_config(&self) -> LatticeConfig {
        self.lattice
    }
}

/// Where the comb and cardboard catalogs come from.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    path: Option<PathBuf>,
    strict_width: bool,
}

impl CatalogConfig {
    const PATH_VAR: &'static str = "LATTICE_PACK_CATALOG_PATH";
    const STRICT_VAR: &'static str = "LATTICE_PACK_STRICT_CATALOG";

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            path: lookup(Self::PATH_VAR).map(PathBuf::from),
            strict_width: lookup(Self::STRICT_VAR)
                .and_then(|raw| parse_bool(&raw, Self::STRICT_VAR))
                .unwrap_or(false),
        }
    }

    /// Configured catalog file, `None` for the built-in table.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Whether comb width mismatches are fatal.
    pub fn strict_width(&self) -> bool {
        self.strict_width
    }

    /// Loads the catalog from the configured file or the built-in table.
    pub fn load(&self) -> Result<Catalog, CatalogError> {
        match &self.path {
            Some(path) => {
                let catalog = Catalog::from_path(path, self.strict_width)?;
                log::info!(
                    "📚 Loaded {} combs and {} cardboards from {}",
                    catalog.combs.len(),
                    catalog.cardboards.len(),
                    path.display()
                );
                Ok(catalog)
            }
            None => {
                let catalog = Catalog::builtin();
                catalog.validate(self.strict_width)?;
                log::info!("📚 Using built-in catalog");
                Ok(catalog)
            }
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            log::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    lookup: Lookup<'_>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    log::warn!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name,
                        raw,
                        invalid_hint,
                        default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        log::info!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                log::warn!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        // Test case insensitivity
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("Yes", "TEST_VAR"), Some(true));

        // Test with whitespace
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  0  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = AppConfig::from_lookup(&lookup_from(&[]));
        assert_eq!(config.api.port(), 8080);
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert!(config.api.binds_to_all_interfaces());
        assert_eq!(config.optimizer.lattice_config(), LatticeConfig::default());
        assert!(config.catalog.path().is_none());
        assert!(!config.catalog.strict_width());
    }

    #[test]
    fn test_reads_custom_values() {
        let lookup = lookup_from(&[
            ("LATTICE_PACK_API_HOST", "127.0.0.1"),
            ("LATTICE_PACK_API_PORT", "9090"),
            ("LATTICE_PACK_THICKNESS", "4.5"),
            ("LATTICE_PACK_CATALOG_PATH", "/tmp/catalog.json"),
            ("LATTICE_PACK_STRICT_CATALOG", "yes"),
        ]);
        let config = AppConfig::from_lookup(&lookup);

        assert_eq!(config.api.socket_addr(), "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
        assert!(!config.api.binds_to_all_interfaces());
        assert_eq!(config.optimizer.lattice_config().thickness, 4.5);
        assert_eq!(
            config.catalog.path(),
            Some(&PathBuf::from("/tmp/catalog.json"))
        );
        assert!(config.catalog.strict_width());
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let lookup = lookup_from(&[
            ("LATTICE_PACK_API_HOST", "not-an-ip"),
            ("LATTICE_PACK_API_PORT", "0"),
            ("LATTICE_PACK_THICKNESS", "-2"),
            ("LATTICE_PACK_EPSILON", "abc"),
        ]);
        let config = AppConfig::from_lookup(&lookup);

        assert_eq!(config.api.port(), 8080);
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert_eq!(config.optimizer.lattice_config(), LatticeConfig::default());
    }

    #[test]
    fn test_builtin_catalog_loads_without_path() {
        let catalog = CatalogConfig::default().load().unwrap();
        assert_eq!(catalog, Catalog::builtin());
    }
}
