use secrecy::Secret;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub identity_service: IdentityServiceSettings,
    #[serde(default)]
    pub route_gate: RouteGateSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// OTLP collector endpoint; span export is skipped when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct IdentityServiceSettings {
    /// Base URL for server-side calls to the identity service.
    pub url: String,
    /// URL accessible from the browser for sign-in redirects.
    pub public_url: String,
    /// Key presented on server-to-server calls.
    pub service_api_key: Secret<String>,
    /// Upper bound on a profile lookup. The session stays usable without a
    /// profile, so this only caps how long an identity event waits for one.
    #[serde(default = "default_profile_timeout_ms")]
    pub profile_timeout_ms: u64,
}

fn default_profile_timeout_ms() -> u64 {
    5_000
}

/// Route classification tables for the edge gate. Static after startup.
#[derive(Deserialize, Clone)]
pub struct RouteGateSettings {
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    #[serde(default = "default_auth_only_prefixes")]
    pub auth_only_prefixes: Vec<String>,
    #[serde(default = "default_exempt_prefixes")]
    pub exempt_prefixes: Vec<String>,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
}

impl Default for RouteGateSettings {
    fn default() -> Self {
        Self {
            protected_prefixes: default_protected_prefixes(),
            auth_only_prefixes: default_auth_only_prefixes(),
            exempt_prefixes: default_exempt_prefixes(),
            landing_path: default_landing_path(),
        }
    }
}

fn default_protected_prefixes() -> Vec<String> {
    vec![
        "/dashboard".to_string(),
        "/profile".to_string(),
        "/settings".to_string(),
    ]
}

fn default_auth_only_prefixes() -> Vec<String> {
    vec!["/login".to_string(), "/signup".to_string()]
}

fn default_exempt_prefixes() -> Vec<String> {
    vec![
        "/api".to_string(),
        "/static".to_string(),
        "/favicon.ico".to_string(),
        "/health".to_string(),
        "/metrics".to_string(),
    ]
}

fn default_landing_path() -> String {
    "/dashboard/workspace".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    // Workspace root and member directory are both valid working directories
    let configuration_directory = if base_path.ends_with("dashboard-frontend") {
        base_path.join("config")
    } else {
        base_path.join("dashboard-frontend").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
