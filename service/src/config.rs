use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Seconds between keepalive comments written to every open stream
    #[arg(long, env, default_value_t = 15)]
    pub keepalive_interval_secs: u64,

    /// Frames a subscriber may have pending before it is treated as failed and dropped
    #[arg(long, env, default_value_t = 32)]
    pub subscriber_buffer_size: usize,

    /// Shared HS256 secret used to verify subscriber tokens.
    #[arg(long, env, hide_env_values = true)]
    jwt_secret: Option<String>,

    /// When set, subscriber tokens must carry this `iss` claim.
    #[arg(long, env)]
    jwt_issuer: Option<String>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn jwt_secret(&self) -> Option<SecretString> {
        self.jwt_secret.clone().map(SecretString::new)
    }

    pub fn set_jwt_secret(mut self, jwt_secret: String) -> Self {
        self.jwt_secret = Some(jwt_secret);
        self
    }

    pub fn jwt_issuer(&self) -> Option<String> {
        self.jwt_issuer.clone()
    }

    /// Stream settings handed to the SSE manager. The buffer never drops
    /// below one frame, since the `connected` frame has to fit.
    pub fn sse_settings(&self) -> sse::Settings {
        sse::Settings {
            keepalive_interval: Duration::from_secs(self.keepalive_interval_secs.max(1)),
            buffer_size: self.subscriber_buffer_size.max(1),
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}
