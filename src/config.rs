use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use derive_more::{Display, Error};
use dotenv::dotenv;
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    Sendmail { path: String },
    Outbox { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
    pub admin_notify: String,
    pub transport: MailTransport,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub batch_size: i64,
    pub delay: Duration,
    pub max_attempts: i32,
    /// `None` disables the in-process worker; cron runs the one-shot command instead.
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password_hash: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub certificate_dir: PathBuf,
    pub admin: AdminConfig,
    pub mail: MailConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", key)]
    Missing { key: String },

    #[display(fmt = "invalid value for '{}': {}", key, reason)]
    Invalid { key: String, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let host: String = vars.or("SERVER_HOST", "127.0.0.1")?;
        let port: u16 = vars.or("SERVER_PORT", "8080")?;

        let transport = match vars.or::<String>("MAIL_TRANSPORT", "outbox")?.as_str() {
            "sendmail" => MailTransport::Sendmail {
                path: vars.or("SENDMAIL_PATH", "/usr/sbin/sendmail")?,
            },
            "outbox" => MailTransport::Outbox {
                dir: PathBuf::from(vars.or::<String>("MAIL_OUTBOX_DIR", "var/outbox")?),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "MAIL_TRANSPORT".to_string(),
                    reason: format!("unknown transport '{other}'"),
                })
            }
        };
        let from_address: String = vars.or("MAIL_FROM", "info@localhost")?;
        let poll_secs: u64 = vars.or("QUEUE_POLL_SECS", "60")?;

        Ok(Config {
            database_url: vars.required("DATABASE_URL")?,
            max_connections: vars.positive("DATABASE_MAX_CONNECTIONS", "5")?,
            public_base_url: vars
                .or::<String>("PUBLIC_BASE_URL", &format!("http://{host}:{port}"))?
                .trim_end_matches('/')
                .to_string(),
            host,
            port,
            certificate_dir: PathBuf::from(vars.or::<String>("CERTIFICATE_DIR", "var/certificates")?),
            admin: AdminConfig {
                username: vars.or("ADMIN_USERNAME", "admin")?,
                password_hash: vars.required::<String>("ADMIN_PASSWORD_HASH")?.to_uppercase(),
                jwt_secret: vars.required("JWT_SECRET")?,
                session_ttl: Duration::from_secs(vars.or("SESSION_TTL_SECS", "28800")?),
            },
            mail: MailConfig {
                from_name: vars.or("MAIL_FROM_NAME", "Training Office")?,
                admin_notify: vars.or("ADMIN_NOTIFY_EMAIL", &from_address)?,
                from_address,
                transport,
            },
            queue: QueueConfig {
                batch_size: vars.positive("QUEUE_BATCH_SIZE", "20")?,
                delay: Duration::from_millis(vars.or("QUEUE_DELAY_MS", "500")?),
                max_attempts: vars.positive("QUEUE_MAX_ATTEMPTS", "3")?,
                poll_interval: (poll_secs > 0).then(|| Duration::from_secs(poll_secs)),
            },
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required<T: FromStr>(&self, key: &str) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        match (self.lookup)(key) {
            Some(raw) if !raw.trim().is_empty() => parse(key, &raw),
            _ => Err(ConfigError::Missing { key: key.to_string() }),
        }
    }

    fn or<T: FromStr>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        match (self.lookup)(key) {
            Some(raw) if !raw.trim().is_empty() => parse(key, &raw),
            _ => {
                info!("{key} not set, using default: {default}");
                parse(key, default)
            }
        }
    }

    fn positive<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + From<u8> + fmt::Display,
        T::Err: fmt::Display,
    {
        let value: T = self.or(key, default)?;
        if value < T::from(1u8) {
            warn!("Invalid {key} value: {value}");
            return Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("must be at least 1, got {value}"),
            });
        }
        Ok(value)
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/training"),
        ("ADMIN_PASSWORD_HASH", "abc123"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_are_applied() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.public_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.admin.password_hash, "ABC123");
        assert_eq!(config.queue.batch_size, 20);
        assert_eq!(config.queue.poll_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.mail.admin_notify, "info@localhost");
        assert_eq!(
            config.mail.transport,
            MailTransport::Outbox { dir: PathBuf::from("var/outbox") }
        );
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert_eq!(err, ConfigError::Missing { key: "DATABASE_URL".to_string() });
        assert_eq!(err.to_string(), "environment variable 'DATABASE_URL' must be set");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SERVER_PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "SERVER_PORT"));
        assert!(err.to_string().starts_with("invalid value for 'SERVER_PORT': "));
    }

    #[test]
    fn counts_below_one_are_rejected() {
        for (key, raw) in [
            ("QUEUE_BATCH_SIZE", "0"),
            ("QUEUE_BATCH_SIZE", "-1"),
            ("QUEUE_MAX_ATTEMPTS", "0"),
            ("QUEUE_MAX_ATTEMPTS", "-1"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, raw));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: ref k, .. } if k == key),
                "{key}={raw} accepted"
            );
        }

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("QUEUE_BATCH_SIZE", "1"));
        pairs.push(("QUEUE_MAX_ATTEMPTS", "1"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.queue.batch_size, 1);
        assert_eq!(config.queue.max_attempts, 1);
    }

    #[test]
    fn zero_poll_interval_disables_worker() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("QUEUE_POLL_SECS", "0"));
        pairs.push(("MAIL_TRANSPORT", "sendmail"));
        pairs.push(("PUBLIC_BASE_URL", "https://training.example.com/"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.queue.poll_interval, None);
        assert_eq!(config.public_base_url, "https://training.example.com");
        assert_eq!(
            config.mail.transport,
            MailTransport::Sendmail { path: "/usr/sbin/sendmail".to_string() }
        );
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MAIL_TRANSPORT", "pigeon"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
