//! Connection string parsing.
//!
//! Accepts the driver DSN form used by the game servers' configs,
//! `[user[:password]@][net[(addr)]]/dbname[?param=value&...]`, as well as
//! plain `mysql://` URLs.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use tracing::{debug, warn};

use twdb_core::error::{MigrateError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3306;

/// Parameters the driver DSN may carry that have no meaning here.
const IGNORED_PARAMS: &[&str] = &[
    "parseTime",
    "loc",
    "timeout",
    "readTimeout",
    "writeTimeout",
    "allowNativePasswords",
    "multiStatements",
];

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

/// Parsed connection string.
#[derive(Clone)]
pub struct MySqlDsn {
    pub user: String,
    password: Option<String>,
    pub endpoint: Endpoint,
    pub database: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub ssl_mode: Option<MySqlSslMode>,
    url: Option<String>,
}

impl MySqlDsn {
    /// Parse a driver DSN or a `mysql://` URL.
    pub fn parse(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(invalid("empty connection string"));
        }

        if dsn.starts_with("mysql://") || dsn.starts_with("mariadb://") {
            return Self::parse_url(dsn);
        }

        let slash = dsn
            .rfind('/')
            .ok_or_else(|| invalid("missing the slash separating the database name"))?;
        let (prefix, rest) = (&dsn[..slash], &dsn[slash + 1..]);

        let (user, password, net) = match prefix.rfind('@') {
            Some(at) => {
                let creds = &prefix[..at];
                let (user, password) = match creds.split_once(':') {
                    Some((user, password)) => (user, Some(password.to_string())),
                    None => (creds, None),
                };
                (user.to_string(), password, &prefix[at + 1..])
            }
            None => (String::new(), None, prefix),
        };

        let endpoint = parse_endpoint(net)?;

        let (database, query) = match rest.split_once('?') {
            Some((db, query)) => (db, Some(query)),
            None => (rest, None),
        };

        let mut parsed = Self {
            user,
            password,
            endpoint,
            database: (!database.is_empty()).then(|| database.to_string()),
            charset: None,
            collation: None,
            ssl_mode: None,
            url: None,
        };

        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| invalid(&format!("parameter {} has no value", pair)))?;
                parsed.apply_param(key, value)?;
            }
        }

        Ok(parsed)
    }

    fn parse_url(url: &str) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(url).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            user: options.get_username().to_string(),
            password: None,
            endpoint: match options.get_socket() {
                Some(socket) => Endpoint::Unix(socket.clone()),
                None => Endpoint::Tcp {
                    host: options.get_host().to_string(),
                    port: options.get_port(),
                },
            },
            database: options.get_database().map(str::to_string),
            charset: None,
            collation: None,
            ssl_mode: None,
            url: Some(url.to_string()),
        })
    }

    fn apply_param(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "charset" => {
                // The driver tries each charset in turn; the first one wins here.
                let first = value.split(',').next().unwrap_or_default();
                self.charset = Some(first.to_string());
            }
            "collation" => self.collation = Some(value.to_string()),
            "tls" => {
                self.ssl_mode = Some(match value {
                    "true" => MySqlSslMode::VerifyIdentity,
                    "skip-verify" => MySqlSslMode::Required,
                    "preferred" => MySqlSslMode::Preferred,
                    "false" => MySqlSslMode::Disabled,
                    other => return Err(invalid(&format!("unsupported tls mode {}", other))),
                });
            }
            key if IGNORED_PARAMS.contains(&key) => {
                debug!(param = key, "ignoring driver-only DSN parameter");
            }
            key => warn!(param = key, "ignoring unknown DSN parameter"),
        }
        Ok(())
    }

    /// Build sqlx connect options.
    pub fn to_connect_options(&self) -> Result<MySqlConnectOptions> {
        if let Some(ref url) = self.url {
            return MySqlConnectOptions::from_str(url).map_err(|e| invalid(&e.to_string()));
        }

        let mut options = MySqlConnectOptions::new().username(&self.user);
        options = match &self.endpoint {
            Endpoint::Tcp { host, port } => options.host(host).port(*port),
            Endpoint::Unix(path) => options.socket(path),
        };
        if let Some(ref password) = self.password {
            options = options.password(password);
        }
        if let Some(ref database) = self.database {
            options = options.database(database);
        }
        if let Some(ref charset) = self.charset {
            options = options.charset(charset);
        }
        if let Some(ref collation) = self.collation {
            options = options.collation(collation);
        }
        if let Some(ref mode) = self.ssl_mode {
            options = options.ssl_mode(mode.clone());
        }
        Ok(options)
    }
}

impl fmt::Display for MySqlDsn {
    /// Render without the password, for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.user.is_empty() {
            write!(f, "{}:***@", self.user)?;
        }
        match &self.endpoint {
            Endpoint::Tcp { host, port } => write!(f, "tcp({}:{})", host, port)?,
            Endpoint::Unix(path) => write!(f, "unix({})", path.display())?,
        }
        write!(f, "/{}", self.database.as_deref().unwrap_or_default())
    }
}

impl fmt::Debug for MySqlDsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlDsn")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(net: &str) -> Result<Endpoint> {
    if net.is_empty() || net == "tcp" || net == "tcp6" {
        return Ok(Endpoint::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        });
    }

    let open = net
        .find('(')
        .ok_or_else(|| invalid(&format!("unknown network address {}", net)))?;
    if !net.ends_with(')') {
        return Err(invalid("network address not terminated (missing closing paren)"));
    }
    let (proto, addr) = (&net[..open], &net[open + 1..net.len() - 1]);

    match proto {
        "tcp" | "tcp6" => parse_tcp_addr(addr),
        "unix" if !addr.is_empty() => Ok(Endpoint::Unix(PathBuf::from(addr))),
        "unix" => Err(invalid("unix socket path is empty")),
        other => Err(invalid(&format!("unsupported network {}", other))),
    }
}

fn parse_tcp_addr(addr: &str) -> Result<Endpoint> {
    if addr.is_empty() {
        return Ok(Endpoint::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        });
    }

    // [::1]:3306
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid(&format!("malformed address {}", addr)))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None if tail.is_empty() => DEFAULT_PORT,
            None => return Err(invalid(&format!("malformed address {}", addr))),
        };
        return Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        });
    }

    match addr.rsplit_once(':') {
        Some((host, port)) => Ok(Endpoint::Tcp {
            host: if host.is_empty() { DEFAULT_HOST } else { host }.to_string(),
            port: parse_port(port)?,
        }),
        None => Ok(Endpoint::Tcp {
            host: addr.to_string(),
            port: DEFAULT_PORT,
        }),
    }
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| invalid(&format!("invalid port {:?}", port)))
}

fn invalid(reason: &str) -> MigrateError {
    MigrateError::DbOpen(format!("invalid DSN: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_driver_dsn() {
        let dsn = MySqlDsn::parse("user:pw@tcp(127.0.0.1:3306)/gamedb").unwrap();
        assert_eq!(dsn.user, "user");
        assert_eq!(dsn.password.as_deref(), Some("pw"));
        assert_eq!(
            dsn.endpoint,
            Endpoint::Tcp {
                host: "127.0.0.1".to_string(),
                port: 3306
            }
        );
        assert_eq!(dsn.database.as_deref(), Some("gamedb"));
    }

    #[test]
    fn test_parse_params() {
        let dsn = MySqlDsn::parse(
            "root:secret@tcp(db.internal:3307)/game?charset=utf8mb4,utf8&parseTime=True&loc=Local&collation=utf8mb4_general_ci",
        )
        .unwrap();
        assert_eq!(dsn.charset.as_deref(), Some("utf8mb4"));
        assert_eq!(dsn.collation.as_deref(), Some("utf8mb4_general_ci"));
        assert_eq!(
            dsn.endpoint,
            Endpoint::Tcp {
                host: "db.internal".to_string(),
                port: 3307
            }
        );
    }

    #[test]
    fn test_password_may_contain_at_and_colon() {
        let dsn = MySqlDsn::parse("admin:p@ss:w0rd@tcp(10.0.0.5)/game").unwrap();
        assert_eq!(dsn.user, "admin");
        assert_eq!(dsn.password.as_deref(), Some("p@ss:w0rd"));
        assert_eq!(
            dsn.endpoint,
            Endpoint::Tcp {
                host: "10.0.0.5".to_string(),
                port: 3306
            }
        );
    }

    #[test]
    fn test_defaults_and_sockets() {
        let dsn = MySqlDsn::parse("/gamedb").unwrap();
        assert_eq!(dsn.user, "");
        assert_eq!(
            dsn.endpoint,
            Endpoint::Tcp {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT
            }
        );

        let dsn = MySqlDsn::parse("app@unix(/var/run/mysqld/mysqld.sock)/gamedb").unwrap();
        assert_eq!(
            dsn.endpoint,
            Endpoint::Unix(PathBuf::from("/var/run/mysqld/mysqld.sock"))
        );

        let dsn = MySqlDsn::parse("app@tcp([::1]:3306)/gamedb").unwrap();
        assert_eq!(
            dsn.endpoint,
            Endpoint::Tcp {
                host: "::1".to_string(),
                port: 3306
            }
        );
    }

    #[test]
    fn test_parse_url() {
        let dsn = MySqlDsn::parse("mysql://root:pw@localhost:3306/gamedb").unwrap();
        assert_eq!(dsn.user, "root");
        assert_eq!(dsn.database.as_deref(), Some("gamedb"));
        assert!(dsn.to_connect_options().is_ok());
    }

    #[test]
    fn test_invalid_dsn_is_db_open_error() {
        for bad in [
            "",
            "no-slash-at-all",
            "user:pw@tcp(127.0.0.1:3306/gamedb",
            "user@tcp(127.0.0.1:notaport)/gamedb",
            "user@udp(127.0.0.1)/gamedb",
            "user@tcp(127.0.0.1)/gamedb?tls=sometimes",
            "user@tcp(127.0.0.1)/gamedb?charset",
        ] {
            let err = MySqlDsn::parse(bad).unwrap_err();
            assert_eq!(err.kind(), "DBOpenError", "{}", bad);
        }
    }

    #[test]
    fn test_display_hides_password() {
        let dsn = MySqlDsn::parse("user:hunter2@tcp(127.0.0.1:3306)/gamedb").unwrap();
        let shown = dsn.to_string();
        assert_eq!(shown, "user:***@tcp(127.0.0.1:3306)/gamedb");
        assert!(!format!("{:?}", dsn).contains("hunter2"));
    }
}
