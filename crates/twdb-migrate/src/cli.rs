use std::path::PathBuf;

use clap::Parser;
use twdb_core::config::DEFAULT_CONFIG_PATH;

/// Create or update the game database schema, then exit.
#[derive(Debug, Parser)]
#[command(name = "db_migrate")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path.
    #[arg(short = 'f', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let args = Args::try_parse_from(["db_migrate"]).unwrap();
        assert_eq!(args.config, PathBuf::from("../etc/db.yaml"));
    }

    #[test]
    fn test_short_flag() {
        let args = Args::try_parse_from(["db_migrate", "-f", "/srv/etc/db.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("/srv/etc/db.toml"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["db_migrate", "--drop-everything"]).is_err());
    }
}
