//! Value parsers for CLI arguments

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Longest DNS name accepted as a host
const MAX_HOSTNAME_LEN: usize = 253;

/// Port in 1..=65535
pub fn validate_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str.parse().map_err(|_| {
        format!(
            "Port must be a valid number between 1 and 65535, got: '{}'",
            port_str
        )
    })?;

    if port == 0 {
        return Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string());
    }

    Ok(port)
}

/// Existing, readable regular file
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    std::fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", path_str, e))
}

/// IP address or hostname
pub fn validate_host_address(host_str: &str) -> Result<String, String> {
    let host = host_str.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.contains(char::is_whitespace) {
        return Err("Host address cannot contain spaces".to_string());
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    // Dotted digits that failed to parse are a malformed IPv4 address, not a hostname.
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return host
            .parse::<Ipv4Addr>()
            .map(|_| host.to_string())
            .map_err(|_| format!("Invalid IPv4 address format: '{}'", host_str));
    }

    if host.len() > MAX_HOSTNAME_LEN {
        return Err("Host address is too long (maximum 253 characters)".to_string());
    }

    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        for port_str in ["1", "80", "3000", "65535"] {
            assert!(validate_port(port_str).is_ok(), "Port {} should be valid", port_str);
        }
        for port_str in ["0", "65536", "abc", "-1", ""] {
            assert!(validate_port(port_str).is_err(), "Port {} should be invalid", port_str);
        }
    }

    #[test]
    fn test_host_validation_valid_hosts() {
        for host in [
            "localhost",
            "127.0.0.1",
            "0.0.0.0",
            "::1",
            "192.168.1.1",
            "contacts.example.com",
        ] {
            assert_eq!(validate_host_address(host).as_deref(), Ok(host));
        }
    }

    #[test]
    fn test_host_validation_invalid_hosts() {
        let too_long = "x".repeat(300);
        for host in ["", "   ", "host with spaces", "999.999.999.999", "10.0.0", too_long.as_str()] {
            assert!(validate_host_address(host).is_err(), "Host '{}' should be invalid", host);
        }
    }

    #[test]
    fn test_config_file_path_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("app.toml");
        std::fs::write(&file, "[server]\nport = 3000\n").unwrap();

        assert_eq!(validate_config_file_path(file.to_str().unwrap()), Ok(file.clone()));

        let err = validate_config_file_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("not a file"));

        let missing = dir.path().join("missing.toml");
        let err = validate_config_file_path(missing.to_str().unwrap()).unwrap_err();
        assert!(err.contains("does not exist"));
    }
}
