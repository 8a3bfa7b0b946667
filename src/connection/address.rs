//! Robot address parsing.
//!
//! Addresses are `host:port`. IPv6 literals must be bracketed
//! (`[fe80::1]:23`). Host names are resolved at connect time, not here.

use crate::error::ConnectError;

/// A syntactically valid robot address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotAddress {
    host: String,
    port: u16,
}

impl RobotAddress {
    /// Parse `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::InvalidAddress` when the host is empty, the
    /// port is missing, or the port is not in `1..=65535`.
    ///
    /// # Examples
    ///
    /// ```
    /// use robo_remote::connection::address::RobotAddress;
    ///
    /// let addr = RobotAddress::parse("192.168.4.1:23")?;
    /// assert_eq!(addr.port(), 23);
    /// assert!(RobotAddress::parse("192.168.4.1").is_err());
    /// # Ok::<(), robo_remote::error::ConnectError>(())
    /// ```
    pub fn parse(address: &str) -> Result<Self, ConnectError> {
        let invalid = || ConnectError::InvalidAddress(address.to_string());
        let trimmed = address.trim();

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = tail.strip_prefix(':').ok_or_else(invalid)?;
            (host, port)
        } else {
            let (host, port) = trimmed.rsplit_once(':').ok_or_else(invalid)?;
            // unbracketed IPv6 is ambiguous
            if host.contains(':') {
                return Err(invalid());
            }
            (host, port)
        };

        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Form accepted by `TcpStream::connect`.
    #[must_use]
    pub fn to_socket_string(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for RobotAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_socket_string())
    }
}
