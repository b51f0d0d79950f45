//! Turns operator input into registry arguments. The registry trusts what it
//! is given, so everything is checked here.

use grafter::{Architecture, Error, GraftHandle};

pub fn address(raw: &str) -> Result<String, Error> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(Error::Validation("address is empty".into()));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "address '{address}' contains whitespace"
        )));
    }
    Ok(address.to_owned())
}

pub fn port(raw: &str) -> Result<u16, Error> {
    let raw = raw.trim();
    let port: i64 = raw.parse().map_err(|_| {
        Error::Validation(format!("port '{raw}' is not an integer"))
    })?;
    u16::try_from(port).map_err(|_| {
        Error::Validation(format!("port {port} is outside 0-65535"))
    })
}

/// Blank input picks the default architecture.
pub fn architecture(raw: &str) -> Result<Architecture, Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Architecture::default());
    }
    raw.parse()
        .map_err(|error: grafter::UnknownArchitecture| Error::Validation(error.to_string()))
}

pub fn handle(raw: &str) -> Result<GraftHandle, Error> {
    let raw = raw.trim();
    raw.parse()
        .map(GraftHandle)
        .map_err(|_| Error::Validation(format!("graft index '{raw}' is not valid")))
}

pub fn command(raw: &str) -> Result<&str, Error> {
    if raw.trim().is_empty() {
        return Err(Error::Validation("command is empty".into()));
    }
    Ok(raw)
}
