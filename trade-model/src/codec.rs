use crate::error::Error;

/// Text representation used on the game chat channel.
///
/// Implementations must satisfy `decode(encode(x)) == x` for every valid `x`.
pub trait WireFormat: Sized {
    fn encode(&self) -> String;
    fn decode(text: &str) -> Result<Self, Error>;
}

/// Strips `prefix` from `text` or fails with a malformed message error.
pub(crate) fn expect_prefix<'a>(text: &'a str, prefix: &str) -> Result<&'a str, Error> {
    text.strip_prefix(prefix)
        .ok_or_else(|| Error::malformed(text, format!("expected prefix '{}'", prefix)))
}

/// Splits `key=value` and checks the key.
pub(crate) fn expect_field<'a>(field: &'a str, key: &str) -> Result<&'a str, Error> {
    match field.split_once('=') {
        Some((k, value)) if k == key => Ok(value),
        _ => Err(Error::malformed(
            field,
            format!("expected field '{}'", key),
        )),
    }
}

pub(crate) fn parse_number<T: std::str::FromStr>(text: &str, context: &str) -> Result<T, Error> {
    text.trim()
        .parse::<T>()
        .map_err(|_| Error::malformed(context, format!("'{}' is not a number", text)))
}

pub(crate) fn parse_bool(text: &str, context: &str) -> Result<bool, Error> {
    match text.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::malformed(
            context,
            format!("'{}' is not a boolean", other),
        )),
    }
}
