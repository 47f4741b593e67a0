//! Configuration for priming a [`Jar`] from a client-held string.
//!
//! Check out the [`Config`] struct for more information.
//!
//! [`Jar`]: crate::Jar

/// `Config` specifies how [`Jar::parse_header`] should interpret the names and
/// values it finds.
///
/// ```rust
/// use cantuccio::Jar;
/// use cantuccio::config::Config;
///
/// let mut config = Config::default();
/// config.percent_decode = false;
/// let jar = Jar::parse_header("greeting=hello%20world", &config).unwrap();
/// assert_eq!(jar.get("greeting"), Some("hello%20world"));
/// ```
///
/// [`Jar::parse_header`]: crate::Jar::parse_header
#[derive(Debug, Clone)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// If `true`, cookie names and values are form-decoded: `+` is turned into
    /// a space, then percent-decoding is applied.
    ///
    /// If `false`, cookie values and names are used as is.
    ///
    /// By default, this field is `true`.
    pub percent_decode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            percent_decode: true,
        }
    }
}
