use std::path::PathBuf;

use shakmaty::CastlingMode;

use crate::{errors::SettingsError, types::Compression};

/// Requested tablebase configuration.
///
/// Typically kept in sync with the engine options via
/// [`Settings::set_option()`] and handed to
/// [`Egtb::reconcile()`](crate::Egtb::reconcile) before each search.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    pub enabled: bool,
    /// Tablebase directories, separated by `;`.
    pub paths: String,
    /// Cache size in MiB.
    pub cache_mib: u32,
    pub compression: Compression,
    /// [`CastlingMode::Chess960`] makes castling rights ambiguous, so
    /// positions with castling rights will not be probed.
    pub castling_mode: CastlingMode,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            enabled: false,
            paths: String::new(),
            cache_mib: 32,
            compression: Compression::default(),
            castling_mode: CastlingMode::Standard,
        }
    }
}

impl Settings {
    pub const ENABLED: &'static str = "UseGaviotaTb";
    pub const PATHS: &'static str = "GaviotaTbPath";
    pub const CACHE: &'static str = "GaviotaTbCache";
    pub const COMPRESSION: &'static str = "GaviotaTbCompression";
    pub const CHESS960: &'static str = "UCI_Chess960";

    /// Allowed range of the cache option, in MiB.
    pub const CACHE_RANGE: (u32, u32) = (4, 1024);

    /// Applies an engine option. Option names are matched case
    /// insensitively.
    ///
    /// Compression names are never rejected, see
    /// [`Compression::from_name()`].
    ///
    /// # Errors
    ///
    /// Errors if the option is not a tablebase option or `value` can not be
    /// parsed for it.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        if name.eq_ignore_ascii_case(Settings::ENABLED) {
            self.enabled = parse_bool(Settings::ENABLED, value)?;
        } else if name.eq_ignore_ascii_case(Settings::PATHS) {
            self.paths = value.to_owned();
        } else if name.eq_ignore_ascii_case(Settings::CACHE) {
            let (min, max) = Settings::CACHE_RANGE;
            self.cache_mib = value
                .parse::<u32>()
                .ok()
                .filter(|mib| (min..=max).contains(mib))
                .ok_or_else(|| SettingsError::InvalidValue {
                    name: Settings::CACHE,
                    value: value.to_owned(),
                })?;
        } else if name.eq_ignore_ascii_case(Settings::COMPRESSION) {
            self.compression = Compression::from_name(value);
        } else if name.eq_ignore_ascii_case(Settings::CHESS960) {
            let chess960 = parse_bool(Settings::CHESS960, value)?;
            self.castling_mode = CastlingMode::from_chess960(chess960);
        } else {
            return Err(SettingsError::UnknownOption(name.to_owned()));
        }
        Ok(())
    }

    /// Lines advertising the tablebase options to a UCI GUI, using the
    /// current values as defaults.
    pub fn uci_options(&self) -> Vec<String> {
        let (min, max) = Settings::CACHE_RANGE;
        let mut compression = format!(
            "option name {} type combo default {}",
            Settings::COMPRESSION,
            self.compression
        );
        for scheme in Compression::ALL {
            compression.push_str(" var ");
            compression.push_str(scheme.name());
        }
        vec![
            format!(
                "option name {} type check default {}",
                Settings::ENABLED,
                self.enabled
            ),
            format!(
                "option name {} type string default {}",
                Settings::PATHS,
                if self.paths.is_empty() { "<empty>" } else { self.paths.as_str() }
            ),
            format!(
                "option name {} type spin default {} min {min} max {max}",
                Settings::CACHE,
                self.cache_mib
            ),
            compression,
        ]
    }

    /// The configured directories, see [`parse_paths()`].
    pub fn path_list(&self) -> Vec<PathBuf> {
        parse_paths(&self.paths)
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, SettingsError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(SettingsError::InvalidValue {
            name,
            value: value.to_owned(),
        })
    }
}

/// Splits a `;` separated list of directories, trimming whitespace around
/// each entry and dropping empty entries. Order is preserved.
pub fn parse_paths(paths: &str) -> Vec<PathBuf> {
    paths
        .split(';')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect()
}
