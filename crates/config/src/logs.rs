/*
 * vSMTP mail transfer agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

use std::{collections::HashMap, str::FromStr};
use tracing_subscriber::filter::LevelFilter;

/// Logging configuration.
#[derive(Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Logs {
    /// Level of the targets not listed in `levels`.
    #[serde(
        default = "Logs::default_level",
        serialize_with = "Logs::serialize_level",
        deserialize_with = "Logs::deserialize_level"
    )]
    pub default_level: LevelFilter,
    /// Customize the log level of the different part of the program, by target.
    ///
    /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/targets/struct.Targets.html>
    #[serde(
        default,
        serialize_with = "Logs::serialize_levels",
        deserialize_with = "Logs::deserialize_levels"
    )]
    pub levels: HashMap<String, LevelFilter>,
}

impl Logs {
    const fn default_level() -> LevelFilter {
        LevelFilter::WARN
    }

    fn parse_level<E: serde::de::Error>(level: &str) -> Result<LevelFilter, E> {
        LevelFilter::from_str(level)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse log level: `{e}`")))
    }

    fn serialize_level<S: serde::Serializer>(
        value: &LevelFilter,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    fn deserialize_level<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Self::parse_level(&<String as serde::Deserialize>::deserialize(deserializer)?)
    }

    fn serialize_levels<S: serde::Serializer>(
        value: &HashMap<String, LevelFilter>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut x = serializer.serialize_map(Some(value.len()))?;
        for (target, level) in value {
            serde::ser::SerializeMap::serialize_entry(&mut x, target, &level.to_string())?;
        }
        serde::ser::SerializeMap::end(x)
    }

    fn deserialize_levels<'de, D>(deserializer: D) -> Result<HashMap<String, LevelFilter>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <HashMap<String, String> as serde::Deserialize>::deserialize(deserializer)?
            .into_iter()
            .map(|(target, level)| Self::parse_level(&level).map(|level| (target, level)))
            .collect()
    }

    /// The filter built from this configuration.
    #[must_use]
    pub fn targets(&self) -> tracing_subscriber::filter::Targets {
        tracing_subscriber::filter::Targets::new()
            .with_targets(self.levels.clone())
            .with_default(self.default_level)
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            default_level: Self::default_level(),
            levels: HashMap::new(),
        }
    }
}

/// Install a global subscriber writing formatted logs on stderr.
///
/// # Errors
///
/// * a global subscriber is already installed
pub fn init_logs(logs: &Logs) -> Result<(), crate::ConfigError> {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(logs.targets()),
        )
        .try_init()?;

    Ok(())
}
