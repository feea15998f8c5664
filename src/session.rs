//! Session snapshots: the resolved schema decisions, serialized.
//!
//! A snapshot captures everything the data phase needs from the schema
//! phase — both schemas, the synthetic-key registry and the session time
//! zone — so a schema-only run can be reviewed offline and resumed later
//! as a data-only run against the same decisions.

use crate::conv::{Conv, SyntheticKey};
use crate::schema::Schema;
use ahash::AHashMap;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub dialect: String,
    pub src_schema: Schema,
    pub target_schema: Schema,
    pub synthetic_keys: AHashMap<String, SyntheticKey>,
    /// Session zone as seconds east of UTC.
    pub timezone_offset_secs: i32,
}

impl Session {
    pub fn from_conv(conv: &Conv, dialect: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            src_schema: conv.src_schema.clone(),
            target_schema: conv.target_schema.clone(),
            synthetic_keys: conv.synthetic_keys.clone(),
            timezone_offset_secs: conv.timezone.local_minus_utc(),
        }
    }

    /// Install the snapshot's decisions into a fresh Conv.
    pub fn apply(&self, conv: &mut Conv) -> anyhow::Result<()> {
        conv.src_schema = self.src_schema.clone();
        conv.target_schema = self.target_schema.clone();
        conv.synthetic_keys = self.synthetic_keys.clone();
        conv.set_timezone(
            FixedOffset::east_opt(self.timezone_offset_secs)
                .ok_or_else(|| anyhow::anyhow!("invalid timezone offset in session"))?,
        );
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("can't read session file {}: {e}", path.as_ref().display())
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}
