//! Stage thresholds shared by prompting, fallbacks, mood classification and
//! the reveal check.

use serde::{Deserialize, Serialize};

/// Narrative bucket a stage falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageBucket {
    /// Small talk. No extra prompt instruction, base fallback pool.
    Early,
    /// The persona starts opening up. Mood-shift fallback pool.
    Mid,
    /// Vulnerability and intent to meet again. Romantic and mysterious
    /// mood rules become active.
    Late,
}

/// One threshold table for the whole engine.
///
/// All values are stage counts, i.e. completed persona turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTable {
    pub mid_at: u32,
    pub late_at: u32,
    pub reveal_at: u32,
    /// Minimum stage before the user may end the date early.
    pub early_end_at: u32,
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            mid_at: 3,
            late_at: 6,
            reveal_at: 8,
            early_end_at: 3,
        }
    }
}

impl StageTable {
    pub fn bucket(&self, stage: u32) -> StageBucket {
        if stage >= self.late_at {
            StageBucket::Late
        } else if stage >= self.mid_at {
            StageBucket::Mid
        } else {
            StageBucket::Early
        }
    }

    pub fn is_late(&self, stage: u32) -> bool {
        self.bucket(stage) == StageBucket::Late
    }

    pub fn is_reveal(&self, stage: u32) -> bool {
        stage >= self.reveal_at
    }

    pub fn can_end_early(&self, stage: u32) -> bool {
        stage >= self.early_end_at
    }

    /// Check ordering constraints. Returns a description of the first
    /// violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.mid_at > self.late_at {
            return Err(format!(
                "mid_at ({}) must not exceed late_at ({})",
                self.mid_at, self.late_at
            ));
        }
        if self.late_at > self.reveal_at {
            return Err(format!(
                "late_at ({}) must not exceed reveal_at ({})",
                self.late_at, self.reveal_at
            ));
        }
        if self.reveal_at == 0 {
            return Err("reveal_at must be at least 1".to_string());
        }
        if self.early_end_at > self.reveal_at {
            return Err(format!(
                "early_end_at ({}) must not exceed reveal_at ({})",
                self.early_end_at, self.reveal_at
            ));
        }
        Ok(())
    }
}
