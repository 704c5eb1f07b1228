//! `SnapshotOps` (§4.4): the operations over `strata_core::Snapshot`.
//! Implemented as an extension trait rather than methods on `Snapshot`
//! itself so that `strata-core` stays free of the `strata-intervals` /
//! `strata-fingerprint` dependency edge.

use strata_core::errors::CoreError;
use strata_core::fingerprint::ChangeCategory;
use strata_core::interval::{Interval, IntervalSet};
use strata_core::snapshot::{Snapshot, SnapshotVersion};
use strata_intervals::Cadence;

/// Default prefix for a snapshot's generated physical schema, analogous to
/// spec's `<namespace>__<environment_or_default>` convention.
pub const PHYSICAL_SCHEMA_PREFIX: &str = "strata";

pub fn default_physical_schema(environment: Option<&str>) -> String {
    format!("{PHYSICAL_SCHEMA_PREFIX}__{}", environment.unwrap_or("default"))
}

fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

pub trait SnapshotOps {
    /// Assign `change_category` and update `version`/`previous_versions`
    /// per the §4.4 categorization rules. No-op (in terms of version
    /// history) on the very first categorization of a snapshot.
    fn categorize_as(&mut self, category: ChangeCategory);

    /// Deterministic physical table name for this snapshot's current state.
    fn table_name(&self, is_dev: bool, for_read: bool) -> String;

    fn add_interval(&mut self, start_ms: i64, end_ms: i64, is_dev: bool) -> Result<(), CoreError>;

    fn missing_intervals(
        &self,
        start_ms: i64,
        end_ms: i64,
        latest_ms: i64,
        restated: bool,
    ) -> Result<IntervalSet, CoreError>;

    fn merge_intervals(&mut self, other: &Snapshot);

    fn remove_interval(&mut self, start_ms: i64, end_ms: i64, latest_ms: i64) -> Result<(), CoreError>;
}

impl SnapshotOps for Snapshot {
    fn categorize_as(&mut self, category: ChangeCategory) {
        if let Some(old_version) = self.version.clone() {
            self.previous_versions.push(SnapshotVersion {
                version: old_version,
                data_hash: self.fingerprint.data_hash.clone(),
                physical_schema: self.physical_schema.clone(),
            });
        }

        let new_version = match category {
            ChangeCategory::Breaking | ChangeCategory::IndirectBreaking => {
                self.fingerprint.data_hash.clone()
            }
            ChangeCategory::NonBreaking
            | ChangeCategory::IndirectNonBreaking
            | ChangeCategory::Metadata => self
                .previous_versions
                .iter()
                .rev()
                .find(|v| v.data_hash == self.fingerprint.data_hash)
                .map(|v| v.version.clone())
                .or_else(|| self.version.clone())
                .unwrap_or_else(|| self.fingerprint.data_hash.clone()),
            ChangeCategory::ForwardOnly => self
                .version
                .clone()
                .unwrap_or_else(|| self.fingerprint.data_hash.clone()),
        };

        // A forward-only re-categorization keeps the schema the original
        // categorization picked (§4.4 "persists ... via previous_versions[0]").
        if matches!(category, ChangeCategory::ForwardOnly) {
            if let Some(first) = self.previous_versions.first() {
                self.physical_schema = first.physical_schema.clone();
            }
        }

        self.change_category = Some(category);
        self.version = Some(new_version);
    }

    fn table_name(&self, is_dev: bool, for_read: bool) -> String {
        let short = short_name(&self.name);
        let forward_only_temp =
            matches!(self.change_category, Some(ChangeCategory::ForwardOnly)) && (is_dev || !for_read);

        if forward_only_temp {
            format!(
                "{}.{}__{}__temp",
                self.physical_schema, short, self.fingerprint.data_hash
            )
        } else {
            let version = self.version.as_deref().unwrap_or(&self.fingerprint.data_hash);
            format!("{}.{}__{}", self.physical_schema, short, version)
        }
    }

    fn add_interval(&mut self, start_ms: i64, end_ms: i64, is_dev: bool) -> Result<(), CoreError> {
        let target = if is_dev {
            &mut self.dev_intervals
        } else {
            &mut self.intervals
        };
        *target = strata_intervals::add(target, start_ms, end_ms)?;
        Ok(())
    }

    fn missing_intervals(
        &self,
        start_ms: i64,
        end_ms: i64,
        latest_ms: i64,
        restated: bool,
    ) -> Result<IntervalSet, CoreError> {
        let cadence = Cadence::parse(&self.model.cron)?;
        let mut clamped_start = start_ms;
        if self.model.kind.is_incremental() {
            if let Some(model_start) = self.model.start_ms {
                clamped_start = clamped_start.max(model_start);
            }
        }
        let clamped_end = end_ms.min(latest_ms);
        if clamped_start >= clamped_end {
            return Ok(IntervalSet::new());
        }
        strata_intervals::missing(
            &self.intervals,
            clamped_start,
            clamped_end,
            &cadence,
            self.model.lookback,
            restated,
            latest_ms,
        )
    }

    fn merge_intervals(&mut self, other: &Snapshot) {
        if self.version != other.version {
            return;
        }

        let source: Vec<Interval> = if self.fingerprint != other.fingerprint {
            match self.effective_from {
                Some(cutoff) => other
                    .intervals
                    .iter()
                    .copied()
                    .filter(|iv| iv.end_ms <= cutoff)
                    .collect(),
                None => other.intervals.clone(),
            }
        } else {
            other.intervals.clone()
        };

        self.intervals = strata_intervals::merge_two(&self.intervals, &source);
    }

    fn remove_interval(&mut self, start_ms: i64, end_ms: i64, latest_ms: i64) -> Result<(), CoreError> {
        let (effective_start, effective_end) = if self.model.is_self_referential() {
            (start_ms.min(latest_ms), end_ms.max(latest_ms))
        } else {
            (start_ms, end_ms)
        };

        if effective_start >= effective_end {
            return Ok(());
        }

        self.intervals = strata_intervals::remove(&self.intervals, effective_start, effective_end)?;
        self.dev_intervals =
            strata_intervals::remove(&self.dev_intervals, effective_start, effective_end)?;
        Ok(())
    }
}
