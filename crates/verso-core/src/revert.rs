//! Reverting a record to an earlier version.
//!
//! A revert never rewinds the chain. It copies the target's snapshot into a
//! brand-new head through the ordinary update path, leaving the target and
//! every other closed version untouched.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, version::VersionRecord};

/// What to revert to.
///
/// On the wire (and via [`TryFrom<i64>`]) a positive integer is a
/// `version_id` and a negative integer counts versions back from the head:
/// `-1` is the version before the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RevertTarget {
  Version(i64),
  Back(u64),
}

impl TryFrom<i64> for RevertTarget {
  type Error = Error;

  fn try_from(raw: i64) -> Result<Self> {
    match raw {
      0 => Err(Error::NotAVersionTarget),
      id if id > 0 => Ok(Self::Version(id)),
      offset => Ok(Self::Back(offset.unsigned_abs())),
    }
  }
}

impl From<RevertTarget> for i64 {
  fn from(target: RevertTarget) -> Self {
    match target {
      RevertTarget::Version(id) => id,
      RevertTarget::Back(steps) => i64::try_from(steps).map_or(i64::MIN, |s| -s),
    }
  }
}

impl From<&VersionRecord> for RevertTarget {
  fn from(version: &VersionRecord) -> Self { Self::Version(version.meta.version_id) }
}

/// Resolves revert targets against a loaded chain.
pub struct Reverter;

impl Reverter {
  /// Find the version `target` refers to in `chain` (ordered by
  /// `version_id`).
  ///
  /// Offsets count only non-deleted versions, most recent first, with the
  /// head at position zero.
  pub fn resolve(
    record_id: i64,
    chain: &[VersionRecord],
    target: RevertTarget,
  ) -> Result<&VersionRecord> {
    if chain.last().is_some_and(|head| head.meta.deleted) {
      return Err(Error::RevertAfterDelete(record_id));
    }

    match target {
      RevertTarget::Version(version_id) => {
        let version = chain
          .iter()
          .find(|v| v.meta.version_id == version_id)
          .ok_or(Error::UnknownVersion { record_id, version_id })?;
        // Delete markers only ever sit at the head of a terminated chain,
        // which was rejected above.
        if version.meta.deleted {
          return Err(Error::RevertAfterDelete(record_id));
        }
        Ok(version)
      }
      // The head itself is not an earlier version.
      RevertTarget::Back(0) => Err(Error::NotAVersionTarget),
      RevertTarget::Back(steps) => {
        let live: Vec<&VersionRecord> =
          chain.iter().rev().filter(|v| !v.meta.deleted).collect();
        usize::try_from(steps)
          .ok()
          .and_then(|i| live.get(i).copied())
          .ok_or(Error::RevertOutOfRange {
            record_id,
            steps,
            available: live.len().saturating_sub(1),
          })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::{
    value::Snapshot,
    version::{VersionMeta, VersionRecord},
  };

  fn version(version_id: i64, name: &str, open: bool, deleted: bool) -> VersionRecord {
    VersionRecord {
      meta:   VersionMeta {
        version_id,
        original_record: 1,
        valid_from: Utc.timestamp_opt(version_id, 0).unwrap(),
        valid_until: (!open).then(|| Utc.timestamp_opt(version_id + 1, 0).unwrap()),
        deleted,
      },
      fields: Snapshot::from([("name".to_owned(), name.into())]),
    }
  }

  fn chain() -> Vec<VersionRecord> {
    vec![
      version(1, "a", false, false),
      version(4, "b", false, false),
      version(9, "c", true, false),
    ]
  }

  #[test]
  fn raw_integers_map_to_targets() {
    assert_eq!(RevertTarget::try_from(3).unwrap(), RevertTarget::Version(3));
    assert_eq!(RevertTarget::try_from(-2).unwrap(), RevertTarget::Back(2));
    assert!(matches!(RevertTarget::try_from(0), Err(Error::NotAVersionTarget)));
    assert_eq!(i64::from(RevertTarget::Back(2)), -2);
  }

  #[test]
  fn deserialises_from_plain_integer() {
    let t: RevertTarget = serde_json::from_str("-1").unwrap();
    assert_eq!(t, RevertTarget::Back(1));
    assert!(serde_json::from_str::<RevertTarget>("0").is_err());
  }

  #[test]
  fn offsets_count_back_from_head() {
    let chain = chain();
    assert_eq!(Reverter::resolve(1, &chain, RevertTarget::Back(1)).unwrap().version_id(), 4);
    assert_eq!(Reverter::resolve(1, &chain, RevertTarget::Back(2)).unwrap().version_id(), 1);
  }

  #[test]
  fn zero_offset_is_not_a_target() {
    let err = Reverter::resolve(1, &chain(), RevertTarget::Back(0)).unwrap_err();
    assert!(matches!(err, Error::NotAVersionTarget));
  }

  #[test]
  fn offset_past_history_is_out_of_range() {
    let err = Reverter::resolve(1, &chain(), RevertTarget::Back(3)).unwrap_err();
    assert!(matches!(
      err,
      Error::RevertOutOfRange { record_id: 1, steps: 3, available: 2 }
    ));
  }

  #[test]
  fn version_id_must_be_in_chain() {
    let chain = chain();
    assert_eq!(
      Reverter::resolve(1, &chain, RevertTarget::Version(4)).unwrap().fields,
      chain[1].fields,
    );
    let err = Reverter::resolve(1, &chain, RevertTarget::Version(5)).unwrap_err();
    assert!(matches!(err, Error::UnknownVersion { record_id: 1, version_id: 5 }));
  }

  #[test]
  fn deleted_head_blocks_revert() {
    let mut chain = chain();
    chain[2].meta.valid_until = Some(Utc.timestamp_opt(20, 0).unwrap());
    chain.push(version(12, "c", true, true));
    for target in [RevertTarget::Back(1), RevertTarget::Version(1)] {
      let err = Reverter::resolve(1, &chain, target).unwrap_err();
      assert!(matches!(err, Error::RevertAfterDelete(1)));
    }
  }
}
