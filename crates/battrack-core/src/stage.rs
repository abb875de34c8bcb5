//! The lifecycle state machine.
//!
//! ```text
//! Unregistered --manufactured--> Factory --received_at_store--> Store --sold--> Sold
//! ```
//!
//! A battery's stage is never stored. It is folded from the kinds present in
//! its event history, so two batteries with the same kinds always share a
//! stage.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  code::BatteryCode,
  event::{EventKind, LifecycleEvent},
};

// ─── Stage ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Unregistered,
  Factory,
  Store,
  Sold,
}

impl Stage {
  /// The furthest stage reached by a set of event kinds.
  pub fn from_kinds<I>(kinds: I) -> Self
  where
    I: IntoIterator<Item = EventKind>,
  {
    kinds
      .into_iter()
      .map(Self::reached_by)
      .max()
      .unwrap_or(Self::Unregistered)
  }

  /// The stage a battery is in once an event of `kind` has been recorded.
  pub fn reached_by(kind: EventKind) -> Self {
    match kind {
      EventKind::Manufactured => Self::Factory,
      EventKind::ReceivedAtStore => Self::Store,
      EventKind::Sold => Self::Sold,
    }
  }

  /// The only event kind that may be recorded from this stage, if any.
  pub fn next_kind(self) -> Option<EventKind> {
    match self {
      Self::Unregistered => Some(EventKind::Manufactured),
      Self::Factory => Some(EventKind::ReceivedAtStore),
      Self::Store => Some(EventKind::Sold),
      Self::Sold => None,
    }
  }

  /// The operation a scan of a battery in this stage should lead to.
  pub fn next_action(self) -> NextAction {
    match self {
      Self::Unregistered => NextAction::RegisterFactory,
      Self::Factory => NextAction::RegisterStoreEntry,
      Self::Store => NextAction::RegisterSale,
      Self::Sold => NextAction::CheckWarranty,
    }
  }
}

/// Current stage of a battery with the given ordered history.
pub fn current_stage(events: &[LifecycleEvent]) -> Stage {
  Stage::from_kinds(events.iter().map(LifecycleEvent::kind))
}

/// Whether `requested` is the legal next milestone from `stage`.
pub fn can_transition(stage: Stage, requested: EventKind) -> bool {
  stage.next_kind() == Some(requested)
}

/// Like [`can_transition`], but fails with [`Error::IllegalTransition`]
/// naming the battery, its stage and the attempted kind.
pub fn check_transition(
  code: &BatteryCode,
  stage: Stage,
  requested: EventKind,
) -> Result<()> {
  if can_transition(stage, requested) {
    Ok(())
  } else {
    Err(Error::IllegalTransition {
      code:      code.clone(),
      stage,
      attempted: requested,
    })
  }
}

// ─── NextAction ──────────────────────────────────────────────────────────────

/// Which registration step a scanned code should be routed to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NextAction {
  RegisterFactory,
  RegisterStoreEntry,
  RegisterSale,
  CheckWarranty,
}

#[cfg(test)]
mod tests {
  use strum::VariantArray as _;

  use super::*;
  use crate::code::validate;

  use crate::event::EventKind::*;

  #[test]
  fn stage_is_furthest_kind_present() {
    assert_eq!(Stage::from_kinds(std::iter::empty()), Stage::Unregistered);
    assert_eq!(Stage::from_kinds([Manufactured]), Stage::Factory);
    assert_eq!(
      Stage::from_kinds([Manufactured, ReceivedAtStore]),
      Stage::Store
    );
    assert_eq!(
      Stage::from_kinds([Manufactured, ReceivedAtStore, Sold]),
      Stage::Sold
    );
  }

  #[test]
  fn stage_ignores_order_and_repetition() {
    let every_subset = (0..8u8).map(|mask| {
      EventKind::VARIANTS
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, k)| *k)
        .collect::<Vec<_>>()
    });

    for kinds in every_subset {
      let forward = Stage::from_kinds(kinds.iter().copied());
      let backward = Stage::from_kinds(kinds.iter().rev().copied());
      let doubled = Stage::from_kinds(kinds.iter().chain(kinds.iter()).copied());
      assert_eq!(forward, backward, "{kinds:?}");
      assert_eq!(forward, doubled, "{kinds:?}");
      assert_eq!(forward, Stage::from_kinds(kinds.iter().copied()));
    }
  }

  #[test]
  fn only_the_three_forward_edges_are_legal() {
    let stages = [Stage::Unregistered, Stage::Factory, Stage::Store, Stage::Sold];
    let legal = [
      (Stage::Unregistered, Manufactured),
      (Stage::Factory, ReceivedAtStore),
      (Stage::Store, Sold),
    ];

    for stage in stages {
      for kind in EventKind::VARIANTS {
        assert_eq!(
          can_transition(stage, *kind),
          legal.contains(&(stage, *kind)),
          "{stage} -> {kind}"
        );
      }
    }
  }

  #[test]
  fn legal_path_is_accepted_in_order() {
    let code = validate("BAT1").unwrap();
    let mut stage = Stage::Unregistered;
    for kind in [Manufactured, ReceivedAtStore, Sold] {
      check_transition(&code, stage, kind).unwrap();
      stage = Stage::reached_by(kind);
    }
    assert_eq!(stage, Stage::Sold);
  }

  #[test]
  fn skipping_a_stage_names_stage_and_kind() {
    let code = validate("BAT1").unwrap();
    let err = check_transition(&code, Stage::Factory, Sold).unwrap_err();
    assert!(matches!(
      err,
      Error::IllegalTransition { stage: Stage::Factory, attempted: Sold, ref code }
        if code.as_str() == "BAT1"
    ));
    assert!(check_transition(&code, Stage::Unregistered, Sold).is_err());
  }

  #[test]
  fn sold_is_terminal() {
    assert_eq!(Stage::Sold.next_kind(), None);
    assert_eq!(Stage::Sold.next_action(), NextAction::CheckWarranty);
  }

  #[test]
  fn next_action_follows_stage() {
    assert_eq!(Stage::Unregistered.next_action(), NextAction::RegisterFactory);
    assert_eq!(Stage::Factory.next_action(), NextAction::RegisterStoreEntry);
    assert_eq!(Stage::Store.next_action(), NextAction::RegisterSale);
  }
}
