use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::controller::{Converter, MutatingController, ValidatingController};
use crate::resource::{GroupKind, Kind};

/// The three things a kind can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Role {
    Validating,
    Mutating,
    Converting,
}

/// One registered capability. Validating and mutating entries keep the kind
/// so embedded objects decode with its codec.
#[derive(Clone)]
pub(crate) enum Capability {
    Validating {
        kind: Kind,
        controller: Arc<dyn ValidatingController>,
    },
    Mutating {
        kind: Kind,
        controller: Arc<dyn MutatingController>,
    },
    Converting(Arc<dyn Converter>),
}

impl Capability {
    #[must_use]
    pub(crate) fn role(&self) -> Role {
        match self {
            Self::Validating { .. } => Role::Validating,
            Self::Mutating { .. } => Role::Mutating,
            Self::Converting(_) => Role::Converting,
        }
    }
}

/// Capabilities keyed by group/kind and role, plus the fallbacks used for
/// kinds without their own validating or mutating entry.
#[derive(Default)]
pub(crate) struct CapabilityRegistry {
    entries: HashMap<(GroupKind, Role), Capability>,
    default_validator: Option<Arc<dyn ValidatingController>>,
    default_mutator: Option<Arc<dyn MutatingController>>,
}

impl CapabilityRegistry {
    /// Later registrations for the same key replace earlier ones.
    pub(crate) fn insert(&mut self, group_kind: GroupKind, capability: Capability) {
        let role = capability.role();
        if self
            .entries
            .insert((group_kind.clone(), role), capability)
            .is_some()
        {
            warn!(%group_kind, ?role, "Replacing registered admission capability");
        }
    }

    pub(crate) fn set_default_validator(&mut self, controller: Arc<dyn ValidatingController>) {
        self.default_validator = Some(controller);
    }

    pub(crate) fn set_default_mutator(&mut self, controller: Arc<dyn MutatingController>) {
        self.default_mutator = Some(controller);
    }

    pub(crate) fn validator(
        &self,
        group_kind: &GroupKind,
    ) -> Option<(Option<&Kind>, &Arc<dyn ValidatingController>)> {
        match self.entries.get(&(group_kind.clone(), Role::Validating)) {
            Some(Capability::Validating { kind, controller }) => Some((Some(kind), controller)),
            _ => self.default_validator.as_ref().map(|c| (None, c)),
        }
    }

    pub(crate) fn mutator(
        &self,
        group_kind: &GroupKind,
    ) -> Option<(Option<&Kind>, &Arc<dyn MutatingController>)> {
        match self.entries.get(&(group_kind.clone(), Role::Mutating)) {
            Some(Capability::Mutating { kind, controller }) => Some((Some(kind), controller)),
            _ => self.default_mutator.as_ref().map(|c| (None, c)),
        }
    }

    /// Converters have no fallback.
    pub(crate) fn converter(&self, group_kind: &GroupKind) -> Option<&Arc<dyn Converter>> {
        match self.entries.get(&(group_kind.clone(), Role::Converting)) {
            Some(Capability::Converting(converter)) => Some(converter),
            _ => None,
        }
    }
}
