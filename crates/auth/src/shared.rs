//! Swap-on-write policy handle for processes that reload policy at runtime.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{ConfigError, PolicyEvaluator, PolicyRegistry, PolicySource};

/// Holds the current registry snapshot.
///
/// Readers clone the `Arc` and evaluate against that snapshot; a reload swaps
/// in a complete new registry. Rules are never edited in place, so an
/// in-flight evaluation keeps seeing the table it started with.
#[derive(Debug)]
pub struct SharedPolicy {
    current: RwLock<Arc<PolicyRegistry>>,
}

impl SharedPolicy {
    pub fn new(registry: PolicyRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<PolicyRegistry> {
        // The lock only guards a pointer swap, so a poisoned lock still holds a valid snapshot.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// An evaluator pinned to the current snapshot.
    pub fn evaluator(&self) -> PolicyEvaluator {
        PolicyEvaluator::new(self.snapshot())
    }

    /// Publish `registry`, returning the snapshot it replaced.
    pub fn replace(&self, registry: PolicyRegistry) -> Arc<PolicyRegistry> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(registry))
    }

    /// Load `source` and publish it. On error the current policy stays in force.
    pub fn reload(&self, source: PolicySource<'_>) -> Result<(), ConfigError> {
        let registry = PolicyRegistry::load(source)?;
        let previous = self.replace(registry);
        tracing::info!(previous_rules = previous.len(), "policy reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Department, PermissionRule, Principal, Role};
    use deptguard_core::PrincipalId;

    fn general() -> Principal {
        Principal::new(PrincipalId::parse("u1").unwrap(), Role::General, Department::Sales)
    }

    #[test]
    fn pinned_evaluator_survives_reload() {
        let shared = SharedPolicy::new(PolicyRegistry::builtin());
        let before = shared.evaluator();
        let actor = general();

        shared
            .reload(PolicySource::Rules(vec![PermissionRule::new(
                [Role::General],
                [Action::Delete],
            )]))
            .unwrap();

        assert!(!before.can_perform_action(&actor, Action::Delete, None, None));
        assert!(shared.evaluator().can_perform_action(&actor, Action::Delete, None, None));
    }

    #[test]
    fn failed_reload_keeps_current_policy() {
        let shared = SharedPolicy::new(PolicyRegistry::builtin());
        let err = shared.reload(PolicySource::Json("[{\"rolesAllowed\": []}]"));
        assert!(err.is_err());
        assert_eq!(*shared.snapshot(), PolicyRegistry::builtin());
    }

    #[test]
    fn concurrent_readers_see_complete_snapshots() {
        let shared = Arc::new(SharedPolicy::new(PolicyRegistry::builtin()));
        let actor = general();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let actor = actor.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot();
                        assert!(snapshot.len() == 3 || snapshot.len() == 1);
                        let _ = PolicyEvaluator::new(snapshot).can_perform_action(
                            &actor,
                            Action::Read,
                            Some(&actor),
                            None,
                        );
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            let narrow = vec![PermissionRule::new([Role::Admin], [Action::Read])];
            shared.replace(PolicyRegistry::from_rules(narrow).unwrap());
            shared.replace(PolicyRegistry::builtin());
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
