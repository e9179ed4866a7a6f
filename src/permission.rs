//! Permission gate for the storage scan.
//!
//! Grants are re-checked against the platform host on every attempt; a grant
//! observed in a previous process is never trusted. The gate holds at most
//! one outstanding request and hands the caller a [`GateDecision`] telling it
//! whether to proceed, wait, or first show a rationale prompt.

use log::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::Capability;

/// Platform permission facilities, injected so tests can script them.
pub trait PermissionHost {
    fn is_granted(&self, capability: Capability) -> bool;
    /// Whether the platform recommends explaining the request first.
    /// Sticky per capability, supplied by the platform.
    fn should_show_rationale(&self, capability: Capability) -> bool;
    /// Dispatch an asynchronous grant request. Results come back through
    /// `PermissionMessage::GrantResult` carrying the same request id.
    fn request(&mut self, request_id: Uuid, capabilities: &[Capability]);
}

/// Host for platforms without a runtime permission model. Everything is
/// granted up front, so the gate always proceeds.
pub struct UnrestrictedHost;

impl PermissionHost for UnrestrictedHost {
    fn is_granted(&self, _capability: Capability) -> bool {
        true
    }

    fn should_show_rationale(&self, _capability: Capability) -> bool {
        false
    }

    fn request(&mut self, request_id: Uuid, capabilities: &[Capability]) {
        debug!(
            "Unexpected permission request {} for {:?} on an unrestricted host",
            request_id, capabilities
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Everything already granted; proceed immediately.
    Granted,
    /// A request was dispatched; wait for the grant result.
    PendingRequest(Uuid),
    /// The operator must see a combined rationale prompt before the request
    /// is dispatched.
    PendingWithRationale(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    AllGranted,
    Denied,
    /// Unknown or superseded request id; ignore.
    Stale,
}

struct PendingRequest {
    request_id: Uuid,
    capabilities: Vec<Capability>,
    awaiting_rationale: bool,
}

pub struct PermissionGate<H: PermissionHost> {
    host: H,
    pending: Option<PendingRequest>,
}

impl<H: PermissionHost> PermissionGate<H> {
    pub fn new(host: H) -> PermissionGate<H> {
        PermissionGate {
            host,
            pending: None,
        }
    }

    /// Decide whether an operation needing `capabilities` may proceed.
    ///
    /// If any missing capability recommends a rationale, the whole batch is
    /// held behind one combined prompt; otherwise the request is dispatched
    /// immediately.
    pub fn ensure(&mut self, capabilities: &[Capability]) -> GateDecision {
        let missing: Vec<Capability> = capabilities
            .iter()
            .copied()
            .filter(|capability| !self.host.is_granted(*capability))
            .collect();

        if missing.is_empty() {
            return GateDecision::Granted;
        }

        let request_id = Uuid::new_v4();
        let needs_rationale = missing
            .iter()
            .any(|capability| self.host.should_show_rationale(*capability));

        if needs_rationale {
            debug!(
                "Holding permission request {} behind rationale: {:?}",
                request_id, missing
            );
            self.pending = Some(PendingRequest {
                request_id,
                capabilities: missing,
                awaiting_rationale: true,
            });
            GateDecision::PendingWithRationale(request_id)
        } else {
            debug!("Dispatching permission request {}: {:?}", request_id, missing);
            self.host.request(request_id, &missing);
            self.pending = Some(PendingRequest {
                request_id,
                capabilities: missing,
                awaiting_rationale: false,
            });
            GateDecision::PendingRequest(request_id)
        }
    }

    /// Capabilities covered by the held rationale prompt, if any.
    pub fn rationale_capabilities(&self) -> Option<Vec<Capability>> {
        self.pending
            .as_ref()
            .filter(|pending| pending.awaiting_rationale)
            .map(|pending| pending.capabilities.clone())
    }

    /// The operator accepted the rationale prompt; dispatch the held request.
    pub fn confirm_rationale(&mut self) {
        match self.pending.as_mut() {
            Some(pending) if pending.awaiting_rationale => {
                pending.awaiting_rationale = false;
                debug!(
                    "Rationale accepted, dispatching permission request {}",
                    pending.request_id
                );
                self.host
                    .request(pending.request_id, &pending.capabilities);
            }
            _ => debug!("confirm_rationale with no rationale pending"),
        }
    }

    /// The operator dismissed the rationale prompt. Terminal for this
    /// attempt: nothing is dispatched and nothing further happens.
    pub fn cancel_rationale(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!(
                "Permission request {} abandoned at rationale prompt",
                pending.request_id
            );
        }
    }

    /// Feed an asynchronous grant result back into the gate.
    pub fn on_grant_result(&mut self, request_id: Uuid, results: &[bool]) -> GateOutcome {
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == request_id);
        if !matches {
            warn!("Ignoring grant result for unknown request {}", request_id);
            return GateOutcome::Stale;
        }

        self.pending = None;
        if !results.is_empty() && results.iter().all(|granted| *granted) {
            GateOutcome::AllGranted
        } else {
            GateOutcome::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct ScriptedHost {
        granted: Vec<Capability>,
        rationale: Vec<Capability>,
        requests: Rc<RefCell<Vec<(Uuid, Vec<Capability>)>>>,
    }

    impl PermissionHost for ScriptedHost {
        fn is_granted(&self, capability: Capability) -> bool {
            self.granted.contains(&capability)
        }

        fn should_show_rationale(&self, capability: Capability) -> bool {
            self.rationale.contains(&capability)
        }

        fn request(&mut self, request_id: Uuid, capabilities: &[Capability]) {
            self.requests
                .borrow_mut()
                .push((request_id, capabilities.to_vec()));
        }
    }

    #[test]
    fn test_ensure_with_everything_granted_proceeds() {
        let mut gate = PermissionGate::new(ScriptedHost {
            granted: vec![Capability::ReadAudio],
            ..Default::default()
        });

        let decision = gate.ensure(&[Capability::ReadAudio]);

        assert_eq!(decision, GateDecision::Granted);
    }

    #[test]
    fn test_ensure_dispatches_request_for_missing_capability() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let mut gate = PermissionGate::new(ScriptedHost {
            requests: requests.clone(),
            ..Default::default()
        });

        let decision = gate.ensure(&[Capability::ReadAudio]);

        let GateDecision::PendingRequest(request_id) = decision else {
            panic!("expected PendingRequest, got {:?}", decision);
        };
        assert_eq!(
            requests.borrow().as_slice(),
            &[(request_id, vec![Capability::ReadAudio])]
        );
    }

    #[test]
    fn test_any_rationale_capability_holds_the_whole_batch() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let mut gate = PermissionGate::new(ScriptedHost {
            rationale: vec![Capability::ReadExternalStorage],
            requests: requests.clone(),
            ..Default::default()
        });

        let decision = gate.ensure(&[Capability::ReadAudio, Capability::ReadExternalStorage]);

        assert!(matches!(decision, GateDecision::PendingWithRationale(_)));
        assert!(requests.borrow().is_empty());
        assert_eq!(
            gate.rationale_capabilities(),
            Some(vec![Capability::ReadAudio, Capability::ReadExternalStorage])
        );

        gate.confirm_rationale();
        assert_eq!(requests.borrow().len(), 1);
        assert_eq!(
            requests.borrow()[0].1,
            vec![Capability::ReadAudio, Capability::ReadExternalStorage]
        );
    }

    #[test]
    fn test_cancelled_rationale_dispatches_nothing() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let mut gate = PermissionGate::new(ScriptedHost {
            rationale: vec![Capability::ReadAudio],
            requests: requests.clone(),
            ..Default::default()
        });

        gate.ensure(&[Capability::ReadAudio]);
        gate.cancel_rationale();
        gate.confirm_rationale();

        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_grant_result_outcomes() {
        let mut gate = PermissionGate::new(ScriptedHost::default());

        let GateDecision::PendingRequest(request_id) = gate.ensure(&[Capability::ReadAudio])
        else {
            panic!("expected PendingRequest");
        };

        assert_eq!(
            gate.on_grant_result(Uuid::new_v4(), &[true]),
            GateOutcome::Stale
        );
        assert_eq!(
            gate.on_grant_result(request_id, &[true]),
            GateOutcome::AllGranted
        );
        // The request was consumed; a replay is stale.
        assert_eq!(
            gate.on_grant_result(request_id, &[true]),
            GateOutcome::Stale
        );
    }

    #[test]
    fn test_single_denied_capability_denies_the_batch() {
        let mut gate = PermissionGate::new(ScriptedHost::default());

        let GateDecision::PendingRequest(request_id) =
            gate.ensure(&[Capability::ReadAudio, Capability::ReadExternalStorage])
        else {
            panic!("expected PendingRequest");
        };

        assert_eq!(
            gate.on_grant_result(request_id, &[true, false]),
            GateOutcome::Denied
        );
    }
}
