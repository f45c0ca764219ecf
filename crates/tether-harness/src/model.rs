//! Reference model for session lifecycle sequences.
//!
//! A deliberately simple oracle: it tracks only the observable facts
//! (authenticated identity, unread count, connection liveness) and applies
//! operations with instant, infallible bookkeeping. Model-based tests
//! apply the same operation sequence to the model and to a [`World`] and
//! require the observable state to agree after every step.
//!
//! [`World`]: crate::World

use arbitrary::Arbitrary;
use tether_core::{Role, UserId};

/// Operations a user (or the network) can perform against the session
/// layer. Account indices are resolved modulo the registered account list
/// so any byte sequence is a valid schedule.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Log in with an account's correct password.
    Login {
        /// Index into the registered accounts.
        account: u8,
    },

    /// Attempt a login with the wrong password.
    LoginWrongPassword {
        /// Index into the registered accounts.
        account: u8,
    },

    /// Log out (always succeeds locally).
    Logout,

    /// The server drops the live realtime connection.
    DropChannel,

    /// Toggle server reachability.
    SetReachable {
        /// Whether the server is reachable afterwards.
        reachable: bool,
    },

    /// A notification arrives.
    Increment,

    /// The user marks everything read.
    ClearCount,
}

/// Oracle state for a single session stack.
#[derive(Debug, Clone)]
pub struct SessionModel {
    accounts: Vec<(UserId, Role)>,
    reachable: bool,
    authenticated: Option<(UserId, Role)>,
    /// Identity the counter was last seeded for. Survives reconnects,
    /// cleared on logout, exactly like the real notification state.
    seeded_for: Option<(UserId, Role)>,
    count: u32,
    connected: bool,
}

impl SessionModel {
    /// A logged-out model over the given accounts.
    pub fn new(accounts: Vec<(UserId, Role)>) -> Self {
        Self {
            accounts,
            reachable: true,
            authenticated: None,
            seeded_for: None,
            count: 0,
            connected: false,
        }
    }

    /// Expected authentication status.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.is_some()
    }

    /// Expected authenticated user id.
    pub fn user_id(&self) -> Option<UserId> {
        self.authenticated.map(|(id, _)| id)
    }

    /// Expected unread count.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Expected connection liveness.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Resolve an operation's account index. `None` when the model was
    /// built with no accounts.
    pub fn account(&self, index: u8) -> Option<(UserId, Role)> {
        if self.accounts.is_empty() {
            return None;
        }
        Some(self.accounts[index as usize % self.accounts.len()])
    }

    /// Apply an operation; returns whether it is expected to succeed.
    pub fn apply(&mut self, op: &Operation) -> bool {
        match op {
            Operation::Login { account } => {
                if !self.reachable {
                    return false;
                }
                let Some(identity) = self.account(*account) else {
                    return false;
                };
                self.authenticated = Some(identity);
                self.connected = true;
                if self.seeded_for != Some(identity) {
                    self.count = initial_count(identity.1);
                    self.seeded_for = Some(identity);
                }
                true
            },

            Operation::LoginWrongPassword { .. } => false,

            Operation::Logout => {
                self.authenticated = None;
                self.seeded_for = None;
                self.count = 0;
                self.connected = false;
                true
            },

            Operation::DropChannel => {
                self.connected = false;
                true
            },

            Operation::SetReachable { reachable } => {
                self.reachable = *reachable;
                true
            },

            Operation::Increment => {
                self.count = self.count.saturating_add(1);
                true
            },

            Operation::ClearCount => {
                self.count = 0;
                true
            },
        }
    }
}

/// Must mirror the client's role seeding.
fn initial_count(role: Role) -> u32 {
    match role {
        Role::Admin => 5,
        Role::ShopOwner => 3,
        Role::Retailer => 2,
        Role::DeliveryBoy => 1,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn model() -> SessionModel {
        SessionModel::new(vec![(1, Role::Retailer), (2, Role::ShopOwner)])
    }

    #[test]
    fn login_then_logout() {
        let mut model = model();
        assert!(model.apply(&Operation::Login { account: 0 }));
        assert!(model.is_authenticated());
        assert_eq!(model.count(), 2);
        assert!(model.is_connected());

        assert!(model.apply(&Operation::Logout));
        assert!(!model.is_authenticated());
        assert_eq!(model.count(), 0);
        assert!(!model.is_connected());
    }

    #[test]
    fn unreachable_login_fails_without_state_change() {
        let mut model = model();
        model.apply(&Operation::SetReachable { reachable: false });
        assert!(!model.apply(&Operation::Login { account: 0 }));
        assert!(!model.is_authenticated());
    }

    #[test]
    fn relogin_same_identity_keeps_count() {
        let mut model = model();
        model.apply(&Operation::Login { account: 0 });
        model.apply(&Operation::Increment);
        model.apply(&Operation::Login { account: 0 });
        assert_eq!(model.count(), 3);
    }

    #[test]
    fn identity_switch_reseeds_count() {
        let mut model = model();
        model.apply(&Operation::Login { account: 0 });
        model.apply(&Operation::Increment);
        model.apply(&Operation::Login { account: 1 });
        assert_eq!(model.count(), 3); // ShopOwner seed
    }

    #[test]
    fn login_without_accounts_fails_cleanly() {
        let mut model = SessionModel::new(vec![]);
        assert!(!model.apply(&Operation::Login { account: 0 }));
        assert!(!model.is_authenticated());
        assert_eq!(model.account(7), None);
    }

    #[test]
    fn drop_channel_does_not_log_out() {
        let mut model = model();
        model.apply(&Operation::Login { account: 0 });
        model.apply(&Operation::DropChannel);
        assert!(model.is_authenticated());
        assert!(!model.is_connected());
    }
}
