use crate::domain::ids::UserId;

use super::{
    chat_session::ChatSessionController,
    contracts::{AuthProvider, DocumentStore},
    directory::DirectoryFeed,
    inbox::InboxFeed,
    presence::PresenceTracker,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub presence_updated: bool,
    pub signed_out: bool,
}

/// Everything a signed-in session holds that logout has to tear down.
pub struct SessionHandles<'a, S> {
    pub controller: &'a mut ChatSessionController<S>,
    pub directory: &'a mut DirectoryFeed,
    pub inbox: &'a mut InboxFeed,
}

/// Marks the user offline, then tears the session down. A failed presence
/// write is reported in the outcome and does not stop the teardown.
pub fn logout<S, P>(
    auth: &dyn AuthProvider,
    presence: &PresenceTracker<P>,
    user: &UserId,
    session: SessionHandles<'_, S>,
) -> LogoutOutcome
where
    S: DocumentStore,
    P: DocumentStore,
{
    let presence_updated = presence.set_online(user, false).is_ok();

    session.controller.end_session();
    session.directory.stop();
    session.inbox.stop();

    let signed_out = match auth.sign_out() {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(code = "SIGN_OUT_FAILED", error = %error, "sign-out failed");
            false
        }
    };

    tracing::info!(user_id = %user, presence_updated, signed_out, "logged out");
    LogoutOutcome {
        presence_updated,
        signed_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{
            memory_auth::MemoryAuth,
            memory_store::{FaultTarget, MemoryStore},
        },
        test_support::{seeded_pair, uid},
        usecases::{chat_session::SessionUser, contracts::AuthState},
    };

    struct Fixture {
        store: MemoryStore,
        auth: MemoryAuth,
        controller: ChatSessionController<MemoryStore>,
        directory: DirectoryFeed,
        inbox: InboxFeed,
    }

    fn signed_in_alice() -> Fixture {
        let store = seeded_pair();
        let auth = MemoryAuth::new();
        auth.sign_up("alice@example.com", "pw").expect("sign up");
        store.set_presence(&uid("alice"), true).expect("online");

        let mut controller = ChatSessionController::new(store.clone());
        controller.start_session(SessionUser {
            id: uid("alice"),
            username: "alice".to_owned(),
        });
        controller.open_chat(&uid("bob")).expect("open");

        Fixture {
            directory: DirectoryFeed::start(&store, uid("alice")),
            inbox: InboxFeed::start(&store, uid("alice")),
            store,
            auth,
            controller,
        }
    }

    fn run_logout(fixture: &mut Fixture) -> LogoutOutcome {
        let presence = PresenceTracker::new(fixture.store.clone());
        logout(
            &fixture.auth,
            &presence,
            &uid("alice"),
            SessionHandles {
                controller: &mut fixture.controller,
                directory: &mut fixture.directory,
                inbox: &mut fixture.inbox,
            },
        )
    }

    #[test]
    fn logout_marks_offline_and_tears_everything_down() {
        let mut fixture = signed_in_alice();

        let outcome = run_logout(&mut fixture);

        assert_eq!(
            outcome,
            LogoutOutcome {
                presence_updated: true,
                signed_out: true
            }
        );
        let alice = fixture.store.get_user(&uid("alice")).expect("get").expect("exists");
        assert!(!alice.is_online);
        assert_eq!(fixture.store.active_message_subscriptions(), 0);
        assert!(!fixture.directory.is_live());
        assert!(fixture.controller.session_user().is_none());
        assert_eq!(fixture.auth.current_user(), None);
    }

    #[test]
    fn presence_failure_does_not_block_teardown() {
        let mut fixture = signed_in_alice();
        fixture.store.fail_next(FaultTarget::SetPresence);
        let changes = fixture.auth.auth_state_changes();

        let outcome = run_logout(&mut fixture);

        assert!(!outcome.presence_updated);
        assert!(outcome.signed_out);
        assert_eq!(fixture.store.active_message_subscriptions(), 0);
        assert_eq!(changes.try_iter().last(), Some(AuthState::SignedOut));
    }
}
