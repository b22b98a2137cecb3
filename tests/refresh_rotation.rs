use futures_util::future::join_all;
use shop_access::application_impl::*;
use shop_access::application_port::*;
use shop_access::domain_model::*;
use shop_access::domain_port::*;
use shop_access::infra_memory::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

struct Harness {
    service: Arc<RealAuthService>,
    store: Arc<MemorySessionStore>,
    principals: Arc<MemoryPrincipalRepo>,
}

fn jwt_config() -> JwtConfig {
    JwtConfig {
        issuer: "shop-access.test".to_string(),
        audience: "shop-client".to_string(),
        access_ttl: Duration::from_secs(15 * 60),
        refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        leeway_secs: 0,
    }
}

fn service_over(
    principals: Arc<MemoryPrincipalRepo>,
    sessions: Arc<dyn SessionStore>,
) -> Arc<RealAuthService> {
    Arc::new(RealAuthService::new(
        principals,
        Arc::new(Argon2CredentialHasher),
        Arc::new(Ed25519KeyGenerator),
        Arc::new(JwtEdDsaCodec::new(jwt_config())),
        sessions,
    ))
}

fn harness() -> Harness {
    let store = Arc::new(MemorySessionStore::new(Duration::from_secs(3600)));
    let principals = Arc::new(MemoryPrincipalRepo::new());
    Harness {
        service: service_over(principals.clone(), store.clone()),
        store,
        principals,
    }
}

fn alice() -> RegisterInput {
    RegisterInput {
        handle: "alice@example.com".to_string(),
        name: "Alice".to_string(),
        password: "correct horse".to_string(),
    }
}

/// Revocation always fails; everything else passes through.
struct BrokenRevokeStore {
    inner: Arc<MemorySessionStore>,
}

#[async_trait::async_trait]
impl SessionStore for BrokenRevokeStore {
    async fn create(
        &self,
        principal_id: PrincipalId,
        key_pair: KeyPair,
        refresh_token: &TokenDigest,
    ) -> Result<SessionRecord, SessionStoreError> {
        self.inner.create(principal_id, key_pair, refresh_token).await
    }

    async fn find_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.inner.find_by_principal(principal_id).await
    }

    async fn find_by_current_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.inner.find_by_current_refresh_token(refresh_token).await
    }

    async fn find_by_used_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.inner.find_by_used_refresh_token(refresh_token).await
    }

    async fn rotate(&self, rotation: SessionRotation) -> Result<RotateOutcome, SessionStoreError> {
        self.inner.rotate(rotation).await
    }

    async fn revoke(&self, _principal_id: PrincipalId) -> Result<bool, SessionStoreError> {
        Err(SessionStoreError::Store("connection reset".to_string()))
    }

    async fn remove_by_record_id(&self, session_id: SessionId) -> Result<bool, SessionStoreError> {
        self.inner.remove_by_record_id(session_id).await
    }
}

#[tokio::test]
async fn register_then_refresh_rotates_the_pair() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;
    let t1 = registered.tokens.refresh_token.clone();

    let refreshed = h.service.refresh(t1.as_str(), pid).await.unwrap();
    let t2 = refreshed.tokens.refresh_token.clone();
    assert_ne!(t1, t2);
    assert_eq!(refreshed.session_id, registered.session_id);

    let record = h.store.find_by_principal(pid).await.unwrap().unwrap();
    assert_eq!(record.current_refresh_token, t2.digest());
    assert!(record.used_refresh_tokens.contains_key(&t1.digest()));
    // key pair survives rotation
    h.service
        .authenticate(refreshed.tokens.access_token.as_str(), pid)
        .await
        .unwrap();
}

#[tokio::test]
async fn replayed_refresh_token_revokes_the_session() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;
    let t1 = registered.tokens.refresh_token.clone();

    let refreshed = h.service.refresh(t1.as_str(), pid).await.unwrap();
    let t2 = refreshed.tokens.refresh_token.clone();

    let err = h.service.refresh(t1.as_str(), pid).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionCompromised));
    assert!(h.store.find_by_principal(pid).await.unwrap().is_none());

    // the legitimate holder is locked out as well
    let err = h.service.refresh(t2.as_str(), pid).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    let err = h
        .service
        .authenticate(refreshed.tokens.access_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
}

#[tokio::test]
async fn replay_under_another_principal_id_still_revokes_the_owner() {
    let h = harness();
    let a = h.service.register(alice()).await.unwrap();
    let b = h
        .service
        .register(RegisterInput {
            handle: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .unwrap();

    let t1 = a.tokens.refresh_token.clone();
    h.service.refresh(t1.as_str(), a.principal.id).await.unwrap();

    let err = h.service.refresh(t1.as_str(), b.principal.id).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionCompromised));
    assert!(h.store.find_by_principal(a.principal.id).await.unwrap().is_none());
    assert!(h.store.find_by_principal(b.principal.id).await.unwrap().is_some());
}

#[tokio::test]
async fn never_issued_token_changes_nothing() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;
    let before = h.store.find_by_principal(pid).await.unwrap().unwrap();

    let err = h.service.refresh("forged.refresh.token", pid).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));

    let after = h.store.find_by_principal(pid).await.unwrap().unwrap();
    assert_eq!(after.current_refresh_token, before.current_refresh_token);
    assert!(after.used_refresh_tokens.is_empty());
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn another_principals_token_is_rejected() {
    let h = harness();
    let a = h.service.register(alice()).await.unwrap();
    let b = h
        .service
        .register(RegisterInput {
            handle: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .unwrap();

    let err = h
        .service
        .refresh(b.tokens.refresh_token.as_str(), a.principal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    // neither session moved
    h.service
        .refresh(a.tokens.refresh_token.as_str(), a.principal.id)
        .await
        .unwrap();
    h.service
        .refresh(b.tokens.refresh_token.as_str(), b.principal.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn access_token_is_not_a_refresh_token() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let err = h
        .service
        .refresh(
            registered.tokens.access_token.as_str(),
            registered.principal.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;

    let ctx = h
        .service
        .authenticate(registered.tokens.access_token.as_str(), pid)
        .await
        .unwrap();
    assert_eq!(ctx.session_id, registered.session_id);
    assert_eq!(ctx.claims.principal_id, pid);
    assert_eq!(ctx.claims.kind, TokenKind::Access);

    h.service.logout(ctx.session_id).await.unwrap();
    assert!(h.store.is_empty());

    let err = h
        .service
        .refresh(registered.tokens.refresh_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));

    // a second logout is a no-op
    h.service.logout(ctx.session_id).await.unwrap();
}

#[tokio::test]
async fn login_replaces_the_previous_session() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;

    let logged_in = h
        .service
        .login(LoginInput {
            handle: "Alice@Example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(logged_in.principal.id, pid);
    assert_ne!(logged_in.session_id, registered.session_id);
    assert_eq!(h.store.len(), 1);

    // old tokens were signed with the discarded key pair
    let err = h
        .service
        .authenticate(registered.tokens.access_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    let err = h
        .service
        .refresh(registered.tokens.refresh_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));

    h.service
        .refresh(logged_in.tokens.refresh_token.as_str(), pid)
        .await
        .unwrap();
}

#[tokio::test]
async fn login_failures_do_not_say_which_part_was_wrong() {
    let h = harness();
    h.service.register(alice()).await.unwrap();

    let wrong_password = h
        .service
        .login(LoginInput {
            handle: "alice@example.com".to_string(),
            password: "wrong horse".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));

    let unknown = h
        .service
        .login(LoginInput {
            handle: "nobody@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(unknown, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn register_validates_input_and_uniqueness() {
    let h = harness();

    let mut bad_handle = alice();
    bad_handle.handle = "alice".to_string();
    assert!(matches!(
        h.service.register(bad_handle).await.unwrap_err(),
        AuthError::InvalidInput(_)
    ));

    let mut short_password = alice();
    short_password.password = "short".to_string();
    assert!(matches!(
        h.service.register(short_password).await.unwrap_err(),
        AuthError::InvalidInput(_)
    ));

    let mut blank_name = alice();
    blank_name.name = "   ".to_string();
    assert!(matches!(
        h.service.register(blank_name).await.unwrap_err(),
        AuthError::InvalidInput(_)
    ));

    h.service.register(alice()).await.unwrap();
    assert!(matches!(
        h.service.register(alice()).await.unwrap_err(),
        AuthError::HandleTaken
    ));
}

#[tokio::test]
async fn deactivated_principal_cannot_refresh_or_login() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;
    assert!(h.principals.set_active(pid, false));

    let err = h
        .service
        .refresh(registered.tokens.refresh_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));

    let err = h
        .service
        .login(LoginInput {
            handle: "alice@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    // an access token issued before deactivation stops working too
    let err = h
        .service
        .authenticate(registered.tokens.access_token.as_str(), pid)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    assert!(h.store.find_by_principal(pid).await.unwrap().is_some());
}

#[tokio::test]
async fn used_set_only_grows_across_a_refresh_chain() {
    let h = harness();
    let registered = h.service.register(alice()).await.unwrap();
    let pid = registered.principal.id;

    let mut presented = vec![registered.tokens.refresh_token.clone()];
    for _ in 0..4 {
        let current = presented.last().unwrap().clone();
        let next = h.service.refresh(current.as_str(), pid).await.unwrap();
        presented.push(next.tokens.refresh_token);

        let record = h.store.find_by_principal(pid).await.unwrap().unwrap();
        assert_eq!(record.used_refresh_tokens.len(), presented.len() - 1);
        for consumed in &presented[..presented.len() - 1] {
            assert!(record.used_refresh_tokens.contains_key(&consumed.digest()));
        }
        assert!(!record.used_refresh_tokens.contains_key(&record.current_refresh_token));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_with_one_token_has_one_winner() {
    const RACERS: usize = 8;

    for round in 0..10 {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();
        let pid = registered.principal.id;
        let t1 = registered.tokens.refresh_token.clone();

        // released together so every request starts before any rotation commits
        let start = Arc::new(Barrier::new(RACERS));
        let racers = (0..RACERS).map(|_| {
            let service = h.service.clone();
            let start = start.clone();
            let token = t1.clone();
            tokio::spawn(async move {
                start.wait().await;
                service.refresh(token.as_str(), pid).await
            })
        });
        let results: Vec<_> = join_all(racers)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "round {round}");
        for result in &results {
            if let Err(e) = result {
                assert!(
                    matches!(e, AuthError::Unauthenticated),
                    "round {round}: unexpected {e:?}"
                );
            }
        }

        let record = h.store.find_by_principal(pid).await.unwrap().unwrap();
        assert_eq!(
            record.current_refresh_token,
            winners[0].tokens.refresh_token.digest()
        );
        assert_eq!(record.used_refresh_tokens.len(), 1);
        assert!(record.used_refresh_tokens.contains_key(&t1.digest()));

        // once committed, the same token is a replay
        let err = h.service.refresh(t1.as_str(), pid).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionCompromised));
        assert!(h.store.find_by_principal(pid).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn failed_revocation_still_reports_compromise() {
    let inner = Arc::new(MemorySessionStore::new(Duration::from_secs(3600)));
    let principals = Arc::new(MemoryPrincipalRepo::new());
    let service = service_over(
        principals,
        Arc::new(BrokenRevokeStore {
            inner: inner.clone(),
        }),
    );

    let registered = service.register(alice()).await.unwrap();
    let pid = registered.principal.id;
    let t1 = registered.tokens.refresh_token.clone();
    service.refresh(t1.as_str(), pid).await.unwrap();

    let err = service.refresh(t1.as_str(), pid).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionCompromised));
    assert!(inner.find_by_principal(pid).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_session_is_invisible() {
    let store = Arc::new(MemorySessionStore::new(Duration::from_millis(50)));
    let principals = Arc::new(MemoryPrincipalRepo::new());
    let service = service_over(principals, store.clone());

    let registered = service.register(alice()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let err = service
        .refresh(
            registered.tokens.refresh_token.as_str(),
            registered.principal.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    assert_eq!(store.purge_expired(), 1);
}
