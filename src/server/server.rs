use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::Permission;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Composition root: picks an adapter per port from settings and owns the
/// background tasks and pools they need.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub api_key_service: Arc<dyn ApiKeyService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let mut sweeper_handle = None;

        let needs_mysql =
            settings.account.backend == "mysql" || settings.api_key.backend == "mysql";
        let pool = if needs_mysql {
            Some(Pool::<MySql>::connect(&settings.account.mysql_dsn).await?)
        } else {
            None
        };

        let session_ttl = Duration::from_secs(settings.session.ttl_secs);
        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "memory" => {
                let store = Arc::new(MemorySessionStore::new(session_ttl));
                let interval = Duration::from_secs(settings.session.sweep_interval_secs.max(1));
                sweeper_handle = Some(tokio::spawn(
                    store.clone().run_sweeper(interval, cancel.clone()),
                ));
                store
            }
            "redis" => {
                let redis_client = redis::Client::open(settings.session.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session.key_prefix.clone(),
                    session_ttl,
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let principal_repo: Arc<dyn PrincipalRepo> = match settings.account.backend.as_str() {
            "memory" => Arc::new(MemoryPrincipalRepo::new()),
            "mysql" => match &pool {
                Some(pool) => Arc::new(MySqlPrincipalRepo::new(pool.clone())),
                None => return Err(anyhow::anyhow!("mysql pool not initialised")),
            },
            other => return Err(anyhow::anyhow!("Unknown account backend: {}", other)),
        };

        let api_key_store: Arc<dyn ApiKeyStore> = match settings.api_key.backend.as_str() {
            "memory" => Arc::new(MemoryApiKeyStore::new()),
            "mysql" => match &pool {
                Some(pool) => Arc::new(MySqlApiKeyStore::new(pool.clone())),
                None => return Err(anyhow::anyhow!("mysql pool not initialised")),
            },
            other => return Err(anyhow::anyhow!("Unknown api key backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtEdDsaCodec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            leeway_secs: settings.auth.leeway_secs,
        }));

        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthService::new()),
            "real" => Arc::new(RealAuthService::new(
                principal_repo,
                Arc::new(Argon2CredentialHasher),
                Arc::new(Ed25519KeyGenerator),
                token_codec,
                session_store,
            )),
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let api_key_service: Arc<dyn ApiKeyService> =
            Arc::new(RealApiKeyService::new(api_key_store));
        if let Some(seed) = settings.api_key.seed.as_deref().filter(|s| !s.is_empty()) {
            let key = api_key_service
                .install(seed, vec![Permission::Basic])
                .await?;
            info!(expires_at = %key.expires_at, "seed api key installed");
        }

        info!("server started");

        Ok(Self {
            auth_service,
            api_key_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = match self.sweeper_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("session sweeper dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
