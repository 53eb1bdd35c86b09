use std::sync::Weak;

use moka::future::Cache;

use super::*;

type SessionSlot = Arc<Mutex<SwitchSession>>;
type KeyLock = Arc<Mutex<()>>;

/// Session pool keyed by device identity.
///
/// All work on one identity runs under that identity's lock, from session
/// lookup until the response has been read, because a shared shell cannot
/// attribute interleaved output to the command that produced it. Distinct
/// identities run in parallel.
///
/// A background task evicts sessions idle for longer than the retention
/// threshold. It stops on [`SessionPool::shutdown`] or when the pool is
/// dropped.
pub struct SessionPool<C: Connector = SshConnector> {
    inner: Arc<PoolInner<C>>,
    sweeper: JoinHandle<()>,
}

struct PoolInner<C> {
    connector: C,
    catalog: Arc<SignatureCatalog>,
    sink: Arc<dyn DiagnosticsSink>,
    config: PoolConfig,
    sessions: RwLock<HashMap<String, SessionSlot>>,
    /// Grows with the number of distinct identities and is never pruned.
    key_locks: Cache<String, KeyLock>,
}

impl SessionPool<SshConnector> {
    /// Pool dialing real switches over SSH.
    pub fn with_ssh(
        catalog: Arc<SignatureCatalog>,
        sink: Arc<dyn DiagnosticsSink>,
        config: PoolConfig,
        security_options: ConnectionSecurityOptions,
    ) -> Result<Self, ConnectError> {
        let connector = SshConnector::new(security_options, config.connect_timeout());
        Self::new(connector, catalog, sink, config)
    }
}

impl<C: Connector> SessionPool<C> {
    /// Creates the pool and starts its eviction sweep. Must be called from
    /// within a Tokio runtime.
    pub fn new(
        connector: C,
        catalog: Arc<SignatureCatalog>,
        sink: Arc<dyn DiagnosticsSink>,
        config: PoolConfig,
    ) -> Result<Self, ConnectError> {
        config.validate()?;
        let sweep_interval = config.sweep_interval();
        let inner = Arc::new(PoolInner {
            connector,
            catalog,
            sink,
            config,
            sessions: RwLock::new(HashMap::new()),
            key_locks: Cache::builder().build(),
        });
        let sweeper = tokio::spawn(run_sweeper(Arc::downgrade(&inner), sweep_interval));
        Ok(Self { inner, sweeper })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &SignatureCatalog {
        &self.inner.catalog
    }

    /// Runs `commands` on the device and returns the filtered response.
    ///
    /// `brand_hint` skips detection on a new session when it names a known
    /// brand. The response is filtered against the first command.
    pub async fn run_commands<S: AsRef<str> + Sync>(
        &self,
        target: &DeviceTarget,
        brand_hint: Option<&str>,
        commands: &[S],
    ) -> Result<String, ConnectError> {
        let Some(first) = commands.first() else {
            return Ok(String::new());
        };
        let key = target.identity_key();
        let held = self.inner.lock_key(&key).await;
        let slot = self
            .inner
            .resolve_session(&key, target, brand_hint, &held)
            .await?;

        let mut session = slot.lock().await;
        session.write(commands).await?;
        let raw = session.read_timing(self.inner.config.command_quiet()).await;
        Ok(filter_output(&raw, first.as_ref()))
    }

    /// Detected brand of the device, empty when unknown.
    pub async fn brand(&self, target: &DeviceTarget) -> Result<String, ConnectError> {
        let key = target.identity_key();
        let held = self.inner.lock_key(&key).await;
        let slot = self.inner.resolve_session(&key, target, None, &held).await?;

        let mut session = slot.lock().await;
        session
            .detect_brand(
                &self.inner.catalog,
                self.inner.sink.as_ref(),
                self.inner.config.probe_quiet(),
            )
            .await
    }

    /// Dumps the MAC address table using the command of the device's
    /// signature, preceded by its pager command when it has one.
    pub async fn mac_address_table(&self, target: &DeviceTarget) -> Result<String, ConnectError> {
        let brand = self.brand(target).await?;
        if brand.is_empty() {
            return Err(ConnectError::UnknownBrand(target.device_addr()));
        }
        let signature = self
            .inner
            .catalog
            .by_name(&brand)
            .filter(|sig| !sig.mac_addr_list.trim().is_empty())
            .ok_or_else(|| ConnectError::SignatureNotFound(brand.clone()))?;

        let mut commands = Vec::with_capacity(2);
        if !signature.pager.trim().is_empty() {
            commands.push(signature.pager.clone());
        }
        commands.push(signature.mac_addr_list.clone());
        self.run_commands(target, Some(&brand), commands.as_slice())
            .await
    }

    /// Evicts sessions idle past the retention threshold whose identity lock
    /// is free. Returns the evicted identity keys.
    pub async fn sweep(&self) -> Vec<String> {
        self.inner.sweep().await
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn contains(&self, target: &DeviceTarget) -> bool {
        self.inner
            .sessions
            .read()
            .await
            .contains_key(&target.identity_key())
    }

    /// Stops the sweep and closes every cached session.
    pub async fn shutdown(&self) {
        self.sweeper.abort();
        let drained: Vec<(String, SessionSlot)> =
            self.inner.sessions.write().await.drain().collect();
        for (key, slot) in drained {
            debug!("Shutdown closing session {}", key);
            slot.lock().await.close().await;
        }
    }
}

impl<C: Connector> Drop for SessionPool<C> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

impl<C: Connector> PoolInner<C> {
    /// Identity lock, created at most once per key even under contention.
    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .key_locks
            .get_with(key.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }

    /// Returns a live session for `key`, replacing a dead cached one.
    /// The caller proves it holds the identity lock.
    async fn resolve_session(
        &self,
        key: &str,
        target: &DeviceTarget,
        brand_hint: Option<&str>,
        _held: &OwnedMutexGuard<()>,
    ) -> Result<SessionSlot, ConnectError> {
        let device_addr = target.device_addr();
        let cached = self.sessions.read().await.get(key).cloned();

        if let Some(slot) = cached {
            let alive = {
                let mut session = slot.lock().await;
                if session.check_liveness(self.config.liveness_quiet()).await {
                    session.touch();
                    true
                } else {
                    session.close().await;
                    false
                }
            };
            if alive {
                debug!("Cache hit: {}", device_addr);
                return Ok(slot);
            }
            debug!("Cached session {} failed liveness, reconnecting", device_addr);
            self.sessions.write().await.remove(key);
        } else {
            debug!("Cache miss, creating new session for {}...", device_addr);
        }

        let session = self.create_session(target, brand_hint).await?;
        let slot = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .await
            .insert(key.to_string(), slot.clone());
        debug!("New session for {} has been cached.", device_addr);
        Ok(slot)
    }

    async fn create_session(
        &self,
        target: &DeviceTarget,
        brand_hint: Option<&str>,
    ) -> Result<SwitchSession, ConnectError> {
        let transport = self.connector.connect(target).await?;
        let mut session = SwitchSession::open(
            target.device_addr(),
            transport,
            self.config.read_timing(),
            self.config.banner_quiet(),
        )
        .await?;

        if let Err(e) = self.initialize(&mut session, brand_hint).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Settles the brand and disables pagination.
    async fn initialize(
        &self,
        session: &mut SwitchSession,
        brand_hint: Option<&str>,
    ) -> Result<(), ConnectError> {
        let brand = match brand_hint.filter(|hint| templates::is_known_brand(hint, &self.catalog))
        {
            Some(hint) => {
                session.set_brand(hint);
                hint.to_string()
            }
            None => {
                session
                    .detect_brand(&self.catalog, self.sink.as_ref(), self.config.probe_quiet())
                    .await?
            }
        };

        if let Some(pager) = templates::pager_command(&brand, &self.catalog) {
            debug!("{} Disabling pagination: {}", session.device_addr(), pager);
            session.write(&[pager]).await?;
            session
                .read_expect(self.config.pager_quiet(), PROMPT_CHARS)
                .await;
        }
        session.mark_active();
        Ok(())
    }

    async fn sweep(&self) -> Vec<String> {
        let retention = self.config.retention();
        let mut sessions = self.sessions.write().await;
        let keys: Vec<String> = sessions.keys().cloned().collect();
        let mut evicted = Vec::new();

        for key in keys {
            let Some(lock) = self.key_locks.get(&key).await else {
                continue;
            };
            let Ok(_held) = lock.try_lock_owned() else {
                trace!("Session {} busy, retrying next sweep", key);
                continue;
            };
            let Some(slot) = sessions.get(&key).cloned() else {
                continue;
            };
            let Ok(mut session) = slot.try_lock() else {
                continue;
            };
            let idle = session.idle_for();
            if idle <= retention {
                continue;
            }

            debug!(
                "Evicting session {} <unused for {:?}>",
                session.device_addr(),
                idle
            );
            session.close().await;
            drop(session);
            sessions.remove(&key);
            evicted.push(key);
        }
        evicted
    }
}

async fn run_sweeper<C: Connector>(inner: Weak<PoolInner<C>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let evicted = inner.sweep().await;
        if !evicted.is_empty() {
            debug!("Sweep evicted {} idle sessions", evicted.len());
        }
    }
}
