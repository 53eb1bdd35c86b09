use super::pump::StreamPump;
use super::reader::read_until_idle;
use super::*;

/// One interactive switch shell.
///
/// Commands are queued to the outbound pump and answers are collected by
/// idle-timeout reads. A session is not safe to share between concurrent
/// command cycles; the pool serializes access per identity.
pub struct SwitchSession {
    device_addr: String,
    pump: StreamPump,
    client: Option<Client>,
    timing: ReadTiming,
    brand: Option<String>,
    state: SessionState,
    last_used: Instant,
}

impl SwitchSession {
    /// Starts the stream pump on an established shell and drains the login
    /// banner up to the first prompt.
    pub async fn open(
        device_addr: impl Into<String>,
        mut transport: ShellTransport,
        timing: ReadTiming,
        banner_quiet: Duration,
    ) -> Result<Self, ConnectError> {
        let device_addr = device_addr.into();
        let client = transport.take_client();
        let pump = StreamPump::start(&device_addr, transport);

        let mut session = Self {
            device_addr,
            pump,
            client,
            timing,
            brand: None,
            state: SessionState::Connecting,
            last_used: Instant::now(),
        };

        let banner = session.read_expect(banner_quiet, PROMPT_CHARS).await;
        trace!("{} login banner: {:?}", session.device_addr, banner);
        if banner.is_empty() && session.pump.status() != PumpStatus::Running {
            debug!("{} Shell closed before the first prompt", session.device_addr);
            session.close().await;
            return Err(ConnectError::ChannelDisconnectError);
        }

        session.state = SessionState::ShellReady;
        debug!("{} Shell ready", session.device_addr);
        Ok(session)
    }

    pub fn device_addr(&self) -> &str {
        &self.device_addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pump_status(&self) -> PumpStatus {
        self.pump.status()
    }

    /// Brand detected or adopted for this session, if any.
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    /// Adopts a brand without probing. Ignored once a brand is set.
    pub fn set_brand(&mut self, brand: impl Into<String>) {
        if self.brand.is_none() {
            self.brand = Some(brand.into());
        }
    }

    pub(super) fn mark_active(&mut self) {
        if self.state == SessionState::ShellReady {
            self.state = SessionState::Active;
        }
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Queues each command as one line. Returns once all are queued.
    pub async fn write<S: AsRef<str>>(&self, commands: &[S]) -> Result<(), ConnectError> {
        if self.state == SessionState::Closed {
            return Err(ConnectError::ConnectClosedError);
        }
        trace!(
            "{} WriteChannel <cmds={:?}>",
            self.device_addr,
            commands.iter().map(|c| c.as_ref()).collect::<Vec<_>>()
        );
        for command in commands {
            self.pump.send(command.as_ref().to_string()).await?;
        }
        Ok(())
    }

    /// Reads until output stops and contains one of `expects`, or until the
    /// shell stays quiet through one grace period.
    pub async fn read_expect(&mut self, quiet: Duration, expects: &[&str]) -> String {
        let timing = self.timing;
        read_until_idle(self.pump.inbound(), timing, quiet, expects).await
    }

    /// Reads until the shell stays quiet through one grace period.
    pub async fn read_timing(&mut self, quiet: Duration) -> String {
        let timing = self.timing;
        read_until_idle(self.pump.inbound(), timing, quiet, &[]).await
    }

    /// Whether the shell still answers with a prompt.
    ///
    /// A pump that already reported a hang-up or fault fails immediately;
    /// otherwise a blank line is sent and a prompt character expected back.
    pub async fn check_liveness(&mut self, quiet: Duration) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        let status = self.pump.status();
        if status != PumpStatus::Running {
            debug!("{} Pump is {:?}", self.device_addr, status);
            return false;
        }
        if let Err(e) = self.write(&[""]).await {
            debug!("{} Liveness write failed: {}", self.device_addr, e);
            return false;
        }
        let answer = self.read_expect(quiet, PROMPT_CHARS).await;
        PROMPT_CHARS.iter().any(|prompt| answer.contains(prompt))
    }

    /// Fingerprints the device once and caches the result.
    ///
    /// Probe output that matches no signature goes to `sink` and an empty
    /// brand is returned.
    pub async fn detect_brand(
        &mut self,
        catalog: &SignatureCatalog,
        sink: &dyn DiagnosticsSink,
        probe_quiet: Duration,
    ) -> Result<String, ConnectError> {
        if let Some(brand) = &self.brand {
            return Ok(brand.clone());
        }

        self.write(templates::brand_probe_lines().as_slice()).await?;
        let evidence = self.read_timing(probe_quiet).await;

        // Model and version evidence come from the same capture.
        match catalog.verify_model_and_version(&evidence, &evidence) {
            Some(signature) => {
                debug!(
                    "{} Match found: {} ({})",
                    self.device_addr, signature.name, signature.description
                );
                self.brand = Some(signature.name.clone());
                Ok(signature.name.clone())
            }
            None => {
                debug!("{} No signature matched the probe output", self.device_addr);
                if let Err(e) = sink.record_unknown(&self.device_addr, &evidence).await {
                    warn!("{} Failed to record unknown device: {}", self.device_addr, e);
                }
                Ok(String::new())
            }
        }
    }

    /// Closes the shell and releases both queues. Later calls do nothing.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        debug!("{} Closing session", self.device_addr);
        self.state = SessionState::Closed;
        self.pump.shutdown(&self.device_addr).await;
        if let Some(client) = self.client.take()
            && let Err(e) = client.disconnect().await
        {
            debug!("{} Error disconnecting: {}", self.device_addr, e);
        }
        debug!("{} Session closed", self.device_addr);
    }
}
