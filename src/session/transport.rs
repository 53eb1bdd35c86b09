use super::*;

/// An established interactive shell: a byte stream in both directions plus
/// whatever keeps the underlying connection alive.
pub struct ShellTransport {
    pub(super) reader: Box<dyn AsyncRead + Send + Unpin>,
    pub(super) writer: Box<dyn AsyncWrite + Send + Unpin>,
    client: Option<Client>,
}

impl ShellTransport {
    /// Wraps any duplex byte stream, e.g. an SSH channel stream or an
    /// in-memory pipe standing in for a switch.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            client: None,
        }
    }

    fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub(super) fn take_client(&mut self) -> Option<Client> {
        self.client.take()
    }
}

/// Source of shells for the pool.
///
/// Errors returned here are creation errors: they reach the caller and are
/// never retried by the pool.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        target: &DeviceTarget,
    ) -> impl Future<Output = Result<ShellTransport, ConnectError>> + Send;
}

/// Opens shells over SSH with password authentication.
#[derive(Debug, Clone)]
pub struct SshConnector {
    security_options: ConnectionSecurityOptions,
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(security_options: ConnectionSecurityOptions, connect_timeout: Duration) -> Self {
        Self {
            security_options,
            connect_timeout,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(
            ConnectionSecurityOptions::legacy_compatible(),
            PoolConfig::default().connect_timeout(),
        )
    }
}

impl Connector for SshConnector {
    async fn connect(&self, target: &DeviceTarget) -> Result<ShellTransport, ConnectError> {
        let device_addr = target.device_addr();

        // Pooled shells sit idle for minutes; staleness is caught by the
        // liveness probe instead of an SSH inactivity timer.
        let config = Config {
            preferred: self.security_options.preferred(),
            inactivity_timeout: None,
            ..Default::default()
        };

        let client = tokio::time::timeout(
            self.connect_timeout,
            Client::connect_with_config(
                (target.addr.clone(), target.port),
                &target.user,
                AuthMethod::with_password(&target.password),
                self.security_options.server_check.clone(),
                config,
            ),
        )
        .await
        .map_err(|_| ConnectError::ConnectTimeout(device_addr.clone()))??;
        debug!("{} TCP connection successful", device_addr);

        let channel = client.get_channel().await?;
        channel
            .request_pty(
                false,
                "vt100",
                80,
                40,
                0,
                0,
                &[
                    (russh::Pty::ECHO, 1),
                    (russh::Pty::TTY_OP_ISPEED, 14400),
                    (russh::Pty::TTY_OP_OSPEED, 14400),
                ],
            )
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        Ok(ShellTransport::from_stream(channel.into_stream()).with_client(client))
    }
}
