use super::*;

/// Size of the inbound scratch buffer.
const SCRATCH_SIZE: usize = 65 * 1024;

/// Capacity of the inbound and outbound queues.
pub(super) const QUEUE_CAPACITY: usize = 1024;

/// Upper bound for flushing queued lines when a session closes.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Health of a session's stream pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PumpStatus {
    Running,
    /// The shell hung up or the session was closed.
    Closed,
    /// A read or write on the transport failed.
    Faulted,
}

/// First terminal status wins; later ones are ignored.
fn publish(status: &watch::Sender<PumpStatus>, next: PumpStatus) {
    status.send_if_modified(|current| {
        if *current == PumpStatus::Running {
            *current = next;
            true
        } else {
            false
        }
    });
}

/// The two I/O tasks of one shell and the queues connecting them to callers.
pub(super) struct StreamPump {
    outbound: Option<Sender<String>>,
    inbound: Receiver<String>,
    status: watch::Receiver<PumpStatus>,
    reader_task: JoinHandle<()>,
    writer_task: Option<JoinHandle<()>>,
}

impl StreamPump {
    pub(super) fn start(device_addr: &str, transport: ShellTransport) -> Self {
        let ShellTransport { reader, writer, .. } = transport;
        let (outbound_tx, outbound_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
        let (status_tx, status_rx) = watch::channel(PumpStatus::Running);
        let status_tx = Arc::new(status_tx);

        let reader_task = tokio::spawn(pump_inbound(
            reader,
            inbound_tx,
            status_tx.clone(),
            device_addr.to_string(),
        ));
        let writer_task = tokio::spawn(pump_outbound(
            writer,
            outbound_rx,
            status_tx,
            device_addr.to_string(),
        ));

        Self {
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            status: status_rx,
            reader_task,
            writer_task: Some(writer_task),
        }
    }

    /// Published status, or `Faulted` when a task ended without publishing.
    pub(super) fn status(&self) -> PumpStatus {
        let published = *self.status.borrow();
        if published != PumpStatus::Running {
            return published;
        }
        let writer_gone = self
            .writer_task
            .as_ref()
            .is_none_or(|task| task.is_finished());
        if self.reader_task.is_finished() || writer_gone {
            return PumpStatus::Faulted;
        }
        PumpStatus::Running
    }

    pub(super) async fn send(&self, line: String) -> Result<(), ConnectError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(ConnectError::ConnectClosedError)?;
        outbound.send(line).await?;
        Ok(())
    }

    pub(super) fn inbound(&mut self) -> &mut Receiver<String> {
        &mut self.inbound
    }

    /// Flushes queued lines, shuts the transport down and stops both tasks.
    pub(super) async fn shutdown(&mut self, device_addr: &str) {
        // Closing the queue lets the writer drain it and shut the stream.
        self.outbound.take();
        if let Some(task) = self.writer_task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, task).await.is_err() {
                debug!("{} Writer did not drain in time, aborting", device_addr);
                abort.abort();
            }
        }
        self.reader_task.abort();
        let _ = (&mut self.reader_task).await;
        self.inbound.close();
    }
}

impl Drop for StreamPump {
    fn drop(&mut self) {
        self.reader_task.abort();
        if let Some(task) = self.writer_task.as_ref() {
            task.abort();
        }
    }
}

/// Decodes the complete characters in `pending`, leaving a trailing partial
/// character for the next read. Invalid sequences become U+FFFD.
fn decode_available(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut rest = pending.as_slice();
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                rest = &[];
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }
    let carried = rest.len();
    pending.drain(..pending.len() - carried);
    text
}

async fn pump_inbound(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    inbound: Sender<String>,
    status: Arc<watch::Sender<PumpStatus>>,
    device_addr: String,
) {
    let mut scratch = vec![0u8; SCRATCH_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => {
                if !pending.is_empty() {
                    let tail = String::from_utf8_lossy(&pending).into_owned();
                    let _ = inbound.send(tail).await;
                }
                debug!("{} Shell sent EOF.", device_addr);
                publish(&status, PumpStatus::Closed);
                break;
            }
            Ok(n) => {
                pending.extend_from_slice(&scratch[..n]);
                let chunk = decode_available(&mut pending);
                if chunk.is_empty() {
                    continue;
                }
                trace!("{:?}", chunk);
                if inbound.send(chunk).await.is_err() {
                    debug!("{} Shell output receiver dropped.", device_addr);
                    publish(&status, PumpStatus::Closed);
                    break;
                }
            }
            Err(e) => {
                debug!("{} Reader read err: {:?}", device_addr, e);
                publish(&status, PumpStatus::Faulted);
                break;
            }
        }
    }
    debug!("{} Inbound pump ended.", device_addr);
}

async fn pump_outbound(
    mut writer: Box<dyn AsyncWrite + Send + Unpin>,
    mut outbound: Receiver<String>,
    status: Arc<watch::Sender<PumpStatus>>,
    device_addr: String,
) {
    while let Some(command) = outbound.recv().await {
        let line = format!("{command}\n");
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            debug!("{} Writer write err: {:?}", device_addr, e);
            publish(&status, PumpStatus::Faulted);
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!("{} Writer shutdown err: {:?}", device_addr, e);
    }
    publish(&status, PumpStatus::Closed);
    debug!("{} Outbound pump ended.", device_addr);
}
