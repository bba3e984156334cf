// src/sim.rs - Simulated servo-bus controller
//
// Speaks the controller side of the wire protocol over any async byte
// stream. Used by the tests and by `aracna-host --simulate`.
use crate::config::Config;
use crate::protocol::{Command, Protocol};
use crate::trajectory::Position;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// Misbehaviour to inject. Request indices count every request received,
/// starting at 0.
#[derive(Debug, Clone, Default)]
pub struct SimFaults {
    /// Answer the first N handshakes with garbage.
    pub ignore_hellos: usize,
    /// Reply to this request with the QUERY token regardless of the request.
    pub wrong_token_at: Option<usize>,
    /// Drop the last item from the reply to this request.
    pub short_reply_at: Option<usize>,
    /// Never answer this request (nor anything after it).
    pub silent_from: Option<usize>,
}

/// What the controller saw over one connection.
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub hellos: usize,
    pub queries: usize,
    /// Every goal vector received, in order.
    pub positions: Vec<Position>,
    pub unknown: usize,
}

/// Controller state: current servo positions and fault schedule.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    protocol: Protocol,
    positions: Position,
    faults: SimFaults,
    requests: usize,
    report: SimReport,
}

impl SimulatedController {
    pub fn new(protocol: Protocol, initial: Position, faults: SimFaults) -> Self {
        Self {
            protocol,
            positions: initial,
            faults,
            requests: 0,
            report: SimReport::default(),
        }
    }

    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    pub fn report(&self) -> &SimReport {
        &self.report
    }

    /// Process one request line and produce the reply line, if any.
    pub fn respond(&mut self, line: &str) -> Option<String> {
        let index = self.requests;
        self.requests += 1;

        let Some((command, args)) = self.protocol.parse_request(line) else {
            self.report.unknown += 1;
            tracing::warn!("Simulator got unknown request {:?}", line.trim_end());
            return Some(format!("ERR{}", self.protocol.end_marker));
        };

        match command {
            Command::Hello => self.report.hellos += 1,
            Command::Query => self.report.queries += 1,
            Command::Position => {
                self.report.positions.push(args.clone());
                if args.len() == self.positions.len() {
                    self.positions = args;
                }
            }
        }

        if self.faults.silent_from.is_some_and(|from| index >= from) {
            return None;
        }
        if command == Command::Hello {
            if self.report.hellos <= self.faults.ignore_hellos {
                return Some(format!("??{}", self.protocol.end_marker));
            }
            return Some(self.protocol.encode(Command::Hello, None));
        }

        let token = if self.faults.wrong_token_at == Some(index) {
            Command::Query
        } else {
            command
        };
        let mut items = self.positions.clone();
        if self.faults.short_reply_at == Some(index) {
            items.pop();
        }
        Some(self.protocol.encode(token, Some(&items)))
    }

    /// Serve requests until the host closes its end of the stream.
    pub async fn serve<S>(mut self, stream: S) -> std::io::Result<SimReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if stream.read_line(&mut line).await? == 0 {
                break;
            }
            if let Some(reply) = self.respond(&line) {
                stream.write_all(reply.as_bytes()).await?;
                stream.flush().await?;
            }
        }
        tracing::debug!("Simulator connection closed after {} requests", self.requests);
        Ok(self.report)
    }
}

/// Start a simulated controller for `config` on an in-memory stream and
/// return the host end together with the serving task.
pub fn spawn_simulated(
    config: &Config,
    initial: Position,
    faults: SimFaults,
) -> (DuplexStream, JoinHandle<std::io::Result<SimReport>>) {
    let (host, device) = tokio::io::duplex(4096);
    let controller = SimulatedController::new(config.protocol.clone(), initial, faults);
    let handle = tokio::spawn(controller.serve(device));
    (host, handle)
}
