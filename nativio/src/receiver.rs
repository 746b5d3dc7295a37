//! Batched UDP receive loop.
//!
//! [`DatagramReceiver`] owns a non-blocking UDP socket and a
//! [`MsgHeaders`] batch. Each [`drain`](DatagramReceiver::drain) pulls
//! batches until the socket has nothing queued, hands every datagram to a
//! [`DatagramSink`] and asks the sink to commit every
//! [`commit_rate`](ReceiverConfig::commit_rate) datagrams and once at the
//! end.

use std::{fmt, io, net::Ipv4Addr};

use crate::{
  error::NetError,
  msg::MsgHeaders,
  net::Socket,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
  /// Host-order address to bind to, or the interface joining `group_ip`.
  pub bind_ip: u32,
  /// Multicast group to join. When set the socket binds to `INADDR_ANY`.
  pub group_ip: Option<u32>,
  pub port: u16,
  /// Records per batch receive.
  pub msg_count: usize,
  /// Bytes per record; longer datagrams are truncated.
  pub msg_buffer_size: usize,
  /// `SO_RCVBUF` to request; the kernel default when `None`.
  pub receive_buffer_size: Option<usize>,
  /// Datagrams between two commits.
  pub commit_rate: u64,
}

impl Default for ReceiverConfig {
  fn default() -> Self {
    ReceiverConfig {
      bind_ip: 0,
      group_ip: None,
      port: 9009,
      msg_count: 10_000,
      msg_buffer_size: 2048,
      receive_buffer_size: None,
      commit_rate: 1024 * 1024,
    }
  }
}

impl ReceiverConfig {
  pub fn with_bind_ip(mut self, ip: u32) -> Self {
    self.bind_ip = ip;
    self
  }

  pub fn with_group(mut self, group_ip: u32) -> Self {
    self.group_ip = Some(group_ip);
    self
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = port;
    self
  }

  pub fn with_msg_count(mut self, count: usize) -> Self {
    self.msg_count = count;
    self
  }

  pub fn with_msg_buffer_size(mut self, size: usize) -> Self {
    self.msg_buffer_size = size;
    self
  }

  pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
    self.receive_buffer_size = Some(size);
    self
  }

  pub fn with_commit_rate(mut self, rate: u64) -> Self {
    self.commit_rate = rate;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.msg_count == 0 {
      return Err(ConfigError::ZeroMsgCount);
    }
    if self.msg_buffer_size == 0 {
      return Err(ConfigError::ZeroMsgBufferSize);
    }
    if self.receive_buffer_size == Some(0) {
      return Err(ConfigError::ZeroReceiveBufferSize);
    }
    if let Some(group) = self.group_ip
      && !Ipv4Addr::from(group).is_multicast()
    {
      return Err(ConfigError::NotMulticast(group));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
  ZeroMsgCount,
  ZeroMsgBufferSize,
  ZeroReceiveBufferSize,
  NotMulticast(u32),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::ZeroMsgCount => f.write_str("msg_count must be positive"),
      ConfigError::ZeroMsgBufferSize => {
        f.write_str("msg_buffer_size must be positive")
      }
      ConfigError::ZeroReceiveBufferSize => {
        f.write_str("receive_buffer_size must be positive when set")
      }
      ConfigError::NotMulticast(ip) => {
        write!(f, "{} is not a multicast group", Ipv4Addr::from(*ip))
      }
    }
  }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum ReceiverError {
  Config(ConfigError),
  Io(io::Error),
}

impl fmt::Display for ReceiverError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReceiverError::Config(err) => write!(f, "invalid receiver config: {err}"),
      ReceiverError::Io(err) => write!(f, "receiver setup failed: {err}"),
    }
  }
}

impl std::error::Error for ReceiverError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReceiverError::Config(err) => Some(err),
      ReceiverError::Io(err) => Some(err),
    }
  }
}

impl From<ConfigError> for ReceiverError {
  fn from(err: ConfigError) -> Self {
    ReceiverError::Config(err)
  }
}

impl From<io::Error> for ReceiverError {
  fn from(err: io::Error) -> Self {
    ReceiverError::Io(err)
  }
}

impl From<NetError> for ReceiverError {
  fn from(err: NetError) -> Self {
    ReceiverError::Io(err.into())
  }
}

/// Consumer of received datagrams.
pub trait DatagramSink {
  fn on_datagram(&mut self, datagram: &[u8]);

  /// Called every `commit_rate` datagrams and after every non-empty drain.
  fn commit(&mut self) {}
}

impl<F: FnMut(&[u8])> DatagramSink for F {
  fn on_datagram(&mut self, datagram: &[u8]) {
    self(datagram)
  }
}

pub struct DatagramReceiver {
  socket: Socket,
  batch: MsgHeaders,
  config: ReceiverConfig,
  total: u64,
  since_commit: u64,
}

impl DatagramReceiver {
  pub fn bind(config: ReceiverConfig) -> Result<DatagramReceiver, ReceiverError> {
    config.validate()?;

    let socket = Socket::udp()?;
    match config.group_ip {
      Some(group) => {
        // Multicast datagrams only reach a socket bound to the wildcard.
        socket.bind(0, config.port)?;
        socket.join(config.bind_ip, group)?;
      }
      None => socket.bind(config.bind_ip, config.port)?,
    }

    if let Some(size) = config.receive_buffer_size
      && let Err(err) = socket.set_rcv_buf(size)
    {
      tracing::warn!(
        fd = socket.raw(),
        size,
        error = %err,
        "cannot set receive buffer size"
      );
    }

    let batch = MsgHeaders::new(config.msg_count, config.msg_buffer_size)?;

    tracing::info!(
      fd = socket.raw(),
      bind = %Ipv4Addr::from(config.bind_ip),
      group = ?config.group_ip.map(Ipv4Addr::from),
      port = config.port,
      batch = config.msg_count,
      commit_rate = config.commit_rate,
      "receiver started"
    );
    Ok(DatagramReceiver { socket, batch, config, total: 0, since_commit: 0 })
  }

  /// Receives until the socket reports retry. Returns whether anything was
  /// received.
  pub fn drain<S: DatagramSink + ?Sized>(
    &mut self,
    sink: &mut S,
  ) -> Result<bool, NetError> {
    let count = self.batch.len();
    let mut ran = false;
    loop {
      let received = match self.socket.recv_batch(&mut self.batch, count) {
        Ok(received) => received,
        Err(err) if err.is_retry() => break,
        Err(err) => return Err(err),
      };
      for datagram in self.batch.messages(received) {
        sink.on_datagram(datagram);
      }
      self.total += received as u64;
      self.since_commit += received as u64;
      if self.since_commit > self.config.commit_rate {
        self.since_commit = 0;
        sink.commit();
      }
      ran = true;
    }
    if ran {
      sink.commit();
    }
    Ok(ran)
  }

  /// Datagrams received since [`bind`](DatagramReceiver::bind).
  pub fn total_messages(&self) -> u64 {
    self.total
  }

  pub fn local_port(&self) -> Result<u16, NetError> {
    self
      .socket
      .local_addr()?
      .port()
      .ok_or_else(|| NetError::from_errno(libc::EAFNOSUPPORT))
  }

  pub fn socket(&self) -> &Socket {
    &self.socket
  }

  pub fn config(&self) -> &ReceiverConfig {
    &self.config
  }

  pub fn close(self) -> io::Result<()> {
    let fd = self.socket.raw();
    self.socket.close()?;
    tracing::info!(fd, total = self.total, "receiver closed");
    Ok(())
  }
}
