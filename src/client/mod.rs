//! Client Module
//!
//! Blocking client for the emulator.
//!
//! ```no_run
//! use bigcell::client::Client;
//!
//! # fn main() -> bigcell::Result<()> {
//! let client = Client::from_env("some_random_project_id", "some_random_instance_id")?;
//! let table = client.table("some_random_table_id");
//! if !table.exists()? {
//!     table.create(Default::default())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A `Client` holds one connection; requests on it are serialized. Clones
//! share the connection.

mod row;
mod table;

pub use row::{AppendRow, ConditionalRow, DirectRow};
pub use table::{ReadRowsQuery, Table};

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EMULATOR_HOST_ENV;
use crate::error::{BigcellError, Result};
use crate::model::{instance_path, table_path};
use crate::protocol::{decode_reply, read_response, write_command, Command, Reply};

/// Buffered request/response pair over one TCP stream
struct ClientConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl ClientConnection {
    fn open(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| {
            BigcellError::Network(format!("Failed to connect to {}: {}", addr, e))
        })?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    fn round_trip(&mut self, command: &Command) -> Result<Reply> {
        write_command(&mut self.writer, command)?;
        let payload = read_response(&mut self.reader)?.into_result()?;
        let payload = payload.ok_or_else(|| {
            BigcellError::Protocol("OK response without a reply".to_string())
        })?;
        decode_reply(&payload)
    }
}

struct Inner {
    addr: String,
    project: String,
    instance: String,

    /// `None` after a transport failure; reopened on the next call
    connection: Mutex<Option<ClientConnection>>,
}

/// Handle to an emulator instance
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Connect to the emulator at `addr` (`host:port`)
    pub fn connect(addr: &str, project: &str, instance: &str) -> Result<Self> {
        let connection = ClientConnection::open(addr)?;
        tracing::debug!("Connected to emulator at {}", addr);

        Ok(Self {
            inner: Arc::new(Inner {
                addr: addr.to_string(),
                project: project.to_string(),
                instance: instance.to_string(),
                connection: Mutex::new(Some(connection)),
            }),
        })
    }

    /// Connect to the emulator named by `BIGTABLE_EMULATOR_HOST`
    pub fn from_env(project: &str, instance: &str) -> Result<Self> {
        let addr = std::env::var(EMULATOR_HOST_ENV).map_err(|_| {
            BigcellError::Config(format!("{} is not set", EMULATOR_HOST_ENV))
        })?;
        if addr.trim().is_empty() {
            return Err(BigcellError::Config(format!("{} is empty", EMULATOR_HOST_ENV)));
        }
        Self::connect(addr.trim(), project, instance)
    }

    /// Handle to a table of this instance (the table may not exist yet)
    pub fn table(&self, table_id: &str) -> Table {
        Table::new(
            self.clone(),
            table_id,
            table_path(&self.inner.project, &self.inner.instance, table_id),
        )
    }

    /// Short ids of the instance's tables
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let parent = instance_path(&self.inner.project, &self.inner.instance);
        match self.call(Command::ListTables { parent })? {
            Reply::Tables(names) => Ok(names
                .iter()
                .map(|name| crate::model::table_id(name).to_string())
                .collect()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn ping(&self) -> Result<()> {
        match self.call(Command::Ping)? {
            Reply::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    pub fn project(&self) -> &str {
        &self.inner.project
    }

    pub fn instance(&self) -> &str {
        &self.inner.instance
    }

    /// Send one command and wait for its reply
    pub(crate) fn call(&self, command: Command) -> Result<Reply> {
        let mut guard = self.inner.connection.lock();
        if guard.is_none() {
            tracing::debug!("Reconnecting to {}", self.inner.addr);
            *guard = Some(ClientConnection::open(&self.inner.addr)?);
        }

        let connection = match guard.as_mut() {
            Some(connection) => connection,
            None => {
                return Err(BigcellError::Network(format!(
                    "No connection to {}",
                    self.inner.addr
                )))
            }
        };

        let result = connection.round_trip(&command);
        if let Err(BigcellError::Io(_) | BigcellError::Protocol(_)) = &result {
            // The stream may hold half a frame; start over next time
            *guard = None;
        }
        result
    }
}

/// Error for a reply of the wrong kind
pub(crate) fn unexpected(reply: &Reply) -> BigcellError {
    BigcellError::Protocol(format!("Unexpected reply: {:?}", reply))
}
