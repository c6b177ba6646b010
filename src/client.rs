//! The typed public facade over the connection engine.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::connection::Connection;
use crate::error::{Error, ShutdownCause};
use crate::parser::{Response, ReturnCode};
use crate::pipeline::{Exchange, Pipeline};
use crate::proto::{validated_key, Flags, Request, StorageMode, Ttl};
use crate::value::MemcachedValue;

/// Client-side tunables.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the request queue; producers suspend when it is full.
    pub queue_capacity: usize,
    /// Largest value accepted for storage, in bytes.
    pub max_value_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            queue_capacity: 256,
            max_value_size: 1024 * 1024,
        }
    }
}

/// A cloneable handle submitting commands to one connection.
///
/// Every operation suspends until its paired response arrives or the engine
/// terminates. Handles share the engine's bounded request queue; requests
/// from a single handle complete in submission order.
#[derive(Clone)]
pub struct Client {
    sender: mpsc::Sender<Exchange>,
    max_value_size: usize,
}

impl Client {
    /// Connects to `dsn` with default [`Config`].
    ///
    /// Returns the client handle and the engine. The engine must be driven
    /// for any operation to make progress, typically by spawning
    /// [`Pipeline::run`] onto the runtime.
    pub async fn connect<S: AsRef<str>>(dsn: S) -> Result<(Client, Pipeline<Connection>), Error> {
        Self::connect_with(dsn, Config::default()).await
    }

    /// Connects to `dsn` with the given [`Config`].
    pub async fn connect_with<S: AsRef<str>>(
        dsn: S,
        config: Config,
    ) -> Result<(Client, Pipeline<Connection>), Error> {
        let connection = Connection::new(dsn.as_ref()).await?;
        Ok(Self::with_transport(connection, config))
    }

    /// Pairs a client handle and engine over an arbitrary byte stream.
    pub fn with_transport<T>(transport: T, config: Config) -> (Client, Pipeline<T>)
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let client = Client {
            sender,
            max_value_size: config.max_value_size,
        };
        (client, Pipeline::new(transport, receiver))
    }

    async fn exchange(&self, request: Request) -> Result<Response, Error> {
        let (completion, response) = oneshot::channel();
        self.sender
            .send(Exchange {
                request,
                completion,
            })
            .await
            .map_err(|_| Error::ConnectionShutdown(ShutdownCause::Terminated))?;
        response.await.map_err(|_| Error::Cancelled)?
    }

    async fn store<K, V>(
        &self,
        key: K,
        value: &V,
        ttl: Option<Ttl>,
        storage_mode: Option<StorageMode>,
    ) -> Result<ReturnCode, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        let key = validated_key(key.as_ref())?;
        let value = value.to_bytes().into_owned();
        if value.len() > self.max_value_size {
            return Err(Error::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }
        let flags = Flags {
            ttl,
            storage_mode,
            ..Flags::default()
        };
        let response = self.exchange(Request::Set { key, value, flags }).await?;
        Ok(response.code)
    }

    async fn arithmetic<K, V>(
        &self,
        key: K,
        mode: StorageMode,
        delta: u64,
        seed: Option<(u64, Ttl)>,
    ) -> Result<V, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        if !V::is_numeric() {
            return Err(Error::TypeMismatch);
        }
        let key = validated_key(key.as_ref())?;
        let flags = Flags {
            return_value: true,
            auto_vivify_ttl: seed.map(|(_, ttl)| ttl),
            storage_mode: Some(mode),
            initial_value: seed.map(|(initial, _)| initial),
            delta: Some(delta),
            ..Flags::default()
        };
        let response = self.exchange(Request::Arithmetic { key, flags }).await?;
        match response.code {
            ReturnCode::Value => {
                let data = response.data.as_deref().unwrap_or_default();
                V::from_bytes(data)
            }
            ReturnCode::NotStored | ReturnCode::NotFound | ReturnCode::Miss => {
                Err(Error::KeyNotFound)
            }
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Sets the given key, unconditionally.
    pub async fn set<K, V>(&self, key: K, value: &V, ttl: Option<Ttl>) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        match self.store(key, value, ttl, None).await? {
            ReturnCode::Stored => Ok(()),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Stores the given key only if it does not already exist.
    pub async fn add<K, V>(&self, key: K, value: &V, ttl: Option<Ttl>) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        match self.store(key, value, ttl, Some(StorageMode::Add)).await? {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotStored | ReturnCode::Exists => Err(Error::KeyExists),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Replaces the value of an existing key.
    pub async fn replace<K, V>(&self, key: K, value: &V, ttl: Option<Ttl>) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        match self
            .store(key, value, ttl, Some(StorageMode::Replace))
            .await?
        {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotStored | ReturnCode::NotFound => Err(Error::KeyNotFound),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Appends to the value of an existing key.
    pub async fn append<K, V>(&self, key: K, value: &V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        match self
            .store(key, value, None, Some(StorageMode::Append))
            .await?
        {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotStored | ReturnCode::NotFound => Err(Error::KeyNotFound),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Prepends to the value of an existing key.
    pub async fn prepend<K, V>(&self, key: K, value: &V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        match self
            .store(key, value, None, Some(StorageMode::Prepend))
            .await?
        {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotStored | ReturnCode::NotFound => Err(Error::KeyNotFound),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Gets the given key.
    ///
    /// Returns `Ok(None)` on a miss, or [`Error::Decode`] if the stored
    /// bytes do not decode as `V`.
    pub async fn get<K, V>(&self, key: K) -> Result<Option<V>, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        let key = validated_key(key.as_ref())?;
        let flags = Flags {
            return_value: true,
            ..Flags::default()
        };
        let response = self.exchange(Request::Get { key, flags }).await?;
        match response.code {
            ReturnCode::Value => {
                let data = response.data.as_deref().unwrap_or_default();
                V::from_bytes(data).map(Some)
            }
            ReturnCode::Stored | ReturnCode::Miss => Ok(None),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Deletes the given key.
    pub async fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        let key = validated_key(key.as_ref())?;
        let response = self.exchange(Request::Delete { key }).await?;
        match response.code {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotFound | ReturnCode::Miss => Err(Error::KeyNotFound),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Updates the time-to-live of an existing key without reading it.
    ///
    /// On the wire this is `mg` with a `T` flag and no `v`, so no value
    /// block comes back; `HD` means touched.
    pub async fn touch<K: AsRef<[u8]>>(&self, key: K, ttl: Ttl) -> Result<(), Error> {
        let key = validated_key(key.as_ref())?;
        let flags = Flags {
            ttl: Some(ttl),
            ..Flags::default()
        };
        let response = self.exchange(Request::Get { key, flags }).await?;
        match response.code {
            ReturnCode::Stored => Ok(()),
            ReturnCode::NotFound | ReturnCode::Miss => Err(Error::KeyNotFound),
            code => Err(Error::UnexpectedReturnCode(code)),
        }
    }

    /// Increments the numeric value of `key` by `delta`, returning the new
    /// value. Fails with [`Error::KeyNotFound`] if the key does not exist.
    pub async fn increment<K, V>(&self, key: K, delta: u64) -> Result<V, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        self.arithmetic(key, StorageMode::Increment, delta, None)
            .await
    }

    /// Like [`Client::increment`], but a missing key is created holding
    /// `initial_value` (with `ttl`, or no expiry) instead of failing.
    pub async fn increment_from<K, V>(
        &self,
        key: K,
        delta: u64,
        initial_value: u64,
        ttl: Option<Ttl>,
    ) -> Result<V, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        let seed = (initial_value, ttl.unwrap_or(Ttl::Indefinitely));
        self.arithmetic(key, StorageMode::Increment, delta, Some(seed))
            .await
    }

    /// Decrements the numeric value of `key` by `delta`, returning the new
    /// value. Decrementing below zero pins the value at zero, as the server
    /// does. Fails with [`Error::KeyNotFound`] if the key does not exist.
    pub async fn decrement<K, V>(&self, key: K, delta: u64) -> Result<V, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        self.arithmetic(key, StorageMode::Decrement, delta, None)
            .await
    }

    /// Like [`Client::decrement`], but a missing key is created holding
    /// `initial_value` (with `ttl`, or no expiry) instead of failing.
    pub async fn decrement_from<K, V>(
        &self,
        key: K,
        delta: u64,
        initial_value: u64,
        ttl: Option<Ttl>,
    ) -> Result<V, Error>
    where
        K: AsRef<[u8]>,
        V: MemcachedValue,
    {
        let seed = (initial_value, ttl.unwrap_or(Ttl::Indefinitely));
        self.arithmetic(key, StorageMode::Decrement, delta, Some(seed))
            .await
    }
}
