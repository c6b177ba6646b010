//! A Tokio-based memcached client speaking the text meta protocol (the
//! `mg`/`ms`/`md`/`ma` command family) over a single multiplexed connection.
//!
//! Commands are submitted through a cloneable [`Client`] handle and driven
//! by a [`Pipeline`] engine that owns the transport. The engine pipelines
//! requests onto the wire and pairs responses back to callers in FIFO
//! order.
//!
//! ```no_run
//! use metacached::{Client, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let (client, mut pipeline) = Client::connect("tcp://127.0.0.1:11211").await?;
//!     tokio::spawn(async move {
//!         let _ = pipeline.run().await;
//!     });
//!
//!     client.set("greeting", &String::from("hello"), None).await?;
//!     let greeting: Option<String> = client.get("greeting").await?;
//!     assert_eq!(greeting.as_deref(), Some("hello"));
//!     Ok(())
//! }
//! ```
#![deny(warnings)]

mod client;
pub use self::client::{Client, Config};

mod connection;
pub use self::connection::Connection;

mod error;
pub use self::error::{Error, ShutdownCause};

mod parser;
pub use self::parser::{parse_meta_response, Response, ReturnCode};

mod pipeline;
pub use self::pipeline::Pipeline;

mod proto;
pub use self::proto::{Flags, Request, StorageMode, Ttl, MAX_KEY_LENGTH};

mod value;
pub use self::value::MemcachedValue;
