#![allow(clippy::result_large_err)]
//! # replit-object-storage
//!
//! Object storage client for Replit. A client works against a single Google Cloud Storage
//! bucket, either named explicitly or looked up through the local Replit sidecar.
//!
//! ## Quick Start
//!
//! ### Default bucket
//!
//! On Replit the bucket and the credentials both come from the sidecar. The client resolves
//! them in the background; construction never fails and never blocks.
//!
//! ```
//! use replit_object_storage::client::Client;
//!
//! async fn run() {
//!     let client = Client::default();
//! }
//! ```
//!
//! ### Explicit bucket
//!
//! ```
//! use replit_object_storage::client::{ClientConfig, Client};
//!
//! async fn run() {
//!     let client = Client::new(ClientConfig::default().with_bucket_id("my-bucket"));
//! }
//! ```
//!
//! ### Anonymous Access
//!
//! ```
//! use replit_object_storage::client::{ClientConfig, Client};
//!
//! async fn run() {
//!     let config = ClientConfig::default().with_bucket_id("public-bucket").anonymous();
//!     let client = Client::new(config);
//! }
//! ```
//!
//! ### Usage
//!
//! Every operation returns [`Result`], failures carry a message and, when the storage service
//! reported one, an HTTP status.
//!
//! ```
//! use futures_util::TryStreamExt;
//! use replit_object_storage::client::Client;
//! use replit_object_storage::options::{DeleteOptions, DownloadOptions, ListOptions, UploadOptions};
//!
//! async fn run(client: Client) {
//!     client.upload_from_text("dir/a.txt", "Hello World!", &UploadOptions::default()).await.unwrap();
//!
//!     let text = client.download_as_text("dir/a.txt", &DownloadOptions::default()).await.unwrap();
//!
//!     let objects = client.list(&ListOptions::default().with_prefix("dir/")).await.unwrap();
//!
//!     let mut stream = client.download_as_stream("dir/a.txt", &DownloadOptions::default());
//!     while let Some(chunk) = stream.try_next().await.unwrap() {
//!         println!("{}", chunk.len());
//!     }
//!
//!     match client.delete("dir/a.txt", &DeleteOptions::default()).await {
//!         Ok(()) => {}
//!         Err(e) if e.is_not_found() => {}
//!         Err(e) => panic!("{e}"),
//!     }
//! }
//! ```
//!
//! ### Without Google Cloud Storage
//!
//! [`backend::MemoryBackend`] keeps objects in process, handy for tests.
//!
//! ```
//! use std::sync::Arc;
//! use replit_object_storage::backend::MemoryBackend;
//! use replit_object_storage::client::{ClientConfig, Client};
//!
//! let config = ClientConfig::default()
//!     .with_bucket_id("test")
//!     .with_backend(Arc::new(MemoryBackend::new()));
//! let client = Client::new(config);
//! ```
pub mod backend;
mod bucket;
pub mod client;
pub mod error;
pub mod http;
pub mod options;
pub mod resolver;

pub use client::{Client, ClientConfig, ObjectStream};
pub use error::{RequestError, Result, StreamRequestError};
pub use options::{DeleteOptions, DownloadOptions, ListOptions, StorageObject, UploadOptions};
