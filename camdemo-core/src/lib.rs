#![cfg_attr(not(feature = "std"), no_std)]

//! Frame encapsulation and HTTP handlers for the camera demo.
//!
//! The camera driver and the HTTP response sit behind the [`Camera`] and
//! [`Response`] traits so the handlers run unchanged on the device and in
//! host tests. With the `std` feature the crate also carries the Wi-Fi
//! connection state and a small blocking HTTP/1.1 server.

pub mod bitmap;
pub mod camera;
pub mod handlers;
pub mod pgm;
pub mod routes;
pub mod writer;

#[cfg(feature = "std")]
pub mod http;
#[cfg(feature = "std")]
pub mod network;

pub use bitmap::{BitmapHeader, BITMAP_HEADER_SIZE};
pub use camera::{Camera, Frame, PixelFormat};
pub use handlers::{HandlerError, StreamOutcome};
pub use routes::{routes_for, Route, RouteKind};
pub use writer::Response;
