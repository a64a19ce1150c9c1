//! Hot multicast stream of responses.
//!
//! A [`ResponseStream`] fans every published [`Response`](crate::core::Response)
//! out to the subscribers attached at publish time. There is no replay: a
//! subscriber only sees values published after it subscribed.
//!
//! Observation styles:
//! - every response ([`ResponseSubscriber::collect`])
//! - split data/error callbacks ([`ResponseSubscriber::collect_split`])
//! - split callbacks keeping only the newest value
//!   ([`ResponseSubscriber::collect_latest`])
//! - derived streams ([`ResponseStream::map`], [`ResponseStream::map_error`],
//!   [`ResponseStream::share`])

mod response_stream;
mod subscriber;

pub use response_stream::ResponseStream;
pub use subscriber::ResponseSubscriber;
