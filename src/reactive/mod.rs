//! Reactive building blocks
//!
//! Subjects hold the subscriber lists of every observable value in the crate,
//! and delivery contexts decide where their publications run.

pub mod scheduler;
pub mod subject;

pub use scheduler::{forward_on, DeliveryContext, ImmediateContext, Job, PolledContext, SerialContext};
pub use subject::{BehaviorSubject, Observer, PublishSubject, Subscription};
